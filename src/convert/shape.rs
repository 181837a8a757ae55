//! Line shapes shared by several passes.

use crate::fence::is_fence_marker;
use regex::Regex;
use std::sync::LazyLock;

/// Lines shorter than this (in characters) can be titles or subheadings.
pub(crate) const SHORT_LINE: usize = 60;

pass_regex!(ATX_HEADING, r"^#{1,6}\s+\S");
pass_regex!(RULE, r"^(?:-{3,}|\*{3,}|_{3,}|={3,})$");
pass_regex!(UNDERLINE, r"^(?:={3,}|-{3,})$");
pass_regex!(LIST_ITEM, r"^(?:[-•*+]|\d+[.)])\s+\S");
pass_regex!(NUMBERED_ITEM, r"^\d+\.\s+\S");

/// What a single line looks like before any structure is inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineShape {
    Blank,
    Fence,
    Heading,
    Rule,
    ListItem,
    Quote,
    TableRow,
    /// Short line ending in `:` or `?`
    Subheading,
    /// Contains a gap of two or more spaces
    Spaced,
    Text,
}

pub(crate) fn classify(line: &str) -> LineShape {
    let t = line.trim();
    if t.is_empty() {
        LineShape::Blank
    } else if is_fence_marker(t) {
        LineShape::Fence
    } else if ATX_HEADING.is_match(t) {
        LineShape::Heading
    } else if RULE.is_match(t) {
        LineShape::Rule
    } else if LIST_ITEM.is_match(t) {
        LineShape::ListItem
    } else if t.starts_with('>') {
        LineShape::Quote
    } else if t.starts_with('|') {
        LineShape::TableRow
    } else if is_subheading(t) {
        LineShape::Subheading
    } else if t.contains("  ") {
        LineShape::Spaced
    } else {
        LineShape::Text
    }
}

pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

pub(crate) fn is_subheading(t: &str) -> bool {
    (t.ends_with(':') || t.ends_with('?')) && char_len(t) < SHORT_LINE
}

pub(crate) fn is_atx_heading(line: &str) -> bool {
    ATX_HEADING.is_match(line.trim_start())
}

/// A homogeneous run of three or more `-`, `*`, `_` or `=`.
pub(crate) fn is_rule(line: &str) -> bool {
    RULE.is_match(line.trim())
}

/// A Setext underline: three or more `=` or `-`.
pub(crate) fn is_underline(line: &str) -> bool {
    UNDERLINE.is_match(line.trim())
}

pub(crate) fn is_list_item(line: &str) -> bool {
    LIST_ITEM.is_match(line.trim_start())
}

pub(crate) fn is_numbered_item(line: &str) -> bool {
    NUMBERED_ITEM.is_match(line.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::blank("   ", LineShape::Blank)]
    #[case::fence("```rust", LineShape::Fence)]
    #[case::heading("## Done", LineShape::Heading)]
    #[case::rule("-----", LineShape::Rule)]
    #[case::equals("===", LineShape::Rule)]
    #[case::bullet("• apples", LineShape::ListItem)]
    #[case::numbered("2) pears", LineShape::ListItem)]
    #[case::quote("> said", LineShape::Quote)]
    #[case::table("| a | b |", LineShape::TableRow)]
    #[case::subheading("What next?", LineShape::Subheading)]
    #[case::spaced("Name  Score", LineShape::Spaced)]
    #[case::text("Plain words here.", LineShape::Text)]
    fn test_classify(#[case] line: &str, #[case] expected: LineShape) {
        assert_eq!(classify(line), expected);
    }

    #[test]
    fn test_long_question_is_text() {
        let line = "Is this a very long question that keeps going well past the limit?";
        assert_eq!(classify(line), LineShape::Text);
    }

    #[test]
    fn test_mixed_rule_is_not_rule() {
        assert!(!is_rule("-*-"));
        assert!(is_rule("  ***  "));
        assert!(is_underline("==="));
        assert!(!is_underline("***"));
    }
}
