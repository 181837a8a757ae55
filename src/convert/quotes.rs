//! Blockquotes and horizontal rules.

use super::shape::{is_atx_heading, is_list_item};
use crate::fence::FenceIndex;
use crate::text::is_blank;
use regex::Regex;
use std::sync::LazyLock;

pass_regex!(QUOTED_LINE, r#"^\s*["'](.+)["']\s*$"#);
pass_regex!(QUOTE_INDICATOR, r"^\s*(?:Quote|Quoted|Q|Citation):\s*");
pass_regex!(HOMOGENEOUS_RULE, r"^(?:-{3,}|\*{3,}|_{3,})$");
pass_regex!(EQUALS_RULE, r"^={3,}$");

/// Mark quotations with `>`.
///
/// A line already starting with `>` opens quote mode, as does a line that is
/// only a quoted string or one introduced by `Quote:`, `Quoted:`, `Q:` or
/// `Citation:`. While quote mode is open, following non-blank lines that are
/// not headings or list items are prefixed too. A blank line closes it.
pub(super) fn format_blockquotes(lines: &[String]) -> Vec<String> {
    let fences = FenceIndex::new(lines);
    let mut out = Vec::with_capacity(lines.len());
    let mut in_quote = false;

    for (i, line) in lines.iter().enumerate() {
        if fences.is_protected(i) {
            out.push(line.clone());
            continue;
        }

        if line.trim_start().starts_with('>') {
            in_quote = true;
            out.push(line.clone());
        } else if let Some(caps) = QUOTED_LINE.captures(line) {
            in_quote = true;
            out.push(format!("> {}", &caps[1]));
        } else if let Some(indicator) = QUOTE_INDICATOR.find(line) {
            in_quote = true;
            out.push(format!("> {}", &line[indicator.end()..]));
        } else if is_blank(line) {
            in_quote = false;
            out.push(line.clone());
        } else if in_quote && !is_atx_heading(line) && !is_list_item(line) {
            out.push(format!("> {}", line));
        } else {
            out.push(line.clone());
        }
    }

    out
}

/// Canonicalise rules to `---`.
///
/// Homogeneous runs of `-`, `*` or `_` always become `---`. A run of `=`
/// becomes `---` only after a blank line, since under text it would be a
/// Setext underline.
pub(super) fn format_horizontal_rules(lines: &[String]) -> Vec<String> {
    let fences = FenceIndex::new(lines);

    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let t = line.trim();
            if fences.is_protected(i) {
                return line.clone();
            }
            let after_blank = i == 0 || is_blank(&lines[i - 1]);
            if HOMOGENEOUS_RULE.is_match(t) || (EQUALS_RULE.is_match(t) && after_blank) {
                "---".to_string()
            } else {
                line.clone()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{join_lines, split_lines};
    use pretty_assertions::assert_eq;

    fn quotes(text: &str) -> String {
        join_lines(&format_blockquotes(&split_lines(text)))
    }

    fn rules(text: &str) -> String {
        join_lines(&format_horizontal_rules(&split_lines(text)))
    }

    #[test]
    fn test_existing_quote_continues() {
        assert_eq!(
            quotes("> first\nsecond\n\nafter"),
            "> first\n> second\n\nafter"
        );
    }

    #[test]
    fn test_quoted_string_line() {
        assert_eq!(quotes("\"Stay hungry.\""), "> Stay hungry.");
        assert_eq!(quotes("'Less is more'"), "> Less is more");
    }

    #[test]
    fn test_quote_indicators() {
        assert_eq!(quotes("Quote: be kind\nalways"), "> be kind\n> always");
        assert_eq!(quotes("Q: why not"), "> why not");
        assert_eq!(quotes("Citation: Knuth, 1974"), "> Knuth, 1974");
    }

    #[test]
    fn test_quote_mode_stops_at_structure() {
        assert_eq!(
            quotes("> said\n- item\n## Next"),
            "> said\n- item\n## Next"
        );
    }

    #[test]
    fn test_rules() {
        assert_eq!(rules("*****"), "---");
        assert_eq!(rules("a\n\n_____"), "a\n\n---");
        assert_eq!(rules("\n====="), "\n---");
        assert_eq!(rules("text\n====="), "text\n=====");
        assert_eq!(rules("-*-*-"), "-*-*-");
    }

    #[test]
    fn test_fenced_rules_untouched() {
        let text = "```\n*****\n> x\n```";
        assert_eq!(rules(text), text);
        assert_eq!(quotes(text), text);
    }
}
