//! Line and span helpers shared by the detectors and converter passes.

use regex::{Captures, Regex};

/// Split on `\n`, keeping a trailing empty element when the text ends with a
/// newline so that joining gives back the same text.
pub(crate) fn split_lines(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_string).collect()
}

/// Inverse of [`split_lines`].
pub(crate) fn join_lines<S: AsRef<str>>(lines: &[S]) -> String {
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(line.as_ref());
    }
    out
}

/// Leading whitespace of a line.
pub(crate) fn leading_ws(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

pub(crate) fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Replace every match of `re` for which `accept` holds.
///
/// `accept` sees the character before and after the match, which stands in
/// for the lookbehind/lookahead assertions the `regex` crate does not have.
pub(crate) fn replace_guarded<A, R>(re: &Regex, text: &str, accept: A, render: R) -> String
where
    A: Fn(Option<char>, Option<char>, &Captures<'_>) -> bool,
    R: Fn(&Captures<'_>) -> String,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let before = text[..whole.start()].chars().next_back();
        let after = text[whole.end()..].chars().next();

        if accept(before, after, &caps) {
            out.push_str(&text[last..whole.start()]);
            out.push_str(&render(&caps));
            last = whole.end();
        }
    }

    out.push_str(&text[last..]);
    out
}

/// Apply `f` to the parts of `line` that are outside inline code spans.
///
/// A span opens at a backtick and closes at the next backtick. An unclosed
/// backtick is treated as ordinary text.
pub(crate) fn map_outside_code_spans<F>(line: &str, f: F) -> String
where
    F: Fn(&str) -> String,
{
    if !line.contains('`') {
        return f(line);
    }

    let mut out = String::with_capacity(line.len());
    let mut rest = line;

    while let Some(open) = rest.find('`') {
        let after_open = &rest[open + 1..];
        let Some(close) = after_open.find('`') else {
            break;
        };
        out.push_str(&f(&rest[..open]));
        out.push_str(&rest[open..open + 1 + close + 1]);
        rest = &after_open[close + 1..];
    }

    out.push_str(&f(rest));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_join_roundtrip() {
        for text in ["", "a", "a\n", "a\n\nb", "\n\n"] {
            assert_eq!(join_lines(&split_lines(text)), text);
        }
    }

    #[test]
    fn test_leading_ws() {
        assert_eq!(leading_ws("  - item"), "  ");
        assert_eq!(leading_ws("\titem"), "\t");
        assert_eq!(leading_ws("item"), "");
    }

    #[test]
    fn test_replace_guarded_respects_neighbours() {
        let re = Regex::new(r"foo").unwrap();
        let out = replace_guarded(
            &re,
            "foo xfoo foo",
            |before, _, _| !before.is_some_and(char::is_alphanumeric),
            |_| "bar".to_string(),
        );
        assert_eq!(out, "bar xfoo bar");
    }

    #[test]
    fn test_map_outside_code_spans() {
        let out = map_outside_code_spans("a `b` c", |s| s.to_uppercase());
        assert_eq!(out, "A `b` C");

        let unclosed = map_outside_code_spans("a `b c", |s| s.to_uppercase());
        assert_eq!(unclosed, "A `B C");
    }
}
