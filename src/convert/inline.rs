//! Inline passes: emphasis, links, images and quoted code spans.
//!
//! All of them work one line at a time and leave fenced lines alone.

use crate::fence::FenceIndex;
use crate::text::{map_outside_code_spans, replace_guarded};
use regex::{Captures, Regex};
use std::sync::LazyLock;

pass_regex!(TRIPLE_UNDERSCORE, r"___([^_\n]+)___");
pass_regex!(DOUBLE_UNDERSCORE, r"__([^_\n]+)__");
pass_regex!(SINGLE_UNDERSCORE, r"_([^_\n]+)_");
pass_regex!(ALL_CAPS_WORD, r"\b[A-Z][A-Z0-9]{2,}\b");

pass_regex!(COMPLETE_LINK, r"\[[^\]]+\]\([^)]+\)");
pass_regex!(
    LABELLED_URL,
    r#"^(\s*(?:[-*+] |\d+\. |> )?)([^:\[\]()]+?):\s+(https?://[^\s<]+[^<.,:;"')\]\s])"#
);
pass_regex!(BARE_URL, r#"(^|\s)(https?://[^\s<]+[^<.,:;"')\]\s])"#);
pass_regex!(
    EMAIL,
    r"(^|\s)([a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,})"
);

pass_regex!(COMPLETE_IMAGE, r"!\[[^\]]*\]\([^)]+\)");
pass_regex!(
    IMAGE_URL_LINE,
    r"(?i)^(https?://[^\s<]+\.(?:jpg|jpeg|png|gif|webp|svg))$"
);
pass_regex!(
    LABELLED_IMAGE_LINE,
    r"(?i)^(Image|Figure|Photo|Picture):\s+(https?://[^\s<]+\.(?:jpg|jpeg|png|gif|webp|svg))$"
);

pass_regex!(DOUBLE_QUOTED, r#"\s"([^"\n]+)"\s"#);
pass_regex!(SINGLE_QUOTED, r"\s'([^'\n]+)'\s");

/// Apply `f` to every line outside fences.
fn map_unfenced(lines: &[String], f: impl Fn(&str) -> String) -> Vec<String> {
    let fences = FenceIndex::new(lines);
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if fences.is_protected(i) {
                line.clone()
            } else {
                f(line)
            }
        })
        .collect()
}

/// Replace an underscore span unless it touches more underscores or sits
/// inside a word.
fn underscore_span(re: &Regex, text: &str, marks: &str) -> String {
    replace_guarded(
        re,
        text,
        |before, after, _| {
            let open = |c: Option<char>| !c.is_some_and(|c| c == '_' || c.is_alphanumeric());
            open(before) && open(after)
        },
        |caps: &Captures<'_>| format!("{0}{1}{0}", marks, &caps[1]),
    )
}

/// The whitespace-delimited token of `text` containing byte range `start..end`.
fn enclosing_token(text: &str, start: usize, end: usize) -> &str {
    let from = text[..start]
        .rfind(char::is_whitespace)
        .map_or(0, |i| i + text[i..].chars().next().map_or(1, char::len_utf8));
    let to = text[end..]
        .find(char::is_whitespace)
        .map_or(text.len(), |i| end + i);
    &text[from..to]
}

fn bold_all_caps(text: &str) -> String {
    replace_guarded(
        &ALL_CAPS_WORD,
        text,
        |before, after, caps| {
            let Some(word) = caps.get(0) else {
                return false;
            };
            let token = enclosing_token(text, word.start(), word.end());
            before != Some('*') && after != Some('*') && !token.contains("://") && !token.contains('@')
        },
        |caps| format!("**{}**", &caps[0]),
    )
}

fn emphasise(segment: &str) -> String {
    let text = underscore_span(&TRIPLE_UNDERSCORE, segment, "***");
    let text = underscore_span(&DOUBLE_UNDERSCORE, &text, "**");
    let text = bold_all_caps(&text);
    underscore_span(&SINGLE_UNDERSCORE, &text, "*")
}

/// Normalise emphasis markers and bold ALL-CAPS words.
///
/// `___x___` becomes `***x***`, `__x__` becomes `**x**`, `_x_` becomes `*x*`
/// (never inside a word), and any ALL-CAPS word of three or more characters
/// is bolded. Asterisk forms are already canonical. Inline code spans are
/// skipped.
pub(super) fn format_emphasis(lines: &[String]) -> Vec<String> {
    map_unfenced(lines, |line| map_outside_code_spans(line, emphasise))
}

fn is_image_line(t: &str) -> bool {
    IMAGE_URL_LINE.is_match(t) || LABELLED_IMAGE_LINE.is_match(t)
}

fn link_line(line: &str) -> String {
    if COMPLETE_LINK.is_match(line) || is_image_line(line.trim()) {
        return line.to_string();
    }

    let line = LABELLED_URL.replace(line, |caps: &Captures<'_>| {
        format!("{}[{}]({})", &caps[1], caps[2].trim(), &caps[3])
    });
    let line = BARE_URL.replace_all(&line, "$1[$2]($2)");
    EMAIL.replace_all(&line, "$1[$2](mailto:$2)").into_owned()
}

/// Turn bare URLs, emails and `Label: url` lines into markdown links.
pub(super) fn format_links(lines: &[String]) -> Vec<String> {
    map_unfenced(lines, link_line)
}

fn image_line(line: &str) -> String {
    let t = line.trim();
    if COMPLETE_IMAGE.is_match(t) {
        return line.to_string();
    }
    if let Some(caps) = LABELLED_IMAGE_LINE.captures(t) {
        return format!("![{}]({})", &caps[1], &caps[2]);
    }
    if let Some(caps) = IMAGE_URL_LINE.captures(t) {
        return format!("![]({})", &caps[1]);
    }
    line.to_string()
}

/// Turn lines holding only an image URL into images.
pub(super) fn format_images(lines: &[String]) -> Vec<String> {
    map_unfenced(lines, image_line)
}

fn quoted_code_line(line: &str) -> String {
    if line.contains('`') {
        return line.to_string();
    }
    let line = DOUBLE_QUOTED.replace_all(line, " `$1` ");
    SINGLE_QUOTED.replace_all(&line, " `$1` ").into_owned()
}

/// Backtick quoted spans that sit between whitespace.
///
/// Lines that already contain a backtick are left alone.
pub(super) fn format_quoted_code(lines: &[String]) -> Vec<String> {
    map_unfenced(lines, quoted_code_line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::split_lines;
    use pretty_assertions::assert_eq;

    fn one(pass: fn(&[String]) -> Vec<String>, line: &str) -> String {
        pass(&split_lines(line)).join("\n")
    }

    #[test]
    fn test_underscore_emphasis() {
        assert_eq!(one(format_emphasis, "a __b__ c"), "a **b** c");
        assert_eq!(one(format_emphasis, "a _b_ c"), "a *b* c");
        assert_eq!(one(format_emphasis, "a ___b___ c"), "a ***b*** c");
    }

    #[test]
    fn test_snake_case_untouched() {
        let line = "set my_var_name now";
        assert_eq!(one(format_emphasis, line), line);
    }

    #[test]
    fn test_all_caps_bolded() {
        assert_eq!(
            one(format_emphasis, "the API is READY now"),
            "the **API** is **READY** now"
        );
        assert_eq!(one(format_emphasis, "already **BOLD**"), "already **BOLD**");
        assert_eq!(one(format_emphasis, "OK fine"), "OK fine");
    }

    #[test]
    fn test_all_caps_inside_urls_and_code_skipped() {
        let line = "go to https://example.com/API or mail OPS@example.com";
        assert_eq!(one(format_emphasis, line), line);
        assert_eq!(one(format_emphasis, "run `HTTP_GET` now"), "run `HTTP_GET` now");
    }

    #[test]
    fn test_bare_url_and_email() {
        assert_eq!(
            one(format_links, "see https://example.com/docs."),
            "see [https://example.com/docs](https://example.com/docs)."
        );
        assert_eq!(
            one(format_links, "write to team@example.org today"),
            "write to [team@example.org](mailto:team@example.org) today"
        );
    }

    #[test]
    fn test_labelled_url() {
        assert_eq!(
            one(format_links, "Docs: https://example.com/docs"),
            "[Docs](https://example.com/docs)"
        );
        assert_eq!(
            one(format_links, "- Home page: https://example.com"),
            "- [Home page](https://example.com)"
        );
    }

    #[test]
    fn test_existing_links_untouched() {
        let line = "see [docs](https://a.io) and https://b.io";
        assert_eq!(one(format_links, line), line);
    }

    #[test]
    fn test_images() {
        assert_eq!(
            one(format_images, "https://example.com/cat.png"),
            "![](https://example.com/cat.png)"
        );
        assert_eq!(
            one(format_images, "Figure: https://example.com/chart.SVG"),
            "![Figure](https://example.com/chart.SVG)"
        );
        let line = "![x](https://example.com/cat.png)";
        assert_eq!(one(format_images, line), line);
    }

    #[test]
    fn test_image_lines_skip_link_pass() {
        let line = "Photo: https://example.com/me.jpg";
        assert_eq!(one(format_links, line), line);
    }

    #[test]
    fn test_quoted_code() {
        assert_eq!(
            one(format_quoted_code, r#"type "make build" then 'run' it"#),
            "type `make build` then `run` it"
        );
        let line = r#"keep `x` and "y" here"#;
        assert_eq!(one(format_quoted_code, line), line);
    }

    #[test]
    fn test_fenced_lines_untouched() {
        let text = "```\nuse __init__ and NASA at https://x.io\n```";
        let lines = split_lines(text);
        assert_eq!(format_emphasis(&lines), lines);
        assert_eq!(format_links(&lines), lines);
    }
}
