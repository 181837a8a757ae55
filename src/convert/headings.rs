//! Heading inference: Setext underlines and standalone short lines.

use super::shape::{char_len, is_atx_heading, is_list_item, is_rule};
use crate::fence::FenceIndex;
use crate::text::is_blank;
use regex::Regex;
use std::sync::LazyLock;

pass_regex!(ALL_CAPS_LINE, r"^[A-Z0-9\s.,!?:;-]+$");
pass_regex!(QUOTE_INDICATOR, r"^(?:Quote|Quoted|Q|Citation):");

fn setext_level(underline: &str) -> Option<usize> {
    let t = underline.trim();
    if t.len() < 3 {
        None
    } else if t.chars().all(|c| c == '=') {
        Some(1)
    } else if t.chars().all(|c| c == '-') {
        Some(2)
    } else {
        None
    }
}

/// Can this line be the text of a heading at all?
fn is_heading_text(line: &str) -> bool {
    let t = line.trim();
    !t.is_empty()
        && !is_rule(t)
        && !is_list_item(t)
        && !t.starts_with('>')
        && !t.starts_with('|')
        && !t.starts_with("```")
}

/// Level for a standalone line promoted by its shape alone.
fn shape_level(t: &str) -> Option<usize> {
    let len = char_len(t);
    let starts_upper = t.chars().next().is_some_and(char::is_uppercase);
    if len >= 100 || t.contains("://") || QUOTE_INDICATOR.is_match(t) {
        return None;
    }

    // All-caps lines may open with a digit; the other levels need a capital
    let has_letters = t.chars().any(char::is_alphabetic);
    if len < 20 && has_letters && ALL_CAPS_LINE.is_match(t) {
        Some(1)
    } else if !starts_upper {
        None
    } else if len < 50 && !t.contains('.') {
        Some(2)
    } else if len < 80 && !t.ends_with('.') {
        Some(3)
    } else {
        None
    }
}

fn heading(level: usize, text: &str) -> String {
    format!("{} {}", "#".repeat(level), text.trim())
}

pub(super) fn format_headings(lines: &[String]) -> Vec<String> {
    let fences = FenceIndex::new(lines);
    let mut out = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let line = &lines[i];
        if fences.is_protected(i) || is_blank(line) || is_atx_heading(line) || !is_heading_text(line) {
            out.push(line.clone());
            i += 1;
            continue;
        }

        let next = lines.get(i + 1);
        let underline = next
            .filter(|_| !fences.is_protected(i + 1))
            .and_then(|n| setext_level(n));
        if let Some(level) = underline {
            out.push(heading(level, line));
            i += 2;
            continue;
        }

        let prev_blank = i == 0 || is_blank(&lines[i - 1]);
        let next_blank = next.is_none_or(|n| is_blank(n));
        match shape_level(line.trim()) {
            Some(level) if prev_blank && next_blank => out.push(heading(level, line)),
            _ => out.push(line.clone()),
        }
        i += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{join_lines, split_lines};
    use pretty_assertions::assert_eq;

    fn run(text: &str) -> String {
        join_lines(&format_headings(&split_lines(text)))
    }

    #[test]
    fn test_setext_levels() {
        assert_eq!(run("Title\n=====\n\nbody text"), "# Title\n\nbody text");
        assert_eq!(run("Section\n-------\nbody text"), "## Section\nbody text");
    }

    #[test]
    fn test_rule_after_blank_is_not_setext() {
        assert_eq!(run("# Top\n\n---\n\ntext."), "# Top\n\n---\n\ntext.");
    }

    #[test]
    fn test_rule_under_rule_is_not_setext() {
        assert_eq!(run("***\n---"), "***\n---");
    }

    #[test]
    fn test_shape_promotion_levels() {
        assert_eq!(run("\nSUMMARY\n"), "\n# SUMMARY\n");
        assert_eq!(run("\nProject Background\n"), "\n## Project Background\n");
        assert_eq!(
            run("\nA slightly longer heading, e.g. with an abbreviation inside it\n"),
            "\n### A slightly longer heading, e.g. with an abbreviation inside it\n"
        );
    }

    #[test]
    fn test_digit_led_all_caps_is_h1() {
        assert_eq!(run("\n2024 ROADMAP\n"), "\n# 2024 ROADMAP\n");
        assert_eq!(run("\n2024 plans ahead\n"), "\n2024 plans ahead\n");
        assert_eq!(run("\n42\n"), "\n42\n");
    }

    #[test]
    fn test_sentences_are_not_promoted() {
        let text = "\nEverything is on track.\n";
        assert_eq!(run(text), text);
    }

    #[test]
    fn test_lines_inside_paragraph_context_not_promoted() {
        let text = "Intro\nFollow up line";
        assert_eq!(run(text), text);
    }

    #[test]
    fn test_lowercase_and_urls_not_promoted() {
        for text in ["\nlowercase start\n", "\nSee https://example.com\n", "\nQuote: be kind\n"] {
            assert_eq!(run(text), text);
        }
    }

    #[test]
    fn test_fenced_lines_untouched() {
        let text = "```\nTitle\n=====\n\nHEADER\n\n```";
        assert_eq!(run(text), text);
    }
}
