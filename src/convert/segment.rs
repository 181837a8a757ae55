//! Segmentation: group raw lines into blocks separated by blank lines.
//!
//! Plain lines are joined into paragraphs, short `:`/`?` lines become `###`
//! subheadings (absorbing a directly following numbered run), runs of
//! space-aligned lines become pipe tables, and lines that already carry
//! block markup (lists, quotes, tables, headings, fences) pass through
//! verbatim as their own blocks.

use super::shape::{LineShape, classify, is_numbered_item};
use crate::fence::{FenceIndex, is_fence_marker};
use crate::table::{format_row, separator_row};
use crate::text::is_blank;
use regex::Regex;
use std::sync::LazyLock;

pass_regex!(CELL_GAP, r"\s{2,}");

/// Push an empty line unless the output is empty or already ends in one.
fn ensure_blank(out: &mut Vec<String>) {
    if out.last().is_some_and(|last| !last.is_empty()) {
        out.push(String::new());
    }
}

fn push_block(out: &mut Vec<String>, block: impl IntoIterator<Item = String>) {
    ensure_blank(out);
    out.extend(block);
    out.push(String::new());
}

/// End (exclusive) of the run starting at `start` whose lines satisfy `keep`.
fn run_end(lines: &[String], start: usize, keep: impl Fn(LineShape) -> bool) -> usize {
    start
        + lines[start..]
            .iter()
            .take_while(|line| keep(classify(line)))
            .count()
}

fn spaced_table(rows: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(rows.len() + 1);
    for (i, row) in rows.iter().enumerate() {
        let cells: Vec<&str> = CELL_GAP
            .split(row.trim())
            .map(str::trim)
            .filter(|cell| !cell.is_empty())
            .collect();
        out.push(format_row(&cells));
        if i == 0 {
            out.push(separator_row(cells.len()));
        }
    }
    out
}

pub(super) fn segment(lines: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    // Set when the last block emitted was a paragraph ending on the previous line
    let mut paragraph_ended_at = None;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();
        let shape = classify(line);

        match shape {
            LineShape::Blank => {
                i += 1;
            }
            LineShape::Fence => {
                let close = (i + 1..lines.len()).find(|&j| is_fence_marker(&lines[j]));
                match close {
                    Some(c) => {
                        push_block(&mut out, lines[i..=c].iter().cloned());
                        i = c + 1;
                    }
                    None => {
                        // Unclosed fence owns the rest of the text, verbatim
                        ensure_blank(&mut out);
                        out.extend(lines[i..].iter().cloned());
                        i = lines.len();
                    }
                }
            }
            LineShape::Heading => {
                push_block(&mut out, [line.to_string()]);
                i += 1;
            }
            LineShape::Rule => {
                if paragraph_ended_at == Some(i) && out.last().is_some_and(String::is_empty) {
                    // Setext underline: keep it glued to its paragraph
                    out.pop();
                    out.push(line.to_string());
                    out.push(String::new());
                } else {
                    push_block(&mut out, [line.to_string()]);
                }
                i += 1;
            }
            LineShape::ListItem => {
                let end = run_end(lines, i, |s| {
                    matches!(s, LineShape::ListItem | LineShape::Text | LineShape::Spaced)
                });
                push_block(
                    &mut out,
                    lines[i..end].iter().map(|l| l.trim_end().to_string()),
                );
                i = end;
            }
            LineShape::Quote => {
                let end = run_end(lines, i, |s| matches!(s, LineShape::Quote | LineShape::Text));
                push_block(
                    &mut out,
                    lines[i..end].iter().map(|l| l.trim_end().to_string()),
                );
                i = end;
            }
            LineShape::TableRow => {
                let end = run_end(lines, i, |s| s == LineShape::TableRow);
                push_block(
                    &mut out,
                    lines[i..end].iter().map(|l| l.trim_end().to_string()),
                );
                i = end;
            }
            LineShape::Subheading => {
                let mut block = vec![format!("### {}", line)];
                let mut j = i + 1;
                while j < lines.len() && is_numbered_item(&lines[j]) {
                    block.push(lines[j].trim().to_string());
                    j += 1;
                }
                push_block(&mut out, block);
                i = j;
            }
            LineShape::Spaced => {
                let end = run_end(lines, i, |s| s == LineShape::Spaced);
                if end - i >= 2 {
                    push_block(&mut out, spaced_table(&lines[i..end]));
                } else {
                    push_block(&mut out, [line.to_string()]);
                    paragraph_ended_at = Some(end);
                }
                i = end;
            }
            LineShape::Text => {
                let end = run_end(lines, i, |s| s == LineShape::Text);
                let paragraph: Vec<&str> = lines[i..end].iter().map(|l| l.trim()).collect();
                push_block(&mut out, [paragraph.join(" ")]);
                paragraph_ended_at = Some(end);
                i = end;
            }
        }
    }

    out
}

/// Collapse every run of blank lines outside fences to a single blank line.
pub(super) fn collapse_blank_lines(lines: &[String]) -> Vec<String> {
    let fences = FenceIndex::new(lines);
    let mut out: Vec<String> = Vec::with_capacity(lines.len());

    for (i, line) in lines.iter().enumerate() {
        if !fences.is_protected(i) && is_blank(line) {
            if out.last().is_some_and(|last| last.is_empty()) {
                continue;
            }
            out.push(String::new());
        } else {
            out.push(line.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{join_lines, split_lines};
    use pretty_assertions::assert_eq;

    fn run(text: &str) -> String {
        join_lines(&segment(&split_lines(text)))
    }

    #[test]
    fn test_paragraph_lines_joined() {
        assert_eq!(run("one line\nand another\n\nnew para"), "one line and another\n\nnew para\n");
    }

    #[test]
    fn test_subheading_absorbs_numbered_run() {
        assert_eq!(
            run("Plan:\n1. Design\n2. Build\nafterwards text"),
            "### Plan:\n1. Design\n2. Build\n\nafterwards text\n"
        );
    }

    #[test]
    fn test_spaced_rows_become_table() {
        assert_eq!(
            run("Item  Qty  Price\nApple  3  1.20\n"),
            "| Item | Qty | Price |\n| --- | --- | --- |\n| Apple | 3 | 1.20 |\n"
        );
    }

    #[test]
    fn test_single_spaced_line_is_paragraph() {
        assert_eq!(run("Total:  42 items here\nnext"), "Total:  42 items here\n\nnext\n");
    }

    #[test]
    fn test_list_kept_verbatim_with_indent() {
        assert_eq!(
            run("intro\n\n- a\n  - nested\nplain follower\n\nend"),
            "intro\n\n- a\n  - nested\nplain follower\n\nend\n"
        );
    }

    #[test]
    fn test_fence_copied_verbatim() {
        assert_eq!(
            run("text\n```\n  keep   this\n\n\n```\nmore"),
            "text\n\n```\n  keep   this\n\n\n```\n\nmore\n"
        );
    }

    #[test]
    fn test_unclosed_fence_runs_to_end() {
        assert_eq!(run("text\n```\ncode\n  keep"), "text\n\n```\ncode\n  keep");
    }

    #[test]
    fn test_quote_absorbs_lazy_continuation() {
        assert_eq!(run("> first\nsecond\n\nafter"), "> first\nsecond\n\nafter\n");
        assert_eq!(run("> quoted\n- item"), "> quoted\n\n- item\n");
    }

    #[test]
    fn test_setext_underline_stays_attached() {
        assert_eq!(run("Overview\n--------\nBody text"), "Overview\n--------\n\nBody text\n");
    }

    #[test]
    fn test_collapse_blank_lines() {
        let lines = split_lines("a\n\n\n\nb\n```\n\n\n```");
        assert_eq!(
            join_lines(&collapse_blank_lines(&lines)),
            "a\n\nb\n```\n\n\n```"
        );
    }
}
