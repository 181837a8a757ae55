//! Code block detection.
//!
//! Wraps code-looking runs of raw text in fenced blocks tagged by the
//! language sniffer, then backticks code-looking tokens in ordinary lines.
//! Existing fenced blocks are masked for the whole operation and come back
//! byte for byte.

use crate::fence::{FenceIndex, is_fence_marker};
use crate::language::fence_tag;
use crate::mask::MaskTable;
use crate::text::{is_blank, join_lines, map_outside_code_spans, replace_guarded, split_lines};
use log::debug;
use regex::Regex;
use std::sync::LazyLock;

/// Minimum lines in an indented run.
pub const MIN_INDENTED_LINES: usize = 2;

macro_rules! code_regex {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($re).expect("valid code regex"));
    };
}

code_regex!(
    BRACED_OPENER,
    r"^(?:function|class|const|let|var|import|export|if|for|while)\b"
);
code_regex!(
    STATEMENT_OPENER,
    r"^(?:public|private|protected|static|void|int|string|bool|function|def|class|interface)\s+\w+"
);
code_regex!(CALL, r"[A-Za-z_]\w*(?:\.[A-Za-z_]\w*)*\(\)");
code_regex!(FLAG, r"--?[A-Za-z][\w-]*");
code_regex!(PATH, r"/[\w.-]+(?:/[\w.-]+)*/?");
code_regex!(QUOTED_TECHNICAL, r#""([A-Za-z0-9_\-./\\]+)""#);

/// Block-level shapes, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockShape {
    /// Two or more lines indented by four spaces or a tab
    Indented,
    /// A keyword-led line opening a brace-balanced run
    Braced,
    /// A typed-language declaration ending at `;` or a balanced brace run
    Statement,
}

impl BlockShape {
    /// All shapes in application order.
    pub const ALL: [BlockShape; 3] = [Self::Indented, Self::Braced, Self::Statement];

    /// Shape name for logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Indented => "indented",
            Self::Braced => "braced",
            Self::Statement => "statement",
        }
    }

    /// If a run of this shape starts at `lines[start]`, return its exclusive end.
    pub fn run_end<S: AsRef<str>>(self, lines: &[S], start: usize) -> Option<usize> {
        let first = lines.get(start)?.as_ref();
        match self {
            Self::Indented => {
                let end = start
                    + lines[start..]
                        .iter()
                        .take_while(|line| is_indented(line.as_ref()))
                        .count();
                (end - start >= MIN_INDENTED_LINES).then_some(end)
            }
            Self::Braced => {
                if !BRACED_OPENER.is_match(first) {
                    return None;
                }
                terminated_run(lines, start, false)
            }
            Self::Statement => {
                if !STATEMENT_OPENER.is_match(first) {
                    return None;
                }
                terminated_run(lines, start, true)
            }
        }
    }

    /// Body text of a run, as it goes between the fences.
    fn body<S: AsRef<str>>(self, run: &[S]) -> String {
        match self {
            Self::Indented => {
                let stripped: Vec<&str> = run.iter().map(|line| dedent(line.as_ref())).collect();
                join_lines(&stripped)
            }
            Self::Braced | Self::Statement => join_lines(run),
        }
    }
}

fn is_indented(line: &str) -> bool {
    (line.starts_with("    ") || line.starts_with('\t')) && !is_blank(line)
}

fn dedent(line: &str) -> &str {
    line.strip_prefix("    ")
        .or_else(|| line.strip_prefix('\t'))
        .unwrap_or(line)
}

/// End of a run that closes when its braces balance, or (if allowed) at the
/// first line ending in `;` before any brace opens. A blank line before the
/// run terminates abandons it.
fn terminated_run<S: AsRef<str>>(lines: &[S], start: usize, allow_semicolon: bool) -> Option<usize> {
    let mut depth: usize = 0;
    let mut opened = false;

    for (i, line) in lines.iter().enumerate().skip(start) {
        let line = line.as_ref();
        if !opened && i > start && is_blank(line) {
            return None;
        }

        for c in line.chars() {
            match c {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' if depth > 0 => depth -= 1,
                _ => {}
            }
        }

        if opened && depth == 0 {
            return Some(i + 1);
        }
        if !opened && allow_semicolon && line.trim_end().ends_with(';') {
            return Some(i + 1);
        }
    }
    None
}

/// Replace each paired fenced block with a single token line.
fn mask_fenced_blocks(lines: Vec<String>, mask: &mut MaskTable) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    let mut i = 0;
    while i < lines.len() {
        if !is_fence_marker(&lines[i]) {
            out.push(lines[i].clone());
            i += 1;
            continue;
        }
        match (i + 1..lines.len()).find(|&j| is_fence_marker(&lines[j])) {
            Some(close) => {
                out.push(mask.mask(join_lines(&lines[i..=close])));
                i = close + 1;
            }
            None => {
                // Unpaired: the fence guard keeps everything after it as-is
                out.extend_from_slice(&lines[i..]);
                break;
            }
        }
    }
    out
}

fn apply_shape(shape: BlockShape, lines: Vec<String>, mask: &mut MaskTable) -> Vec<String> {
    let fences = FenceIndex::new(&lines);
    let mut out = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let usable = |j: usize| !fences.is_protected(j) && !mask.contains_token(&lines[j]);
        let run = if usable(i) {
            shape
                .run_end(&lines, i)
                .filter(|&end| (i..end).all(usable))
        } else {
            None
        };

        let Some(end) = run else {
            out.push(lines[i].clone());
            i += 1;
            continue;
        };

        let body = shape.body(&lines[i..end]);
        let tag = fence_tag(&body);
        debug!(
            "{} code block at line {} ({} lines, tag {:?})",
            shape.name(),
            i + 1,
            end - i,
            tag
        );
        out.push(mask.mask(format!("```{}\n{}\n```", tag, body)));
        i = end;
    }
    out
}

/// Backtick code-looking tokens outside existing code spans.
pub fn format_inline_code(line: &str) -> String {
    let at_word_start = |before: Option<char>| before.is_none_or(char::is_whitespace);

    let line = map_outside_code_spans(line, |seg| {
        replace_guarded(
            &CALL,
            seg,
            |before, _, _| !before.is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '.'),
            |caps| format!("`{}`", &caps[0]),
        )
    });
    let line = map_outside_code_spans(&line, |seg| {
        replace_guarded(
            &FLAG,
            seg,
            |before, after, _| at_word_start(before) && !after.is_some_and(char::is_alphanumeric),
            |caps| format!("`{}`", &caps[0]),
        )
    });
    let line = map_outside_code_spans(&line, |seg| {
        replace_guarded(
            &PATH,
            seg,
            |before, _, _| at_word_start(before),
            |caps| format!("`{}`", &caps[0]),
        )
    });
    map_outside_code_spans(&line, |seg| {
        QUOTED_TECHNICAL.replace_all(seg, "`$1`").into_owned()
    })
}

/// Fence code-looking runs in `text` and backtick code-looking tokens.
pub fn detect_code_blocks(text: &str) -> String {
    let mut mask = MaskTable::for_text(text);
    let mut lines = mask_fenced_blocks(split_lines(text), &mut mask);

    for shape in BlockShape::ALL {
        lines = apply_shape(shape, lines, &mut mask);
    }

    let fences = FenceIndex::new(&lines);
    let lines: Vec<String> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if fences.is_protected(i) || mask.contains_token(line) {
                line.clone()
            } else {
                format_inline_code(line)
            }
        })
        .collect();

    mask.restore(&join_lines(&lines))
}
