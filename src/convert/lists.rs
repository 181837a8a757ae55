//! List and task-list normalisation.

use super::shape::{is_atx_heading, is_rule};
use crate::fence::{FenceIndex, is_fence_marker};
use crate::text::{is_blank, leading_ws};
use regex::Regex;
use std::sync::LazyLock;

pass_regex!(NUMBERED, r"^(\s*)([0-9]+)[.)]\s+(.+)$");
pass_regex!(BULLET, r"^(\s*)[-•*+]\s+(.+)$");
pass_regex!(TASK, r"^(\s*)[-*+]\s+\[([xX ])\]\s+(.+)$");
pass_regex!(
    STATUS,
    r"(?i)^(\s*)[-*+]\s+(TODO|DONE|☐|☑|☒|□|✓|✔|✗|✘):?\s+(.+)$"
);
pass_regex!(CHECKED_STATUS, r"(?i)^(?:DONE|☑|☒|✓|✔)$");

/// The list marker a line carries, if any.
enum Marker {
    Numbered { indent: String, number: String },
    Bullet { indent: String },
}

fn marker_of(line: &str) -> Option<Marker> {
    if let Some(caps) = NUMBERED.captures(line) {
        return Some(Marker::Numbered {
            indent: caps[1].to_string(),
            number: caps[2].to_string(),
        });
    }
    BULLET.captures(line).map(|caps| Marker::Bullet {
        indent: caps[1].to_string(),
    })
}

/// Add one to a run of ASCII digits, however long.
fn next_number(digits: &str) -> String {
    let mut bytes = digits.as_bytes().to_vec();
    for b in bytes.iter_mut().rev() {
        if *b == b'9' {
            *b = b'0';
        } else {
            *b += 1;
            return String::from_utf8_lossy(&bytes).into_owned();
        }
    }
    bytes.insert(0, b'1');
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Lines that never become an inferred list item.
fn is_block_markup(t: &str) -> bool {
    is_atx_heading(t)
        || is_fence_marker(t)
        || is_rule(t)
        || t.starts_with('|')
        || t.starts_with('>')
}

/// Normalise list markers and infer items that follow a list item.
///
/// Numbered markers become `N. `, bullets become `- `, indentation is kept.
/// While a list is open, lines indented at or beyond the list's indentation
/// are continuation lines. A plain line right after an item becomes the next
/// item in the same style. A blank line closes the list.
pub(super) fn format_lists(lines: &[String]) -> Vec<String> {
    let fences = FenceIndex::new(lines);
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut in_list = false;
    let mut list_indent = 0;

    for (i, line) in lines.iter().enumerate() {
        if fences.is_protected(i) {
            out.push(line.clone());
            continue;
        }

        if let Some(caps) = NUMBERED.captures(line) {
            in_list = true;
            list_indent = caps[1].len();
            out.push(format!("{}{}. {}", &caps[1], &caps[2], &caps[3]));
            continue;
        }
        if let Some(caps) = BULLET.captures(line) {
            in_list = true;
            list_indent = caps[1].len();
            out.push(format!("{}- {}", &caps[1], &caps[2]));
            continue;
        }

        if is_blank(line) {
            in_list = false;
            out.push(line.clone());
            continue;
        }

        let indent = leading_ws(line).len();
        if in_list && indent > 0 && indent >= list_indent {
            out.push(line.clone());
            continue;
        }

        let inferred = out
            .last()
            .filter(|_| in_list && !is_block_markup(line.trim()))
            .and_then(|prev| marker_of(prev));
        match inferred {
            Some(Marker::Numbered { indent, number }) => {
                out.push(format!("{}{}. {}", indent, next_number(&number), line.trim()));
            }
            Some(Marker::Bullet { indent }) => {
                out.push(format!("{}- {}", indent, line.trim()));
            }
            None => {
                in_list = false;
                out.push(line.clone());
            }
        }
    }

    out
}

/// Canonicalise checkbox items and turn status words into checkboxes.
pub(super) fn format_task_lists(lines: &[String]) -> Vec<String> {
    let fences = FenceIndex::new(lines);

    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if fences.is_protected(i) {
                return line.clone();
            }
            if let Some(caps) = TASK.captures(line) {
                let mark = if caps[2].eq_ignore_ascii_case("x") { "x" } else { " " };
                return format!("{}- [{}] {}", &caps[1], mark, &caps[3]);
            }
            if let Some(caps) = STATUS.captures(line) {
                let mark = if CHECKED_STATUS.is_match(&caps[2]) { "x" } else { " " };
                return format!("{}- [{}] {}", &caps[1], mark, &caps[3]);
            }
            line.clone()
        })
        .collect()
}
