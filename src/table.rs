//! Table detection.
//!
//! Finds runs of delimiter-separated lines in raw text and rewrites each run
//! into a canonical pipe table. Genuine markdown tables are masked first so
//! no shape ever touches them, and every table this module emits is masked
//! as soon as it is written so later shapes skip it as well.

use crate::fence::FenceIndex;
use crate::mask::MaskTable;
use crate::text::{join_lines, split_lines};
use log::debug;
use regex::Regex;
use std::sync::LazyLock;

/// Minimum rows for any candidate run.
pub const MIN_ROWS: usize = 2;

macro_rules! table_regex {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($re).expect("valid table regex"));
    };
}

table_regex!(CSV_LINE, r#"^[^,"]+(?:,[^,"]+)+$"#);
table_regex!(CSV_DELIM, r"\s*,\s*");
table_regex!(SPACED_LINE, r"^\S+(?:\s{2,}\S+)+$");
table_regex!(SPACED_DELIM, r"\s{2,}");
table_regex!(PIPE_LINE, r"^[^|]*\|[^|]*\|.*$");
table_regex!(PIPE_DELIM, r"\s*\|\s*");
table_regex!(PIPE_OUTER, r"^\s*\|\s*|\s*\|\s*$");
table_regex!(TAB_LINE, r"^[^\t]+(?:\t[^\t]+)+$");
table_regex!(TAB_DELIM, r"\t");
table_regex!(BLOCK_MARKUP, r"^\s*(?:#{1,6}\s|>|[-*+]\s|\d+[.)]\s)");

/// One raw-text table shape.
pub struct TableShape {
    /// Shape name for logs
    pub name: &'static str,
    line: &'static LazyLock<Regex>,
    delimiter: &'static LazyLock<Regex>,
    /// Minimum widest row
    pub min_cols: usize,
    /// Lower minimum accepted when every row has the same width
    pub uniform_min_cols: usize,
    strip_outer_pipes: bool,
}

impl TableShape {
    /// Check whether a single line has this shape.
    pub fn matches_line(&self, line: &str) -> bool {
        let line = line.trim_end();
        !BLOCK_MARKUP.is_match(line) && self.line.is_match(line)
    }

    /// Split a line into trimmed cells.
    pub fn split_cells(&self, line: &str) -> Vec<String> {
        let line = line.trim();
        let stripped;
        let line = if self.strip_outer_pipes {
            stripped = PIPE_OUTER.replace_all(line, "");
            stripped.as_ref()
        } else {
            line
        };
        self.delimiter
            .split(line)
            .map(|cell| cell.trim().to_string())
            .collect()
    }

    fn accepts(&self, rows: &[Vec<String>]) -> bool {
        if rows.len() < MIN_ROWS {
            return false;
        }
        let widest = rows.iter().map(Vec::len).max().unwrap_or(0);
        let uniform = rows.iter().all(|row| row.len() == widest);
        widest >= self.min_cols || (uniform && widest >= self.uniform_min_cols)
    }
}

/// Shapes in application order.
pub static SHAPES: &[TableShape] = &[
    TableShape {
        name: "csv",
        line: &CSV_LINE,
        delimiter: &CSV_DELIM,
        min_cols: 2,
        uniform_min_cols: 2,
        strip_outer_pipes: false,
    },
    TableShape {
        name: "whitespace",
        line: &SPACED_LINE,
        delimiter: &SPACED_DELIM,
        min_cols: 3,
        uniform_min_cols: 2,
        strip_outer_pipes: false,
    },
    TableShape {
        name: "pipe",
        line: &PIPE_LINE,
        delimiter: &PIPE_DELIM,
        min_cols: 2,
        uniform_min_cols: 2,
        strip_outer_pipes: true,
    },
    TableShape {
        name: "tab",
        line: &TAB_LINE,
        delimiter: &TAB_DELIM,
        min_cols: 2,
        uniform_min_cols: 2,
        strip_outer_pipes: false,
    },
];

/// Format one row of cells as `| a | b |`.
pub fn format_row<S: AsRef<str>>(cells: &[S]) -> String {
    let mut row = String::from("|");
    for cell in cells {
        row.push(' ');
        row.push_str(cell.as_ref());
        row.push_str(" |");
    }
    row
}

/// Separator row with one `---` per column.
pub fn separator_row(columns: usize) -> String {
    let mut row = String::from("|");
    for _ in 0..columns {
        row.push_str(" --- |");
    }
    row
}

/// Render rows as a canonical table, padding short rows with empty cells.
///
/// The first row is the header.
pub fn render_table(rows: &[Vec<String>]) -> Vec<String> {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut out = Vec::with_capacity(rows.len() + 1);

    for (i, row) in rows.iter().enumerate() {
        let mut cells = row.clone();
        cells.resize(columns, String::new());
        out.push(format_row(&cells));
        if i == 0 {
            out.push(separator_row(columns));
        }
    }
    out
}

/// Rewrite delimiter-separated runs in `text` as canonical tables.
pub fn detect_tables(text: &str) -> String {
    let mut mask = MaskTable::for_text(text);
    let mut lines = mask_existing_tables(split_lines(text), &mut mask);

    for shape in SHAPES {
        lines = apply_shape(shape, lines, &mut mask);
    }

    mask.restore(&join_lines(&lines))
}

/// Replace every genuine markdown table with a single token line.
///
/// A genuine table is a line containing a pipe followed by one or more lines
/// that start with a pipe and carry at least two of them.
fn mask_existing_tables(lines: Vec<String>, mask: &mut MaskTable) -> Vec<String> {
    let continues = |line: &str| line.trim_start().starts_with('|') && line.matches('|').count() >= 2;

    let mut out = Vec::with_capacity(lines.len());
    let mut i = 0;
    while i < lines.len() {
        let opens = lines[i].contains('|') && lines.get(i + 1).is_some_and(|next| continues(next));
        if !opens {
            out.push(lines[i].clone());
            i += 1;
            continue;
        }

        let mut end = i + 1;
        while end < lines.len() && continues(&lines[end]) {
            end += 1;
        }
        out.push(mask.mask(join_lines(&lines[i..end])));
        i = end;
    }
    out
}

fn apply_shape(shape: &TableShape, lines: Vec<String>, mask: &mut MaskTable) -> Vec<String> {
    let fences = FenceIndex::new(&lines);
    let candidate = |i: usize| {
        !fences.is_protected(i) && !mask.contains_token(&lines[i]) && shape.matches_line(&lines[i])
    };

    let mut runs = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if !candidate(i) {
            i += 1;
            continue;
        }
        let start = i;
        while i < lines.len() && candidate(i) {
            i += 1;
        }
        runs.push(start..i);
    }

    let mut out = Vec::with_capacity(lines.len());
    let mut cursor = 0;
    for run in runs {
        let rows: Vec<Vec<String>> = lines[run.clone()]
            .iter()
            .map(|line| shape.split_cells(line))
            .collect();
        if !shape.accepts(&rows) {
            continue;
        }

        debug!(
            "{} table: {} rows at line {}",
            shape.name,
            rows.len(),
            run.start + 1
        );
        out.extend_from_slice(&lines[cursor..run.start]);
        out.push(mask.mask(join_lines(&render_table(&rows))));
        cursor = run.end;
    }
    out.extend_from_slice(&lines[cursor..]);
    out
}
