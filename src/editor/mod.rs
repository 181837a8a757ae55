//! Toggle-aware formatting edits on a markdown buffer.
//!
//! Every edit is a pure function of the buffer, a selection and an action:
//! it returns the new buffer and where the cursor should land. Offsets are
//! byte offsets; out-of-range values are clamped to the buffer and moved
//! back to the nearest character boundary.

mod history;

pub use history::History;

use crate::table::{format_row, separator_row};
use log::debug;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

macro_rules! editor_regex {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($re).expect("valid editor regex"));
    };
}

editor_regex!(LINK, r"^\[(.+)\]\((.+)\)$");
editor_regex!(IMAGE, r"^!\[(.+)\]\((.+)\)$");
editor_regex!(ATX_PREFIX, r"^(#{1,6})\s+");
editor_regex!(BULLET_MARK, r"^[-*+]\s");
editor_regex!(BULLET_STRIP, r"^(\s*)[-*+]\s");
editor_regex!(NUMBER_MARK, r"^\d+\.\s");
editor_regex!(NUMBER_STRIP, r"^(\s*)\d+\.\s");
editor_regex!(TASK_MARK, r"^[-*+]\s\[[xX ]\]\s");
editor_regex!(TASK_STRIP, r"^(\s*)[-*+]\s\[[xX ]\]\s");
editor_regex!(QUOTE_MARK, r"^>");
editor_regex!(QUOTE_STRIP, r"^(\s*)>\s?");
editor_regex!(CELL_BREAK, r"\s{2,}|\t");

/// Inserted by the table action when the selection cannot become a table.
pub const TABLE_TEMPLATE: &str = "\n| Header 1 | Header 2 | Header 3 |\n| --- | --- | --- |\n| Row 1, Col 1 | Row 1, Col 2 | Row 1, Col 3 |\n| Row 2, Col 1 | Row 2, Col 2 | Row 2, Col 3 |\n";

/// A formatting action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// ATX heading of the given level (1-6)
    Heading(u8),
    Bold,
    Italic,
    Code,
    Link,
    Image,
    UnorderedList,
    OrderedList,
    TaskList,
    Quote,
    CodeBlock,
    Table,
    HorizontalRule,
}

/// An action name that is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown formatting action '{0}'")]
pub struct UnknownAction(pub String);

impl Action {
    /// Every action name, in the order the toolbar lists them.
    pub const NAMES: [&'static str; 13] = [
        "heading",
        "bold",
        "italic",
        "code",
        "link",
        "image",
        "unorderedList",
        "orderedList",
        "taskList",
        "quote",
        "codeBlock",
        "table",
        "horizontalRule",
    ];

    /// The camelCase name of this action.
    pub fn name(self) -> &'static str {
        match self {
            Self::Heading(_) => "heading",
            Self::Bold => "bold",
            Self::Italic => "italic",
            Self::Code => "code",
            Self::Link => "link",
            Self::Image => "image",
            Self::UnorderedList => "unorderedList",
            Self::OrderedList => "orderedList",
            Self::TaskList => "taskList",
            Self::Quote => "quote",
            Self::CodeBlock => "codeBlock",
            Self::Table => "table",
            Self::HorizontalRule => "horizontalRule",
        }
    }

    /// Parse an action name, taking the heading level from `options`.
    pub fn parse_with(name: &str, options: &FormatOptions) -> Result<Self, UnknownAction> {
        match name.parse()? {
            Self::Heading(_) => Ok(Self::Heading(options.heading_level())),
            action => Ok(action),
        }
    }
}

impl FromStr for Action {
    type Err = UnknownAction;

    /// `heading` parses as a level-1 heading.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "heading" => Self::Heading(1),
            "bold" => Self::Bold,
            "italic" => Self::Italic,
            "code" => Self::Code,
            "link" => Self::Link,
            "image" => Self::Image,
            "unorderedList" => Self::UnorderedList,
            "orderedList" => Self::OrderedList,
            "taskList" => Self::TaskList,
            "quote" => Self::Quote,
            "codeBlock" => Self::CodeBlock,
            "table" => Self::Table,
            "horizontalRule" => Self::HorizontalRule,
            other => return Err(UnknownAction(other.to_string())),
        })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Heading(level) => write!(f, "heading (level {})", level),
            other => f.write_str(other.name()),
        }
    }
}

/// Extra inputs some actions take.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatOptions {
    /// Heading level; defaults to 1 and is clamped to 1..=6
    pub level: Option<u8>,
    /// Replacement URL for link and image actions
    pub url: Option<String>,
}

impl FormatOptions {
    fn heading_level(&self) -> u8 {
        self.level.unwrap_or(1).clamp(1, 6)
    }
}

/// Result of one edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edit {
    pub text: String,
    pub new_cursor_pos: usize,
}

/// A clamped selection over a buffer.
struct Selection<'a> {
    text: &'a str,
    start: usize,
    end: usize,
}

impl<'a> Selection<'a> {
    fn new(text: &'a str, start: usize, end: usize) -> Self {
        let snap = |mut offset: usize| {
            offset = offset.min(text.len());
            while !text.is_char_boundary(offset) {
                offset -= 1;
            }
            offset
        };
        let (a, b) = (snap(start), snap(end));
        Self {
            text,
            start: a.min(b),
            end: a.max(b),
        }
    }

    fn before(&self) -> &'a str {
        &self.text[..self.start]
    }

    fn selected(&self) -> &'a str {
        &self.text[self.start..self.end]
    }

    fn after(&self) -> &'a str {
        &self.text[self.end..]
    }

    fn at_line_start(&self) -> bool {
        self.start == 0 || self.before().ends_with('\n')
    }

    /// Start of the line holding the selection start.
    fn line_start(&self) -> usize {
        self.before().rfind('\n').map_or(0, |i| i + 1)
    }

    /// End of the line holding `from`.
    fn line_end_from(&self, from: usize) -> usize {
        self.text[from..].find('\n').map_or(self.text.len(), |i| from + i)
    }

    /// Replace the selection with `insert`; the cursor lands `cursor` bytes
    /// after the selection start.
    fn replace(&self, insert: &str, cursor: usize) -> Edit {
        Edit {
            text: format!("{}{}{}", self.before(), insert, self.after()),
            new_cursor_pos: self.start + cursor,
        }
    }

    /// Replace `from..to` of the buffer with `insert`; the cursor lands at the
    /// end of the insertion.
    fn splice(&self, from: usize, to: usize, insert: &str) -> Edit {
        Edit {
            text: format!("{}{}{}", &self.text[..from], insert, &self.text[to..]),
            new_cursor_pos: from + insert.len(),
        }
    }
}

fn toggle_wrap(sel: &Selection<'_>, mark: &str, placeholder: &str, already: bool) -> Edit {
    let selected = sel.selected();
    if selected.is_empty() {
        return sel.replace(&format!("{0}{1}{0}", mark, placeholder), mark.len());
    }
    if already && selected.len() >= 2 * mark.len() {
        let inner = &selected[mark.len()..selected.len() - mark.len()];
        return sel.replace(inner, inner.len());
    }
    let wrapped = format!("{0}{1}{0}", mark, selected);
    sel.replace(&wrapped, wrapped.len())
}

fn link_or_image(sel: &Selection<'_>, image: bool, options: &FormatOptions) -> Edit {
    let (bang, pattern, placeholder, default_url) = if image {
        ("!", &IMAGE, "alt text", "image-url")
    } else {
        ("", &LINK, "link text", "url")
    };
    let selected = sel.selected();

    if selected.is_empty() {
        let insert = format!("{}[{}]({})", bang, placeholder, default_url);
        return sel.replace(&insert, bang.len() + 1);
    }

    let insert = match pattern.captures(selected) {
        Some(caps) => {
            let url = options.url.as_deref().unwrap_or(&caps[2]);
            format!("{}[{}]({})", bang, &caps[1], url)
        }
        None => {
            let url = options.url.as_deref().unwrap_or(default_url);
            format!("{}[{}]({})", bang, selected, url)
        }
    };
    sel.replace(&insert, insert.len())
}

/// How one line-prefix action recognises, adds and removes its marker.
struct LinePrefix {
    mark: &'static LazyLock<Regex>,
    strip: &'static LazyLock<Regex>,
    prefix: fn(usize) -> String,
}

impl LinePrefix {
    fn is_marked(&self, line: &str) -> bool {
        self.mark.is_match(line.trim())
    }
}

fn bullet(_: usize) -> String {
    "- ".to_string()
}

fn number(i: usize) -> String {
    format!("{}. ", i + 1)
}

fn task(_: usize) -> String {
    "- [ ] ".to_string()
}

fn quote(_: usize) -> String {
    "> ".to_string()
}

static BULLETS: LinePrefix = LinePrefix {
    mark: &BULLET_MARK,
    strip: &BULLET_STRIP,
    prefix: bullet,
};
static NUMBERS: LinePrefix = LinePrefix {
    mark: &NUMBER_MARK,
    strip: &NUMBER_STRIP,
    prefix: number,
};
static TASKS: LinePrefix = LinePrefix {
    mark: &TASK_MARK,
    strip: &TASK_STRIP,
    prefix: task,
};
static QUOTES: LinePrefix = LinePrefix {
    mark: &QUOTE_MARK,
    strip: &QUOTE_STRIP,
    prefix: quote,
};

fn toggle_line_prefix(sel: &Selection<'_>, kind: &LinePrefix) -> Edit {
    let selected = sel.selected();

    if selected.contains('\n') {
        let block: Vec<String> = selected
            .split('\n')
            .enumerate()
            .map(|(i, line)| {
                if kind.is_marked(line) {
                    line.to_string()
                } else {
                    format!("{}{}", (kind.prefix)(i), line)
                }
            })
            .collect();
        let block = block.join("\n");
        return sel.replace(&block, block.len());
    }

    let start = sel.line_start();
    let end = sel.line_end_from(sel.end);
    let line = &sel.text[start..end];
    let new_line = if kind.is_marked(line) {
        kind.strip.replace(line, "$1").into_owned()
    } else {
        format!("{}{}", (kind.prefix)(0), line)
    };
    sel.splice(start, end, &new_line)
}

fn toggle_code_block(sel: &Selection<'_>) -> Edit {
    let selected = sel.selected();
    if selected.is_empty() {
        return sel.replace("```\ncode block\n```", 4);
    }
    if selected.len() >= 6 && selected.starts_with("```") && selected.ends_with("```") {
        let inner = selected[3..selected.len() - 3].trim();
        return sel.replace(inner, inner.len());
    }
    let wrapped = format!("```\n{}\n```", selected);
    sel.replace(&wrapped, wrapped.len())
}

fn split_cells(line: &str) -> Vec<String> {
    CELL_BREAK
        .split(line)
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect()
}

/// Build a table from a selection of two or more non-blank lines whose first
/// line has at least two cells; `None` when the selection does not qualify.
fn table_from_selection(selected: &str) -> Option<String> {
    let lines: Vec<&str> = selected.split('\n').filter(|l| !l.trim().is_empty()).collect();
    if lines.len() < 2 {
        return None;
    }
    let header = split_cells(lines[0]);
    let columns = header.len();
    if columns < 2 {
        return None;
    }

    let mut table = String::from("\n");
    table.push_str(&format_row(&header));
    table.push('\n');
    table.push_str(&separator_row(columns));
    table.push('\n');
    for line in &lines[1..] {
        let mut cells = split_cells(line);
        cells.resize(columns, String::new());
        table.push_str(&format_row(&cells));
        table.push('\n');
    }
    Some(table)
}

fn insert_table(sel: &Selection<'_>) -> Edit {
    match table_from_selection(sel.selected()) {
        Some(table) => sel.replace(&table, table.len()),
        // Cursor on the first header cell
        None => sel.replace(TABLE_TEMPLATE, 3),
    }
}

fn insert_rule(sel: &Selection<'_>) -> Edit {
    let rule = if sel.at_line_start() { "---" } else { "\n---" };
    sel.replace(rule, rule.len())
}

fn toggle_heading(sel: &Selection<'_>, level: u8) -> Edit {
    let level = level.clamp(1, 6) as usize;
    let start = sel.line_start();
    let end = sel.line_end_from(start);
    let line = &sel.text[start..end];

    let new_line = match ATX_PREFIX.captures(line) {
        Some(caps) => {
            let content = &line[caps[0].len()..];
            if caps[1].len() == level {
                content.to_string()
            } else {
                format!("{} {}", "#".repeat(level), content)
            }
        }
        None => format!("{} {}", "#".repeat(level), line),
    };
    sel.splice(start, end, &new_line)
}

/// Apply `action` to the selection `start..end` of `text`.
pub fn apply_formatting(
    text: &str,
    start: usize,
    end: usize,
    action: Action,
    options: &FormatOptions,
) -> Edit {
    let sel = Selection::new(text, start, end);
    let selected = sel.selected();

    match action {
        Action::Heading(level) => toggle_heading(&sel, level),
        Action::Bold => toggle_wrap(
            &sel,
            "**",
            "bold text",
            selected.starts_with("**") && selected.ends_with("**"),
        ),
        Action::Italic => toggle_wrap(
            &sel,
            "*",
            "italic text",
            selected.starts_with('*') && selected.ends_with('*') && !selected.starts_with("**"),
        ),
        Action::Code => toggle_wrap(
            &sel,
            "`",
            "code",
            selected.starts_with('`') && selected.ends_with('`'),
        ),
        Action::Link => link_or_image(&sel, false, options),
        Action::Image => link_or_image(&sel, true, options),
        Action::UnorderedList => toggle_line_prefix(&sel, &BULLETS),
        Action::OrderedList => toggle_line_prefix(&sel, &NUMBERS),
        Action::TaskList => toggle_line_prefix(&sel, &TASKS),
        Action::Quote => toggle_line_prefix(&sel, &QUOTES),
        Action::CodeBlock => toggle_code_block(&sel),
        Action::Table => insert_table(&sel),
        Action::HorizontalRule => insert_rule(&sel),
    }
}

/// Stringly entry point: an unknown action leaves the text unchanged with
/// the cursor at the end of the selection.
pub fn apply_markdown_formatting(
    text: &str,
    start: usize,
    end: usize,
    action: &str,
    options: &FormatOptions,
) -> Edit {
    match Action::parse_with(action, options) {
        Ok(action) => apply_formatting(text, start, end, action, options),
        Err(err) => {
            debug!("{}; leaving text unchanged", err);
            let sel = Selection::new(text, start, end);
            Edit {
                text: text.to_string(),
                new_cursor_pos: sel.end,
            }
        }
    }
}
