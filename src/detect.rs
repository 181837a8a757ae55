//! Markdown detection.
//!
//! Decides whether a piece of text is already markdown by probing it with a
//! fixed battery of patterns, one per construct category. The text counts as
//! markdown when at least two distinct categories match, or when it contains
//! a fenced code block (which never occurs in plain prose by accident).

use log::debug;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

/// Minimum number of distinct categories that makes text "markdown".
pub const MIN_CATEGORIES: usize = 2;

/// A markdown construct the detector knows how to recognise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// `# Heading`
    Header,
    /// `- item`, `* item`, `+ item`, `1. item`
    ListItem,
    /// `> quoted`
    Blockquote,
    /// `[label](url)`
    Link,
    /// `![alt](url)`
    Image,
    /// A block delimited by ``` lines
    FencedCode,
    /// A block delimited by ~~~ lines
    TildeCode,
    /// `**bold**`
    Bold,
    /// `*italic*`
    Italic,
    /// `| a | b |`
    TableRow,
    /// `|---|---|`
    TableSeparator,
    /// `---`, `***`, `___`
    HorizontalRule,
    /// `` `code` ``
    InlineCode,
    /// `- [ ] task`
    TaskList,
}

impl Category {
    /// Snake-case name used in reports.
    pub fn name(self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::ListItem => "list_item",
            Self::Blockquote => "blockquote",
            Self::Link => "link",
            Self::Image => "image",
            Self::FencedCode => "fenced_code",
            Self::TildeCode => "tilde_code",
            Self::Bold => "bold",
            Self::Italic => "italic",
            Self::TableRow => "table_row",
            Self::TableSeparator => "table_separator",
            Self::HorizontalRule => "horizontal_rule",
            Self::InlineCode => "inline_code",
            Self::TaskList => "task_list",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One probe: a category and the pattern that evidences it.
pub struct Probe {
    /// The construct this probe detects
    pub category: Category,
    pattern: &'static LazyLock<Regex>,
}

impl Probe {
    /// True if the probe's pattern matches anywhere in `text`.
    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

macro_rules! probe_regex {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($re).expect("valid detector regex"));
    };
}

probe_regex!(HEADER_RE, r"(?m)^#+\s+.+$");
probe_regex!(LIST_ITEM_RE, r"(?m)^(?:\*|-|\+|\d+\.)\s+.+$");
probe_regex!(BLOCKQUOTE_RE, r"(?m)^>\s+.+$");
probe_regex!(LINK_RE, r"\[.+\]\(.+\)");
probe_regex!(IMAGE_RE, r"!\[.+\]\(.+\)");
probe_regex!(FENCED_CODE_RE, r"(?m)^```[\s\S]*?```$");
probe_regex!(TILDE_CODE_RE, r"(?m)^~~~[\s\S]*?~~~$");
probe_regex!(BOLD_RE, r"\*\*.+\*\*");
probe_regex!(ITALIC_RE, r"\*.+\*");
probe_regex!(TABLE_ROW_RE, r"(?m)^(?:\s*\|.+\|)+\s*$");
probe_regex!(TABLE_SEPARATOR_RE, r"(?m)^(?:\s*\|[-:]+\|)+\s*$");
probe_regex!(HORIZONTAL_RULE_RE, r"(?m)^(?:---|\*\*\*|___)\s*$");
probe_regex!(INLINE_CODE_RE, r"`[^`]+`");
probe_regex!(TASK_LIST_RE, r"(?mi)^- \[[x ]\]");

/// The probe battery, in evaluation order.
pub static PROBES: &[Probe] = &[
    Probe { category: Category::Header, pattern: &HEADER_RE },
    Probe { category: Category::ListItem, pattern: &LIST_ITEM_RE },
    Probe { category: Category::Blockquote, pattern: &BLOCKQUOTE_RE },
    Probe { category: Category::Link, pattern: &LINK_RE },
    Probe { category: Category::Image, pattern: &IMAGE_RE },
    Probe { category: Category::FencedCode, pattern: &FENCED_CODE_RE },
    Probe { category: Category::TildeCode, pattern: &TILDE_CODE_RE },
    Probe { category: Category::Bold, pattern: &BOLD_RE },
    Probe { category: Category::Italic, pattern: &ITALIC_RE },
    Probe { category: Category::TableRow, pattern: &TABLE_ROW_RE },
    Probe { category: Category::TableSeparator, pattern: &TABLE_SEPARATOR_RE },
    Probe { category: Category::HorizontalRule, pattern: &HORIZONTAL_RULE_RE },
    Probe { category: Category::InlineCode, pattern: &INLINE_CODE_RE },
    Probe { category: Category::TaskList, pattern: &TASK_LIST_RE },
];

/// Outcome of running the probe battery over one text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    /// Final verdict
    pub is_markdown: bool,
    /// Distinct categories that matched, in probe order
    pub categories: Vec<Category>,
}

/// Every distinct category that matches somewhere in `text`, in probe order.
///
/// Each category appears at most once no matter how often it matches.
pub fn matched_categories(text: &str) -> Vec<Category> {
    PROBES
        .iter()
        .filter(|probe| probe.matches(text))
        .map(|probe| probe.category)
        .collect()
}

/// Run the battery and keep the evidence.
pub fn detect(text: &str) -> Detection {
    if text.trim().is_empty() {
        return Detection {
            is_markdown: false,
            categories: Vec::new(),
        };
    }

    let categories = matched_categories(text);
    let is_markdown =
        categories.len() >= MIN_CATEGORIES || categories.contains(&Category::FencedCode);

    debug!(
        "markdown detection: {} ({} categories: {:?})",
        is_markdown,
        categories.len(),
        categories
    );

    Detection {
        is_markdown,
        categories,
    }
}

/// Classify `text` as markdown (true) or plain text (false).
pub fn is_markdown(text: &str) -> bool {
    detect(text).is_markdown
}
