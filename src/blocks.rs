//! Block classification of markdown text.
//!
//! A single forward walk over the lines that groups them into headings,
//! paragraphs, lists, tables, code blocks and rules. This is what export
//! back ends consume; it does not validate markdown and never fails.

use crate::fence::is_fence_marker;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("valid heading regex"));
static RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^---+$").expect("valid rule regex"));
static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)([*+-]|\d+\.)\s+(.+)$").expect("valid list regex")
});
static SEPARATOR_CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-:]+$").expect("valid separator regex"));

/// A classified run of lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph { text: String },
    List { ordered: bool, items: Vec<String> },
    Table { rows: Vec<Vec<String>> },
    /// Every line between the fences, each followed by `\n`
    Code { content: String },
    HorizontalRule,
}

/// Split a row on `|`, dropping the empty edge cells outer pipes produce.
fn table_cells(line: &str) -> Vec<String> {
    let mut cells: Vec<&str> = line.split('|').collect();
    if cells.first().is_some_and(|c| c.is_empty()) {
        cells.remove(0);
    }
    if cells.last().is_some_and(|c| c.is_empty()) {
        cells.pop();
    }
    cells.into_iter().map(|c| c.trim().to_string()).collect()
}

struct Walker {
    blocks: Vec<Block>,
    open: Option<Block>,
}

impl Walker {
    fn close(&mut self) {
        if let Some(block) = self.open.take() {
            self.blocks.push(block);
        }
    }

    fn emit(&mut self, block: Block) {
        self.close();
        self.blocks.push(block);
    }

    fn line(&mut self, line: &str) {
        if is_fence_marker(line) {
            match self.open {
                Some(Block::Code { .. }) => self.close(),
                _ => {
                    self.close();
                    self.open = Some(Block::Code {
                        content: String::new(),
                    });
                }
            }
            return;
        }
        if let Some(Block::Code { content }) = &mut self.open {
            content.push_str(line);
            content.push('\n');
            return;
        }

        if let Some(caps) = HEADING.captures(line) {
            self.emit(Block::Heading {
                level: caps[1].len() as u8,
                text: caps[2].to_string(),
            });
            return;
        }
        if RULE.is_match(line.trim()) {
            self.emit(Block::HorizontalRule);
            return;
        }

        if line.contains('|') {
            let cells = table_cells(line);
            if cells.len() > 1 {
                if cells.iter().all(|c| SEPARATOR_CELL.is_match(c)) {
                    return;
                }
                match &mut self.open {
                    Some(Block::Table { rows }) => rows.push(cells),
                    _ => {
                        self.close();
                        self.open = Some(Block::Table { rows: vec![cells] });
                    }
                }
                return;
            }
        }

        if let Some(caps) = LIST_ITEM.captures(line) {
            let ordered = caps[2].ends_with('.');
            let item = caps[3].to_string();
            match &mut self.open {
                Some(Block::List { ordered: o, items }) if *o == ordered => items.push(item),
                _ => {
                    self.close();
                    self.open = Some(Block::List {
                        ordered,
                        items: vec![item],
                    });
                }
            }
            return;
        }

        if line.trim().is_empty() {
            self.close();
            return;
        }

        match &mut self.open {
            Some(Block::Paragraph { text }) => {
                text.push(' ');
                text.push_str(line);
            }
            _ => {
                self.close();
                self.open = Some(Block::Paragraph {
                    text: line.to_string(),
                });
            }
        }
    }
}

/// Classify markdown into blocks, in document order.
///
/// An unclosed fence runs to the end of the text and still yields a code
/// block.
pub fn parse_blocks(markdown: &str) -> Vec<Block> {
    let mut walker = Walker {
        blocks: Vec::new(),
        open: None,
    };
    for line in markdown.split('\n') {
        walker.line(line);
    }
    walker.close();
    walker.blocks
}
