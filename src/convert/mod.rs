//! Plain-text to markdown conversion.
//!
//! The converter is a fixed, ordered pipeline of line-rewrite passes. Each
//! pass receives the full line array produced by the previous pass and
//! returns a fresh one; nothing is shared between passes, and fence
//! protection is recomputed from the pass's own input every time.

macro_rules! pass_regex {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($re).expect("valid converter regex"));
    };
}

mod headings;
mod inline;
mod lists;
mod quotes;
mod segment;
mod shape;
mod title;

use crate::table::detect_tables;
use crate::text::{join_lines, split_lines};
use log::debug;
use serde::Serialize;

/// A single rewrite pass over the working lines.
pub struct Pass {
    /// Stable pass name, used in reports and logs
    pub name: &'static str,
    run: fn(&[String]) -> Vec<String>,
}

impl Pass {
    /// Run this pass over `lines`.
    pub fn apply(&self, lines: &[String]) -> Vec<String> {
        (self.run)(lines)
    }
}

fn tables(lines: &[String]) -> Vec<String> {
    split_lines(&detect_tables(&join_lines(lines)))
}

/// The pipeline, in execution order.
pub static PIPELINE: &[Pass] = &[
    Pass { name: "title", run: title::promote_title },
    Pass { name: "segment", run: segment::segment },
    Pass { name: "whitespace", run: segment::collapse_blank_lines },
    Pass { name: "tables", run: tables },
    Pass { name: "headings", run: headings::format_headings },
    Pass { name: "lists", run: lists::format_lists },
    Pass { name: "tasks", run: lists::format_task_lists },
    Pass { name: "emphasis", run: inline::format_emphasis },
    Pass { name: "links", run: inline::format_links },
    Pass { name: "images", run: inline::format_images },
    Pass { name: "blockquotes", run: quotes::format_blockquotes },
    Pass { name: "rules", run: quotes::format_horizontal_rules },
    Pass { name: "inline_code", run: inline::format_quoted_code },
];

/// What one pass did to the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub name: &'static str,
    pub lines_before: usize,
    pub lines_after: usize,
    pub changed: bool,
}

/// Converted markdown plus a report per pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversion {
    pub markdown: String,
    pub passes: Vec<PassReport>,
}

impl Conversion {
    /// Names of the passes that changed the text.
    pub fn changed_passes(&self) -> Vec<&'static str> {
        self.passes
            .iter()
            .filter(|pass| pass.changed)
            .map(|pass| pass.name)
            .collect()
    }
}

/// Run the pipeline and keep a report for every pass.
pub fn convert_with_report(text: &str) -> Conversion {
    let normalized = text.replace("\r\n", "\n");
    let mut lines = split_lines(&normalized);
    let mut passes = Vec::with_capacity(PIPELINE.len());

    for pass in PIPELINE {
        let next = pass.apply(&lines);
        let report = PassReport {
            name: pass.name,
            lines_before: lines.len(),
            lines_after: next.len(),
            changed: next != lines,
        };
        debug!(
            "pass {}: {} -> {} lines{}",
            report.name,
            report.lines_before,
            report.lines_after,
            if report.changed { "" } else { " (unchanged)" }
        );
        passes.push(report);
        lines = next;
    }

    Conversion {
        markdown: join_lines(&lines),
        passes,
    }
}

/// Convert unstructured text into markdown.
pub fn convert_to_markdown(text: &str) -> String {
    convert_with_report(text).markdown
}
