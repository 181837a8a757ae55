//! markify: turn plain text into markdown.
//!
//! The crate infers structure (headings, lists, tables, quotes, emphasis,
//! links, code) from unstructured text and emits markdown. Everything is a
//! pure string transform: no I/O, no shared state, and every entry point is
//! total over its input.
//!
//! - [`is_markdown`] decides whether text is already markdown.
//! - [`convert_to_markdown`] runs the conversion pipeline.
//! - [`detect_tables`] and [`detect_code_blocks`] run the table and code
//!   detectors on their own.
//! - [`apply_formatting`] applies one toolbar-style edit to a buffer.
//! - [`parse_blocks`] classifies markdown into blocks for export.

#![forbid(unsafe_code)]

pub mod blocks;
pub mod code;
pub mod convert;
pub mod detect;
pub mod editor;
pub mod fence;
pub mod language;
pub mod mask;
pub mod table;
mod text;

pub use blocks::{Block, parse_blocks};
pub use code::detect_code_blocks;
pub use convert::{Conversion, PassReport, convert_to_markdown, convert_with_report};
pub use detect::{Category, Detection, is_markdown};
pub use editor::{
    Action, Edit, FormatOptions, History, UnknownAction, apply_formatting,
    apply_markdown_formatting,
};
pub use fence::is_in_code_block;
pub use table::detect_tables;
