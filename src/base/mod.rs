//! Foundation types for objenealogist.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`LineSpan`] - 1-based inclusive line range of a declaration
//! - [`SourceLocation`] - a `file:line` pair reported for a method or opening
//! - [`LineIndex`] - byte offset to line/column conversion
//! - Domain constants (namespace separator, root type names)
//!
//! This module has NO dependencies on other objenealogist modules.

pub mod constants;
mod line_index;
mod position;

pub use line_index::{LineCol, LineIndex};
pub use position::{LineSpan, SourceLocation};

// Re-export text-size types used by the parser for convenience
pub use rowan::{TextRange, TextSize};
