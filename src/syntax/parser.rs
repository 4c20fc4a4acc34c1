//! Syntax-level parsing interface.
//!
//! The location engine only needs the tree of class/module openings of a
//! file. [`SyntaxParser`] is the seam for that; [`RubyParser`] implements it
//! with the rowan-based parser.

use thiserror::Error;
use tracing::trace;

use super::file::SyntaxFile;
use super::tree::SyntaxTree;
use crate::parser::ErrorCode;

/// A file that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{line}:{column}: {message}")]
pub struct ParseError {
    pub message: String,
    /// 1-based line of the first error
    pub line: u32,
    pub column: u32,
    pub code: Option<ErrorCode>,
}

impl ParseError {
    pub fn syntax_error(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            message: message.into(),
            line,
            column,
            code: None,
        }
    }

    /// The first error of a parsed file, if any
    pub fn first_in(file: &SyntaxFile) -> Option<Self> {
        let first = file.errors().first()?;
        let pos = file.line_col(first.range.start());
        Some(Self {
            message: first.message.clone(),
            line: pos.line,
            column: pos.col,
            code: Some(first.code),
        })
    }
}

/// Turns source text into the tree of declarations it opens
pub trait SyntaxParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<SyntaxTree, ParseError>;
}

/// Structural Ruby parser
#[derive(Debug, Clone, Copy, Default)]
pub struct RubyParser;

impl SyntaxParser for RubyParser {
    fn parse(&self, text: &str) -> Result<SyntaxTree, ParseError> {
        let file = SyntaxFile::new(text);
        if let Some(err) = ParseError::first_in(&file) {
            trace!(
                errors = file.errors().len(),
                "rejecting file with syntax errors: {err}"
            );
            return Err(err);
        }
        Ok(file.declaration_tree())
    }
}

impl<P: SyntaxParser + ?Sized> SyntaxParser for &P {
    fn parse(&self, text: &str) -> Result<SyntaxTree, ParseError> {
        (**self).parse(text)
    }
}
