//! Line-based positions for declarations and methods.
//!
//! Reflection reports method definitions as `file:line` with 1-based lines,
//! so everything that is matched against those reports uses the same
//! convention.

use std::fmt;
use std::path::{Path, PathBuf};

/// An inclusive, 1-based line range covered by one class/module opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LineSpan {
    pub start: u32,
    pub end: u32,
}

impl LineSpan {
    /// Create a span; `end` is clamped so that `start <= end` always holds.
    pub fn new(start: u32, end: u32) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Check if a line falls within this span
    pub fn contains(&self, line: u32) -> bool {
        self.start <= line && line <= self.end
    }

    /// Number of lines covered (at least 1)
    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }

    /// A span always covers at least one line
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// A `file:line` pair as reported by reflection or derived from a declaration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SourceLocation {
    pub file: PathBuf,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<PathBuf>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}
