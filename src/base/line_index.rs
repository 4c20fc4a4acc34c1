//! Byte offset to line/column conversion.

use rowan::TextSize;

/// A 1-based line and 0-based column
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

/// Maps byte offsets of a source text to line/column positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    /// Byte offset of the first character of every line
    line_starts: Vec<TextSize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![TextSize::new(0)];
        for (offset, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(TextSize::new(offset as u32 + 1));
            }
        }
        Self { line_starts }
    }

    /// Line/column of an offset. Lines are 1-based to match reflection output.
    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let idx = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        LineCol {
            line: idx as u32 + 1,
            col: u32::from(offset - self.line_starts[idx]),
        }
    }

    /// 1-based line of an offset
    pub fn line(&self, offset: TextSize) -> u32 {
        self.line_col(offset).line
    }

    /// Number of lines in the text
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}
