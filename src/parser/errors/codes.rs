//! Error code definitions for parser diagnostics
//!
//! Error codes follow a naming convention: E{category}{number}
//! - E01xx: Lexical errors (unterminated literals, invalid characters)
//! - E02xx: Structural errors (`end` balance, delimiters)
//! - E03xx: Declaration errors (class, module and method headers)
//! - E09xx: Generic/fallback errors

use std::fmt;

/// Error codes for parser diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // E01xx: Lexical errors
    // =========================================================================
    /// Invalid or unexpected character in source
    E0101,
    /// Unterminated string, symbol or percent literal
    E0102,
    /// Unterminated `=begin` block
    E0103,
    /// Heredoc without its terminator line
    E0104,
    /// Unterminated regex literal
    E0105,

    // =========================================================================
    // E02xx: Structural errors
    // =========================================================================
    /// Block reaches end of file without `end`
    E0201,
    /// `end` with no open block
    E0202,
    /// Unclosed parenthesis `(`
    E0203,
    /// Unclosed bracket `[`
    E0204,
    /// Unexpected closing delimiter
    E0205,
    /// Unclosed brace `{`
    E0206,
    /// Mismatched delimiters
    E0207,

    // =========================================================================
    // E03xx: Declaration errors
    // =========================================================================
    /// Missing class or module name
    E0301,
    /// Missing superclass expression after `<`
    E0302,
    /// Missing method name after `def`
    E0303,
    /// Missing target after `class <<`
    E0304,

    // =========================================================================
    // E09xx: Generic/fallback errors
    // =========================================================================
    /// Unexpected token in current context
    E0901,
    /// Expected a specific token
    E0902,
    /// Internal parser error
    E0999,
}

impl ErrorCode {
    /// Get the string representation of the error code (e.g., "E0201")
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::E0101 => "E0101",
            Self::E0102 => "E0102",
            Self::E0103 => "E0103",
            Self::E0104 => "E0104",
            Self::E0105 => "E0105",
            Self::E0201 => "E0201",
            Self::E0202 => "E0202",
            Self::E0203 => "E0203",
            Self::E0204 => "E0204",
            Self::E0205 => "E0205",
            Self::E0206 => "E0206",
            Self::E0207 => "E0207",
            Self::E0301 => "E0301",
            Self::E0302 => "E0302",
            Self::E0303 => "E0303",
            Self::E0304 => "E0304",
            Self::E0901 => "E0901",
            Self::E0902 => "E0902",
            Self::E0999 => "E0999",
        }
    }

    /// Get a short description of the error category
    pub fn category_description(&self) -> &'static str {
        match self {
            Self::E0101 | Self::E0102 | Self::E0103 | Self::E0104 | Self::E0105 => "lexical error",
            Self::E0201
            | Self::E0202
            | Self::E0203
            | Self::E0204
            | Self::E0205
            | Self::E0206
            | Self::E0207 => "structural error",
            Self::E0301 | Self::E0302 | Self::E0303 | Self::E0304 => "declaration error",
            Self::E0901 | Self::E0902 | Self::E0999 => "syntax error",
        }
    }

    /// Get the default message template for this error code
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::E0101 => "invalid character",
            Self::E0102 => "unterminated literal",
            Self::E0103 => "unterminated embedded document",
            Self::E0104 => "unterminated heredoc",
            Self::E0105 => "unterminated regex literal",
            Self::E0201 => "missing 'end'",
            Self::E0202 => "unexpected 'end'",
            Self::E0203 => "unclosed parenthesis",
            Self::E0204 => "unclosed bracket",
            Self::E0205 => "unexpected closing delimiter",
            Self::E0206 => "unclosed brace",
            Self::E0207 => "mismatched delimiters",
            Self::E0301 => "missing class or module name",
            Self::E0302 => "missing superclass",
            Self::E0303 => "missing method name",
            Self::E0304 => "missing singleton class target",
            Self::E0901 => "unexpected token",
            Self::E0902 => "expected token",
            Self::E0999 => "internal parser error",
        }
    }

    /// Check if this is a structural error (`end` or delimiter balance)
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::E0201
                | Self::E0202
                | Self::E0203
                | Self::E0204
                | Self::E0205
                | Self::E0206
                | Self::E0207
        )
    }

    /// Check if this is a recoverable error (parsing can continue)
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::E0999)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
