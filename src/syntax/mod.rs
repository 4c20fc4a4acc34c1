//! Syntax layer: parsed files and the declaration tree the location engine
//! consumes.

pub mod file;
pub mod parser;
mod tree;

pub use file::SyntaxFile;
pub use parser::{ParseError, RubyParser, SyntaxParser};
pub use tree::{DeclKind, DeclNode, SyntaxTree};
