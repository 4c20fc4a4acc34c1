//! Syntax file wrapper for parsed Ruby files.
//!
//! Pairs a rowan [`Parse`] with the line index of its text so declaration
//! ranges can be reported in the 1-based lines reflection uses.

use crate::base::{LineCol, LineIndex, LineSpan, TextRange, TextSize};
use crate::parser::{AstNode, Declaration, Parse, SourceFile, SyntaxError, SyntaxNode, parse};

use super::tree::{DeclKind, DeclNode, SyntaxTree};

/// A parsed Ruby source file
#[derive(Debug, Clone)]
pub struct SyntaxFile {
    /// The underlying rowan parse result
    parse: Parse,
    line_index: LineIndex,
}

impl SyntaxFile {
    pub fn new(source: &str) -> Self {
        Self {
            parse: parse(source),
            line_index: LineIndex::new(source),
        }
    }

    /// Get the underlying parse result
    pub fn parse(&self) -> &Parse {
        &self.parse
    }

    /// Get the root source file AST node
    pub fn source_file(&self) -> Option<SourceFile> {
        SourceFile::cast(self.parse.syntax())
    }

    pub fn has_errors(&self) -> bool {
        !self.parse.errors.is_empty()
    }

    pub fn errors(&self) -> &[SyntaxError] {
        &self.parse.errors
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    pub fn line_col(&self, offset: TextSize) -> LineCol {
        self.line_index.line_col(offset)
    }

    /// Lines covered by a node, from its first token to its last
    pub fn line_span(&self, range: TextRange) -> LineSpan {
        let start = self.line_index.line(range.start());
        let last = if range.is_empty() {
            range.end()
        } else {
            range.end() - TextSize::new(1)
        };
        LineSpan::new(start, self.line_index.line(last))
    }

    /// Lower the CST to the tree of class and module openings.
    ///
    /// Declarations nested in other constructs (blocks, `class << self`)
    /// become children of the nearest enclosing declaration.
    pub fn declaration_tree(&self) -> SyntaxTree {
        SyntaxTree {
            roots: self.lower_children(&self.parse.syntax()),
        }
    }

    fn lower_children(&self, node: &SyntaxNode) -> Vec<DeclNode> {
        let mut out = Vec::new();
        for child in node.children() {
            match Declaration::cast(child.clone()) {
                Some(decl) => {
                    if let Some(lowered) = self.lower_declaration(&decl) {
                        out.push(lowered);
                    }
                }
                None => out.extend(self.lower_children(&child)),
            }
        }
        out
    }

    fn lower_declaration(&self, decl: &Declaration) -> Option<DeclNode> {
        let name = decl.name()?;
        let kind = if decl.is_module() {
            DeclKind::Module
        } else {
            DeclKind::Class
        };
        let children = decl
            .body()
            .map(|body| self.lower_children(body.syntax()))
            .unwrap_or_default();
        Some(DeclNode {
            kind,
            segments: name.segments(),
            absolute: name.is_absolute(),
            span: self.line_span(decl.syntax().text_range()),
            children,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_span_excludes_trailing_newline() {
        let file = SyntaxFile::new("class A\n  def x; end\nend\n");
        let tree = file.declaration_tree();
        assert_eq!(tree.roots.len(), 1);
        assert_eq!(tree.roots[0].span, LineSpan::new(1, 3));
    }

    #[test]
    fn test_declarations_inside_blocks_are_lowered() {
        let source = "module Outer\n  if true\n    class Inner\n    end\n  end\nend\n";
        let file = SyntaxFile::new(source);
        assert!(!file.has_errors(), "errors: {:?}", file.errors());
        let tree = file.declaration_tree();
        assert_eq!(tree.roots[0].children.len(), 1);
        assert_eq!(tree.roots[0].children[0].local_name(), "Inner");
        assert_eq!(tree.roots[0].children[0].span, LineSpan::new(3, 4));
    }

    #[test]
    fn test_one_line_declaration() {
        let file = SyntaxFile::new("module M; end");
        let tree = file.declaration_tree();
        assert_eq!(tree.roots[0].span, LineSpan::new(1, 1));
        assert_eq!(tree.roots[0].kind, DeclKind::Module);
    }
}
