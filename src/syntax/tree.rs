//! Parser-independent tree of class and module openings.

use smol_str::SmolStr;

use crate::base::LineSpan;
use crate::base::constants::NAMESPACE_SEPARATOR;

/// Class or module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum DeclKind {
    Class,
    Module,
}

/// One class or module opening and the openings lexically nested in it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclNode {
    pub kind: DeclKind,
    /// Name segments as written (`class NS::C2` has two)
    pub segments: Vec<SmolStr>,
    /// Written with a leading `::`
    pub absolute: bool,
    pub span: LineSpan,
    pub children: Vec<DeclNode>,
}

impl DeclNode {
    /// Name as written, without a leading `::`
    pub fn local_name(&self) -> String {
        self.segments.join(NAMESPACE_SEPARATOR)
    }
}

/// Every top-level opening of one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntaxTree {
    pub roots: Vec<DeclNode>,
}

impl SyntaxTree {
    /// Total number of openings at any depth
    pub fn len(&self) -> usize {
        fn count(nodes: &[DeclNode]) -> usize {
            nodes.iter().map(|n| 1 + count(&n.children)).sum()
        }
        count(&self.roots)
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}
