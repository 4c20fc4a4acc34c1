//! Data model of the location engine.

use std::path::PathBuf;

use smol_str::SmolStr;

use crate::base::{LineSpan, SourceLocation};
use crate::runtime::MethodKind;
use crate::syntax::DeclKind;

/// One lexical `class`/`module` opening. Reopenings are separate declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Declaration {
    /// Segments joined with `::`, e.g. `Outer::Inner`
    pub qualified_name: SmolStr,
    pub kind: DeclKind,
    pub file: PathBuf,
    pub span: LineSpan,
    /// Lexical nesting depth, 0 at top level
    pub depth: u32,
}

impl Declaration {
    /// Where the opening starts
    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.file.clone(), self.span.start)
    }

    pub fn contains(&self, location: &SourceLocation) -> bool {
        self.file == location.file && self.span.contains(location.line)
    }
}

/// A method reachable on the queried class, with its resolved location
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MethodEntry {
    pub name: SmolStr,
    pub kind: MethodKind,
    /// Absent for native methods and for lines no declaration covers
    pub location: Option<SourceLocation>,
}

impl MethodEntry {
    /// Line used for ordering; an absent location counts as line 0
    pub fn sort_line(&self) -> u32 {
        self.location.as_ref().map_or(0, |l| l.line)
    }
}

/// Everything known about one qualified type name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TypeEntry {
    pub declarations: Vec<Declaration>,
    pub methods: Vec<MethodEntry>,
}

impl TypeEntry {
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty() && self.methods.is_empty()
    }

    /// Start of every opening, in scan order
    pub fn locations(&self) -> Vec<SourceLocation> {
        self.declarations.iter().map(Declaration::location).collect()
    }

    /// Methods by ascending line; stable, so equal lines keep their order
    pub fn sorted_methods(&self) -> Vec<&MethodEntry> {
        let mut methods: Vec<&MethodEntry> = self.methods.iter().collect();
        methods.sort_by_key(|m| m.sort_line());
        methods
    }
}
