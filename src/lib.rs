//! # objenealogist
//!
//! Ancestry trees for Ruby classes, annotated with the source location of
//! every class/module opening and of every method.
//!
//! Reflection only says which class a method belongs to and the line it was
//! defined on. This crate parses the files those lines point into, finds
//! every (possibly nested, possibly reopened) declaration, and attributes
//! each method to the innermost declaration containing it.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! render    → Ancestry tree text, location filters
//!   ↓
//! hir       → Declaration scanning, location map
//!   ↓
//! project   → Source loading, indexing Ruby files into a Runtime
//!   ↓
//! runtime   → Reflection trait, in-memory object model
//!   ↓
//! syntax    → Parsed files, declaration tree, SyntaxParser trait
//!   ↓
//! parser    → Logos lexer, rowan recursive-descent parser, typed AST
//!   ↓
//! base      → Primitives (LineSpan, SourceLocation, LineIndex)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use objenealogist::{Genealogist, TreeOptions, project};
//!
//! let (runtime, _report) = project::index_directory("lib".as_ref())?;
//! let class = runtime.lookup("MyClass").expect("indexed");
//! println!("{}", Genealogist::new(&runtime).to_tree(&class, &TreeOptions::default()));
//! # Ok::<(), objenealogist::project::LoadError>(())
//! ```

// ============================================================================
// MODULES (dependency order: base → parser → syntax → runtime → project → hir → render)
// ============================================================================

/// Foundation types: LineSpan, SourceLocation, LineIndex
pub mod base;

/// Parser: Logos lexer, recursive-descent parser, typed AST
pub mod parser;

/// Syntax: parsed files and the declaration tree
pub mod syntax;

/// Reflection surface and the in-memory object model
pub mod runtime;

/// Project loading: source loaders and indexing
pub mod project;

/// Location engine: declaration scanning and method attribution
pub mod hir;

/// Ancestry tree rendering
pub mod render;

use hir::{LocationMap, LocationMapBuilder};
use project::{FsLoader, SourceLoader};
use syntax::{RubyParser, SyntaxParser};

// Re-export the types most callers need
pub use base::{LineSpan, SourceLocation};
pub use hir::{Declaration, MethodEntry, TypeEntry};
pub use render::{LocationFilter, TreeOptions, format_locations};
pub use runtime::{MethodId, MethodKind, Reflection, Runtime, TypeKind, TypeRef, Visibility};

/// Entry point tying a reflection surface to a parser and a source loader.
///
/// Defaults to the bundled [`RubyParser`] and to reading files from disk.
#[derive(Debug, Clone)]
pub struct Genealogist<R, P = RubyParser, L = FsLoader> {
    reflection: R,
    parser: P,
    loader: L,
}

impl<R: Reflection> Genealogist<R> {
    pub fn new(reflection: R) -> Self {
        Self {
            reflection,
            parser: RubyParser,
            loader: FsLoader,
        }
    }
}

impl<R, P, L> Genealogist<R, P, L>
where
    R: Reflection,
    P: SyntaxParser,
    L: SourceLoader,
{
    pub fn with_parser<P2: SyntaxParser>(self, parser: P2) -> Genealogist<R, P2, L> {
        Genealogist {
            reflection: self.reflection,
            parser,
            loader: self.loader,
        }
    }

    pub fn with_loader<L2: SourceLoader>(self, loader: L2) -> Genealogist<R, P, L2> {
        Genealogist {
            reflection: self.reflection,
            parser: self.parser,
            loader,
        }
    }

    pub fn reflection(&self) -> &R {
        &self.reflection
    }

    /// Build a fresh location map for `class`
    pub fn location_map(&self, class: &TypeRef) -> LocationMap {
        LocationMapBuilder::new(&self.reflection, &self.parser, &self.loader).build(class)
    }

    pub fn to_tree(&self, class: &TypeRef, options: &TreeOptions) -> String {
        let map = self.location_map(class);
        render::render(&self.reflection, &map, class, options)
    }

    /// Tree of the class `instance` belongs to
    pub fn to_tree_for_instance(&self, instance: &R::Instance, options: &TreeOptions) -> String {
        let class = self.reflection.class_of(instance);
        self.to_tree(&class, options)
    }
}

/// Render the ancestry tree of `class`, reading sources from disk
pub fn to_tree<R: Reflection>(reflection: &R, class: &TypeRef, options: &TreeOptions) -> String {
    Genealogist::new(reflection).to_tree(class, options)
}

/// Build the location map of `class`, reading sources from disk
pub fn build_location_map<R: Reflection>(reflection: &R, class: &TypeRef) -> LocationMap {
    Genealogist::new(reflection).location_map(class)
}
