//! Declaration scanner.
//!
//! Walks the declaration tree of one file and records every class/module
//! opening with its qualified name and line span. The qualified-name stack
//! lives in an explicit [`ScanContext`], so files can be scanned on any
//! thread.

use std::path::Path;

use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use thiserror::Error;
use tracing::trace;

use super::types::Declaration;
use crate::base::constants::NAMESPACE_SEPARATOR;
use crate::project::{LoadError, SourceLoader};
use crate::syntax::{DeclNode, ParseError, SyntaxParser, SyntaxTree};

/// A file whose declarations could not be scanned
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("{}:{source}", .path.display())]
    Parse {
        path: std::path::PathBuf,
        #[source]
        source: ParseError,
    },
}

impl ScanError {
    pub fn path(&self) -> &Path {
        match self {
            Self::Load(err) => err.path(),
            Self::Parse { path, .. } => path,
        }
    }
}

/// Qualified names of the openings enclosing the current node
#[derive(Debug, Default)]
struct ScanContext {
    scopes: Vec<SmolStr>,
}

impl ScanContext {
    fn depth(&self) -> u32 {
        self.scopes.len() as u32
    }

    /// Enter an opening and return its qualified name. An absolute name
    /// (`::Top`) restarts from the root.
    fn push_scope(&mut self, node: &DeclNode) -> SmolStr {
        let local = node.local_name();
        let qualified = match self.scopes.last() {
            Some(prefix) if !node.absolute => {
                SmolStr::new(format!("{prefix}{NAMESPACE_SEPARATOR}{local}"))
            }
            _ => SmolStr::new(local),
        };
        self.scopes.push(qualified.clone());
        qualified
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }
}

/// Collect the declarations of `tree`, which was parsed from `file`.
///
/// With `targets`, only declarations whose qualified name is in the set are
/// kept; nested openings inside discarded ones are still visited.
pub fn scan(tree: &SyntaxTree, file: &Path, targets: Option<&FxHashSet<SmolStr>>) -> Vec<Declaration> {
    let mut found = Vec::new();
    let mut ctx = ScanContext::default();
    for node in &tree.roots {
        visit(node, file, targets, &mut ctx, &mut found);
    }
    found
}

fn visit(
    node: &DeclNode,
    file: &Path,
    targets: Option<&FxHashSet<SmolStr>>,
    ctx: &mut ScanContext,
    found: &mut Vec<Declaration>,
) {
    let depth = ctx.depth();
    let qualified_name = ctx.push_scope(node);
    if targets.is_none_or(|t| t.contains(&qualified_name)) {
        trace!(name = %qualified_name, start = node.span.start, end = node.span.end, "declaration");
        found.push(Declaration {
            qualified_name,
            kind: node.kind,
            file: file.to_path_buf(),
            span: node.span,
            depth,
        });
    }
    for child in &node.children {
        visit(child, file, targets, ctx, found);
    }
    ctx.pop_scope();
}

/// Load, parse and scan one file
pub fn scan_file<L, P>(
    loader: &L,
    parser: &P,
    path: &Path,
    targets: Option<&FxHashSet<SmolStr>>,
) -> Result<Vec<Declaration>, ScanError>
where
    L: SourceLoader + ?Sized,
    P: SyntaxParser + ?Sized,
{
    let text = loader.load(path)?;
    let tree = parser.parse(&text).map_err(|source| ScanError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(scan(&tree, path, targets))
}
