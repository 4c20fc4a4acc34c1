//! Location map builder.
//!
//! Given a class, enumerate every method reachable on it, scan each file
//! those methods were reported in, and attach every method to the innermost
//! ancestor declaration whose span covers its line.

use std::cmp::Reverse;
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use tracing::{debug, trace};

use super::scan::scan_file;
use super::types::{Declaration, MethodEntry, TypeEntry};
use crate::base::{LineSpan, SourceLocation};
use crate::project::SourceLoader;
use crate::runtime::{Reflection, TypeRef};
use crate::syntax::SyntaxParser;

/// Qualified type name to its declarations and attributed methods, in the
/// queried class's ancestor order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct LocationMap {
    entries: IndexMap<SmolStr, TypeEntry>,
}

impl LocationMap {
    pub fn get(&self, name: &str) -> Option<&TypeEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &TypeEntry)> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &SmolStr> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn declarations(&self, name: &str) -> &[Declaration] {
        self.get(name).map_or(&[], |e| e.declarations.as_slice())
    }

    pub fn methods(&self, name: &str) -> &[MethodEntry] {
        self.get(name).map_or(&[], |e| e.methods.as_slice())
    }

    /// Pretty-printed JSON of the whole map
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Builds [`LocationMap`]s against one reflection surface
pub struct LocationMapBuilder<'a, R, P, L> {
    reflection: &'a R,
    parser: &'a P,
    loader: &'a L,
}

impl<'a, R, P, L> LocationMapBuilder<'a, R, P, L>
where
    R: Reflection,
    P: SyntaxParser,
    L: SourceLoader,
{
    pub fn new(reflection: &'a R, parser: &'a P, loader: &'a L) -> Self {
        Self {
            reflection,
            parser,
            loader,
        }
    }

    pub fn build(&self, class: &TypeRef) -> LocationMap {
        let reflection = self.reflection;

        // Reflection stays on the calling thread
        let methods: Vec<(MethodEntry, Option<SourceLocation>)> = reflection
            .methods_of(class)
            .into_iter()
            .map(|id| {
                let reported = reflection.source_location(class, &id);
                let entry = MethodEntry {
                    name: id.name,
                    kind: id.kind,
                    location: None,
                };
                (entry, reported)
            })
            .collect();

        // First-reference order; the merge below follows it
        let files: Vec<&Path> = methods
            .iter()
            .filter_map(|(_, reported)| reported.as_ref().map(|l| l.file.as_path()))
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();

        let ancestors = reflection.ancestors(class);
        let targets: FxHashSet<SmolStr> = ancestors.iter().map(|a| a.name.clone()).collect();

        let (loader, parser) = (self.loader, self.parser);
        let scans: Vec<(&Path, Vec<Declaration>)> = files
            .par_iter()
            .filter_map(|file| match scan_file(loader, parser, file, Some(&targets)) {
                Ok(found) => Some((*file, found)),
                Err(err) => {
                    debug!("skipping {err}");
                    None
                }
            })
            .collect();

        let mut entries: IndexMap<SmolStr, TypeEntry> = ancestors
            .iter()
            .map(|a| (a.name.clone(), TypeEntry::default()))
            .collect();
        entries.entry(class.name.clone()).or_default();

        let mut by_file: IndexMap<PathBuf, SpanIndex> = IndexMap::new();
        for (file, found) in scans {
            let index = SpanIndex::new(&found);
            by_file.insert(file.to_path_buf(), index);
            for decl in found {
                entries
                    .entry(decl.qualified_name.clone())
                    .or_default()
                    .declarations
                    .push(decl);
            }
        }

        for (mut entry, reported) in methods {
            let owner = reported.as_ref().and_then(|location| {
                by_file
                    .get(&location.file)
                    .and_then(|index| index.innermost(location.line))
            });
            let owner = match (owner, reported) {
                (Some(owner), Some(location)) => {
                    entry.location = Some(location);
                    owner
                }
                _ => class.name.clone(),
            };
            trace!(method = %entry.name, owner = %owner, "attributed method");
            entries.entry(owner).or_default().methods.push(entry);
        }

        entries.retain(|_, entry| !entry.is_empty());
        LocationMap { entries }
    }
}

/// Declaration spans of one file, sorted by start line
struct SpanIndex {
    spans: Vec<(LineSpan, u32, SmolStr)>,
}

impl SpanIndex {
    fn new(declarations: &[Declaration]) -> Self {
        let mut spans: Vec<_> = declarations
            .iter()
            .map(|d| (d.span, d.depth, d.qualified_name.clone()))
            .collect();
        spans.sort_by_key(|(span, _, _)| span.start);
        Self { spans }
    }

    /// Smallest span containing `line`; deeper nesting wins a tie
    fn innermost(&self, line: u32) -> Option<SmolStr> {
        let candidates = self.spans.partition_point(|(span, _, _)| span.start <= line);
        self.spans[..candidates]
            .iter()
            .filter(|(span, _, _)| span.contains(line))
            .min_by_key(|(span, depth, _)| (span.len(), Reverse(*depth)))
            .map(|(_, _, name)| name.clone())
    }
}
