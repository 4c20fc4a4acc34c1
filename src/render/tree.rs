//! Ancestry tree rendering.
//!
//! Each class line is followed by its own methods, then one branch per
//! module it mixes in that its superclass does not already have, then its
//! superclass, which recurses one level deeper.

use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use super::format::format_locations;
use super::options::TreeOptions;
use crate::hir::{LocationMap, TypeEntry};
use crate::runtime::{Reflection, TypeRef};

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

/// Render the ancestry of `class` using locations from `map`.
///
/// Lines are separated by `\n`, without a trailing newline.
pub fn render<R: Reflection>(
    reflection: &R,
    map: &LocationMap,
    class: &TypeRef,
    options: &TreeOptions,
) -> String {
    let mut renderer = TreeRenderer {
        reflection,
        map,
        options,
        lines: Vec::new(),
        visited: FxHashSet::default(),
    };
    renderer.write_type(class, "", "");
    renderer.lines.join("\n")
}

enum Branch {
    Mixin(TypeRef),
    Superclass(TypeRef),
}

struct TreeRenderer<'a, R> {
    reflection: &'a R,
    map: &'a LocationMap,
    options: &'a TreeOptions,
    lines: Vec<String>,
    visited: FxHashSet<SmolStr>,
}

impl<R: Reflection> TreeRenderer<'_, R> {
    fn heading(&self, ty: &TypeRef) -> String {
        let locations = self
            .map
            .get(&ty.name)
            .map(TypeEntry::locations)
            .unwrap_or_default();
        format!(
            "{} {}{}",
            ty.kind.glyph(),
            ty.name,
            format_locations(&locations, &self.options.show_locations, &ty.name)
        )
    }

    /// Mixins new at this level, in the order they were mixed in, then the
    /// superclass unless it is a root class
    fn branches(&self, ty: &TypeRef) -> Vec<Branch> {
        let reflection = self.reflection;
        let superclass = reflection.superclass(ty);
        let inherited: FxHashSet<SmolStr> = superclass
            .as_ref()
            .map(|parent| reflection.mixins(parent).into_iter().map(|m| m.name).collect())
            .unwrap_or_default();

        let mut branches: Vec<Branch> = reflection
            .mixins(ty)
            .into_iter()
            .rev()
            .filter(|m| !inherited.contains(&m.name) && !reflection.is_root_module(m))
            .map(Branch::Mixin)
            .collect();
        if let Some(parent) = superclass.filter(|s| !reflection.is_root_class(s)) {
            branches.push(Branch::Superclass(parent));
        }
        branches
    }

    fn write_methods(&mut self, ty: &TypeRef, prefix: &str) {
        if !self.options.show_methods {
            return;
        }
        let map = self.map;
        let Some(entry) = map.get(&ty.name) else {
            return;
        };
        let methods = entry.sorted_methods();
        let count = methods.len();
        for (i, method) in methods.into_iter().enumerate() {
            let connector = if i + 1 == count { LAST_BRANCH } else { BRANCH };
            let location = format_locations(
                method.location.as_slice(),
                &self.options.show_locations,
                &ty.name,
            );
            self.lines
                .push(format!("{prefix}{connector}{}{location}", method.name));
        }
    }

    fn write_type(&mut self, ty: &TypeRef, line_prefix: &str, child_prefix: &str) {
        let heading = self.heading(ty);
        self.lines.push(format!("{line_prefix}{heading}"));
        if !self.visited.insert(ty.name.clone()) {
            return;
        }

        let branches = self.branches(ty);
        // Methods hang off the line leading down to the branches
        let gutter = if branches.is_empty() { "" } else { PIPE };
        self.write_methods(ty, &format!("{child_prefix}{gutter}"));

        let count = branches.len();
        for (i, branch) in branches.into_iter().enumerate() {
            let last = i + 1 == count;
            let line_prefix = format!("{child_prefix}{}", if last { LAST_BRANCH } else { BRANCH });
            let next_prefix = format!("{child_prefix}{}", if last { SPACE } else { PIPE });
            match branch {
                Branch::Mixin(module) => {
                    let heading = self.heading(&module);
                    self.lines.push(format!("{line_prefix}{heading}"));
                    self.write_methods(&module, &next_prefix);
                }
                Branch::Superclass(parent) => self.write_type(&parent, &line_prefix, &next_prefix),
            }
        }
    }
}
