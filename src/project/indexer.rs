//! Builds a [`Runtime`] from Ruby source files.
//!
//! Files are parsed in parallel, then indexed one after another in the order
//! given, the way a program requiring them in that order would populate its
//! object model. Failures are collected in the [`IndexReport`]; a bad file
//! never stops the others from being indexed.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use thiserror::Error;
use tracing::{debug, trace, warn};

use super::file_loader::{FsLoader, LoadError, SourceLoader, collect_ruby_files};
use crate::base::constants::{NAMESPACE_SEPARATOR, ROOT_CLASS, join_segments};
use crate::base::{LineIndex, SourceLocation};
use crate::parser::{
    AstNode, AttrCall, BodyItem, ConstPath, Declaration, MethodDef, MixinCall, MixinKind,
    SingletonClass, SyntaxNode, VisibilityCall,
};
use crate::runtime::{MethodId, Runtime, RuntimeError, Visibility};
use crate::syntax::{ParseError, SyntaxFile};

/// Methods Ruby makes private wherever they are defined
const ALWAYS_PRIVATE: &[&str] = &[
    "initialize",
    "initialize_copy",
    "initialize_clone",
    "initialize_dup",
    "respond_to_missing?",
];

/// A file that could not be indexed
#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("{}:{source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

impl IndexError {
    pub fn path(&self) -> &Path {
        match self {
            Self::Load(err) => err.path(),
            Self::Parse { path, .. } => path,
        }
    }
}

/// Something in a file the index could not represent faithfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexWarning {
    pub location: SourceLocation,
    pub message: String,
}

/// Outcome of indexing a set of files
#[derive(Debug, Default)]
pub struct IndexReport {
    /// Files indexed, in indexing order
    pub indexed: Vec<PathBuf>,
    pub failures: Vec<IndexError>,
    pub warnings: Vec<IndexWarning>,
}

impl IndexReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.warnings.is_empty()
    }
}

/// Index every Ruby file under `root` (or `root` itself when it is a file)
pub fn index_directory(root: &Path) -> Result<(Runtime, IndexReport), LoadError> {
    let paths = collect_ruby_files(root)?;
    debug!(root = %root.display(), files = paths.len(), "indexing directory");
    Ok(index_sources(&FsLoader, &paths))
}

/// Parse `paths` in parallel and index them in order into a fresh runtime.
///
/// Repeated paths are indexed once.
pub fn index_sources<L: SourceLoader>(loader: &L, paths: &[PathBuf]) -> (Runtime, IndexReport) {
    let mut seen = FxHashSet::default();
    let unique: Vec<&PathBuf> = paths.iter().filter(|p| seen.insert(p.as_path())).collect();

    let parsed: Vec<(&PathBuf, Result<SyntaxFile, IndexError>)> = unique
        .par_iter()
        .map(|path| (*path, parse_source(loader, path)))
        .collect();

    let mut indexer = Indexer::new();
    for (path, result) in parsed {
        match result {
            Ok(file) => indexer.index_file(path, &file),
            Err(err) => {
                debug!("skipping {}: {err}", path.display());
                indexer.report.failures.push(err);
            }
        }
    }
    indexer.finish()
}

fn parse_source<L: SourceLoader>(loader: &L, path: &Path) -> Result<SyntaxFile, IndexError> {
    let text = loader.load(path)?;
    let file = SyntaxFile::new(&text);
    match ParseError::first_in(&file) {
        Some(source) => Err(IndexError::Parse {
            path: path.to_path_buf(),
            source,
        }),
        None => Ok(file),
    }
}

/// Accumulates definitions from parsed files into one [`Runtime`]
#[derive(Debug, Default)]
pub struct Indexer {
    runtime: Runtime,
    report: IndexReport,
}

impl Indexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue indexing into an existing runtime
    pub fn with_runtime(runtime: Runtime) -> Self {
        Self {
            runtime,
            report: IndexReport::default(),
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Record everything `file` defines. `path` is what method locations
    /// will report.
    pub fn index_file(&mut self, path: &Path, file: &SyntaxFile) {
        let Some(source) = file.source_file() else {
            return;
        };
        trace!(path = %path.display(), "indexing file");
        let mut walker = FileWalker {
            runtime: &mut self.runtime,
            warnings: &mut self.report.warnings,
            file: path,
            lines: file.line_index(),
            lexical: Vec::new(),
        };
        // Top-level `def` defines private methods on Object
        let mut state = BodyState::new(SmolStr::new_static(ROOT_CLASS));
        state.visibility = Visibility::Private;
        walker.items(source.items(), &mut state);
        self.report.indexed.push(path.to_path_buf());
    }

    pub fn finish(self) -> (Runtime, IndexReport) {
        (self.runtime, self.report)
    }
}

/// Definition state of one class or module body
#[derive(Debug, Clone)]
struct BodyState {
    owner: SmolStr,
    /// Visibility of `def`s that follow a bare `private`/`public`/...
    visibility: Visibility,
    /// After a bare `module_function`
    module_function: bool,
    /// Inside `class << self`
    singleton: bool,
}

impl BodyState {
    fn new(owner: SmolStr) -> Self {
        Self {
            owner,
            visibility: Visibility::Public,
            module_function: false,
            singleton: false,
        }
    }
}

struct FileWalker<'a> {
    runtime: &'a mut Runtime,
    warnings: &'a mut Vec<IndexWarning>,
    file: &'a Path,
    lines: &'a LineIndex,
    /// Qualified names of the enclosing class/module openings
    lexical: Vec<SmolStr>,
}

impl FileWalker<'_> {
    // =========================================================================
    // Positions and diagnostics
    // =========================================================================

    fn location(&self, node: &SyntaxNode) -> SourceLocation {
        let offset = node
            .descendants_with_tokens()
            .filter_map(|element| element.into_token())
            .find(|token| !token.kind().is_trivia())
            .map_or(node.text_range().start(), |token| token.text_range().start());
        SourceLocation::new(self.file, self.lines.line(offset))
    }

    fn warn(&mut self, node: &SyntaxNode, message: String) {
        let location = self.location(node);
        warn!(%location, "{message}");
        self.warnings.push(IndexWarning { location, message });
    }

    fn record(&mut self, node: &SyntaxNode, result: Result<(), RuntimeError>) {
        if let Err(err) = result {
            self.warn(node, err.to_string());
        }
    }

    // =========================================================================
    // Constant resolution
    // =========================================================================

    fn cbase(&self) -> Option<&SmolStr> {
        self.lexical.last()
    }

    fn nested(scope: Option<&str>, name: &str) -> SmolStr {
        match scope {
            Some(scope) => SmolStr::new(format!("{scope}{NAMESPACE_SEPARATOR}{name}")),
            None => SmolStr::new(name),
        }
    }

    /// Innermost lexical scope first, then the ancestors of the innermost
    /// scope, then the top level.
    fn lookup_constant(&self, name: &str) -> Option<SmolStr> {
        for scope in self.lexical.iter().rev() {
            let candidate = Self::nested(Some(scope), name);
            if self.runtime.contains(&candidate) {
                return Some(candidate);
            }
        }
        if let Some(innermost) = self.cbase() {
            for ancestor in self.runtime.ancestor_names(innermost) {
                let candidate = Self::nested(Some(&ancestor), name);
                if self.runtime.contains(&candidate) {
                    return Some(candidate);
                }
            }
        }
        self.runtime.contains(name).then(|| SmolStr::new(name))
    }

    fn resolve_segments(&self, absolute: bool, segments: &[SmolStr]) -> Option<SmolStr> {
        let (first, rest) = segments.split_first()?;
        let mut resolved = if absolute {
            self.runtime.contains(first).then(|| first.clone())?
        } else {
            self.lookup_constant(first)?
        };
        for segment in rest {
            let next = Self::nested(Some(&resolved), segment);
            if !self.runtime.contains(&next) {
                return None;
            }
            resolved = next;
        }
        Some(resolved)
    }

    fn resolve(&self, path: &ConstPath) -> Option<SmolStr> {
        self.resolve_segments(path.is_absolute(), &path.segments())
    }

    /// Qualified name a `class`/`module` opening defines or reopens.
    ///
    /// A plain name is created in the innermost scope; a path resolves its
    /// namespace part first.
    fn declared_name(&mut self, path: &ConstPath, node: &SyntaxNode) -> Option<SmolStr> {
        let segments = path.segments();
        let (last, namespace) = segments.split_last()?;
        if path.is_absolute() {
            self.ensure_namespace(None, namespace, node);
            return Some(SmolStr::new(join_segments(&segments)));
        }
        if namespace.is_empty() {
            return Some(Self::nested(self.cbase().map(SmolStr::as_str), last));
        }
        let base = match self.resolve_segments(false, namespace) {
            Some(base) => base,
            None => {
                let scope = self.cbase().cloned();
                self.ensure_namespace(scope.as_deref(), namespace, node)
            }
        };
        Some(Self::nested(Some(&base), last))
    }

    /// Create placeholder modules for a namespace path nobody defined
    fn ensure_namespace(&mut self, scope: Option<&str>, namespace: &[SmolStr], node: &SyntaxNode) -> SmolStr {
        let mut current: Option<SmolStr> = scope.map(SmolStr::new);
        for segment in namespace {
            let next = Self::nested(current.as_deref(), segment);
            if !self.runtime.contains(&next) {
                self.warn(node, format!("unresolved constant {next}, assuming a module"));
                let defined = self.runtime.define_module(&next).map(|_| ());
                self.record(node, defined);
            }
            current = Some(next);
        }
        current.unwrap_or_default()
    }

    fn superclass_name(&mut self, path: &ConstPath, node: &SyntaxNode) -> Option<SmolStr> {
        if let Some(resolved) = self.resolve(path) {
            return Some(resolved);
        }
        let name = SmolStr::new(join_segments(&path.segments()));
        self.warn(node, format!("unresolved constant {name}, assuming a class"));
        match self.runtime.define_class(&name, None) {
            Ok(_) => Some(name),
            Err(err) => {
                self.warn(node, err.to_string());
                None
            }
        }
    }

    fn mixin_target(&mut self, path: &ConstPath, node: &SyntaxNode) -> Option<SmolStr> {
        if let Some(resolved) = self.resolve(path) {
            return Some(resolved);
        }
        let name = SmolStr::new(join_segments(&path.segments()));
        self.warn(node, format!("unresolved constant {name}, assuming a module"));
        match self.runtime.define_module(&name) {
            Ok(_) => Some(name),
            Err(err) => {
                self.warn(node, err.to_string());
                None
            }
        }
    }

    // =========================================================================
    // Items
    // =========================================================================

    fn items(&mut self, items: impl Iterator<Item = BodyItem>, state: &mut BodyState) {
        for item in items {
            match item {
                BodyItem::Declaration(decl) => self.declaration(&decl),
                BodyItem::SingletonClass(class) => self.singleton_class(&class, state),
                BodyItem::Method(def) => self.method(&def, state, None),
                BodyItem::Mixin(call) => self.mixin(&call, state),
                BodyItem::Visibility(call) => self.visibility(&call, state),
                BodyItem::Attr(call) => self.attr(&call, state, None),
                BodyItem::Block(block) => self.items(block.items(), state),
            }
        }
    }

    fn declaration(&mut self, decl: &Declaration) {
        let Some(path) = decl.name() else {
            return;
        };
        let Some(name) = self.declared_name(&path, decl.syntax()) else {
            return;
        };

        let defined = match decl {
            Declaration::Class(class) => {
                let superclass = match class.superclass() {
                    Some(expr) => match expr.path() {
                        Some(path) => self.superclass_name(&path, decl.syntax()),
                        None => {
                            debug!(class = %name, "superclass is not a constant, assuming Object");
                            None
                        }
                    },
                    None => None,
                };
                self.runtime.define_class(&name, superclass.as_deref())
            }
            Declaration::Module(_) => self.runtime.define_module(&name),
        };
        match defined {
            Ok(_) => {}
            Err(err @ RuntimeError::SuperclassMismatch { .. }) => {
                self.warn(decl.syntax(), format!("ignored reopen mismatch: {err}"));
            }
            Err(err) => {
                self.warn(decl.syntax(), err.to_string());
                return;
            }
        }

        if let Some(body) = decl.body() {
            self.lexical.push(name.clone());
            let mut state = BodyState::new(name);
            self.items(body.items(), &mut state);
            self.lexical.pop();
        }
    }

    fn singleton_class(&mut self, class: &SingletonClass, state: &BodyState) {
        if !class.is_self() {
            debug!(owner = %state.owner, "skipping singleton class of an expression");
            return;
        }
        if let Some(body) = class.body() {
            let mut inner = BodyState::new(state.owner.clone());
            inner.singleton = true;
            self.items(body.items(), &mut inner);
        }
    }

    fn method(&mut self, def: &MethodDef, state: &BodyState, visibility: Option<Visibility>) {
        let Some(name) = def.name() else {
            return;
        };
        let location = self.location(def.syntax());

        let singleton_owner = match def.receiver() {
            Some(receiver) if receiver.is_self() => Some(state.owner.clone()),
            Some(receiver) => match receiver.constant().and_then(|c| self.lookup_constant(&c)) {
                Some(owner) => Some(owner),
                None => {
                    debug!(method = %name, "skipping method on an unknown receiver");
                    return;
                }
            },
            None if state.singleton => Some(state.owner.clone()),
            None => None,
        };

        if let Some(owner) = singleton_owner {
            trace!(owner = %owner, method = %name, %location, "singleton method");
            let defined = self
                .runtime
                .define_singleton_method(&owner, &name, Some(location));
            self.record(def.syntax(), defined);
            // `private` inside `class << self` applies to the singleton side
            let visibility = visibility.or(state.singleton.then_some(state.visibility));
            if let Some(visibility) = visibility.filter(|v| *v != Visibility::Public) {
                let changed =
                    self.runtime
                        .set_visibility(&owner, &MethodId::singleton(name), visibility);
                self.record(def.syntax(), changed);
            }
            return;
        }

        trace!(owner = %state.owner, method = %name, %location, "instance method");
        let visibility = if ALWAYS_PRIVATE.contains(&name.as_str()) {
            Visibility::Private
        } else {
            visibility.unwrap_or(state.visibility)
        };
        if state.module_function {
            let defined = self.runtime.define_method(
                &state.owner,
                &name,
                Visibility::Private,
                Some(location.clone()),
            );
            self.record(def.syntax(), defined);
            let defined = self
                .runtime
                .define_singleton_method(&state.owner, &name, Some(location));
            self.record(def.syntax(), defined);
        } else {
            let defined = self
                .runtime
                .define_method(&state.owner, &name, visibility, Some(location));
            self.record(def.syntax(), defined);
        }
    }

    fn attr(&mut self, call: &AttrCall, state: &BodyState, visibility: Option<Visibility>) {
        let Some(kind) = call.kind() else {
            return;
        };
        let location = self.location(call.syntax());
        let visibility = visibility.unwrap_or(state.visibility);
        for name in call.names() {
            let mut generated = Vec::with_capacity(2);
            if kind.reads() {
                generated.push(name.to_string());
            }
            if kind.writes() {
                generated.push(format!("{name}="));
            }
            for method in generated {
                let defined = if state.singleton {
                    self.runtime
                        .define_singleton_method(&state.owner, &method, Some(location.clone()))
                } else {
                    self.runtime.define_method(
                        &state.owner,
                        &method,
                        visibility,
                        Some(location.clone()),
                    )
                };
                self.record(call.syntax(), defined);
            }
        }
    }

    fn mixin(&mut self, call: &MixinCall, state: &BodyState) {
        let Some(kind) = call.kind() else {
            return;
        };
        // `include` inside `class << self` mixes into the singleton
        let kind = if state.singleton && kind == MixinKind::Include {
            MixinKind::Extend
        } else {
            kind
        };

        let mut modules: Vec<SmolStr> = call
            .targets()
            .filter_map(|path| self.mixin_target(&path, call.syntax()))
            .collect();
        if kind == MixinKind::Extend && call.targets_self() {
            modules.push(state.owner.clone());
        }

        // `include A, B` puts A first in the ancestors, like `include B; include A`
        for module in modules.iter().rev() {
            let result = match kind {
                MixinKind::Include => self.runtime.include(&state.owner, module),
                MixinKind::Prepend => self.runtime.prepend(&state.owner, module),
                MixinKind::Extend => self.runtime.extend(&state.owner, module),
            };
            self.record(call.syntax(), result);
        }
    }

    fn visibility(&mut self, call: &VisibilityCall, state: &mut BodyState) {
        let name = call.name();
        match name.as_str() {
            "public" | "protected" | "private" => {
                let visibility = match name.as_str() {
                    "public" => Visibility::Public,
                    "protected" => Visibility::Protected,
                    _ => Visibility::Private,
                };
                if call.is_bare() {
                    state.visibility = visibility;
                    state.module_function = false;
                    return;
                }
                for def in call.method_defs() {
                    self.method(&def, state, Some(visibility));
                }
                for attr in call.attr_calls() {
                    self.attr(&attr, state, Some(visibility));
                }
                for method in call.symbols() {
                    self.change_visibility(call.syntax(), state, &method, visibility);
                }
            }
            "module_function" => {
                if call.is_bare() {
                    state.module_function = true;
                    return;
                }
                let mut inner = state.clone();
                inner.module_function = true;
                for def in call.method_defs() {
                    self.method(&def, &inner, None);
                }
                for method in call.symbols() {
                    self.module_function(call.syntax(), state, &method);
                }
            }
            "private_class_method" | "public_class_method" => {
                let visibility = if name == "private_class_method" {
                    Visibility::Private
                } else {
                    Visibility::Public
                };
                let mut methods = call.symbols();
                for def in call.method_defs() {
                    self.method(&def, state, None);
                    methods.extend(def.name());
                }
                for method in methods {
                    let result = self.runtime.set_visibility(
                        &state.owner,
                        &MethodId::singleton(method),
                        visibility,
                    );
                    self.record(call.syntax(), result);
                }
            }
            _ => {}
        }
    }

    /// `private :name` for a method defined here or inherited. An inherited
    /// method gets a copy on the owner carrying the new visibility.
    fn change_visibility(&mut self, node: &SyntaxNode, state: &BodyState, method: &str, visibility: Visibility) {
        let id = if state.singleton {
            MethodId::singleton(method)
        } else {
            MethodId::instance(method)
        };
        match self.runtime.set_visibility(&state.owner, &id, visibility) {
            Ok(()) => {}
            Err(RuntimeError::UnknownMethod { .. }) if !state.singleton => {
                let inherited = self
                    .runtime
                    .find_method(&state.owner, method)
                    .map(|(_, info)| info.location.clone());
                match inherited {
                    Some(location) => {
                        let defined =
                            self.runtime
                                .define_method(&state.owner, method, visibility, location);
                        self.record(node, defined);
                    }
                    None => self.warn(
                        node,
                        format!("undefined method '{method}' for {}", state.owner),
                    ),
                }
            }
            Err(err) => self.warn(node, err.to_string()),
        }
    }

    /// `module_function :name`: a public singleton copy, the instance method
    /// becomes private.
    fn module_function(&mut self, node: &SyntaxNode, state: &BodyState, method: &str) {
        let location = self
            .runtime
            .find_method(&state.owner, method)
            .map(|(_, info)| info.location.clone());
        let Some(location) = location else {
            self.warn(
                node,
                format!("undefined method '{method}' for {}", state.owner),
            );
            return;
        };
        let defined = self
            .runtime
            .define_singleton_method(&state.owner, method, location);
        self.record(node, defined);
        self.change_visibility(node, state, method, Visibility::Private);
    }
}

#[cfg(test)]
mod tests;
