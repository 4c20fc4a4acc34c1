//! In-memory Ruby object model.
//!
//! [`Runtime`] records what executing a Ruby program's class bodies would
//! produce: classes and modules with their superclass, mixins and methods.
//! Ancestors are linearized the way Ruby builds a method resolution order,
//! and method lookup walks that order.

use std::collections::VecDeque;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use thiserror::Error;
use tracing::trace;

use super::reflection::{MethodId, MethodKind, Reflection, TypeKind, TypeRef, Visibility};
use crate::base::SourceLocation;
use crate::base::constants::{BASIC_OBJECT, ROOT_CLASS, ROOT_MODULE};

/// Errors raised while building the object model
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("uninitialized constant {0}")]
    UnknownType(SmolStr),
    #[error("superclass mismatch for class {name} ({existing} vs {requested})")]
    SuperclassMismatch {
        name: SmolStr,
        existing: SmolStr,
        requested: SmolStr,
    },
    #[error("{name} is not a {expected}")]
    KindMismatch { name: SmolStr, expected: TypeKind },
    #[error("wrong argument type {0} (expected Module)")]
    NotAModule(SmolStr),
    #[error("cyclic include detected: {module} into {target}")]
    CyclicMixin { target: SmolStr, module: SmolStr },
    #[error("undefined method '{method}' for {owner}")]
    UnknownMethod { owner: SmolStr, method: SmolStr },
}

/// How a module was mixed into a type
#[derive(Debug, Clone, PartialEq, Eq)]
enum Mixin {
    Include(SmolStr),
    Prepend(SmolStr),
    Extend(SmolStr),
}

/// A method body as the runtime knows it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    pub visibility: Visibility,
    /// `None` for natively defined methods
    pub location: Option<SourceLocation>,
}

#[derive(Debug, Clone)]
struct TypeDef {
    kind: TypeKind,
    superclass: Option<SmolStr>,
    /// In call order
    mixins: Vec<Mixin>,
    methods: IndexMap<SmolStr, MethodInfo>,
    singleton_methods: IndexMap<SmolStr, MethodInfo>,
}

impl TypeDef {
    fn new(kind: TypeKind, superclass: Option<SmolStr>) -> Self {
        Self {
            kind,
            superclass,
            mixins: Vec::new(),
            methods: IndexMap::new(),
            singleton_methods: IndexMap::new(),
        }
    }
}

/// An object allocated from a [`Runtime`] class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeInstance {
    class: TypeRef,
}

impl RuntimeInstance {
    pub fn class(&self) -> &TypeRef {
        &self.class
    }
}

/// The object model: every class and module by qualified name
#[derive(Debug, Clone)]
pub struct Runtime {
    types: IndexMap<SmolStr, TypeDef>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// A runtime holding `BasicObject`, `Object < BasicObject` and `Kernel`
    /// included into `Object`.
    pub fn new() -> Self {
        let mut types = IndexMap::new();
        types.insert(
            SmolStr::new_static(BASIC_OBJECT),
            TypeDef::new(TypeKind::Class, None),
        );
        types.insert(
            SmolStr::new_static(ROOT_MODULE),
            TypeDef::new(TypeKind::Module, None),
        );
        let mut object = TypeDef::new(TypeKind::Class, Some(SmolStr::new_static(BASIC_OBJECT)));
        object
            .mixins
            .push(Mixin::Include(SmolStr::new_static(ROOT_MODULE)));
        types.insert(SmolStr::new_static(ROOT_CLASS), object);
        Self { types }
    }

    pub fn lookup(&self, name: &str) -> Option<TypeRef> {
        self.types.get(name).map(|def| TypeRef {
            name: SmolStr::new(name),
            kind: def.kind,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Every type in definition order
    pub fn types(&self) -> impl Iterator<Item = TypeRef> + '_ {
        self.types.iter().map(|(name, def)| TypeRef {
            name: name.clone(),
            kind: def.kind,
        })
    }

    fn get(&self, name: &str) -> Result<&TypeDef, RuntimeError> {
        self.types
            .get(name)
            .ok_or_else(|| RuntimeError::UnknownType(SmolStr::new(name)))
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut TypeDef, RuntimeError> {
        self.types
            .get_mut(name)
            .ok_or_else(|| RuntimeError::UnknownType(SmolStr::new(name)))
    }

    fn expect_kind(&self, name: &str, expected: TypeKind) -> Result<&TypeDef, RuntimeError> {
        let def = self.get(name)?;
        if def.kind != expected {
            return Err(RuntimeError::KindMismatch {
                name: SmolStr::new(name),
                expected,
            });
        }
        Ok(def)
    }

    // =========================================================================
    // Definitions
    // =========================================================================

    /// Open a class, creating it on first use.
    ///
    /// A new class without an explicit superclass inherits from `Object`.
    /// Reopening with a different superclass is an error; reopening without
    /// one keeps the existing superclass.
    pub fn define_class(
        &mut self,
        name: &str,
        superclass: Option<&str>,
    ) -> Result<TypeRef, RuntimeError> {
        if let Some(parent) = superclass {
            self.expect_kind(parent, TypeKind::Class)?;
        }

        if let Some(existing) = self.types.get(name) {
            if existing.kind != TypeKind::Class {
                return Err(RuntimeError::KindMismatch {
                    name: SmolStr::new(name),
                    expected: TypeKind::Class,
                });
            }
            if let Some(requested) = superclass
                && existing.superclass.as_deref() != Some(requested)
            {
                return Err(RuntimeError::SuperclassMismatch {
                    name: SmolStr::new(name),
                    existing: existing.superclass.clone().unwrap_or_default(),
                    requested: SmolStr::new(requested),
                });
            }
            return Ok(TypeRef::class(name));
        }

        let parent = SmolStr::new(superclass.unwrap_or(ROOT_CLASS));
        trace!(class = name, superclass = %parent, "defining class");
        self.types
            .insert(SmolStr::new(name), TypeDef::new(TypeKind::Class, Some(parent)));
        Ok(TypeRef::class(name))
    }

    /// Open a module, creating it on first use.
    pub fn define_module(&mut self, name: &str) -> Result<TypeRef, RuntimeError> {
        if let Some(existing) = self.types.get(name) {
            if existing.kind != TypeKind::Module {
                return Err(RuntimeError::KindMismatch {
                    name: SmolStr::new(name),
                    expected: TypeKind::Module,
                });
            }
            return Ok(TypeRef::module(name));
        }
        trace!(module = name, "defining module");
        self.types
            .insert(SmolStr::new(name), TypeDef::new(TypeKind::Module, None));
        Ok(TypeRef::module(name))
    }

    fn check_mixin(&self, target: &str, module: &str) -> Result<(), RuntimeError> {
        self.get(target)?;
        if self.get(module)?.kind != TypeKind::Module {
            return Err(RuntimeError::NotAModule(SmolStr::new(module)));
        }
        if target == module || self.ancestor_names(module).iter().any(|a| a == target) {
            return Err(RuntimeError::CyclicMixin {
                target: SmolStr::new(target),
                module: SmolStr::new(module),
            });
        }
        Ok(())
    }

    pub fn include(&mut self, target: &str, module: &str) -> Result<(), RuntimeError> {
        self.check_mixin(target, module)?;
        self.get_mut(target)?
            .mixins
            .push(Mixin::Include(SmolStr::new(module)));
        Ok(())
    }

    pub fn prepend(&mut self, target: &str, module: &str) -> Result<(), RuntimeError> {
        self.check_mixin(target, module)?;
        self.get_mut(target)?
            .mixins
            .push(Mixin::Prepend(SmolStr::new(module)));
        Ok(())
    }

    /// Mix a module's instance methods into the singleton side of `target`
    pub fn extend(&mut self, target: &str, module: &str) -> Result<(), RuntimeError> {
        self.get(target)?;
        if self.get(module)?.kind != TypeKind::Module {
            return Err(RuntimeError::NotAModule(SmolStr::new(module)));
        }
        self.get_mut(target)?
            .mixins
            .push(Mixin::Extend(SmolStr::new(module)));
        Ok(())
    }

    /// Define (or redefine) an instance method on `owner`
    pub fn define_method(
        &mut self,
        owner: &str,
        name: &str,
        visibility: Visibility,
        location: Option<SourceLocation>,
    ) -> Result<(), RuntimeError> {
        self.get_mut(owner)?.methods.insert(
            SmolStr::new(name),
            MethodInfo {
                visibility,
                location,
            },
        );
        Ok(())
    }

    /// Define (or redefine) a method on the class object `owner` itself
    pub fn define_singleton_method(
        &mut self,
        owner: &str,
        name: &str,
        location: Option<SourceLocation>,
    ) -> Result<(), RuntimeError> {
        self.get_mut(owner)?.singleton_methods.insert(
            SmolStr::new(name),
            MethodInfo {
                visibility: Visibility::Public,
                location,
            },
        );
        Ok(())
    }

    /// `private :name` after the fact
    pub fn set_visibility(
        &mut self,
        owner: &str,
        method: &MethodId,
        visibility: Visibility,
    ) -> Result<(), RuntimeError> {
        let def = self.get_mut(owner)?;
        let table = match method.kind {
            MethodKind::Instance => &mut def.methods,
            MethodKind::Singleton => &mut def.singleton_methods,
        };
        let info = table
            .get_mut(&method.name)
            .ok_or_else(|| RuntimeError::UnknownMethod {
                owner: SmolStr::new(owner),
                method: method.name.clone(),
            })?;
        info.visibility = visibility;
        Ok(())
    }

    // =========================================================================
    // Linearization
    // =========================================================================

    /// Qualified names in method resolution order
    pub fn ancestor_names(&self, name: &str) -> Vec<SmolStr> {
        let mut path = FxHashSet::default();
        self.linearize(name, &mut path)
    }

    /// Prepends, self, includes not already in the parent chain, parent chain.
    ///
    /// `path` holds the types being linearized above this call; meeting one
    /// of them again is a cycle and contributes nothing.
    fn linearize(&self, name: &str, path: &mut FxHashSet<SmolStr>) -> Vec<SmolStr> {
        let Some(def) = self.types.get(name) else {
            return Vec::new();
        };
        let key = SmolStr::new(name);
        if !path.insert(key.clone()) {
            return Vec::new();
        }

        let parent = def
            .superclass
            .as_ref()
            .map(|parent| self.linearize(parent, path));

        let mut prepends: VecDeque<SmolStr> = VecDeque::new();
        let mut includes: VecDeque<SmolStr> = VecDeque::new();
        for mixin in &def.mixins {
            match mixin {
                Mixin::Prepend(module) => {
                    let ids = self.linearize(module, path);
                    // Prepending modules that are all present already is a no-op
                    if ids.iter().any(|id| !prepends.contains(id)) {
                        prepends.retain(|id| !ids.contains(id));
                        for id in ids.into_iter().rev() {
                            prepends.push_front(id);
                        }
                    }
                }
                Mixin::Include(module) => {
                    let mut ids = self.linearize(module, path);
                    ids.retain(|id| {
                        !prepends.contains(id)
                            && !includes.contains(id)
                            && parent.as_ref().is_none_or(|p| !p.contains(id))
                    });
                    for id in ids.into_iter().rev() {
                        includes.push_front(id);
                    }
                }
                Mixin::Extend(_) => {}
            }
        }

        path.remove(&key);

        let mut ancestors: Vec<SmolStr> = prepends.into();
        ancestors.push(key);
        ancestors.extend(includes);
        ancestors.extend(parent.unwrap_or_default());
        ancestors
    }

    fn to_ref(&self, name: &SmolStr) -> Option<TypeRef> {
        self.types.get(name).map(|def| TypeRef {
            name: name.clone(),
            kind: def.kind,
        })
    }

    // =========================================================================
    // Method lookup
    // =========================================================================

    /// First definition of an instance method along the resolution order
    pub fn find_method(&self, class: &str, name: &str) -> Option<(SmolStr, &MethodInfo)> {
        self.ancestor_names(class).into_iter().find_map(|owner| {
            let info = self.types.get(&owner)?.methods.get(name)?;
            Some((owner, info))
        })
    }

    /// Types whose methods the class object responds to, in lookup order:
    /// for each class up the superclass chain, its own singleton methods and
    /// then the modules it was extended with.
    fn singleton_lookup_order(&self, class: &str) -> Vec<(SmolStr, MethodKind)> {
        let mut order = Vec::new();
        let mut seen = FxHashSet::default();
        let mut current = Some(SmolStr::new(class));
        while let Some(name) = current {
            if !seen.insert(name.clone()) {
                break;
            }
            let Some(def) = self.types.get(&name) else {
                break;
            };
            order.push((name.clone(), MethodKind::Singleton));
            for mixin in def.mixins.iter().rev() {
                if let Mixin::Extend(module) = mixin {
                    order.extend(
                        self.ancestor_names(module)
                            .into_iter()
                            .map(|m| (m, MethodKind::Instance)),
                    );
                }
            }
            current = def.superclass.clone();
        }
        order
    }

    /// First definition of a singleton method, including inherited and extended ones
    pub fn find_singleton_method(&self, class: &str, name: &str) -> Option<(SmolStr, &MethodInfo)> {
        self.singleton_lookup_order(class)
            .into_iter()
            .find_map(|(owner, kind)| {
                let def = self.types.get(&owner)?;
                let info = match kind {
                    MethodKind::Singleton => def.singleton_methods.get(name)?,
                    MethodKind::Instance => def.methods.get(name)?,
                };
                Some((owner, info))
            })
    }
}

impl Reflection for Runtime {
    type Instance = RuntimeInstance;

    fn singleton_methods(&self, class: &TypeRef) -> Vec<SmolStr> {
        let mut names: IndexMap<SmolStr, Visibility> = IndexMap::new();
        for (owner, kind) in self.singleton_lookup_order(&class.name) {
            let Some(def) = self.types.get(&owner) else {
                continue;
            };
            let table = match kind {
                MethodKind::Singleton => &def.singleton_methods,
                MethodKind::Instance => &def.methods,
            };
            for (name, info) in table {
                names.entry(name.clone()).or_insert(info.visibility);
            }
        }
        names
            .into_iter()
            .filter(|(_, visibility)| *visibility != Visibility::Private)
            .map(|(name, _)| name)
            .collect()
    }

    fn allocate_uninitialized(&self, class: &TypeRef) -> RuntimeInstance {
        RuntimeInstance {
            class: class.clone(),
        }
    }

    fn instance_methods(&self, instance: &RuntimeInstance, visibility: Visibility) -> Vec<SmolStr> {
        let mut names: IndexMap<SmolStr, Visibility> = IndexMap::new();
        for owner in self.ancestor_names(&instance.class.name) {
            let Some(def) = self.types.get(&owner) else {
                continue;
            };
            for (name, info) in &def.methods {
                names.entry(name.clone()).or_insert(info.visibility);
            }
        }
        names
            .into_iter()
            .filter(|(_, v)| *v == visibility)
            .map(|(name, _)| name)
            .collect()
    }

    fn class_of(&self, instance: &RuntimeInstance) -> TypeRef {
        instance.class.clone()
    }

    fn source_location(&self, class: &TypeRef, method: &MethodId) -> Option<SourceLocation> {
        let found = match method.kind {
            MethodKind::Instance => self.find_method(&class.name, &method.name),
            MethodKind::Singleton => self.find_singleton_method(&class.name, &method.name),
        };
        found.and_then(|(_, info)| info.location.clone())
    }

    fn ancestors(&self, class: &TypeRef) -> Vec<TypeRef> {
        self.ancestor_names(&class.name)
            .iter()
            .filter_map(|name| self.to_ref(name))
            .collect()
    }

    fn mixins(&self, class: &TypeRef) -> Vec<TypeRef> {
        self.ancestors(class)
            .into_iter()
            .filter(|ty| ty.is_module() && ty.name != class.name)
            .collect()
    }

    fn superclass(&self, class: &TypeRef) -> Option<TypeRef> {
        let parent = self.types.get(&class.name)?.superclass.as_ref()?;
        self.to_ref(parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn names(types: &[TypeRef]) -> Vec<&str> {
        types.iter().map(|t| t.name.as_str()).collect()
    }

    /// The hierarchy used throughout: MyClass < NS::C2 < C1
    fn sample() -> Runtime {
        let mut rt = Runtime::new();
        for m in ["M1", "M2", "M3", "M4", "M5"] {
            rt.define_module(m).unwrap();
        }
        rt.include("M4", "M3").unwrap();
        rt.define_class("C1", None).unwrap();
        rt.include("C1", "M5").unwrap();
        rt.define_module("NS").unwrap();
        rt.define_class("NS::C2", Some("C1")).unwrap();
        rt.include("NS::C2", "M4").unwrap();
        rt.define_class("MyClass", Some("NS::C2")).unwrap();
        rt.include("MyClass", "M1").unwrap();
        rt.include("MyClass", "M2").unwrap();
        rt
    }

    #[test]
    fn test_bootstrap() {
        let rt = Runtime::new();
        let object = rt.lookup("Object").unwrap();
        assert_eq!(
            names(&rt.ancestors(&object)),
            vec!["Object", "Kernel", "BasicObject"]
        );
        assert!(rt.superclass(&rt.lookup("BasicObject").unwrap()).is_none());
    }

    #[test]
    fn test_ancestors_follow_ruby_order() {
        let rt = sample();
        let my_class = rt.lookup("MyClass").unwrap();
        assert_eq!(
            names(&rt.ancestors(&my_class)),
            vec![
                "MyClass",
                "M2",
                "M1",
                "NS::C2",
                "M4",
                "M3",
                "C1",
                "M5",
                "Object",
                "Kernel",
                "BasicObject"
            ]
        );
    }

    #[test]
    fn test_include_already_in_parent_is_skipped() {
        let mut rt = sample();
        rt.include("MyClass", "M5").unwrap();
        let ancestors = rt.ancestor_names("MyClass");
        assert_eq!(ancestors.iter().filter(|a| *a == "M5").count(), 1);
        assert_eq!(ancestors[1], "M2");
    }

    #[test]
    fn test_prepend_goes_before_self() {
        let mut rt = sample();
        rt.define_module("P").unwrap();
        rt.prepend("C1", "P").unwrap();
        assert_eq!(rt.ancestor_names("C1")[..3], ["P", "C1", "M5"]);
    }

    #[test]
    fn test_mixins_are_modules_in_mro() {
        let rt = sample();
        let c2 = rt.lookup("NS::C2").unwrap();
        assert_eq!(names(&rt.mixins(&c2)), vec!["M4", "M3", "M5", "Kernel"]);
        let m4 = rt.lookup("M4").unwrap();
        assert_eq!(names(&rt.mixins(&m4)), vec!["M3"]);
    }

    #[rstest]
    #[case::superclass_mismatch("MyClass", Some("C1"))]
    #[case::module_as_class("M1", None)]
    #[case::module_as_superclass("X", Some("M1"))]
    #[case::unknown_superclass("X", Some("Nope"))]
    fn test_define_class_errors(#[case] name: &str, #[case] superclass: Option<&str>) {
        let mut rt = sample();
        assert!(rt.define_class(name, superclass).is_err());
    }

    #[test]
    fn test_reopen_keeps_superclass() {
        let mut rt = sample();
        rt.define_class("MyClass", None).unwrap();
        rt.define_class("MyClass", Some("NS::C2")).unwrap();
        let my_class = rt.lookup("MyClass").unwrap();
        assert_eq!(rt.superclass(&my_class).unwrap().name, "NS::C2");
    }

    #[test]
    fn test_mixin_errors() {
        let mut rt = sample();
        assert_eq!(
            rt.include("MyClass", "C1"),
            Err(RuntimeError::NotAModule("C1".into()))
        );
        assert!(matches!(
            rt.include("M3", "M4"),
            Err(RuntimeError::CyclicMixin { .. })
        ));
    }

    #[test]
    fn test_method_lookup_and_visibility() {
        let mut rt = sample();
        let loc = |line| Some(SourceLocation::new("a.rb", line));
        rt.define_method("M1", "m1", Visibility::Public, loc(2)).unwrap();
        rt.define_method("MyClass", "c", Visibility::Public, loc(10)).unwrap();
        rt.define_method("MyClass", "secret", Visibility::Private, loc(11))
            .unwrap();
        rt.define_method("C1", "c", Visibility::Public, loc(20)).unwrap();

        let my_class = rt.lookup("MyClass").unwrap();
        let instance = rt.allocate_uninitialized(&my_class);
        assert_eq!(rt.class_of(&instance), my_class);
        assert_eq!(rt.instance_methods(&instance, Visibility::Public), vec!["c", "m1"]);
        assert_eq!(rt.instance_methods(&instance, Visibility::Private), vec!["secret"]);

        // the override wins
        assert_eq!(
            rt.source_location(&my_class, &MethodId::instance("c")),
            loc(10)
        );
        assert_eq!(
            rt.source_location(&my_class, &MethodId::instance("m1")),
            loc(2)
        );
    }

    #[test]
    fn test_singleton_methods_inherit_and_extend() {
        let mut rt = sample();
        rt.define_singleton_method("C1", "build", Some(SourceLocation::new("c1.rb", 3)))
            .unwrap();
        rt.define_module("Helpers").unwrap();
        rt.define_method("Helpers", "helper", Visibility::Public, None)
            .unwrap();
        rt.extend("MyClass", "Helpers").unwrap();

        let my_class = rt.lookup("MyClass").unwrap();
        assert_eq!(rt.singleton_methods(&my_class), vec!["helper", "build"]);
        assert_eq!(
            rt.source_location(&my_class, &MethodId::singleton("build")),
            Some(SourceLocation::new("c1.rb", 3))
        );
        assert_eq!(
            rt.source_location(&my_class, &MethodId::singleton("helper")),
            None
        );
    }

    #[test]
    fn test_methods_of_dedupes_by_name_and_kind() {
        let mut rt = sample();
        rt.define_method("MyClass", "x", Visibility::Public, None).unwrap();
        rt.define_singleton_method("MyClass", "x", None).unwrap();
        rt.define_method("C1", "x", Visibility::Private, None).unwrap();

        let my_class = rt.lookup("MyClass").unwrap();
        let ids = rt.methods_of(&my_class);
        assert_eq!(ids, vec![MethodId::singleton("x"), MethodId::instance("x")]);
    }

    #[test]
    fn test_set_visibility() {
        let mut rt = sample();
        rt.define_method("C1", "c1", Visibility::Public, None).unwrap();
        rt.set_visibility("C1", &MethodId::instance("c1"), Visibility::Private)
            .unwrap();
        let c1 = rt.lookup("C1").unwrap();
        let instance = rt.allocate_uninitialized(&c1);
        assert!(rt.instance_methods(&instance, Visibility::Public).is_empty());
        assert!(
            rt.set_visibility("C1", &MethodId::instance("nope"), Visibility::Private)
                .is_err()
        );
    }
}
