//! The reflection surface the location engine queries.
//!
//! Mirrors what a Ruby process can answer about itself: which methods a class
//! and its instances respond to, where each one was defined, and the
//! ancestor chain. The engine never needs more than this.

use std::fmt;

use indexmap::IndexSet;
use smol_str::SmolStr;

use crate::base::SourceLocation;
use crate::base::constants::{BASIC_OBJECT, ROOT_CLASS, ROOT_MODULE};

/// Class or module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TypeKind {
    Class,
    Module,
}

impl TypeKind {
    /// One-letter tag used in rendered trees
    pub fn glyph(self) -> char {
        match self {
            Self::Class => 'C',
            Self::Module => 'M',
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Class => "class",
            Self::Module => "module",
        })
    }
}

/// A handle to a class or module, identified by its qualified name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    pub name: SmolStr,
    pub kind: TypeKind,
}

impl TypeRef {
    pub fn class(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Class,
        }
    }

    pub fn module(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Module,
        }
    }

    pub fn is_module(&self) -> bool {
        self.kind == TypeKind::Module
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub const ALL: [Visibility; 3] = [Self::Public, Self::Private, Self::Protected];
}

/// Instance method or method on the type itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum MethodKind {
    Instance,
    Singleton,
}

/// A method as identified by reflection: its name and which side it lives on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodId {
    pub name: SmolStr,
    pub kind: MethodKind,
}

impl MethodId {
    pub fn instance(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            kind: MethodKind::Instance,
        }
    }

    pub fn singleton(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            kind: MethodKind::Singleton,
        }
    }
}

/// Reflection queries against a live object model
pub trait Reflection {
    /// An object of some class, created without running its constructor
    type Instance;

    /// Names of methods callable on the class object itself
    fn singleton_methods(&self, class: &TypeRef) -> Vec<SmolStr>;

    fn allocate_uninitialized(&self, class: &TypeRef) -> Self::Instance;

    /// Names of instance methods an object responds to with the given visibility
    fn instance_methods(&self, instance: &Self::Instance, visibility: Visibility) -> Vec<SmolStr>;

    fn class_of(&self, instance: &Self::Instance) -> TypeRef;

    /// Where the method reachable on `class` under this identifier was defined
    fn source_location(&self, class: &TypeRef, method: &MethodId) -> Option<SourceLocation>;

    /// Method resolution order, starting with `class` itself
    fn ancestors(&self, class: &TypeRef) -> Vec<TypeRef>;

    /// Modules in the resolution order of `class`, in that order
    fn mixins(&self, class: &TypeRef) -> Vec<TypeRef>;

    fn superclass(&self, class: &TypeRef) -> Option<TypeRef>;

    /// The universal root classes end superclass recursion
    fn is_root_class(&self, ty: &TypeRef) -> bool {
        ty.name == ROOT_CLASS || ty.name == BASIC_OBJECT
    }

    /// The implicit mixin present on every object is never listed
    fn is_root_module(&self, ty: &TypeRef) -> bool {
        ty.name == ROOT_MODULE
    }

    /// Every method reachable on `class`: its singleton methods plus the
    /// instance methods of an uninitialized instance at every visibility,
    /// de-duplicated by name and kind.
    fn methods_of(&self, class: &TypeRef) -> Vec<MethodId> {
        let mut ids: IndexSet<MethodId> = self
            .singleton_methods(class)
            .into_iter()
            .map(MethodId::singleton)
            .collect();

        let instance = self.allocate_uninitialized(class);
        for visibility in Visibility::ALL {
            ids.extend(
                self.instance_methods(&instance, visibility)
                    .into_iter()
                    .map(MethodId::instance),
            );
        }
        ids.into_iter().collect()
    }
}

impl<R: Reflection + ?Sized> Reflection for &R {
    type Instance = R::Instance;

    fn singleton_methods(&self, class: &TypeRef) -> Vec<SmolStr> {
        (**self).singleton_methods(class)
    }

    fn allocate_uninitialized(&self, class: &TypeRef) -> Self::Instance {
        (**self).allocate_uninitialized(class)
    }

    fn instance_methods(&self, instance: &Self::Instance, visibility: Visibility) -> Vec<SmolStr> {
        (**self).instance_methods(instance, visibility)
    }

    fn class_of(&self, instance: &Self::Instance) -> TypeRef {
        (**self).class_of(instance)
    }

    fn source_location(&self, class: &TypeRef, method: &MethodId) -> Option<SourceLocation> {
        (**self).source_location(class, method)
    }

    fn ancestors(&self, class: &TypeRef) -> Vec<TypeRef> {
        (**self).ancestors(class)
    }

    fn mixins(&self, class: &TypeRef) -> Vec<TypeRef> {
        (**self).mixins(class)
    }

    fn superclass(&self, class: &TypeRef) -> Option<TypeRef> {
        (**self).superclass(class)
    }

    fn is_root_class(&self, ty: &TypeRef) -> bool {
        (**self).is_root_class(ty)
    }

    fn is_root_module(&self, ty: &TypeRef) -> bool {
        (**self).is_root_module(ty)
    }
}
