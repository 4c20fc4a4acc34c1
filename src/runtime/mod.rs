//! Object model and reflection.
//!
//! [`Reflection`] is the query surface the location engine depends on.
//! [`Runtime`] is an in-memory object model implementing it, populated by
//! [`crate::project::index_sources`] from Ruby source files.

mod model;
mod reflection;

pub use model::{MethodInfo, Runtime, RuntimeError, RuntimeInstance};
pub use reflection::{MethodId, MethodKind, Reflection, TypeKind, TypeRef, Visibility};
