//! Type identity and type-erased instances.

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity of a capability or implementation type.
///
/// Equality and hashing use the [`TypeId`] only; the name is kept for messages.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key of `T` (trait objects allowed).
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Fully qualified type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without module path, e.g. `InMemoryStore` or `dyn Store`.
    pub fn short_name(&self) -> String {
        short_type_name(self.name)
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name())
    }
}

/// Strips module paths from every path segment of a type name.
///
/// `app::store::Cache<app::Key>` becomes `Cache<Key>`.
pub(crate) fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    for ch in full.chars() {
        if ch.is_alphanumeric() || ch == '_' || ch == ':' {
            segment.push(ch);
        } else {
            out.push_str(segment.rsplit("::").next().unwrap_or_default());
            segment.clear();
            out.push(ch);
        }
    }
    out.push_str(segment.rsplit("::").next().unwrap_or_default());
    out
}

/// A resolved component, erased to its capability type.
///
/// Internally an `Arc<C>` boxed as `Any`; cloning shares the same component.
#[derive(Clone)]
pub struct Instance {
    capability: TypeKey,
    value: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    pub(crate) fn new<C: ?Sized + Send + Sync + 'static>(component: Arc<C>) -> Self {
        Self {
            capability: TypeKey::of::<C>(),
            value: Arc::new(component),
        }
    }

    /// Capability this instance was registered for.
    pub fn capability(&self) -> TypeKey {
        self.capability
    }

    /// Returns the component as `Arc<C>` if `C` is its capability type.
    pub fn downcast<C: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<C>> {
        self.value.downcast_ref::<Arc<C>>().cloned()
    }

    /// Returns `true` if both handles point to the same component.
    pub fn same(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("capability", &self.capability)
            .finish_non_exhaustive()
    }
}
