//! # Declarations and normalized descriptors.
//!
//! A [`Declaration`] is what callers hand to the registry: an implementation
//! type, optionally a capability it is exposed as, a name and a scope. The
//! registry normalizes each one into an immutable [`ComponentDescriptor`].
//!
//! ```text
//! Declaration::provide::<InMemoryStore, dyn Store>(|s| s).named("Cache")
//!         │ normalize
//!         ▼
//! ComponentDescriptor { name: "Cache", capability: dyn Store,
//!                       implementation: InMemoryStore, scope: Singleton }
//! ```

use std::fmt;
use std::sync::Arc;

use super::component::Component;
use super::container::Session;
use super::key::{Instance, TypeKey};
use super::wiring::{Dependency, ScalarCheck, Wiring};
use crate::error::{Hook, ResolveError};
use crate::process::{Launcher, Process};

/// Instance lifetime policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scope {
    /// One instance for the container lifetime, built on first use.
    #[default]
    Singleton,
    /// A fresh instance on every resolution.
    Prototype,
}

type Build = Arc<dyn Fn(&mut Session<'_>, &str) -> Result<Instance, ResolveError> + Send + Sync>;

/// Everything the container needs to build one implementation type.
#[derive(Clone)]
pub(crate) struct Blueprint {
    pub(crate) implementation: TypeKey,
    pub(crate) capability: TypeKey,
    pub(crate) dependencies: Vec<Dependency>,
    pub(crate) scalars: Vec<ScalarCheck>,
    build: Build,
}

impl Blueprint {
    pub(crate) fn new<T: Component, C: ?Sized + Send + Sync + 'static>(
        upcast: fn(Arc<T>) -> Arc<C>,
    ) -> Self {
        let wiring = Arc::new(T::wiring(Wiring::new()));
        let dependencies = wiring.dependencies();
        let scalars = wiring.scalar_checks();
        let build: Build = Arc::new(move |session: &mut Session<'_>, name: &str| {
            let value = assemble::<T>(&wiring, session, name)?;
            Ok(Instance::new::<C>(upcast(Arc::new(value))))
        });
        Self {
            implementation: TypeKey::of::<T>(),
            capability: TypeKey::of::<C>(),
            dependencies,
            scalars,
            build,
        }
    }

    /// Blueprint exposing `T` as itself.
    pub(crate) fn identity<T: Component>() -> Self {
        Self::new::<T, T>(|t| t)
    }

    pub(crate) fn build(
        &self,
        session: &mut Session<'_>,
        name: &str,
    ) -> Result<Instance, ResolveError> {
        (self.build)(session, name)
    }
}

impl fmt::Debug for Blueprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blueprint")
            .field("implementation", &self.implementation)
            .field("capability", &self.capability)
            .finish_non_exhaustive()
    }
}

/// Allocates `T`, then runs the lifecycle: app context, construct, injection, init.
pub(crate) fn assemble<T: Component>(
    wiring: &Wiring<T>,
    session: &mut Session<'_>,
    name: &str,
) -> Result<T, ResolveError> {
    let mut value = T::default();
    if let Some(set) = wiring.app_setter() {
        set(&mut value, session.app_context());
    }
    value.construct().map_err(|source| ResolveError::Hook {
        component: name.to_string(),
        hook: Hook::Construct,
        source,
    })?;
    for point in wiring.points() {
        point.inject(&mut value, name, session)?;
    }
    value.init().map_err(|source| ResolveError::Hook {
        component: name.to_string(),
        hook: Hook::Init,
        source,
    })?;
    Ok(value)
}

/// A raw component declaration, normalized by
/// [`Registry::normalize`](super::Registry::normalize).
#[derive(Default)]
pub struct Declaration {
    name: Option<String>,
    blueprint: Option<Blueprint>,
    scope: Option<Scope>,
    launcher: Option<Launcher>,
}

impl Declaration {
    /// A declaration without an implementation; rejected by normalization.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Declares `T` as its own capability.
    pub fn component<T: Component>() -> Self {
        Self {
            blueprint: Some(Blueprint::identity::<T>()),
            ..Self::default()
        }
    }

    /// Declares `T` exposed as capability `C`.
    ///
    /// ```rust
    /// use bootvisor::{Component, Declaration};
    ///
    /// trait Store: Send + Sync {}
    ///
    /// #[derive(Default)]
    /// struct InMemoryStore;
    /// impl Component for InMemoryStore {}
    /// impl Store for InMemoryStore {}
    ///
    /// let decl = Declaration::provide::<InMemoryStore, dyn Store>(|s| s).named("Cache");
    /// # let _ = decl;
    /// ```
    pub fn provide<T: Component, C: ?Sized + Send + Sync + 'static>(
        upcast: fn(Arc<T>) -> Arc<C>,
    ) -> Self {
        Self {
            blueprint: Some(Blueprint::new::<T, C>(upcast)),
            ..Self::default()
        }
    }

    /// Declares a process implementation; processes are built fresh per launch.
    pub fn process<T: Process>() -> Self {
        Self {
            blueprint: Some(Blueprint::identity::<T>()),
            scope: Some(Scope::Prototype),
            launcher: Some(Launcher::of::<T>()),
            ..Self::default()
        }
    }

    /// Sets the component name (defaults to the implementation's type name).
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the scope (defaults to singleton, prototype for processes).
    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub(crate) fn explicit_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn into_descriptor(self) -> Option<ComponentDescriptor> {
        let blueprint = self.blueprint?;
        let name = self
            .name
            .unwrap_or_else(|| blueprint.implementation.short_name());
        Some(ComponentDescriptor {
            name,
            scope: self.scope.unwrap_or_default(),
            blueprint,
            launcher: self.launcher.map(Arc::new),
        })
    }
}

/// A normalized, immutable component description.
#[derive(Clone)]
pub struct ComponentDescriptor {
    name: String,
    scope: Scope,
    blueprint: Blueprint,
    launcher: Option<Arc<Launcher>>,
}

impl ComponentDescriptor {
    /// Unique component name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type under which the component is exposed.
    pub fn capability(&self) -> TypeKey {
        self.blueprint.capability
    }

    /// Concrete type that is allocated.
    pub fn implementation(&self) -> TypeKey {
        self.blueprint.implementation
    }

    /// Instance lifetime policy.
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Returns `true` if the component can be launched as a process.
    pub fn is_process(&self) -> bool {
        self.launcher.is_some()
    }

    pub(crate) fn blueprint(&self) -> &Blueprint {
        &self.blueprint
    }

    pub(crate) fn launcher(&self) -> Option<&Launcher> {
        self.launcher.as_deref()
    }
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("name", &self.name)
            .field("capability", &self.capability())
            .field("implementation", &self.implementation())
            .field("scope", &self.scope)
            .finish()
    }
}
