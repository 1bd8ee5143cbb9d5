//! Inversion of control: component declarations, the registry and the container.
//!
//! ## Contents
//! - [`Component`], [`AppContext`] what the container builds and what it injects first
//! - [`Wiring`], [`InjectionPoint`], [`Policy`] per-type injection tables
//! - [`Declaration`], [`ComponentDescriptor`], [`Scope`] raw and normalized registrations
//! - [`Registry`] name/capability indexes with duplicate and cycle checks
//! - [`Container`] resolution, lifecycle hooks and the singleton cache
//! - [`TypeKey`], [`Instance`] type identity and erased instances
//!
//! ## Wiring example
//! ```rust
//! use std::sync::Arc;
//! use bootvisor::{ConfigStore, Component, Container, Declaration, Registry, Wiring};
//!
//! trait Store: Send + Sync {
//!     fn get(&self, key: &str) -> Option<String>;
//! }
//!
//! #[derive(Default)]
//! struct InMemoryStore;
//! impl Component for InMemoryStore {}
//! impl Store for InMemoryStore {
//!     fn get(&self, _key: &str) -> Option<String> { None }
//! }
//!
//! #[derive(Default)]
//! struct Repo { store: Option<Arc<dyn Store>> }
//! impl Component for Repo {
//!     fn wiring(w: Wiring<Self>) -> Wiring<Self> {
//!         w.reference::<dyn Store>("store", |r, s| r.store = Some(s))
//!     }
//! }
//!
//! let registry = Registry::normalize(vec![
//!     Declaration::provide::<InMemoryStore, dyn Store>(|s| s).named("Cache"),
//!     Declaration::component::<Repo>(),
//! ])
//! .unwrap();
//! let container = Container::new(registry, Arc::new(ConfigStore::new()));
//!
//! let repo = container.get::<Repo>("Repo").unwrap();
//! let cache = container.get::<dyn Store>("Cache").unwrap();
//! assert!(Arc::ptr_eq(repo.store.as_ref().unwrap(), &cache));
//! ```

mod component;
mod container;
mod descriptor;
mod key;
mod registry;
mod wiring;

pub use component::{AppContext, Component};
pub use container::Container;
pub(crate) use container::Session;
pub(crate) use descriptor::assemble;
pub use descriptor::{ComponentDescriptor, Declaration, Scope};
pub use key::{Instance, TypeKey};
pub use registry::Registry;
pub use wiring::{InjectionPoint, Policy, Wiring};
