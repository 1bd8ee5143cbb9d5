//! # Injectable components.
//!
//! A [`Component`] is a default-constructible type the container can build. Its
//! injection table ([`Component::wiring`]) replaces runtime reflection: it lists
//! every field the container fills and how.
//!
//! ## Lifecycle
//! ```text
//! T::default()
//!   ├─► Wiring::app setter         (AppContext)
//!   ├─► Component::construct       (before any field injection)
//!   ├─► injection points           (nested / reference / scalar, declaration order)
//!   └─► Component::init            (after all field injection)
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use bootvisor::{AppContext, Component, HookError, Wiring};
//!
//! trait Store: Send + Sync {
//!     fn get(&self, key: &str) -> Option<String>;
//! }
//!
//! #[derive(Default)]
//! struct Repo {
//!     app: Option<AppContext>,
//!     store: Option<Arc<dyn Store>>,
//!     table: String,
//! }
//!
//! impl Component for Repo {
//!     fn wiring(w: Wiring<Self>) -> Wiring<Self> {
//!         w.app(|r, app| r.app = Some(app))
//!             .reference::<dyn Store>("store", |r, s| r.store = Some(s))
//!             .value("table", "repo.table", |r, t: String| r.table = t)
//!     }
//!
//!     fn init(&mut self) -> Result<(), HookError> {
//!         if self.table.is_empty() {
//!             return Err(HookError::new("repo.table is not configured"));
//!         }
//!         Ok(())
//!     }
//! }
//! ```

use std::sync::{Arc, Weak};

use super::container::Container;
use super::wiring::Wiring;
use crate::config::ConfigStore;
use crate::error::HookError;

/// A type the container can allocate, inject and hand out.
pub trait Component: Default + Send + Sync + 'static {
    /// Declares the fields the container injects.
    fn wiring(wiring: Wiring<Self>) -> Wiring<Self> {
        wiring
    }

    /// Runs right after allocation and application-context injection,
    /// before any other field is injected.
    ///
    /// Hooks run while the container is locked and must not resolve through it.
    fn construct(&mut self) -> Result<(), HookError> {
        Ok(())
    }

    /// Runs after every declared field has been injected.
    fn init(&mut self) -> Result<(), HookError> {
        Ok(())
    }
}

/// Process-wide application handle: configuration access and the container.
///
/// Passed explicitly to whatever needs it; there is no ambient global.
#[derive(Clone)]
pub struct AppContext {
    config: Arc<ConfigStore>,
    container: Weak<Container>,
}

impl AppContext {
    pub(crate) fn new(config: Arc<ConfigStore>, container: Weak<Container>) -> Self {
        Self { config, container }
    }

    /// Read-only configuration.
    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// The owning container, while it is alive.
    pub fn container(&self) -> Option<Arc<Container>> {
        self.container.upgrade()
    }
}
