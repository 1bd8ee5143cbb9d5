//! # Dependency injection container.
//!
//! The [`Container`] resolves components from a [`Registry`], builds them, runs
//! their lifecycle hooks and caches singletons by name and by capability.
//!
//! ## Resolution
//! ```text
//! resolve(ref)
//!   ├─ lock cache (held for the whole resolution)
//!   ├─ descriptor lookup (name or capability; ad-hoc for unregistered nested types)
//!   ├─ singleton cached? → return it
//!   ├─ T::default()
//!   ├─ app context → construct → injection points (recursive) → init
//!   └─ singleton: cache under name and capability
//! ```
//!
//! ## Rules
//! - One lock spans lookup, cache check and construction: two concurrent first
//!   resolutions of a singleton never produce two instances. Unrelated first
//!   constructions serialize.
//! - Hooks run under the lock and must not resolve through the container.
//! - A resolution stack catches cycles the registry could not see and reports
//!   them as [`ConfigError::Cycle`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use super::component::{AppContext, Component};
use super::descriptor::{Blueprint, ComponentDescriptor, Scope};
use super::key::{Instance, TypeKey};
use super::registry::Registry;
use crate::config::ConfigStore;
use crate::error::{ConfigError, ResolveError};
use crate::process::{ProcessContext, ProcessRun, ProcessSpec};

#[derive(Default)]
struct Cache {
    by_name: HashMap<String, Instance>,
    by_capability: HashMap<TypeKey, Instance>,
}

/// Builds, injects and caches components.
pub struct Container {
    registry: Registry,
    config: Arc<ConfigStore>,
    cache: Mutex<Cache>,
    this: Weak<Container>,
}

impl Container {
    /// Creates a container over a normalized registry and a loaded configuration.
    pub fn new(registry: Registry, config: Arc<ConfigStore>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            registry,
            config,
            cache: Mutex::new(Cache::default()),
            this: this.clone(),
        })
    }

    /// The registry this container resolves from.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The configuration store.
    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    /// Application handle: configuration plus a weak handle to this container.
    pub fn app_context(&self) -> AppContext {
        AppContext::new(Arc::clone(&self.config), self.this.clone())
    }

    /// Checks every configuration binding before anything is built.
    pub fn check_config(&self) -> Result<(), ConfigError> {
        self.registry.check_config(&self.config)
    }

    /// Resolves a component by name.
    pub fn resolve_named(&self, name: &str) -> Result<Instance, ResolveError> {
        self.session(|s| s.resolve_named(name))
    }

    /// Resolves the primary component for capability `C`.
    pub fn resolve_capability<C: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> Result<Arc<C>, ResolveError> {
        let key = TypeKey::of::<C>();
        let instance = self.session(|s| s.resolve_capability(key, None))?;
        downcast(&instance, &key.short_name())
    }

    /// Resolves the component named `name`, viewed as `C`.
    pub fn get<C: ?Sized + Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<Arc<C>, ResolveError> {
        let instance = self.resolve_named(name)?;
        downcast(&instance, name)
    }

    /// Resolves `T` by capability, building it ad hoc if nothing is registered.
    ///
    /// Ad-hoc components are singletons keyed by their type.
    pub fn resolve<T: Component>(&self) -> Result<Arc<T>, ResolveError> {
        let key = TypeKey::of::<T>();
        let adhoc: fn() -> Blueprint = Blueprint::identity::<T>;
        let instance = self.session(|s| s.resolve_capability(key, Some(adhoc)))?;
        downcast(&instance, &key.short_name())
    }

    /// Assembles a fresh process instance for `spec` and returns its entry point.
    pub(crate) fn launch(
        &self,
        spec: &ProcessSpec,
        ctx: ProcessContext,
    ) -> Result<ProcessRun, ResolveError> {
        let descriptor = self
            .registry
            .by_name(spec.class())
            .ok_or_else(|| ResolveError::not_registered(spec.class()))?;
        let launcher = descriptor
            .launcher()
            .ok_or_else(|| ConfigError::NotAProcess {
                process: spec.name().to_string(),
                class: spec.class().to_string(),
            })?;
        self.session(|s| launcher.prepare(s, descriptor.name(), spec, ctx))
    }

    fn session<R>(&self, f: impl FnOnce(&mut Session<'_>) -> R) -> R {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        let mut session = Session {
            container: self,
            cache: &mut *cache,
            stack: Vec::new(),
        };
        f(&mut session)
    }
}

fn downcast<C: ?Sized + Send + Sync + 'static>(
    instance: &Instance,
    component: &str,
) -> Result<Arc<C>, ResolveError> {
    instance
        .downcast::<C>()
        .ok_or_else(|| ResolveError::TypeMismatch {
            component: component.to_string(),
            expected: std::any::type_name::<C>(),
            found: instance.capability().name(),
        })
}

/// One locked resolution: the cache plus the stack of components being built.
pub(crate) struct Session<'a> {
    container: &'a Container,
    cache: &'a mut Cache,
    stack: Vec<String>,
}

impl<'a> Session<'a> {
    pub(crate) fn config(&self) -> &'a ConfigStore {
        let container: &'a Container = self.container;
        &container.config
    }

    pub(crate) fn app_context(&self) -> AppContext {
        self.container.app_context()
    }

    pub(crate) fn resolve_named(&mut self, name: &str) -> Result<Instance, ResolveError> {
        let container = self.container;
        let descriptor = container
            .registry
            .by_name(name)
            .ok_or_else(|| ResolveError::not_registered(name))?;
        self.resolve_descriptor(descriptor)
    }

    pub(crate) fn resolve_capability(
        &mut self,
        key: TypeKey,
        adhoc: Option<fn() -> Blueprint>,
    ) -> Result<Instance, ResolveError> {
        if let Some(instance) = self.cache.by_capability.get(&key) {
            return Ok(instance.clone());
        }
        let container = self.container;
        if let Some(descriptor) = container.registry.by_capability(key) {
            return self.resolve_descriptor(descriptor);
        }
        let Some(adhoc) = adhoc else {
            return Err(ResolveError::not_registered(key.short_name()));
        };

        let blueprint = adhoc();
        let name = key.short_name();
        let instance = self.build(&blueprint, &name)?;
        tracing::debug!(component = %name, "ad-hoc component built");
        self.cache.by_capability.insert(key, instance.clone());
        Ok(instance)
    }

    fn resolve_descriptor(
        &mut self,
        descriptor: &'a ComponentDescriptor,
    ) -> Result<Instance, ResolveError> {
        let singleton = descriptor.scope() == Scope::Singleton;
        if singleton {
            if let Some(instance) = self.cache.by_name.get(descriptor.name()) {
                return Ok(instance.clone());
            }
        }

        let instance = self.build(descriptor.blueprint(), descriptor.name())?;
        if singleton {
            self.cache
                .by_name
                .insert(descriptor.name().to_string(), instance.clone());
            if self.container.registry.is_primary(descriptor) {
                self.cache
                    .by_capability
                    .insert(descriptor.capability(), instance.clone());
            }
            tracing::debug!(component = descriptor.name(), "singleton cached");
        }
        Ok(instance)
    }

    fn build(&mut self, blueprint: &Blueprint, name: &str) -> Result<Instance, ResolveError> {
        self.enter(name)?;
        let built = blueprint.build(self, name);
        self.leave();
        built
    }

    /// Pushes `name` on the resolution stack, failing if it is already there.
    pub(crate) fn enter(&mut self, name: &str) -> Result<(), ResolveError> {
        if let Some(start) = self.stack.iter().position(|n| n == name) {
            let mut path = self.stack[start..].to_vec();
            path.push(name.to_string());
            return Err(ConfigError::Cycle { path }.into());
        }
        self.stack.push(name.to_string());
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.stack.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use crate::error::{Hook, HookError};
    use crate::ioc::{Declaration, Wiring};

    trait Store: Send + Sync {
        fn id(&self) -> usize;
    }

    static STORES_BUILT: AtomicUsize = AtomicUsize::new(0);

    #[derive(Default)]
    struct InMemoryStore {
        id: usize,
    }

    impl Component for InMemoryStore {
        fn construct(&mut self) -> Result<(), HookError> {
            std::thread::sleep(std::time::Duration::from_millis(5));
            self.id = STORES_BUILT.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl Store for InMemoryStore {
        fn id(&self) -> usize {
            self.id
        }
    }

    #[test]
    fn test_singleton_built_once_under_concurrent_first_use() {
        let registry = Registry::normalize(vec![
            Declaration::provide::<InMemoryStore, dyn Store>(|s| s).named("Cache"),
        ])
        .unwrap();
        let container = Container::new(registry, Arc::new(ConfigStore::new()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let c = Arc::clone(&container);
                std::thread::spawn(move || c.resolve_capability::<dyn Store>().unwrap())
            })
            .collect();
        let stores: Vec<Arc<dyn Store>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(STORES_BUILT.load(Ordering::SeqCst), 1);
        for store in &stores {
            assert!(Arc::ptr_eq(store, &stores[0]));
        }
        let by_name = container.get::<dyn Store>("Cache").unwrap();
        assert!(Arc::ptr_eq(&by_name, &stores[0]));
    }

    #[derive(Default)]
    struct Traced {
        trail: Vec<String>,
        has_app: bool,
        retries: i64,
    }

    impl Component for Traced {
        fn wiring(w: Wiring<Self>) -> Wiring<Self> {
            w.app(|t, _app| t.has_app = true)
                .value("retries", "app.retries", |t, v: i64| {
                    t.retries = v;
                    t.trail.push("inject".into());
                })
        }

        fn construct(&mut self) -> Result<(), HookError> {
            assert!(self.has_app);
            self.trail.push("construct".into());
            Ok(())
        }

        fn init(&mut self) -> Result<(), HookError> {
            self.trail.push(format!("init:{}", self.retries));
            Ok(())
        }
    }

    #[test]
    fn test_hook_ordering() {
        let registry = Registry::normalize(vec![Declaration::component::<Traced>()]).unwrap();
        let config = ConfigStore::from_value(json!({ "app": { "retries": 3 } }));
        let container = Container::new(registry, Arc::new(config));

        let traced = container.resolve::<Traced>().unwrap();
        assert_eq!(traced.trail, vec!["construct", "inject", "init:3"]);
    }

    #[test]
    fn test_scalar_mismatch_fails_resolution() {
        let registry = Registry::normalize(vec![Declaration::component::<Traced>()]).unwrap();
        let config = ConfigStore::from_value(json!({ "app": { "retries": true } }));
        let container = Container::new(registry, Arc::new(config));

        assert!(container.check_config().is_err());
        let err = container.resolve_named("Traced").unwrap_err();
        match err {
            ResolveError::Config(ConfigError::ScalarMismatch {
                component,
                field,
                key,
                found,
                ..
            }) => {
                assert_eq!(component, "Traced");
                assert_eq!(field, "retries");
                assert_eq!(key, "app.retries");
                assert_eq!(found, "boolean");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_absent_key_keeps_default() {
        let registry = Registry::normalize(vec![Declaration::component::<Traced>()]).unwrap();
        let container = Container::new(registry, Arc::new(ConfigStore::new()));
        let traced = container.resolve::<Traced>().unwrap();
        assert_eq!(traced.retries, 0);
        assert_eq!(traced.trail, vec!["construct", "init:0"]);
    }

    #[derive(Default, Clone)]
    struct Settings {
        host: String,
    }

    impl Component for Settings {
        fn wiring(w: Wiring<Self>) -> Wiring<Self> {
            w.value("host", "db.host", |s, h: String| s.host = h)
        }
    }

    #[derive(Default)]
    struct Client {
        settings: Settings,
        store: Option<Arc<dyn Store>>,
    }

    impl Component for Client {
        fn wiring(w: Wiring<Self>) -> Wiring<Self> {
            w.nested::<Settings>("settings", |c, s| c.settings = s)
                .optional_reference::<dyn Store>("store", |c, s| c.store = Some(s))
        }
    }

    #[test]
    fn test_adhoc_nested_and_optional_reference() {
        let config = ConfigStore::from_value(json!({ "db": { "host": "10.0.0.1" } }));
        let container = Container::new(Registry::default(), Arc::new(config));

        let client = container.resolve::<Client>().unwrap();
        assert_eq!(client.settings.host, "10.0.0.1");
        assert!(client.store.is_none());
        assert!(Arc::ptr_eq(&client, &container.resolve::<Client>().unwrap()));
    }

    #[derive(Default)]
    struct Needy {
        store: Option<Arc<dyn Store>>,
    }

    impl Component for Needy {
        fn wiring(w: Wiring<Self>) -> Wiring<Self> {
            w.reference::<dyn Store>("store", |n, s| n.store = Some(s))
        }
    }

    #[derive(Default)]
    struct Broken;

    impl Component for Broken {
        fn init(&mut self) -> Result<(), HookError> {
            Err(HookError::new("no disk"))
        }
    }

    #[test]
    fn test_resolution_errors() {
        let registry = Registry::normalize(vec![
            Declaration::component::<Needy>(),
            Declaration::component::<Broken>(),
        ])
        .unwrap();
        let container = Container::new(registry, Arc::new(ConfigStore::new()));

        let err = container.resolve_named("Needy").unwrap_err();
        assert_eq!(err.as_label(), "resolve_not_registered");

        let err = container.resolve_named("Broken").unwrap_err();
        assert!(matches!(err, ResolveError::Hook { hook: Hook::Init, .. }));

        let err = container.get::<dyn Store>("Broken").err().unwrap();
        assert_eq!(err.as_label(), "resolve_hook_failed");

        assert_eq!(
            container.resolve_named("Nobody").unwrap_err().as_label(),
            "resolve_not_registered"
        );
    }

    #[test]
    fn test_app_context_reaches_container() {
        let container = Container::new(Registry::default(), Arc::new(ConfigStore::new()));
        let app = container.app_context();
        assert!(Arc::ptr_eq(&app.container().unwrap(), &container));
    }
}
