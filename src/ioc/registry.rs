//! # Component registry.
//!
//! Normalizes raw [`Declaration`]s into [`ComponentDescriptor`]s and indexes them
//! by name and by capability. Normalization rejects:
//!
//! - declarations with no implementation ([`ConfigError::MissingImplementation`]);
//! - duplicate names ([`ConfigError::DuplicateName`]);
//! - dependency cycles, including cycles through unregistered nested types
//!   ([`ConfigError::Cycle`]).
//!
//! Several components may share a capability. The last one registered becomes
//! the capability's primary; the others stay reachable by name.
//!
//! ## Cycle check
//! ```text
//! visit(node):
//!   mark node active, push on path
//!   for each dependency edge:
//!     target active  → Cycle(path[target..] + target)
//!     target unseen  → visit(target)
//!   mark node done, pop
//! ```

use std::collections::{HashMap, HashSet};

use super::descriptor::{Blueprint, ComponentDescriptor, Declaration};
use super::key::TypeKey;
use super::wiring::{Dependency, DependencyTarget};
use crate::config::{ConfigStore, describe};
use crate::error::ConfigError;
use crate::process::Scheduler;

/// Normalized, immutable set of component descriptors.
#[derive(Debug, Default)]
pub struct Registry {
    descriptors: Vec<ComponentDescriptor>,
    by_name: HashMap<String, usize>,
    by_capability: HashMap<TypeKey, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Node {
    Registered(usize),
    Adhoc(TypeKey),
}

#[derive(Clone, Copy)]
enum Mark {
    Active,
    Done,
}

impl Registry {
    /// Normalizes and indexes declarations, then checks the graph for cycles.
    pub fn normalize(
        declarations: impl IntoIterator<Item = Declaration>,
    ) -> Result<Self, ConfigError> {
        let mut registry = Self::default();
        for (index, declaration) in declarations.into_iter().enumerate() {
            let name = declaration.explicit_name().map(str::to_owned);
            let descriptor = declaration
                .into_descriptor()
                .ok_or(ConfigError::MissingImplementation { index, name })?;
            registry.insert(descriptor)?;
        }
        registry.check_acyclic()?;
        Ok(registry)
    }

    /// Like [`normalize`](Self::normalize), with the built-in `Scheduler`
    /// process registered first.
    pub fn with_builtins(
        declarations: impl IntoIterator<Item = Declaration>,
    ) -> Result<Self, ConfigError> {
        let builtins = [Declaration::process::<Scheduler>().named("Scheduler")];
        Self::normalize(builtins.into_iter().chain(declarations))
    }

    /// Descriptor registered under `name`.
    pub fn by_name(&self, name: &str) -> Option<&ComponentDescriptor> {
        self.by_name.get(name).map(|&i| &self.descriptors[i])
    }

    /// Primary descriptor for a capability.
    pub fn by_capability(&self, capability: TypeKey) -> Option<&ComponentDescriptor> {
        self.by_capability
            .get(&capability)
            .map(|&i| &self.descriptors[i])
    }

    /// Returns `true` if `descriptor` is the primary for its capability.
    pub fn is_primary(&self, descriptor: &ComponentDescriptor) -> bool {
        self.by_capability(descriptor.capability())
            .is_some_and(|d| d.name() == descriptor.name())
    }

    /// Descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentDescriptor> {
        self.descriptors.iter()
    }

    /// Number of registered components.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Checks every configuration binding against `store`, including those of
    /// unregistered nested types reached through dependency edges.
    ///
    /// Absent keys are fine (fields keep their defaults); a present value of
    /// the wrong type fails with [`ConfigError::ScalarMismatch`].
    pub fn check_config(&self, store: &ConfigStore) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for descriptor in &self.descriptors {
            self.check_blueprint(descriptor.blueprint(), descriptor.name(), store, &mut seen)?;
        }
        Ok(())
    }

    fn check_blueprint(
        &self,
        blueprint: &Blueprint,
        component: &str,
        store: &ConfigStore,
        seen: &mut HashSet<TypeKey>,
    ) -> Result<(), ConfigError> {
        for check in &blueprint.scalars {
            let Some(value) = store.get(&check.key) else {
                continue;
            };
            if !(check.accepts)(value) {
                return Err(ConfigError::ScalarMismatch {
                    component: component.to_string(),
                    field: check.field,
                    key: check.key.clone(),
                    expected: check.expected,
                    found: describe(value),
                });
            }
        }
        // Registered targets are checked on their own; only ad-hoc ones are walked.
        for dependency in &blueprint.dependencies {
            if let Some((Node::Adhoc(key), adhoc, label)) = self.edge(dependency) {
                if seen.insert(key) {
                    self.check_blueprint(&adhoc, &label, store, seen)?;
                }
            }
        }
        Ok(())
    }

    fn insert(&mut self, descriptor: ComponentDescriptor) -> Result<(), ConfigError> {
        if self.by_name.contains_key(descriptor.name()) {
            return Err(ConfigError::DuplicateName {
                name: descriptor.name().to_string(),
            });
        }
        let index = self.descriptors.len();
        if let Some(&previous) = self.by_capability.get(&descriptor.capability()) {
            tracing::warn!(
                capability = %descriptor.capability(),
                primary = descriptor.name(),
                shadowed = self.descriptors[previous].name(),
                "capability registered twice; last registration is primary"
            );
        }
        self.by_name.insert(descriptor.name().to_string(), index);
        self.by_capability.insert(descriptor.capability(), index);
        tracing::debug!(
            name = descriptor.name(),
            capability = %descriptor.capability(),
            implementation = %descriptor.implementation(),
            scope = ?descriptor.scope(),
            "component registered"
        );
        self.descriptors.push(descriptor);
        Ok(())
    }

    fn check_acyclic(&self) -> Result<(), ConfigError> {
        let mut marks = HashMap::new();
        let mut path = Vec::new();
        for index in 0..self.descriptors.len() {
            let descriptor = &self.descriptors[index];
            self.visit(
                Node::Registered(index),
                descriptor.blueprint(),
                descriptor.name().to_string(),
                &mut marks,
                &mut path,
            )?;
        }
        Ok(())
    }

    fn visit(
        &self,
        node: Node,
        blueprint: &Blueprint,
        label: String,
        marks: &mut HashMap<Node, Mark>,
        path: &mut Vec<(Node, String)>,
    ) -> Result<(), ConfigError> {
        match marks.get(&node) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Active) => {
                let start = path.iter().position(|(n, _)| *n == node).unwrap_or(0);
                let mut cycle: Vec<String> =
                    path[start..].iter().map(|(_, l)| l.clone()).collect();
                cycle.push(label);
                return Err(ConfigError::Cycle { path: cycle });
            }
            None => {}
        }

        marks.insert(node, Mark::Active);
        path.push((node, label));
        for dependency in &blueprint.dependencies {
            if let Some((target, target_blueprint, target_label)) = self.edge(dependency) {
                self.visit(target, &target_blueprint, target_label, marks, path)?;
            }
        }
        path.pop();
        marks.insert(node, Mark::Done);
        Ok(())
    }

    /// Target of a dependency edge; `None` for dangling references, which are
    /// reported at resolution time instead.
    fn edge(&self, dependency: &Dependency) -> Option<(Node, Blueprint, String)> {
        let registered = match &dependency.target {
            DependencyTarget::Capability(key) => self.by_capability.get(key),
            DependencyTarget::Name(name) => self.by_name.get(name),
        };
        if let Some(&index) = registered {
            let descriptor = &self.descriptors[index];
            return Some((
                Node::Registered(index),
                descriptor.blueprint().clone(),
                descriptor.name().to_string(),
            ));
        }
        let adhoc = dependency.adhoc?;
        let blueprint = adhoc();
        let label = blueprint.implementation.short_name();
        Some((Node::Adhoc(blueprint.implementation), blueprint, label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::ioc::{Component, Wiring};

    trait Store: Send + Sync {}

    #[derive(Default)]
    struct InMemoryStore;
    impl Component for InMemoryStore {}
    impl Store for InMemoryStore {}

    #[derive(Default)]
    struct DiskStore;
    impl Component for DiskStore {}
    impl Store for DiskStore {}

    #[derive(Default)]
    struct A {
        b: Option<Arc<B>>,
    }
    #[derive(Default)]
    struct B {
        a: Option<Arc<A>>,
    }

    impl Component for A {
        fn wiring(w: Wiring<Self>) -> Wiring<Self> {
            w.reference::<B>("b", |s, b| s.b = Some(b))
        }
    }
    impl Component for B {
        fn wiring(w: Wiring<Self>) -> Wiring<Self> {
            w.reference::<A>("a", |s, a| s.a = Some(a))
        }
    }

    #[derive(Default, Clone)]
    struct Left {
        right: Option<Box<Right>>,
    }
    #[derive(Default, Clone)]
    struct Right {
        left: Option<Box<Left>>,
    }

    impl Component for Left {
        fn wiring(w: Wiring<Self>) -> Wiring<Self> {
            w.nested::<Right>("right", |s, r| s.right = Some(Box::new(r)))
        }
    }
    impl Component for Right {
        fn wiring(w: Wiring<Self>) -> Wiring<Self> {
            w.nested::<Left>("left", |s, l| s.left = Some(Box::new(l)))
        }
    }

    #[derive(Default, Clone)]
    struct Tuned {
        retries: i64,
    }
    impl Component for Tuned {
        fn wiring(w: Wiring<Self>) -> Wiring<Self> {
            w.value("retries", "app.retries", |s, v: i64| s.retries = v)
        }
    }

    #[derive(Default)]
    struct Holder {
        tuned: Tuned,
    }
    impl Component for Holder {
        fn wiring(w: Wiring<Self>) -> Wiring<Self> {
            w.nested::<Tuned>("tuned", |h, t| h.tuned = t)
        }
    }

    #[test]
    fn test_indexes_by_name_and_capability() {
        let registry = Registry::normalize(vec![
            Declaration::provide::<InMemoryStore, dyn Store>(|s| s).named("Cache"),
        ])
        .unwrap();
        let by_name = registry.by_name("Cache").unwrap();
        let by_cap = registry.by_capability(TypeKey::of::<dyn Store>()).unwrap();
        assert_eq!(by_name.name(), by_cap.name());
        assert!(registry.by_name("InMemoryStore").is_none());
        assert!(registry.by_capability(TypeKey::of::<InMemoryStore>()).is_none());
    }

    #[test]
    fn test_last_registration_is_primary() {
        let registry = Registry::normalize(vec![
            Declaration::provide::<InMemoryStore, dyn Store>(|s| s),
            Declaration::provide::<DiskStore, dyn Store>(|s| s),
        ])
        .unwrap();
        let primary = registry.by_capability(TypeKey::of::<dyn Store>()).unwrap();
        assert_eq!(primary.name(), "DiskStore");
        assert!(registry.by_name("InMemoryStore").is_some());
        assert!(!registry.is_primary(registry.by_name("InMemoryStore").unwrap()));
    }

    #[test]
    fn test_rejects_duplicates_and_missing_implementation() {
        let err = Registry::normalize(vec![
            Declaration::component::<InMemoryStore>(),
            Declaration::component::<DiskStore>().named("InMemoryStore"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateName { ref name } if name == "InMemoryStore"));

        let err = Registry::normalize(vec![
            Declaration::component::<InMemoryStore>(),
            Declaration::empty().named("ghost"),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingImplementation { index: 1, name: Some(ref n) } if n == "ghost"
        ));
    }

    #[test]
    fn test_reference_cycle_rejected() {
        let err = Registry::normalize(vec![
            Declaration::component::<A>(),
            Declaration::component::<B>(),
        ])
        .unwrap_err();
        match err {
            ConfigError::Cycle { path } => assert_eq!(path, vec!["A", "B", "A"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_nested_cycle_through_unregistered_types() {
        let err = Registry::normalize(vec![Declaration::component::<Left>()]).unwrap_err();
        assert_eq!(err.to_string(), "dependency cycle: Left -> Right -> Left");
    }

    #[test]
    fn test_builtins_registered_first() {
        let registry = Registry::with_builtins(Vec::new()).unwrap();
        assert!(registry.by_name("Scheduler").unwrap().is_process());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_check_config() {
        let registry = Registry::normalize(vec![Declaration::component::<Tuned>()]).unwrap();

        let ok = ConfigStore::from_value(json!({ "app": { "retries": 3 } }));
        registry.check_config(&ok).unwrap();
        registry.check_config(&ConfigStore::new()).unwrap();

        let bad = ConfigStore::from_value(json!({ "app": { "retries": true } }));
        let err = registry.check_config(&bad).unwrap_err();
        assert_eq!(err.as_label(), "config_scalar_mismatch");
    }

    #[test]
    fn test_check_config_follows_adhoc_nested_types() {
        let registry = Registry::normalize(vec![Declaration::component::<Holder>()]).unwrap();
        assert!(registry.by_name("Tuned").is_none());

        let ok = ConfigStore::from_value(json!({ "app": { "retries": 3 } }));
        registry.check_config(&ok).unwrap();

        let bad = ConfigStore::from_value(json!({ "app": { "retries": "three" } }));
        match registry.check_config(&bad).unwrap_err() {
            ConfigError::ScalarMismatch { component, key, found, .. } => {
                assert_eq!(component, "Tuned");
                assert_eq!(key, "app.retries");
                assert_eq!(found, "string");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
