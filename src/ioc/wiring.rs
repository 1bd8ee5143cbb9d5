//! # Injection tables.
//!
//! [`Wiring`] is the per-type registration table that stands in for runtime
//! type inspection: each entry is a (field identifier, policy, target) tuple plus
//! a setter. The container walks the table in declaration order.
//!
//! ## Policies
//! | Builder method                | Policy      | Target                      | Field receives     |
//! |-------------------------------|-------------|-----------------------------|--------------------|
//! | [`Wiring::nested`]            | `Nested`    | capability `V` (by value)   | a clone of `V`     |
//! | [`Wiring::reference`]         | `Reference` | capability `C`              | shared `Arc<C>`    |
//! | [`Wiring::reference_named`]   | `Reference` | component name              | shared `Arc<C>`    |
//! | [`Wiring::optional_reference`]| `Reference` | capability `C`, may be absent | `Arc<C>` or nothing |
//! | [`Wiring::value`]             | `Scalar`    | dotted configuration key    | `String`/int/`bool`|

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::component::{AppContext, Component};
use super::container::Session;
use super::descriptor::Blueprint;
use super::key::{Instance, TypeKey};
use crate::config::{Scalar, ScalarKind, describe};
use crate::error::{ConfigError, ResolveError};

/// How a field is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Resolve a component and copy its value in.
    Nested,
    /// Resolve a component and share it.
    Reference,
    /// Read a configuration key.
    Scalar,
}

/// What a dependency points at.
#[derive(Debug, Clone)]
pub(crate) enum DependencyTarget {
    Capability(TypeKey),
    Name(String),
}

impl fmt::Display for DependencyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyTarget::Capability(key) => write!(f, "{key}"),
            DependencyTarget::Name(name) => f.write_str(name),
        }
    }
}

/// A component-to-component edge, used for resolution and cycle checks.
#[derive(Clone)]
pub(crate) struct Dependency {
    pub(crate) field: &'static str,
    pub(crate) target: DependencyTarget,
    pub(crate) optional: bool,
    /// Builds the target when nothing is registered for it.
    pub(crate) adhoc: Option<fn() -> Blueprint>,
}

/// A configuration binding, checked against the store before launch.
#[derive(Clone)]
pub(crate) struct ScalarCheck {
    pub(crate) field: &'static str,
    pub(crate) key: String,
    pub(crate) expected: ScalarKind,
    pub(crate) accepts: fn(&Value) -> bool,
}

type AppSetter<T> = Box<dyn Fn(&mut T, AppContext) + Send + Sync>;
type InstanceSetter<T> = Box<dyn Fn(&mut T, &Instance) -> bool + Send + Sync>;
type ScalarSetter<T> = Box<dyn Fn(&mut T, &Value) -> bool + Send + Sync>;

enum Injection<T> {
    Dependency {
        dependency: Dependency,
        policy: Policy,
        expected: &'static str,
        set: InstanceSetter<T>,
    },
    Scalar {
        check: ScalarCheck,
        set: ScalarSetter<T>,
    },
}

/// One row of an injection table.
pub struct InjectionPoint<T> {
    field: &'static str,
    injection: Injection<T>,
}

impl<T> InjectionPoint<T> {
    /// Field identifier.
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Injection policy.
    pub fn policy(&self) -> Policy {
        match &self.injection {
            Injection::Dependency { policy, .. } => *policy,
            Injection::Scalar { .. } => Policy::Scalar,
        }
    }

    /// Target: capability type, component name or configuration key.
    pub fn target(&self) -> String {
        match &self.injection {
            Injection::Dependency { dependency, .. } => dependency.target.to_string(),
            Injection::Scalar { check, .. } => check.key.clone(),
        }
    }

    /// Whether a missing component leaves the field unset instead of failing.
    pub fn is_optional(&self) -> bool {
        matches!(&self.injection, Injection::Dependency { dependency, .. } if dependency.optional)
    }

    pub(crate) fn inject(
        &self,
        target: &mut T,
        component: &str,
        session: &mut Session<'_>,
    ) -> Result<(), ResolveError> {
        match &self.injection {
            Injection::Dependency {
                dependency,
                expected,
                set,
                ..
            } => {
                let resolved = match &dependency.target {
                    DependencyTarget::Capability(key) => {
                        session.resolve_capability(*key, dependency.adhoc)
                    }
                    DependencyTarget::Name(name) => session.resolve_named(name),
                };
                let instance = match resolved {
                    Ok(instance) => instance,
                    Err(ResolveError::NotRegistered { reference }) if dependency.optional => {
                        tracing::warn!(
                            component,
                            field = self.field,
                            %reference,
                            "optional dependency not registered; field left unset"
                        );
                        return Ok(());
                    }
                    Err(e) => return Err(e),
                };
                if set(target, &instance) {
                    Ok(())
                } else {
                    Err(ResolveError::TypeMismatch {
                        component: format!("{component}.{}", self.field),
                        expected,
                        found: instance.capability().name(),
                    })
                }
            }
            Injection::Scalar { check, set } => {
                let Some(value) = session.config().get(&check.key) else {
                    tracing::debug!(component, field = self.field, key = %check.key, "configuration key absent; default kept");
                    return Ok(());
                };
                if set(target, value) {
                    Ok(())
                } else {
                    Err(ConfigError::ScalarMismatch {
                        component: component.to_string(),
                        field: self.field,
                        key: check.key.clone(),
                        expected: check.expected,
                        found: describe(value),
                    }
                    .into())
                }
            }
        }
    }
}

/// Injection table of `T`, built by [`Component::wiring`].
pub struct Wiring<T> {
    app: Option<AppSetter<T>>,
    points: Vec<InjectionPoint<T>>,
}

impl<T: 'static> Default for Wiring<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Wiring<T> {
    /// Empty table.
    pub fn new() -> Self {
        Self {
            app: None,
            points: Vec::new(),
        }
    }

    /// Field that receives the [`AppContext`] before the construct hook runs.
    pub fn app(mut self, set: impl Fn(&mut T, AppContext) + Send + Sync + 'static) -> Self {
        self.app = Some(Box::new(set));
        self
    }

    /// Shares the component registered for capability `C`.
    pub fn reference<C: ?Sized + Send + Sync + 'static>(
        self,
        field: &'static str,
        set: impl Fn(&mut T, Arc<C>) + Send + Sync + 'static,
    ) -> Self {
        let target = DependencyTarget::Capability(TypeKey::of::<C>());
        self.dependency(field, target, false, Policy::Reference, None, set)
    }

    /// Shares the component registered under `name`, viewed as `C`.
    pub fn reference_named<C: ?Sized + Send + Sync + 'static>(
        self,
        field: &'static str,
        name: impl Into<String>,
        set: impl Fn(&mut T, Arc<C>) + Send + Sync + 'static,
    ) -> Self {
        let target = DependencyTarget::Name(name.into());
        self.dependency(field, target, false, Policy::Reference, None, set)
    }

    /// Like [`reference`](Self::reference), but a missing component is logged
    /// and the field keeps its default.
    pub fn optional_reference<C: ?Sized + Send + Sync + 'static>(
        self,
        field: &'static str,
        set: impl Fn(&mut T, Arc<C>) + Send + Sync + 'static,
    ) -> Self {
        let target = DependencyTarget::Capability(TypeKey::of::<C>());
        self.dependency(field, target, true, Policy::Reference, None, set)
    }

    /// Copies the value of component `V`; built ad hoc if `V` is not registered.
    pub fn nested<V: Component + Clone>(
        self,
        field: &'static str,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self {
        let target = DependencyTarget::Capability(TypeKey::of::<V>());
        let adhoc: fn() -> Blueprint = Blueprint::identity::<V>;
        self.dependency(
            field,
            target,
            false,
            Policy::Nested,
            Some(adhoc),
            move |t: &mut T, v: Arc<V>| set(t, V::clone(&v)),
        )
    }

    /// Reads `key` from the configuration and coerces it to `S`.
    pub fn value<S: Scalar>(
        mut self,
        field: &'static str,
        key: impl Into<String>,
        set: impl Fn(&mut T, S) + Send + Sync + 'static,
    ) -> Self {
        let check = ScalarCheck {
            field,
            key: key.into(),
            expected: S::KIND,
            accepts: accepts::<S>,
        };
        let set: ScalarSetter<T> = Box::new(move |t, value| match S::from_value(value) {
            Some(v) => {
                set(t, v);
                true
            }
            None => false,
        });
        self.points.push(InjectionPoint {
            field,
            injection: Injection::Scalar { check, set },
        });
        self
    }

    /// Declared injection points, in order.
    pub fn points(&self) -> &[InjectionPoint<T>] {
        &self.points
    }

    pub(crate) fn app_setter(&self) -> Option<&AppSetter<T>> {
        self.app.as_ref()
    }

    pub(crate) fn dependencies(&self) -> Vec<Dependency> {
        self.points
            .iter()
            .filter_map(|p| match &p.injection {
                Injection::Dependency { dependency, .. } => Some(dependency.clone()),
                Injection::Scalar { .. } => None,
            })
            .collect()
    }

    pub(crate) fn scalar_checks(&self) -> Vec<ScalarCheck> {
        self.points
            .iter()
            .filter_map(|p| match &p.injection {
                Injection::Scalar { check, .. } => Some(check.clone()),
                Injection::Dependency { .. } => None,
            })
            .collect()
    }

    fn dependency<C: ?Sized + Send + Sync + 'static>(
        mut self,
        field: &'static str,
        target: DependencyTarget,
        optional: bool,
        policy: Policy,
        adhoc: Option<fn() -> Blueprint>,
        set: impl Fn(&mut T, Arc<C>) + Send + Sync + 'static,
    ) -> Self {
        let set: InstanceSetter<T> = Box::new(move |t, instance| match instance.downcast::<C>() {
            Some(c) => {
                set(t, c);
                true
            }
            None => false,
        });
        self.points.push(InjectionPoint {
            field,
            injection: Injection::Dependency {
                dependency: Dependency {
                    field,
                    target,
                    optional,
                    adhoc,
                },
                policy,
                expected: std::any::type_name::<C>(),
                set,
            },
        });
        self
    }
}

fn accepts<S: Scalar>(value: &Value) -> bool {
    S::from_value(value).is_some()
}
