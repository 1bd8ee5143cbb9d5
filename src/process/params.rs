//! # Typed process parameters.
//!
//! Every process kind declares the parameters it accepts through
//! [`Process::params`](super::Process::params). The table is checked against
//! each [`ProcessSpec`] before anything launches, so a mistyped or unknown
//! parameter aborts startup with a [`ConfigError`] instead of failing at use.
//!
//! ```rust
//! # use bootvisor::Params;
//! #[derive(Default)]
//! struct Http { port: u16, host: String }
//!
//! let params = Params::<Http>::new()
//!     .required("port", |h, p: u16| h.port = p)
//!     .field("host", |h, v: String| h.host = v);
//! # let _ = params;
//! ```

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::spec::ProcessSpec;
use crate::error::ConfigError;

type Apply<T> = Box<dyn Fn(&mut T, &Value) -> Result<(), String> + Send + Sync>;

struct Param<T> {
    name: &'static str,
    required: bool,
    check: fn(&Value) -> Result<(), String>,
    apply: Apply<T>,
}

/// Parameter table of process kind `T`.
pub struct Params<T> {
    params: Vec<Param<T>>,
}

impl<T: 'static> Default for Params<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Params<T> {
    /// Empty table: the process accepts no parameters.
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Optional parameter; when absent the field keeps its value.
    pub fn field<V: DeserializeOwned + 'static>(
        self,
        name: &'static str,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self {
        self.push(name, false, set)
    }

    /// Parameter that every spec of this kind must provide.
    pub fn required<V: DeserializeOwned + 'static>(
        self,
        name: &'static str,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self {
        self.push(name, true, set)
    }

    /// Declared parameter names.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.params.iter().map(|p| p.name)
    }

    /// Checks a spec's parameter table without touching any instance.
    pub fn validate(&self, spec: &ProcessSpec) -> Result<(), ConfigError> {
        if let Some(unknown) = spec
            .params()
            .keys()
            .find(|key| !self.params.iter().any(|p| p.name == key.as_str()))
        {
            return Err(ConfigError::UnknownParam {
                process: spec.name().to_string(),
                param: unknown.clone(),
            });
        }
        for param in &self.params {
            match spec.params().get(param.name) {
                Some(value) => {
                    (param.check)(value).map_err(|reason| ConfigError::InvalidParam {
                        process: spec.name().to_string(),
                        param: param.name,
                        reason,
                    })?
                }
                None if param.required => {
                    return Err(ConfigError::MissingParam {
                        process: spec.name().to_string(),
                        param: param.name,
                    });
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Writes every present parameter into `target`.
    pub fn apply(&self, target: &mut T, spec: &ProcessSpec) -> Result<(), ConfigError> {
        for param in &self.params {
            let Some(value) = spec.params().get(param.name) else {
                continue;
            };
            (param.apply)(target, value).map_err(|reason| ConfigError::InvalidParam {
                process: spec.name().to_string(),
                param: param.name,
                reason,
            })?;
        }
        Ok(())
    }

    fn push<V: DeserializeOwned + 'static>(
        mut self,
        name: &'static str,
        required: bool,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self {
        let apply: Apply<T> = Box::new(move |target, value| {
            let v = V::deserialize(value).map_err(|e| e.to_string())?;
            set(target, v);
            Ok(())
        });
        self.params.push(Param {
            name,
            required,
            check: check::<V>,
            apply,
        });
        self
    }
}

fn check<V: DeserializeOwned>(value: &Value) -> Result<(), String> {
    V::deserialize(value).map(drop).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Http {
        port: u16,
        host: String,
    }

    fn table() -> Params<Http> {
        Params::new()
            .required("port", |h: &mut Http, p: u16| h.port = p)
            .field("host", |h: &mut Http, v: String| h.host = v)
    }

    #[test]
    fn test_apply_sets_fields() {
        let spec = ProcessSpec::new("http", "Http").with_param("port", 8080);
        table().validate(&spec).unwrap();

        let mut http = Http {
            host: "0.0.0.0".into(),
            ..Http::default()
        };
        table().apply(&mut http, &spec).unwrap();
        assert_eq!(http.port, 8080);
        assert_eq!(http.host, "0.0.0.0");
    }

    #[test]
    fn test_rejects_bad_tables() {
        let missing = ProcessSpec::new("http", "Http");
        assert_eq!(
            table().validate(&missing).unwrap_err().as_label(),
            "config_missing_param"
        );

        let unknown = ProcessSpec::new("http", "Http")
            .with_param("port", 1)
            .with_param("tls", true);
        assert_eq!(
            table().validate(&unknown).unwrap_err().as_label(),
            "config_unknown_param"
        );

        let mistyped = ProcessSpec::new("http", "Http").with_param("port", "eighty");
        assert_eq!(
            table().validate(&mistyped).unwrap_err().as_label(),
            "config_invalid_param"
        );
    }
}
