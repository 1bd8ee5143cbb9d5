//! # Scalar coercion for configuration injection.
//!
//! A field bound to a configuration key must be a string, an integer or a boolean.
//! Coercion is strict: a configured `3` never turns into `true`, and `"3"` never
//! turns into `3`.

use std::fmt;

use serde_json::Value;

/// Scalar type declared by an injected field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    /// UTF-8 string.
    String,
    /// Signed or unsigned integer (range checked against the field type).
    Integer,
    /// Boolean.
    Boolean,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKind::String => f.write_str("string"),
            ScalarKind::Integer => f.write_str("integer"),
            ScalarKind::Boolean => f.write_str("boolean"),
        }
    }
}

/// A field type that can be filled from a configured value.
pub trait Scalar: Sized + Send + 'static {
    /// Kind reported in mismatch errors.
    const KIND: ScalarKind;

    /// Converts a configured value, or `None` if it has the wrong type.
    fn from_value(value: &Value) -> Option<Self>;
}

impl Scalar for String {
    const KIND: ScalarKind = ScalarKind::String;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

impl Scalar for bool {
    const KIND: ScalarKind = ScalarKind::Boolean;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

macro_rules! integer_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Scalar for $ty {
                const KIND: ScalarKind = ScalarKind::Integer;

                fn from_value(value: &Value) -> Option<Self> {
                    if let Some(n) = value.as_i64() {
                        return <$ty>::try_from(n).ok();
                    }
                    value.as_u64().and_then(|n| <$ty>::try_from(n).ok())
                }
            }
        )*
    };
}

integer_scalar!(i32, i64, u16, u32, u64, usize);

/// Human-readable kind of a configured value, used in error messages.
pub fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "table",
    }
}
