//! Configuration: the read-only value store, scalar coercion and file loading.
//!
//! ## Contents
//! - [`ConfigStore`] dotted-key access over the loaded value tree
//! - [`Scalar`], [`ScalarKind`] strict coercion used by configuration injection
//! - [`load`] TOML loading with `{env}` substitution and imports
//! - [`ApplicationSettings`], [`LogSettings`] typed sections

mod loader;
mod scalar;
mod store;

pub use loader::{
    ApplicationSettings, DEFAULT_ENV, ENV_PLACEHOLDER, LogSettings, config_path, load,
};
pub use scalar::{Scalar, ScalarKind, describe};
pub use store::ConfigStore;
