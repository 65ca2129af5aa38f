//! Loading of `kiln.toml` configuration and its environment overrides.
//!
//! The configuration is plain data: callers load it once, apply
//! [`EnvOverrides`], and pass the resulting values on explicitly.

#![warn(missing_docs)]

pub mod env;
pub mod error;
pub mod loader;
pub mod types;

pub use env::{stdin_is_interactive, EnvOverrides};
pub use error::ConfigError;
pub use loader::{discover_config, load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use types::*;
