//! Environment overrides and per-user defaults.

use std::io::IsTerminal;
use std::path::PathBuf;

use directories::{BaseDirs, ProjectDirs};

use crate::error::ConfigError;
use crate::types::KilnConfig;

/// Turns caching on or off (`1/true/yes/on`, `0/false/no/off`).
pub const ENV_CACHE: &str = "KILN_CACHE";

/// Overrides the cache directory.
pub const ENV_CACHE_DIR: &str = "KILN_CACHE_DIR";

/// A `tracing` filter directive for log output.
pub const ENV_LOG: &str = "KILN_LOG";

/// Overrides read from the environment.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EnvOverrides {
    /// Raw `KILN_CACHE` value.
    pub cache: Option<String>,
    /// `KILN_CACHE_DIR` value.
    pub cache_dir: Option<PathBuf>,
    /// `KILN_LOG` value.
    pub log: Option<String>,
}

impl EnvOverrides {
    /// Reads the overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the overrides through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v: &String| !v.trim().is_empty());
        Self {
            cache: non_empty(ENV_CACHE),
            cache_dir: non_empty(ENV_CACHE_DIR).map(PathBuf::from),
            log: non_empty(ENV_LOG),
        }
    }

    /// Applies the overrides on top of `config`.
    pub fn apply(&self, config: &mut KilnConfig) -> Result<(), ConfigError> {
        if let Some(raw) = &self.cache {
            config.cache.enabled = Some(parse_bool(raw).ok_or_else(|| {
                ConfigError::ValidationError(format!("{ENV_CACHE}: expected a boolean, got '{raw}'"))
            })?);
        }
        if let Some(dir) = &self.cache_dir {
            config.cache.dir = Some(dir.clone());
        }
        if let Some(level) = &self.log {
            config.log.level = Some(level.clone());
        }
        Ok(())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Returns `true` when stdin is attached to a terminal.
pub fn stdin_is_interactive() -> bool {
    std::io::stdin().is_terminal()
}

/// Returns the per-user cache directory for Kiln.
pub fn default_cache_dir() -> Result<PathBuf, ConfigError> {
    if let Some(dirs) = ProjectDirs::from("", "", "kiln") {
        return Ok(dirs.cache_dir().to_path_buf());
    }
    BaseDirs::new()
        .map(|base| base.cache_dir().join("kiln"))
        .ok_or(ConfigError::NoCacheDir)
}
