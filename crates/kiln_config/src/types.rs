//! Configuration types deserialized from `kiln.toml`.

use std::path::PathBuf;

use kiln_common::ByteSize;
use kiln_input::{CompilerOptions, OutputStyle, WriteAttachments, DEFAULT_PRECISION};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};

use crate::env::default_cache_dir;
use crate::error::ConfigError;

/// The top-level configuration parsed from `kiln.toml`.
///
/// Every section is optional; an empty file is a valid configuration.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct KilnConfig {
    /// Cache location, toggle, and reporting limits.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Defaults for compilation requests.
    #[serde(default)]
    pub compile: CompileConfig,
    /// Log filtering.
    #[serde(default)]
    pub log: LogConfig,
}

/// The `[cache]` section.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct CacheConfig {
    /// Whether caching is on. Unset means "on unless stdin is a terminal".
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Cache directory. Unset means the per-user cache directory.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Size above which `kiln` reports the cache as over its limit.
    #[serde(default, deserialize_with = "deserialize_byte_size")]
    pub max_size: Option<ByteSize>,
    /// Entry count above which `kiln` reports the cache as over its limit.
    #[serde(default)]
    pub max_entries: Option<u64>,
}

/// The `[compile]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompileConfig {
    /// Output style.
    #[serde(default)]
    pub output_style: OutputStyle,
    /// Numeric precision.
    #[serde(default = "default_precision")]
    pub precision: u8,
    /// Directories searched for imports, in order.
    #[serde(default)]
    pub include_paths: Vec<PathBuf>,
    /// Attachment handling for file outputs.
    #[serde(default)]
    pub write_attachments: WriteAttachments,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            output_style: OutputStyle::default(),
            precision: DEFAULT_PRECISION,
            include_paths: Vec::new(),
            write_attachments: WriteAttachments::default(),
        }
    }
}

fn default_precision() -> u8 {
    DEFAULT_PRECISION
}

/// The `[log]` section.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct LogConfig {
    /// A `tracing` filter directive, e.g. `"warn"` or `"kiln_cache=debug"`.
    #[serde(default)]
    pub level: Option<String>,
}

impl KilnConfig {
    /// Resolves whether caching is on.
    ///
    /// An explicit `enabled` wins; otherwise caching is on only when the
    /// caller is not interactive.
    pub fn cache_enabled(&self, interactive: bool) -> bool {
        self.cache.enabled.unwrap_or(!interactive)
    }

    /// Resolves the cache directory.
    pub fn cache_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.cache.dir {
            Some(dir) => Ok(dir.clone()),
            None => default_cache_dir(),
        }
    }

    /// Builds compiler options from the `[compile]` section.
    pub fn compiler_options(&self) -> CompilerOptions {
        self.compile.include_paths.iter().fold(
            CompilerOptions::default()
                .with_output_style(self.compile.output_style)
                .with_precision(self.compile.precision),
            |options, path| options.with_include_path(path),
        )
    }
}

/// Deserializes a size given either as a string with a unit (`"40MB"`) or as
/// a plain byte count (`41943040`).
fn deserialize_byte_size<'de, D>(deserializer: D) -> Result<Option<ByteSize>, D::Error>
where
    D: Deserializer<'de>,
{
    struct SizeVisitor;

    impl<'de> Visitor<'de> for SizeVisitor {
        type Value = Option<ByteSize>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a size such as \"40MB\" or a byte count")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            v.parse::<ByteSize>().map(Some).map_err(E::custom)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(ByteSize::new(v)))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            u64::try_from(v)
                .map(|b| Some(ByteSize::new(b)))
                .map_err(|_| E::custom("size must not be negative"))
        }
    }

    deserializer.deserialize_any(SizeVisitor)
}
