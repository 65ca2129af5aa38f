//! Configuration file loading and validation.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::types::KilnConfig;

/// Name of the configuration file looked up in a project directory.
pub const CONFIG_FILE_NAME: &str = "kiln.toml";

/// Loads and validates a configuration file.
pub fn load_config(path: &Path) -> Result<KilnConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `kiln.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<KilnConfig, ConfigError> {
    let config: KilnConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Loads `<dir>/kiln.toml` when it exists, or the default configuration.
///
/// Returns the path that was loaded alongside the configuration.
pub fn discover_config(dir: &Path) -> Result<(KilnConfig, Option<PathBuf>), ConfigError> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.is_file() {
        return Ok((KilnConfig::default(), None));
    }
    let config = load_config(&path)?;
    Ok((config, Some(path)))
}

/// Checks value ranges that the TOML types alone cannot express.
fn validate_config(config: &KilnConfig) -> Result<(), ConfigError> {
    config
        .compiler_options()
        .validate()
        .map_err(|e| ConfigError::ValidationError(format!("[compile] {e}")))?;
    if config.cache.max_entries == Some(0) {
        return Err(ConfigError::ValidationError(
            "[cache] max_entries must be at least 1".to_string(),
        ));
    }
    if config
        .cache
        .dir
        .as_ref()
        .is_some_and(|d| d.as_os_str().is_empty())
    {
        return Err(ConfigError::ValidationError(
            "[cache] dir must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_common::ByteSize;
    use kiln_input::{OutputStyle, WriteAttachments};

    #[test]
    fn parse_empty_config() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config, KilnConfig::default());
        assert_eq!(config.compile.precision, 5);
        assert_eq!(config.compile.write_attachments, WriteAttachments::WarnOnly);
        assert!(config.cache.enabled.is_none());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[cache]
enabled = true
dir = "/var/cache/kiln"
max_size = "40MB"
max_entries = 1000

[compile]
output_style = "compressed"
precision = 8
include_paths = ["scss", "vendor/scss"]
write_attachments = "always"

[log]
level = "debug"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.cache.enabled, Some(true));
        assert_eq!(config.cache.dir, Some(PathBuf::from("/var/cache/kiln")));
        assert_eq!(config.cache.max_size, Some(ByteSize::new(40 * 1024 * 1024)));
        assert_eq!(config.cache.max_entries, Some(1000));
        assert_eq!(config.compile.output_style, OutputStyle::Compressed);
        assert_eq!(config.compile.include_paths.len(), 2);
        assert_eq!(config.compile.write_attachments, WriteAttachments::Always);
        assert_eq!(config.log.level.as_deref(), Some("debug"));

        let options = config.compiler_options();
        assert_eq!(options.output_style(), OutputStyle::Compressed);
        assert_eq!(options.precision(), 8);
        assert_eq!(options.include_paths()[1], PathBuf::from("vendor/scss"));
    }

    #[test]
    fn max_size_as_integer() {
        let config = load_config_from_str("[cache]\nmax_size = 2048\n").unwrap();
        assert_eq!(config.cache.max_size, Some(ByteSize::new(2048)));
    }

    #[test]
    fn bad_max_size_errors() {
        let err = load_config_from_str("[cache]\nmax_size = \"lots\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn unknown_attachment_mode_errors() {
        let err = load_config_from_str("[compile]\nwrite_attachments = \"sometimes\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn precision_out_of_range_errors() {
        let err = load_config_from_str("[compile]\nprecision = 20\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn zero_max_entries_errors() {
        let err = load_config_from_str("[cache]\nmax_entries = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn discover_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let (config, path) = discover_config(dir.path()).unwrap();
        assert_eq!(config, KilnConfig::default());
        assert!(path.is_none());
    }

    #[test]
    fn discover_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[cache]\nenabled = false\n").unwrap();
        let (config, path) = discover_config(dir.path()).unwrap();
        assert_eq!(config.cache.enabled, Some(false));
        assert_eq!(path, Some(dir.path().join(CONFIG_FILE_NAME)));
    }

    #[test]
    fn io_error_from_nonexistent_file() {
        let err = load_config(Path::new("/nonexistent/dir/kiln.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
