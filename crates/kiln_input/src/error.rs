//! Error types for building and assembling compilation inputs.

use std::path::PathBuf;

/// Errors raised while building a layer or assembling a source tree.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// A file referenced with [`FileKind::Load`](crate::FileKind::Load) could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// An attachment destination is absolute or escapes the output directory.
    #[error("attachment destination '{dest}' must be a relative path inside the output directory")]
    InvalidAttachmentDest {
        /// The offending destination path.
        dest: PathBuf,
    },

    /// A variable name is empty or contains characters Sass does not allow.
    #[error("invalid variable name '{0}'")]
    InvalidVariableName(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_error_display() {
        let err = InputError::Read {
            path: PathBuf::from("theme/_base.scss"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        };
        let msg = err.to_string();
        assert!(msg.contains("failed to read"));
        assert!(msg.contains("_base.scss"));
    }

    #[test]
    fn invalid_dest_display() {
        let err = InputError::InvalidAttachmentDest {
            dest: PathBuf::from("../escape"),
        };
        assert!(err.to_string().contains("../escape"));
    }

    #[test]
    fn invalid_variable_display() {
        let err = InputError::InvalidVariableName("bad name".to_string());
        assert_eq!(err.to_string(), "invalid variable name 'bad name'");
    }
}
