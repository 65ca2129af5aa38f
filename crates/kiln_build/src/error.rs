//! Errors that abort a compilation request.

use std::path::PathBuf;

use kiln_engine::EngineError;
use kiln_input::InputError;

/// A failed compilation request.
///
/// Configuration errors are raised before any cache or engine work.
/// Cache problems are never errors; see [`Notice`](crate::Notice).
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The compiler options are out of range.
    #[error("invalid compiler options: {0}")]
    InvalidOptions(String),

    /// The directory of the requested output file does not exist.
    #[error("output directory {} does not exist", .0.display())]
    MissingOutputDir(PathBuf),

    /// Attachments were requested without a file output to place them next to.
    #[error("writing attachments requires an output file")]
    AttachmentsWithoutOutput,

    /// The input could not be assembled.
    #[error(transparent)]
    Input(#[from] InputError),

    /// The engine rejected the source.
    #[error("{0}")]
    Compile(#[from] EngineError),

    /// Writing the output or an attachment failed.
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        /// The path being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_is_verbatim() {
        let err = BuildError::from(EngineError::new("Undefined variable."));
        assert_eq!(err.to_string(), "Undefined variable.");
    }

    #[test]
    fn missing_output_dir_display() {
        let err = BuildError::MissingOutputDir(PathBuf::from("/no/such/dir"));
        assert_eq!(err.to_string(), "output directory /no/such/dir does not exist");
    }
}
