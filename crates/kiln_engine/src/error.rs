//! Errors reported by compiler engines.

use std::fmt;

/// A position in the compiled source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// File the error was found in, when the engine reports one.
    pub file: Option<String>,
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{file}:{}:{}", self.line, self.column),
            None => write!(f, "{}:{}", self.line, self.column),
        }
    }
}

/// A compilation failure, surfaced to callers verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}{}", .location.as_ref().map(|l| format!(" at {l}")).unwrap_or_default())]
pub struct EngineError {
    /// The engine's message.
    pub message: String,
    /// Where the error occurred, if known.
    pub location: Option<SourceLocation>,
}

impl EngineError {
    /// Creates an error without a location.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
        }
    }

    /// Attaches a location.
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}
