//! The compiler engine boundary.
//!
//! An [`Engine`] turns an assembled [`SourceTree`] into CSS text. Engines are
//! treated as pure functions: the same tree and options always produce the
//! same output, which is what makes their results cacheable. The
//! [`GrassEngine`] adapter is backed by the `grass` crate.

#![warn(missing_docs)]

pub mod error;
pub mod format;
pub mod grass_engine;

pub use error::{EngineError, SourceLocation};
pub use grass_engine::{GrassEngine, GRASS_VERSION};

use kiln_input::{CompilerOptions, SourceTree};

/// A Sass-to-CSS compiler.
pub trait Engine: Send + Sync {
    /// Returns the identifier mixed into cache keys.
    ///
    /// Must change whenever the engine's output for a given input might
    /// change.
    fn identifier(&self) -> String;

    /// Compiles a source tree into CSS text.
    fn compile(&self, tree: &SourceTree, options: &CompilerOptions) -> Result<String, EngineError>;
}
