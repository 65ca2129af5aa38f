//! Cached compilation of Sass inputs.
//!
//! [`Compiler::run`] decides, per request, whether a cached result can be
//! reused. On a miss it assembles the input, invokes the [`Engine`], and
//! stores the result. Cache faults never fail a request; they are reported
//! as [`Notice`]s in the [`RunReport`].
//!
//! [`Engine`]: kiln_engine::Engine

#![warn(missing_docs)]

pub mod attach;
pub mod compiler;
pub mod error;
pub mod notice;

pub use compiler::{CacheStatus, CompileRequest, Compiled, Compiler, CssText, Output, RunReport};
pub use error::BuildError;
pub use kiln_input::WriteAttachments;
pub use notice::Notice;
