//! Compilation inputs and compiler options for the Kiln Sass front-end.
//!
//! A [`SassInput`] is an ordered list of [`Fragment`]s (raw text, variable
//! maps, file references, and layers carrying file attachments). Assembling
//! an input produces the [`SourceTree`] handed to the compiler engine.
//! [`CompilerOptions`] is the immutable option record that, together with the
//! input, determines the compiled CSS.

#![warn(missing_docs)]

pub mod error;
pub mod fragment;
pub mod options;
pub mod source;

pub use error::InputError;
pub use fragment::{Attachment, FileKind, FileRef, Fragment, Layer, SassInput, VariableMap};
pub use options::{
    CompilerOptions, IndentType, Linefeed, OutputStyle, SourceMapMode, DEFAULT_INDENT_WIDTH,
    DEFAULT_PRECISION, MAX_INDENT_WIDTH, MAX_PRECISION, WriteAttachments,
};
pub use source::SourceTree;
