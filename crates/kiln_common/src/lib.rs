//! Shared foundational types used across the Kiln Sass front-end.
//!
//! This crate provides content hashing (one-shot and streaming) and
//! human-readable byte sizes used for cache limits.

#![warn(missing_docs)]

pub mod hash;
pub mod size;

pub use hash::{ContentHash, ContentHasher};
pub use size::{ByteSize, ParseByteSizeError};
