//! Content-addressed compilation cache.
//!
//! A [`CacheKey`] is derived from a compilation input, its options, and the
//! engine version by the [`fingerprint`] module, including the
//! content of every file the input imports ([`imports`]). Compiled CSS is stored under
//! that key in a flat directory through [`EntryStore`], which publishes each
//! entry with an atomic rename so concurrent readers never observe partial
//! content. [`CssCache`] is the handle callers open once and share.

#![warn(missing_docs)]

pub mod cache;
pub mod entry;
pub mod error;
pub mod fingerprint;
pub mod imports;
pub mod key;
pub mod store;

pub use cache::{CacheLimits, CacheStats, CssCache, LimitViolation, SessionStats};
pub use entry::EntryHeader;
pub use error::CacheError;
pub use fingerprint::{fingerprint, Fingerprinter};
pub use imports::{dependencies, Dependency};
pub use key::CacheKey;
pub use store::EntryStore;
