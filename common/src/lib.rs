//! Shared types for the CacheWarden coordinator workspace.
//!
//! This crate holds the value types exchanged between the host event
//! bridge, the state coordinator, and the persistence layer, plus the
//! error taxonomy used across all of them. It has no runtime
//! dependencies of its own so every other crate can depend on it.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod errors;
pub mod values;

pub use errors::{
    CoordinatorError, CoordinatorResult, StorageError, StorageResult,
};
pub use values::{
    host_url_pattern, keys, HttpHeader, Injection, RequestId, StorageChange, StorageChanges,
    TabId, TOP_LEVEL_FRAME,
};
