//! Persistence substrate for the CacheWarden coordinator.
//!
//! The coordinator persists a small set of keys (the lifetime
//! injection counter, the domain whitelist, and two configuration
//! flags) through the [`KeyValueStore`] trait. Two implementations are
//! provided:
//!
//! - [`MemoryStore`] — ephemeral, used by tests and by hosts that
//!   manage persistence themselves;
//! - [`JsonFileStore`] — a single JSON document on disk, mirroring the
//!   flat key-value layout of the extension's local storage area.
//!
//! Both are safe to share across tasks behind an `Arc`. Completion
//! ordering across independent calls is not guaranteed and callers
//! must not rely on it; each call's own read-before-write sequencing
//! is the caller's responsibility.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod json_store;
mod store;

pub use json_store::JsonFileStore;
pub use store::{KeyValueStore, MemoryStore};

// Re-export the shared error types for convenience.
pub use common::{StorageError, StorageResult};
