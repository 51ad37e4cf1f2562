//! Key-value store trait and the in-memory implementation.

use async_trait::async_trait;
use common::StorageResult;
use dashmap::DashMap;
use serde_json::Value;

/// Asynchronous key-value persistence substrate.
///
/// Keys are flat strings; values are arbitrary JSON. Reads of missing
/// keys return `Ok(None)` rather than an error, matching the host
/// storage API the coordinator was written against.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> StorageResult<Option<Value>>;

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// The returned future resolves once the write has been
    /// acknowledged by the backing store.
    async fn set(&self, key: &str, value: Value) -> StorageResult<()>;
}

/// Ephemeral in-memory store.
///
/// Used by the test suites and by embedding hosts that persist state
/// through their own channel. Values survive only for the lifetime of
/// the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Value>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an initial value, for test setup.
    pub fn with_entry<S: Into<String>>(self, key: S, value: Value) -> Self {
        self.entries.insert(key.into(), value);
        self
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, value: Value) -> StorageResult<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}
