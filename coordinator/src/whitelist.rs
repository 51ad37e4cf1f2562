//! Persisted domain whitelist.
//!
//! The coordinator only stores the set; deciding whether a domain's
//! requests are exempt from substitution is the analyzer's job.
//! Membership alone carries meaning. The persisted form is a
//! `{domain: true}` map for compatibility with the extension's
//! storage schema, entries are only ever inserted or deleted.

use common::{keys, StorageResult};
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use storage::KeyValueStore;

/// In-memory whitelist with write-through persistence.
#[derive(Debug, Default)]
pub struct WhitelistManager {
    domains: RwLock<BTreeSet<String>>,
}

impl WhitelistManager {
    /// Create an empty whitelist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prime the set from the persistence substrate.
    ///
    /// Values in the stored map are ignored; only key membership
    /// matters. Read failures leave the set empty, logged but not
    /// fatal.
    pub async fn load(&self, store: &dyn KeyValueStore) {
        let loaded = match store.get(keys::WHITELISTED_DOMAINS).await {
            Ok(Some(Value::Object(map))) => map.keys().cloned().collect(),
            Ok(_) => BTreeSet::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load whitelist, starting empty");
                BTreeSet::new()
            }
        };

        *self.domains.write() = loaded;
    }

    /// Add `domain` and persist the full set.
    ///
    /// Resolves once the write is acknowledged. No domain-syntax
    /// validation happens here.
    ///
    /// # Errors
    ///
    /// Returns the storage error when the write fails; the in-memory
    /// set keeps the new entry either way.
    pub async fn add(&self, domain: &str, store: &dyn KeyValueStore) -> StorageResult<()> {
        let snapshot = {
            let mut domains = self.domains.write();
            domains.insert(domain.to_string());
            persisted_form(&domains)
        };

        store.set(keys::WHITELISTED_DOMAINS, snapshot).await
    }

    /// Delete `domain` and persist the full set.
    ///
    /// Deletion, not a false-valued entry: an absent key is the only
    /// representation of "not whitelisted".
    ///
    /// # Errors
    ///
    /// Returns the storage error when the write fails.
    pub async fn delete(&self, domain: &str, store: &dyn KeyValueStore) -> StorageResult<()> {
        let snapshot = {
            let mut domains = self.domains.write();
            domains.remove(domain);
            persisted_form(&domains)
        };

        store.set(keys::WHITELISTED_DOMAINS, snapshot).await
    }

    /// Whether `domain` is in the set.
    pub fn contains(&self, domain: &str) -> bool {
        self.domains.read().contains(domain)
    }

    /// All whitelisted domains, sorted.
    pub fn domains(&self) -> Vec<String> {
        self.domains.read().iter().cloned().collect()
    }
}

fn persisted_form(domains: &BTreeSet<String>) -> Value {
    let map: serde_json::Map<String, Value> = domains
        .iter()
        .map(|domain| (domain.clone(), json!(true)))
        .collect();
    Value::Object(map)
}
