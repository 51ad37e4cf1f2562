//! Lifetime injection counter.
//!
//! A persisted integer counting substitution events across all tabs
//! and sessions. It deliberately counts *events*, not distinct
//! libraries: a duplicate registration in the same tab still
//! increments it.

use common::keys;
use serde_json::json;
use storage::KeyValueStore;
use tokio::sync::Mutex;

/// Monotonic counter persisted under `amountInjected`.
///
/// The persisted value is read exactly once, on the first recorded
/// injection of the process lifetime; from then on the in-memory value
/// is authoritative and each increment is written back. The mutex is
/// the one-time initialization gate: a second registration arriving
/// while the first is still loading waits instead of issuing a second
/// read.
#[derive(Debug, Default)]
pub struct InjectedCounter {
    total: Mutex<Option<u64>>,
}

impl InjectedCounter {
    /// Create an unloaded counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one substitution event and persist the new total.
    ///
    /// Persistence failures are absorbed: the in-memory total keeps
    /// counting for the remainder of the runtime lifetime and the next
    /// successful write catches the store up.
    pub async fn record(&self, store: &dyn KeyValueStore) -> u64 {
        let mut total = self.total.lock().await;

        let current = match *total {
            Some(value) => value,
            None => match store.get(keys::AMOUNT_INJECTED).await {
                Ok(value) => value.as_ref().and_then(serde_json::Value::as_u64).unwrap_or(0),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to load injection counter, starting at 0");
                    0
                }
            },
        };

        let next = current + 1;
        *total = Some(next);

        if let Err(e) = store.set(keys::AMOUNT_INJECTED, json!(next)).await {
            tracing::warn!(error = %e, total = next, "Failed to persist injection counter");
        }

        next
    }

    /// Current in-memory total, or None before the first record.
    pub async fn value(&self) -> Option<u64> {
        *self.total.lock().await
    }
}
