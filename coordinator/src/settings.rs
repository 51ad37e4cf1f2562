//! Process-wide configuration flags.
//!
//! Both flags are loaded once from persistence at startup and mutated
//! only by the settings reactor in response to config-store change
//! notifications. There is no other writer.

use common::keys;
use parking_lot::RwLock;
use serde_json::Value;
use storage::KeyValueStore;

/// Runtime configuration flags of the coordinator.
#[derive(Debug)]
pub struct Settings {
    flags: RwLock<Flags>,
}

#[derive(Debug, Clone, Copy)]
struct Flags {
    show_icon_badge: bool,
    strip_metadata: bool,
}

impl Default for Settings {
    fn default() -> Self {
        // Both features ship enabled; persistence only ever turns
        // them off.
        Self {
            flags: RwLock::new(Flags {
                show_icon_badge: true,
                strip_metadata: true,
            }),
        }
    }
}

impl Settings {
    /// Create settings with the shipped defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load both flags from the persistence substrate.
    ///
    /// Missing keys and read failures fall back to the defaults; a
    /// broken store must not keep the coordinator from starting.
    pub async fn load(&self, store: &dyn KeyValueStore) {
        let show_icon_badge = read_flag(store, keys::SHOW_ICON_BADGE, true).await;
        let strip_metadata = read_flag(store, keys::STRIP_METADATA, true).await;

        let mut flags = self.flags.write();
        flags.show_icon_badge = show_icon_badge;
        flags.strip_metadata = strip_metadata;
    }

    /// Whether the badge counter is shown on the toolbar icon.
    pub fn show_icon_badge(&self) -> bool {
        self.flags.read().show_icon_badge
    }

    /// Whether outgoing `Origin`/`Referer` headers are stripped.
    pub fn strip_metadata(&self) -> bool {
        self.flags.read().strip_metadata
    }

    /// Set the badge visibility flag.
    pub fn set_show_icon_badge(&self, enabled: bool) {
        self.flags.write().show_icon_badge = enabled;
    }

    /// Set the header-stripping flag.
    pub fn set_strip_metadata(&self, enabled: bool) {
        self.flags.write().strip_metadata = enabled;
    }
}

async fn read_flag(store: &dyn KeyValueStore, key: &str, default: bool) -> bool {
    match store.get(key).await {
        Ok(value) => value.as_ref().and_then(Value::as_bool).unwrap_or(default),
        Err(e) => {
            tracing::warn!(key, error = %e, "Failed to load flag, using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use storage::MemoryStore;

    #[test]
    fn test_defaults_enabled() {
        let settings = Settings::new();
        assert!(settings.show_icon_badge());
        assert!(settings.strip_metadata());
    }

    #[tokio::test]
    async fn test_load_from_store() {
        let store = MemoryStore::new()
            .with_entry(keys::SHOW_ICON_BADGE, json!(false))
            .with_entry(keys::STRIP_METADATA, json!(true));

        let settings = Settings::new();
        settings.load(&store).await;

        assert!(!settings.show_icon_badge());
        assert!(settings.strip_metadata());
    }

    #[tokio::test]
    async fn test_missing_keys_keep_defaults() {
        let settings = Settings::new();
        settings.load(&MemoryStore::new()).await;

        assert!(settings.show_icon_badge());
        assert!(settings.strip_metadata());
    }

    #[test]
    fn test_mutation() {
        let settings = Settings::new();
        settings.set_show_icon_badge(false);
        settings.set_strip_metadata(false);
        assert!(!settings.show_icon_badge());
        assert!(!settings.strip_metadata());
    }
}
