//! Per-tab injection state.
//!
//! The registry owns one record per tracked tab, keyed by the host's
//! opaque tab identifier. Records are created when a tab is created or
//! first observed, have their injection set cleared on every top-level
//! navigation commit, and are destroyed when the tab closes. Every
//! mutation re-checks existence: host events for a given tab can keep
//! arriving after its removal.

use common::{CoordinatorError, CoordinatorResult, Injection, TabId};
use dashmap::DashMap;
use std::collections::HashMap;

/// State tracked for one open tab.
#[derive(Debug, Default)]
struct TabRecord {
    /// Active injections keyed by their de-duplication identity.
    injections: HashMap<String, Injection>,
}

/// Registry of all tracked tabs.
#[derive(Debug, Default)]
pub struct TabRegistry {
    tabs: DashMap<TabId, TabRecord>,
}

impl TabRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an empty record for `tab_id`.
    ///
    /// Re-creating an existing tab replaces its state; the host only
    /// reuses identifiers for genuinely fresh tabs.
    pub fn create(&self, tab_id: TabId) {
        self.tabs.insert(tab_id, TabRecord::default());
    }

    /// Delete the record for `tab_id`. Returns false when the tab was
    /// not tracked.
    pub fn remove(&self, tab_id: TabId) -> bool {
        self.tabs.remove(&tab_id).is_some()
    }

    /// Whether a record exists for `tab_id`.
    pub fn contains(&self, tab_id: TabId) -> bool {
        self.tabs.contains_key(&tab_id)
    }

    /// Clear the injection set of `tab_id`, keeping the record.
    ///
    /// Returns false when the tab is not tracked, which is not an
    /// error: navigation commits are delivered for tabs the registry
    /// never observed.
    pub fn clear_injections(&self, tab_id: TabId) -> bool {
        match self.tabs.get_mut(&tab_id) {
            Some(mut record) => {
                record.injections.clear();
                true
            }
            None => false,
        }
    }

    /// Record an injection in `tab_id`, returning the tab's new
    /// distinct-injection count.
    ///
    /// Inserting an identical (source, path, version) key overwrites
    /// in place, so repeats leave the count unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::MissingTab`] when the tab closed or
    /// was never tracked.
    pub fn record_injection(
        &self,
        tab_id: TabId,
        injection: Injection,
    ) -> CoordinatorResult<usize> {
        let mut record = self
            .tabs
            .get_mut(&tab_id)
            .ok_or(CoordinatorError::MissingTab { tab_id })?;

        record.injections.insert(injection.key(), injection);
        Ok(record.injections.len())
    }

    /// Number of distinct injections in `tab_id`, or None when
    /// untracked.
    pub fn injection_count(&self, tab_id: TabId) -> Option<usize> {
        self.tabs.get(&tab_id).map(|record| record.injections.len())
    }

    /// Identifiers of all tracked tabs.
    pub fn tab_ids(&self) -> Vec<TabId> {
        self.tabs.iter().map(|entry| *entry.key()).collect()
    }

    /// Number of tracked tabs.
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    /// Whether any tabs are tracked.
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jquery() -> Injection {
        Injection::new("ajax.googleapis.com", "jquery/3.3.1/jquery.min.js", "3.3.1")
    }

    #[test]
    fn test_duplicate_key_counts_once() {
        let registry = TabRegistry::new();
        registry.create(TabId(7));

        assert_eq!(registry.record_injection(TabId(7), jquery()).unwrap(), 1);
        assert_eq!(registry.record_injection(TabId(7), jquery()).unwrap(), 1);

        let other = Injection::new("cdnjs.cloudflare.com", "angular/1.7.5/angular.min.js", "1.7.5");
        assert_eq!(registry.record_injection(TabId(7), other).unwrap(), 2);
    }

    #[test]
    fn test_missing_tab_rejected() {
        let registry = TabRegistry::new();
        let result = registry.record_injection(TabId(9), jquery());
        assert!(matches!(result, Err(CoordinatorError::MissingTab { tab_id: TabId(9) })));
    }

    #[test]
    fn test_clear_keeps_record() {
        let registry = TabRegistry::new();
        registry.create(TabId(7));
        registry.record_injection(TabId(7), jquery()).unwrap();

        assert!(registry.clear_injections(TabId(7)));
        assert!(registry.contains(TabId(7)));
        assert_eq!(registry.injection_count(TabId(7)), Some(0));
    }

    #[test]
    fn test_clear_untracked_is_noop() {
        let registry = TabRegistry::new();
        assert!(!registry.clear_injections(TabId(3)));
    }

    #[test]
    fn test_recreate_replaces_state() {
        let registry = TabRegistry::new();
        registry.create(TabId(7));
        registry.record_injection(TabId(7), jquery()).unwrap();

        registry.create(TabId(7));
        assert_eq!(registry.injection_count(TabId(7)), Some(0));
    }

    #[test]
    fn test_remove() {
        let registry = TabRegistry::new();
        registry.create(TabId(7));
        assert!(registry.remove(TabId(7)));
        assert!(!registry.remove(TabId(7)));
        assert!(registry.is_empty());
    }
}
