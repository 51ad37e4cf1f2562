//! Central state coordinator.
//!
//! Owns the tab registry, the request correlator, the configuration
//! flags, the whitelist, and the lifetime counter, and issues host
//! commands through the [`HostBridge`] seam. All operations are safe
//! to call in any interleaving the host produces: tab removal between
//! a request's start and its redirect is the normal case, not an edge
//! case.

use crate::counter::InjectedCounter;
use crate::headers;
use crate::requests::RequestCorrelator;
use crate::settings::Settings;
use crate::tabs::TabRegistry;
use crate::traits::HostBridge;
use crate::whitelist::WhitelistManager;
use common::{
    host_url_pattern, keys, CoordinatorError, CoordinatorResult, HttpHeader, Injection,
    RequestId, StorageChanges, TabId, TOP_LEVEL_FRAME,
};
use serde_json::Value;
use std::sync::Arc;
use storage::KeyValueStore;

/// Tab/request lifecycle state coordinator.
pub struct StateCoordinator {
    bridge: Arc<dyn HostBridge>,
    store: Arc<dyn KeyValueStore>,
    tabs: TabRegistry,
    requests: RequestCorrelator,
    settings: Settings,
    counter: InjectedCounter,
    whitelist: WhitelistManager,
    /// URL match patterns derived from the resolver's supported-source
    /// table, used to scope every listener the coordinator arms.
    valid_hosts: Vec<String>,
}

impl StateCoordinator {
    /// Create a coordinator for the given supported source hosts.
    pub fn new(
        bridge: Arc<dyn HostBridge>,
        store: Arc<dyn KeyValueStore>,
        supported_hosts: Vec<String>,
    ) -> Self {
        let valid_hosts = supported_hosts
            .iter()
            .map(|host| host_url_pattern(host))
            .collect();

        Self {
            bridge,
            store,
            tabs: TabRegistry::new(),
            requests: RequestCorrelator::new(),
            settings: Settings::new(),
            counter: InjectedCounter::new(),
            whitelist: WhitelistManager::new(),
            valid_hosts,
        }
    }

    /// One-time startup initialization.
    ///
    /// Tracks every already-open tab, loads the configuration flags
    /// and the whitelist from persistence, and arms the header
    /// listener when stripping is enabled. Persistence failures
    /// degrade to defaults; startup never fails outright.
    pub async fn initialize(&self, initial_tabs: &[TabId]) {
        for &tab_id in initial_tabs {
            self.create_tab(tab_id).await;
        }

        self.settings.load(self.store.as_ref()).await;
        self.whitelist.load(self.store.as_ref()).await;

        if self.settings.strip_metadata() {
            if let Err(e) = self.bridge.add_header_listener(&self.valid_hosts).await {
                tracing::warn!(error = %e, "Failed to arm header listener at startup");
            }
        }

        tracing::info!(
            tabs = self.tabs.len(),
            whitelisted = self.whitelist.domains().len(),
            show_icon_badge = self.settings.show_icon_badge(),
            strip_metadata = self.settings.strip_metadata(),
            "Coordinator initialized"
        );
    }

    /// Track a newly created (or newly observed) tab and arm its
    /// request observer.
    pub async fn create_tab(&self, tab_id: TabId) {
        self.tabs.create(tab_id);

        if let Err(e) = self
            .bridge
            .add_request_listener(tab_id, &self.valid_hosts)
            .await
        {
            tracing::warn!(%tab_id, error = %e, "Failed to arm request listener");
        }
    }

    /// Stop tracking a closed tab.
    ///
    /// Pending request records still pointing at this tab stay in the
    /// correlator; their own redirect or error event drops them, and
    /// registration re-checks tab existence in between.
    pub fn remove_tab(&self, tab_id: TabId) {
        if self.tabs.remove(tab_id) {
            tracing::debug!(%tab_id, "Tab removed");
        }
    }

    /// React to a navigation commit.
    ///
    /// A top-level commit starts a fresh document context: injections
    /// from the previous page no longer apply, so the tab's set is
    /// emptied and its badge cleared, while the record itself
    /// persists. Sub-frame commits and the "no tab" sentinel are
    /// ignored.
    pub async fn reset_tab_on_navigation(&self, tab_id: TabId, frame_id: i64) {
        if tab_id.is_none() || frame_id != TOP_LEVEL_FRAME {
            return;
        }

        if self.settings.show_icon_badge() {
            self.set_badge(tab_id, "").await;
        }

        self.tabs.clear_injections(tab_id);
    }

    /// Record an injection in `tab_id` and synchronize the badge.
    ///
    /// Returns the tab's distinct-injection count. The lifetime
    /// counter increments once per call, duplicate keys included: it
    /// counts substitution events, not distinct libraries.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::MissingTab`] when the tab closed
    /// mid-flight; callers treat that as a no-op.
    pub async fn register_injection(
        &self,
        tab_id: TabId,
        injection: Injection,
    ) -> CoordinatorResult<usize> {
        let count = self.tabs.record_injection(tab_id, injection)?;

        if self.settings.show_icon_badge() {
            let text = if count > 0 {
                count.to_string()
            } else {
                String::new()
            };
            self.set_badge(tab_id, &text).await;
        }

        let total = self.counter.record(self.store.as_ref()).await;
        tracing::debug!(%tab_id, count, total, "Injection registered");

        Ok(count)
    }

    /// Enter the PENDING state for a redirect-based substitution the
    /// resolver decided on.
    pub fn note_pending_request(&self, request_id: RequestId, tab_id: TabId, target: Injection) {
        tracing::debug!(%request_id, %tab_id, "Substitution pending on redirect");
        self.requests.insert(request_id, tab_id, target);
    }

    /// Confirm a pending substitution: the host reported the redirect
    /// firing, so the speculative record becomes a real injection.
    ///
    /// # Errors
    ///
    /// [`CoordinatorError::OrphanedRequest`] when nothing was pending
    /// for this request, [`CoordinatorError::MissingTab`] when the tab
    /// closed in between. Both are expected races the event bridge
    /// absorbs.
    pub async fn handle_redirect(&self, request_id: &RequestId) -> CoordinatorResult<usize> {
        let record = self
            .requests
            .take(request_id)
            .ok_or_else(|| CoordinatorError::orphaned_request(request_id.clone()))?;

        self.register_injection(record.tab_id, record.target).await
    }

    /// Drop a pending substitution: the request failed before the
    /// redirect could confirm it.
    ///
    /// # Errors
    ///
    /// [`CoordinatorError::OrphanedRequest`] when nothing was pending,
    /// which is the common case for unrelated failed requests.
    pub fn handle_request_error(&self, request_id: &RequestId) -> CoordinatorResult<()> {
        if self.requests.drop_pending(request_id) {
            tracing::debug!(%request_id, "Pending substitution dropped on request error");
            Ok(())
        } else {
            Err(CoordinatorError::orphaned_request(request_id.clone()))
        }
    }

    /// Sanitize the outgoing header list of an in-flight request and
    /// hand the replacement set back to the host.
    ///
    /// No-op while stripping is disabled; the listener should not be
    /// armed then, but the host may still flush queued events after a
    /// toggle.
    pub async fn handle_outgoing_headers(&self, request_id: &RequestId, headers: Vec<HttpHeader>) {
        if !self.settings.strip_metadata() {
            return;
        }

        let filtered = headers::strip_metadata(headers);
        if let Err(e) = self
            .bridge
            .replace_request_headers(request_id, filtered)
            .await
        {
            tracing::warn!(%request_id, error = %e, "Failed to replace request headers");
        }
    }

    /// Add a domain to the whitelist; resolves once persisted.
    ///
    /// # Errors
    ///
    /// Propagates the storage error when the persistence write fails.
    pub async fn add_domain_to_whitelist(&self, domain: &str) -> CoordinatorResult<()> {
        self.whitelist.add(domain, self.store.as_ref()).await?;
        Ok(())
    }

    /// Delete a domain from the whitelist; resolves once persisted.
    ///
    /// # Errors
    ///
    /// Propagates the storage error when the persistence write fails.
    pub async fn delete_domain_from_whitelist(&self, domain: &str) -> CoordinatorResult<()> {
        self.whitelist.delete(domain, self.store.as_ref()).await?;
        Ok(())
    }

    /// React to a configuration-store change notification.
    pub async fn handle_config_change(&self, changes: &StorageChanges) {
        if let Some(change) = changes.get(keys::SHOW_ICON_BADGE) {
            let enabled = change.new_value.as_ref().and_then(Value::as_bool) == Some(true);
            self.settings.set_show_icon_badge(enabled);
            tracing::debug!(enabled, "Badge visibility changed");

            // A disabled badge must not keep showing stale counts.
            if !enabled {
                for tab_id in self.tabs.tab_ids() {
                    self.set_badge(tab_id, "").await;
                }
            }
        }

        if let Some(change) = changes.get(keys::STRIP_METADATA) {
            // Anything but an explicit false keeps stripping on,
            // matching the storage schema's tri-state history.
            let enabled = change.new_value.as_ref().and_then(Value::as_bool) != Some(false);
            self.settings.set_strip_metadata(enabled);
            tracing::debug!(enabled, "Header stripping changed");

            // Remove-then-add keeps the registration idempotent no
            // matter how often the flag toggles.
            if let Err(e) = self.bridge.remove_header_listener().await {
                tracing::warn!(error = %e, "Failed to remove header listener");
            }

            if enabled {
                if let Err(e) = self.bridge.add_header_listener(&self.valid_hosts).await {
                    tracing::warn!(error = %e, "Failed to add header listener");
                }
            }
        }
    }

    /// Distinct-injection count for a tab, None when untracked.
    pub fn injection_count(&self, tab_id: TabId) -> Option<usize> {
        self.tabs.injection_count(tab_id)
    }

    /// Whether a tab is tracked.
    pub fn is_tab_tracked(&self, tab_id: TabId) -> bool {
        self.tabs.contains(tab_id)
    }

    /// Number of requests in the PENDING state.
    pub fn pending_request_count(&self) -> usize {
        self.requests.len()
    }

    /// In-memory lifetime counter, None before the first registration.
    pub async fn lifetime_injection_count(&self) -> Option<u64> {
        self.counter.value().await
    }

    /// Whether a domain is whitelisted. Read side of the analyzer
    /// contract.
    pub fn is_domain_whitelisted(&self, domain: &str) -> bool {
        self.whitelist.contains(domain)
    }

    /// All whitelisted domains, sorted.
    pub fn whitelisted_domains(&self) -> Vec<String> {
        self.whitelist.domains()
    }

    /// Runtime configuration flags.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    async fn set_badge(&self, tab_id: TabId, text: &str) {
        if let Err(e) = self.bridge.set_badge_text(tab_id, text).await {
            tracing::warn!(%tab_id, error = %e, "Failed to set badge text");
        }
    }
}
