//! Host event bridge.
//!
//! Thin adapter translating host-delivered events into coordinator
//! operations. The bridge absorbs every error local to one tab or
//! request: expected lifecycle races log at debug, everything else at
//! warn, and nothing propagates far enough to take down the dispatch
//! loop.

use crate::coordinator::StateCoordinator;
use common::{HttpHeader, Injection, RequestId, StorageChanges, TabId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Semantic host events consumed by the coordinator.
///
/// Wire form is tagged JSON, e.g.
/// `{"event":"tab-created","tabId":12}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum HostEvent {
    /// Snapshot of all open tabs, delivered once at startup.
    #[serde(rename_all = "camelCase")]
    TabsSnapshot {
        /// Identifiers of every currently open tab.
        tabs: Vec<TabId>,
    },

    /// A tab was created.
    #[serde(rename_all = "camelCase")]
    TabCreated {
        /// New tab's identifier.
        tab_id: TabId,
    },

    /// A tab was closed.
    #[serde(rename_all = "camelCase")]
    TabRemoved {
        /// Closed tab's identifier.
        tab_id: TabId,
    },

    /// A navigation committed in some frame of a tab.
    #[serde(rename_all = "camelCase")]
    NavigationCommitted {
        /// Tab the navigation happened in.
        tab_id: TabId,
        /// Frame that committed; 0 is the top-level document.
        frame_id: i64,
    },

    /// The resolver decided a request will be redirect-substituted.
    #[serde(rename_all = "camelCase")]
    SubstitutionPending {
        /// Host request identifier to correlate on.
        request_id: RequestId,
        /// Tab the request originated from.
        tab_id: TabId,
        /// Injection to register once the redirect fires.
        target: Injection,
    },

    /// The resolver served an inline substitution; register directly.
    #[serde(rename_all = "camelCase")]
    SubstitutionApplied {
        /// Tab that received the substitution.
        tab_id: TabId,
        /// The served injection.
        injection: Injection,
    },

    /// An intercepted request is redirecting.
    #[serde(rename_all = "camelCase")]
    RequestRedirecting {
        /// Host request identifier.
        request_id: RequestId,
    },

    /// A request failed before completion.
    #[serde(rename_all = "camelCase")]
    RequestErrored {
        /// Host request identifier.
        request_id: RequestId,
    },

    /// Outgoing headers of a request to a supported host, delivered
    /// while the sanitizer listener is armed.
    #[serde(rename_all = "camelCase")]
    RequestHeaders {
        /// Host request identifier.
        request_id: RequestId,
        /// The outgoing header list.
        headers: Vec<HttpHeader>,
    },

    /// One or more configuration-store keys changed.
    #[serde(rename_all = "camelCase")]
    ConfigChanged {
        /// Changed keys with old and new values.
        changes: StorageChanges,
    },
}

/// Dispatches host events onto the coordinator.
pub struct EventBridge {
    coordinator: Arc<StateCoordinator>,
}

impl EventBridge {
    /// Create a bridge for `coordinator`.
    pub fn new(coordinator: Arc<StateCoordinator>) -> Self {
        Self { coordinator }
    }

    /// The wrapped coordinator.
    pub fn coordinator(&self) -> &Arc<StateCoordinator> {
        &self.coordinator
    }

    /// Handle one host event to completion, absorbing its errors.
    pub async fn handle_event(&self, event: HostEvent) {
        match event {
            HostEvent::TabsSnapshot { tabs } => {
                self.coordinator.initialize(&tabs).await;
            }
            HostEvent::TabCreated { tab_id } => {
                self.coordinator.create_tab(tab_id).await;
            }
            HostEvent::TabRemoved { tab_id } => {
                self.coordinator.remove_tab(tab_id);
            }
            HostEvent::NavigationCommitted { tab_id, frame_id } => {
                self.coordinator
                    .reset_tab_on_navigation(tab_id, frame_id)
                    .await;
            }
            HostEvent::SubstitutionPending {
                request_id,
                tab_id,
                target,
            } => {
                self.coordinator
                    .note_pending_request(request_id, tab_id, target);
            }
            HostEvent::SubstitutionApplied { tab_id, injection } => {
                if let Err(e) = self.coordinator.register_injection(tab_id, injection).await {
                    absorb(&e, "inline substitution");
                }
            }
            HostEvent::RequestRedirecting { request_id } => {
                if let Err(e) = self.coordinator.handle_redirect(&request_id).await {
                    absorb(&e, "redirect");
                }
            }
            HostEvent::RequestErrored { request_id } => {
                if let Err(e) = self.coordinator.handle_request_error(&request_id) {
                    absorb(&e, "request error");
                }
            }
            HostEvent::RequestHeaders {
                request_id,
                headers,
            } => {
                self.coordinator
                    .handle_outgoing_headers(&request_id, headers)
                    .await;
            }
            HostEvent::ConfigChanged { changes } => {
                self.coordinator.handle_config_change(&changes).await;
            }
        }
    }
}

fn absorb(error: &common::CoordinatorError, context: &str) {
    if error.is_expected() {
        tracing::debug!(code = error.error_code(), error = %error, context, "Absorbed lifecycle race");
    } else {
        tracing::warn!(code = error.error_code(), error = %error, context, "Absorbed coordinator error");
    }
}
