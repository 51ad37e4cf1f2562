//! Host command seam.

use async_trait::async_trait;
use common::{HttpHeader, RequestId, TabId};

/// Commands the coordinator issues back to the hosting browser.
///
/// The coordinator never talks to the browser directly; every outward
/// effect goes through this trait so the state machine can be driven
/// by a recording mock in tests and by the stdio protocol in the
/// shipped host binary. Implementations must tolerate commands for
/// tabs that already closed.
#[async_trait]
pub trait HostBridge: Send + Sync {
    /// Set the badge text of the toolbar icon for one tab. Empty text
    /// clears the badge.
    async fn set_badge_text(&self, tab_id: TabId, text: &str) -> anyhow::Result<()>;

    /// Arm a network-request observer scoped to `tab_id`, filtered to
    /// the supported-source URL patterns.
    async fn add_request_listener(
        &self,
        tab_id: TabId,
        url_patterns: &[String],
    ) -> anyhow::Result<()>;

    /// Register the outgoing-header listener for the supported-source
    /// URL patterns.
    async fn add_header_listener(&self, url_patterns: &[String]) -> anyhow::Result<()>;

    /// Remove the outgoing-header listener. Must be idempotent: the
    /// settings reactor always removes before conditionally re-adding.
    async fn remove_header_listener(&self) -> anyhow::Result<()>;

    /// Replace the outgoing header list of an in-flight request with
    /// the sanitized set.
    async fn replace_request_headers(
        &self,
        request_id: &RequestId,
        headers: Vec<HttpHeader>,
    ) -> anyhow::Result<()>;
}
