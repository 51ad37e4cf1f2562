//! Redirect-based request correlation.
//!
//! Some substitutions are served by issuing a redirect rather than
//! inline content, so the injection is only real once the host reports
//! the redirect firing. The correlator holds the speculative record in
//! between: per request identifier the lifecycle is
//! `NONE -> PENDING -> (REGISTERED | DROPPED)`. Records whose terminal
//! event never arrives leak for the lifetime of the identifier
//! namespace; that is a bounded cost of the host's event model.

use common::{Injection, RequestId, TabId};
use dashmap::DashMap;

/// Provisional link between an in-flight request and the injection
/// that will be confirmed on redirect.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    /// Tab the request originated from.
    pub tab_id: TabId,

    /// Injection to register once the redirect fires.
    pub target: Injection,
}

/// Pending-request table keyed by host request identifier.
#[derive(Debug, Default)]
pub struct RequestCorrelator {
    pending: DashMap<RequestId, PendingRequest>,
}

impl RequestCorrelator {
    /// Create an empty correlator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the PENDING state for `request_id`.
    ///
    /// Inserting over an existing record replaces it, which upholds
    /// the at-most-one-record-per-identifier invariant.
    pub fn insert(&self, request_id: RequestId, tab_id: TabId, target: Injection) {
        self.pending
            .insert(request_id, PendingRequest { tab_id, target });
    }

    /// Consume the pending record for `request_id`, if any.
    ///
    /// Used by the redirect path: the caller registers the returned
    /// injection. A missing record means no substitution was pending.
    pub fn take(&self, request_id: &RequestId) -> Option<PendingRequest> {
        self.pending.remove(request_id).map(|(_, record)| record)
    }

    /// Drop the pending record for `request_id` without registering.
    ///
    /// Used by the error path. Returns false when nothing was pending.
    pub fn drop_pending(&self, request_id: &RequestId) -> bool {
        self.pending.remove(request_id).is_some()
    }

    /// Number of pending records.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no records are pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
