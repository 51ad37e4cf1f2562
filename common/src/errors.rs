//! Error taxonomy for the coordinator and its persistence substrate.
//!
//! Tab and request races are expected during normal operation (a tab
//! can close between a request starting and its redirect resolving),
//! so the taxonomy distinguishes expected, absorbable errors from real
//! storage failures.

use crate::values::{RequestId, TabId};
use thiserror::Error;

/// Result type for persistence operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for coordinator operations.
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

/// Error types for the key-value persistence substrate.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying I/O failure while reading or writing the store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored document could not be parsed or a value could not be
    /// serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The store is not usable (missing backing file directory,
    /// closed handle, or similar).
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Create an unavailable error.
    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Self::Unavailable(message.into())
    }
}

/// Error types for coordinator state operations.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// An operation referenced a tab that is no longer tracked.
    ///
    /// Tab closure can interleave with in-flight request resolution;
    /// callers treat this as a no-op, never as fatal.
    #[error("No tracked tab with identifier {tab_id}")]
    MissingTab {
        /// Identifier of the missing tab.
        tab_id: TabId,
    },

    /// A redirect or error event arrived for a request with no pending
    /// record. Expected whenever no substitution was pending for that
    /// request.
    #[error("No pending record for request {request_id}")]
    OrphanedRequest {
        /// Identifier of the unknown request.
        request_id: RequestId,
    },

    /// A persistence read or write failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl CoordinatorError {
    /// Create a missing-tab error.
    pub fn missing_tab(tab_id: TabId) -> Self {
        Self::MissingTab { tab_id }
    }

    /// Create an orphaned-request error.
    pub fn orphaned_request(request_id: RequestId) -> Self {
        Self::OrphanedRequest { request_id }
    }

    /// Get the error code for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingTab { .. } => "MISSING_TAB",
            Self::OrphanedRequest { .. } => "ORPHANED_REQUEST",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Check whether this error is an expected lifecycle race that the
    /// event bridge absorbs at debug level rather than warning.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::MissingTab { .. } | Self::OrphanedRequest { .. })
    }
}
