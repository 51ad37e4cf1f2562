//! Value types shared between the coordinator, the host bridge, and
//! the persistence layer.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Frame identifier of the top-level document in a tab.
///
/// Navigation commits in sub-frames (iframes) carry a non-zero frame
/// identifier and never reset per-tab injection state.
pub const TOP_LEVEL_FRAME: i64 = 0;

/// Persistence key names.
///
/// These match the storage schema of the browser extension and must
/// not be renamed without a data migration.
pub mod keys {
    /// Lifetime counter of substitution events across all sessions.
    pub const AMOUNT_INJECTED: &str = "amountInjected";

    /// Persisted whitelist, stored as a `{domain: true}` map.
    pub const WHITELISTED_DOMAINS: &str = "whitelistedDomains";

    /// Whether the badge counter is shown on the toolbar icon.
    pub const SHOW_ICON_BADGE: &str = "showIconBadge";

    /// Whether outgoing `Origin`/`Referer` headers are stripped.
    pub const STRIP_METADATA: &str = "stripMetadata";
}

/// Host-issued opaque tab identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i64);

impl TabId {
    /// The host's "no tab" sentinel, delivered for events that are not
    /// associated with any open tab (e.g. prefetch requests).
    pub const NONE: TabId = TabId(-1);

    /// Returns true when this is the "no tab" sentinel.
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TabId {
    fn from(id: i64) -> Self {
        TabId(id)
    }
}

/// Host-issued opaque request identifier.
///
/// Request identifiers are unique within a browser session; the host
/// may reuse them across sessions, which is why pending-request state
/// is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        RequestId(id.to_string())
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        RequestId(id)
    }
}

/// A record that a specific versioned library file was served locally
/// in place of a remote request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Injection {
    /// Source host the request was originally destined for.
    pub source: String,

    /// Library path below the source host.
    pub path: String,

    /// Library version that was substituted.
    pub version: String,
}

impl Injection {
    /// Create a new injection record.
    pub fn new<S: Into<String>>(source: S, path: S, version: S) -> Self {
        Self {
            source: source.into(),
            path: path.into(),
            version: version.into(),
        }
    }

    /// De-duplication identity of this injection within one tab.
    ///
    /// Re-registering the same (source, path, version) triple in the
    /// same tab must not double count, so the key is the concatenation
    /// of all three fields.
    pub fn key(&self) -> String {
        format!("{}{}{}", self.source, self.path, self.version)
    }
}

/// A single outgoing HTTP request header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpHeader {
    /// Header name, case preserved as delivered by the host.
    pub name: String,

    /// Header value.
    pub value: String,
}

impl HttpHeader {
    /// Create a new header.
    pub fn new<S: Into<String>>(name: S, value: S) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A single changed key in the host's configuration store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageChange {
    /// Previous value, absent when the key was just created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<serde_json::Value>,

    /// New value, absent when the key was deleted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<serde_json::Value>,
}

impl StorageChange {
    /// Convenience constructor for a change to a new value.
    pub fn to_value(new_value: serde_json::Value) -> Self {
        Self {
            old_value: None,
            new_value: Some(new_value),
        }
    }
}

/// The full change set of one configuration-store notification.
pub type StorageChanges = HashMap<String, StorageChange>;

/// Build the host URL match pattern for a supported source host.
///
/// The supported-source table of the resolver lists bare host names;
/// the host's listener API expects `*://{host}/*` match patterns.
pub fn host_url_pattern(host: &str) -> String {
    format!("*://{host}/*")
}
