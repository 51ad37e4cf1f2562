//! CacheWarden Coordinator Crate
//!
//! Tab/request lifecycle state coordinator for a privacy-preserving
//! resource-substitution tool: tracks which third-party library
//! requests were served from the local cache per browser tab, and
//! keeps that bookkeeping consistent across concurrent, asynchronous
//! network events.
//!
//! # Architecture
//!
//! - Per-tab injection state with badge synchronization
//! - Two-phase correlation of redirect-based substitutions, so an
//!   injection is recorded exactly once per logical request
//! - Persisted domain whitelist and lifetime injection counter
//! - Dynamic header-sanitizer listener (de)registration on
//!   configuration change
//!
//! The resolver (which decides *whether* a URL maps to a local
//! resource) and the analyzer (which evaluates the whitelist) are
//! external collaborators; they drive this crate through
//! [`StateCoordinator`] and the [`bridge::HostEvent`] stream.
//!
//! # Usage
//!
//! ```rust,no_run
//! use cachewarden::{EventBridge, HostBridge, StateCoordinator};
//! use common::TabId;
//! use std::sync::Arc;
//! use storage::MemoryStore;
//!
//! # struct NullBridge;
//! # #[async_trait::async_trait]
//! # impl HostBridge for NullBridge {
//! #     async fn set_badge_text(&self, _: TabId, _: &str) -> anyhow::Result<()> { Ok(()) }
//! #     async fn add_request_listener(&self, _: TabId, _: &[String]) -> anyhow::Result<()> { Ok(()) }
//! #     async fn add_header_listener(&self, _: &[String]) -> anyhow::Result<()> { Ok(()) }
//! #     async fn remove_header_listener(&self) -> anyhow::Result<()> { Ok(()) }
//! #     async fn replace_request_headers(
//! #         &self,
//! #         _: &common::RequestId,
//! #         _: Vec<common::HttpHeader>,
//! #     ) -> anyhow::Result<()> { Ok(()) }
//! # }
//! #
//! #[tokio::main]
//! async fn main() {
//!     let coordinator = Arc::new(StateCoordinator::new(
//!         Arc::new(NullBridge),
//!         Arc::new(MemoryStore::new()),
//!         vec!["ajax.googleapis.com".to_string()],
//!     ));
//!     coordinator.initialize(&[TabId(1)]).await;
//!
//!     let bridge = EventBridge::new(coordinator);
//!     # let _ = bridge;
//!     // feed bridge.handle_event(..) from the host's event stream
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod bridge;
mod coordinator;
mod counter;
pub mod headers;
pub mod protocol;
mod requests;
mod settings;
mod tabs;
mod traits;
mod whitelist;

// Re-export public API
pub use bridge::{EventBridge, HostEvent};
pub use coordinator::StateCoordinator;
pub use protocol::{HostCommand, ProtocolError};
pub use settings::Settings;
pub use traits::HostBridge;
