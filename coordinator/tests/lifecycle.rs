//! End-to-end lifecycle tests driving the coordinator through the
//! event bridge with a recording host bridge and an in-memory store.

use async_trait::async_trait;
use cachewarden::{EventBridge, HostBridge, HostCommand, HostEvent, StateCoordinator};
use common::{
    keys, CoordinatorError, HttpHeader, Injection, RequestId, StorageChange, StorageChanges,
    StorageResult, TabId,
};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use storage::{KeyValueStore, MemoryStore};

/// Host bridge that records every command it is asked to issue.
#[derive(Default)]
struct MockBridge {
    commands: Mutex<Vec<HostCommand>>,
}

impl MockBridge {
    fn commands(&self) -> Vec<HostCommand> {
        self.commands.lock().clone()
    }

    fn badge_history(&self, tab_id: TabId) -> Vec<String> {
        self.commands
            .lock()
            .iter()
            .filter_map(|command| match command {
                HostCommand::SetBadgeText { tab_id: t, text } if *t == tab_id => {
                    Some(text.clone())
                }
                _ => None,
            })
            .collect()
    }

    fn last_badge(&self, tab_id: TabId) -> Option<String> {
        self.badge_history(tab_id).pop()
    }

    fn header_listener_commands(&self) -> Vec<&'static str> {
        self.commands
            .lock()
            .iter()
            .filter_map(|command| match command {
                HostCommand::AddHeaderListener { .. } => Some("add"),
                HostCommand::RemoveHeaderListener => Some("remove"),
                _ => None,
            })
            .collect()
    }

    fn replaced_headers(&self) -> Vec<(RequestId, Vec<HttpHeader>)> {
        self.commands
            .lock()
            .iter()
            .filter_map(|command| match command {
                HostCommand::ReplaceRequestHeaders { request_id, headers } => {
                    Some((request_id.clone(), headers.clone()))
                }
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl HostBridge for MockBridge {
    async fn set_badge_text(&self, tab_id: TabId, text: &str) -> anyhow::Result<()> {
        self.commands.lock().push(HostCommand::SetBadgeText {
            tab_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn add_request_listener(
        &self,
        tab_id: TabId,
        url_patterns: &[String],
    ) -> anyhow::Result<()> {
        self.commands.lock().push(HostCommand::AddRequestListener {
            tab_id,
            urls: url_patterns.to_vec(),
        });
        Ok(())
    }

    async fn add_header_listener(&self, url_patterns: &[String]) -> anyhow::Result<()> {
        self.commands.lock().push(HostCommand::AddHeaderListener {
            urls: url_patterns.to_vec(),
        });
        Ok(())
    }

    async fn remove_header_listener(&self) -> anyhow::Result<()> {
        self.commands.lock().push(HostCommand::RemoveHeaderListener);
        Ok(())
    }

    async fn replace_request_headers(
        &self,
        request_id: &RequestId,
        headers: Vec<HttpHeader>,
    ) -> anyhow::Result<()> {
        self.commands
            .lock()
            .push(HostCommand::ReplaceRequestHeaders {
                request_id: request_id.clone(),
                headers,
            });
        Ok(())
    }
}

/// Store whose writes always fail, for degradation tests.
struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> StorageResult<Option<serde_json::Value>> {
        Err(common::StorageError::unavailable("store offline"))
    }

    async fn set(&self, _key: &str, _value: serde_json::Value) -> StorageResult<()> {
        Err(common::StorageError::unavailable("store offline"))
    }
}

fn jquery() -> Injection {
    Injection::new("ajax.googleapis.com", "jquery/3.3.1/jquery.min.js", "3.3.1")
}

fn supported_hosts() -> Vec<String> {
    vec!["ajax.googleapis.com".to_string(), "cdnjs.cloudflare.com".to_string()]
}

struct Harness {
    bridge: Arc<MockBridge>,
    store: Arc<MemoryStore>,
    coordinator: Arc<StateCoordinator>,
}

async fn harness() -> Harness {
    harness_with_store(MemoryStore::new()).await
}

async fn harness_with_store(store: MemoryStore) -> Harness {
    let bridge = Arc::new(MockBridge::default());
    let store = Arc::new(store);
    let coordinator = Arc::new(StateCoordinator::new(
        bridge.clone(),
        store.clone(),
        supported_hosts(),
    ));
    coordinator.initialize(&[]).await;

    Harness {
        bridge,
        store,
        coordinator,
    }
}

fn config_change(key: &str, new_value: serde_json::Value) -> StorageChanges {
    let mut changes = HashMap::new();
    changes.insert(key.to_string(), StorageChange::to_value(new_value));
    changes
}

#[tokio::test]
async fn duplicate_registration_counts_once_per_tab_but_every_call_in_lifetime_counter() {
    let h = harness().await;
    h.coordinator.create_tab(TabId(7)).await;

    for _ in 0..3 {
        let count = h.coordinator.register_injection(TabId(7), jquery()).await.unwrap();
        assert_eq!(count, 1);
    }

    assert_eq!(h.coordinator.injection_count(TabId(7)), Some(1));
    assert_eq!(h.coordinator.lifetime_injection_count().await, Some(3));
    assert_eq!(
        h.store.get(keys::AMOUNT_INJECTED).await.unwrap(),
        Some(json!(3))
    );
}

#[tokio::test]
async fn registration_into_missing_tab_fails_without_side_effects() {
    let h = harness().await;

    let result = h.coordinator.register_injection(TabId(9), jquery()).await;
    assert!(matches!(result, Err(CoordinatorError::MissingTab { tab_id: TabId(9) })));

    // Neither the badge nor the lifetime counter moved.
    assert!(h.bridge.badge_history(TabId(9)).is_empty());
    assert_eq!(h.coordinator.lifetime_injection_count().await, None);
}

#[tokio::test]
async fn subframe_navigation_never_resets_injections() {
    let h = harness().await;
    h.coordinator.create_tab(TabId(7)).await;
    h.coordinator.register_injection(TabId(7), jquery()).await.unwrap();

    h.coordinator.reset_tab_on_navigation(TabId(7), 3).await;
    assert_eq!(h.coordinator.injection_count(TabId(7)), Some(1));

    h.coordinator.reset_tab_on_navigation(TabId::NONE, 0).await;
    assert_eq!(h.coordinator.injection_count(TabId(7)), Some(1));
}

#[tokio::test]
async fn top_level_navigation_empties_set_and_clears_badge() {
    let h = harness().await;
    h.coordinator.create_tab(TabId(7)).await;
    h.coordinator.register_injection(TabId(7), jquery()).await.unwrap();
    assert_eq!(h.bridge.last_badge(TabId(7)), Some("1".to_string()));

    h.coordinator.reset_tab_on_navigation(TabId(7), 0).await;

    assert_eq!(h.coordinator.injection_count(TabId(7)), Some(0));
    assert_eq!(h.bridge.last_badge(TabId(7)), Some(String::new()));
    assert!(h.coordinator.is_tab_tracked(TabId(7)));
}

#[tokio::test]
async fn redirect_confirms_pending_substitution_exactly_once() {
    let h = harness().await;
    h.coordinator.create_tab(TabId(7)).await;
    h.coordinator
        .note_pending_request(RequestId::from("1742"), TabId(7), jquery());

    let count = h.coordinator.handle_redirect(&RequestId::from("1742")).await.unwrap();
    assert_eq!(count, 1);
    assert_eq!(h.coordinator.pending_request_count(), 0);

    // The record was consumed; a second redirect for the same id is
    // orphaned.
    let result = h.coordinator.handle_redirect(&RequestId::from("1742")).await;
    assert!(matches!(result, Err(CoordinatorError::OrphanedRequest { .. })));
    assert_eq!(h.coordinator.injection_count(TabId(7)), Some(1));
}

#[tokio::test]
async fn request_error_drops_pending_substitution_without_registering() {
    let h = harness().await;
    h.coordinator.create_tab(TabId(7)).await;
    h.coordinator
        .note_pending_request(RequestId::from("1742"), TabId(7), jquery());

    h.coordinator.handle_request_error(&RequestId::from("1742")).unwrap();

    assert_eq!(h.coordinator.pending_request_count(), 0);
    assert_eq!(h.coordinator.injection_count(TabId(7)), Some(0));
    assert_eq!(h.coordinator.lifetime_injection_count().await, None);
}

#[tokio::test]
async fn tab_closure_between_pending_and_redirect_is_absorbed() {
    let h = harness().await;
    h.coordinator.create_tab(TabId(7)).await;
    h.coordinator
        .note_pending_request(RequestId::from("1742"), TabId(7), jquery());

    h.coordinator.remove_tab(TabId(7));

    let result = h.coordinator.handle_redirect(&RequestId::from("1742")).await;
    assert!(matches!(result, Err(CoordinatorError::MissingTab { .. })));
    assert_eq!(h.coordinator.pending_request_count(), 0);
}

#[tokio::test]
async fn badge_disable_clears_every_tracked_tab() {
    let h = harness().await;
    h.coordinator.create_tab(TabId(1)).await;
    h.coordinator.create_tab(TabId(2)).await;
    h.coordinator.register_injection(TabId(1), jquery()).await.unwrap();

    h.coordinator
        .handle_config_change(&config_change(keys::SHOW_ICON_BADGE, json!(false)))
        .await;

    assert_eq!(h.bridge.last_badge(TabId(1)), Some(String::new()));
    assert_eq!(h.bridge.last_badge(TabId(2)), Some(String::new()));

    // Subsequent registrations stay silent while disabled.
    let before = h.bridge.badge_history(TabId(1)).len();
    h.coordinator.register_injection(TabId(1), jquery()).await.unwrap();
    assert_eq!(h.bridge.badge_history(TabId(1)).len(), before);
}

#[tokio::test]
async fn badge_reenable_reflects_live_counts_on_next_injection() {
    let h = harness().await;
    h.coordinator.create_tab(TabId(1)).await;

    h.coordinator
        .handle_config_change(&config_change(keys::SHOW_ICON_BADGE, json!(false)))
        .await;
    h.coordinator.register_injection(TabId(1), jquery()).await.unwrap();

    h.coordinator
        .handle_config_change(&config_change(keys::SHOW_ICON_BADGE, json!(true)))
        .await;
    let other = Injection::new("cdnjs.cloudflare.com", "angular/1.7.5/angular.min.js", "1.7.5");
    h.coordinator.register_injection(TabId(1), other).await.unwrap();

    assert_eq!(h.bridge.last_badge(TabId(1)), Some("2".to_string()));
}

#[tokio::test]
async fn strip_metadata_toggle_reconciles_listener_without_duplicates() {
    let h = harness().await;
    // Initialization armed the listener once (flag defaults true).
    assert_eq!(h.bridge.header_listener_commands(), ["add"]);

    h.coordinator
        .handle_config_change(&config_change(keys::STRIP_METADATA, json!(true)))
        .await;
    assert_eq!(h.bridge.header_listener_commands(), ["add", "remove", "add"]);

    h.coordinator
        .handle_config_change(&config_change(keys::STRIP_METADATA, json!(false)))
        .await;
    assert_eq!(
        h.bridge.header_listener_commands(),
        ["add", "remove", "add", "remove"]
    );
}

#[tokio::test]
async fn strip_metadata_disabled_stops_filtering_header_events() {
    let h = harness().await;
    let headers = vec![
        HttpHeader::new("Origin", "https://example.org"),
        HttpHeader::new("Accept", "*/*"),
    ];

    h.coordinator
        .handle_outgoing_headers(&RequestId::from("1"), headers.clone())
        .await;
    let replaced = h.bridge.replaced_headers();
    assert_eq!(replaced.len(), 1);
    assert_eq!(replaced[0].1.len(), 1);
    assert_eq!(replaced[0].1[0].name, "Accept");

    h.coordinator
        .handle_config_change(&config_change(keys::STRIP_METADATA, json!(false)))
        .await;
    h.coordinator
        .handle_outgoing_headers(&RequestId::from("2"), headers)
        .await;
    assert_eq!(h.bridge.replaced_headers().len(), 1);
}

#[tokio::test]
async fn whitelist_mutations_persist_and_propagate_failures() {
    let h = harness().await;

    h.coordinator.add_domain_to_whitelist("example.org").await.unwrap();
    assert!(h.coordinator.is_domain_whitelisted("example.org"));
    assert_eq!(
        h.store.get(keys::WHITELISTED_DOMAINS).await.unwrap(),
        Some(json!({"example.org": true}))
    );

    h.coordinator.delete_domain_from_whitelist("example.org").await.unwrap();
    assert!(!h.coordinator.is_domain_whitelisted("example.org"));

    // A broken store surfaces to the whitelist caller.
    let bridge = Arc::new(MockBridge::default());
    let failing = Arc::new(StateCoordinator::new(
        bridge,
        Arc::new(FailingStore),
        supported_hosts(),
    ));
    let result = failing.add_domain_to_whitelist("example.net").await;
    assert!(matches!(result, Err(CoordinatorError::Storage(_))));
}

#[tokio::test]
async fn counter_stays_authoritative_when_store_is_down() {
    let bridge = Arc::new(MockBridge::default());
    let coordinator = Arc::new(StateCoordinator::new(
        bridge,
        Arc::new(FailingStore),
        supported_hosts(),
    ));
    coordinator.create_tab(TabId(1)).await;

    coordinator.register_injection(TabId(1), jquery()).await.unwrap();
    let other = Injection::new("cdnjs.cloudflare.com", "ember.js/2.4.1/ember.min.js", "2.4.1");
    coordinator.register_injection(TabId(1), other).await.unwrap();

    assert_eq!(coordinator.lifetime_injection_count().await, Some(2));
}

#[tokio::test]
async fn worked_example_full_lifecycle() {
    let h = harness().await;
    let bridge = EventBridge::new(h.coordinator.clone());

    bridge.handle_event(HostEvent::TabCreated { tab_id: TabId(7) }).await;
    bridge
        .handle_event(HostEvent::SubstitutionPending {
            request_id: RequestId::from("1742"),
            tab_id: TabId(7),
            target: jquery(),
        })
        .await;
    bridge
        .handle_event(HostEvent::RequestRedirecting {
            request_id: RequestId::from("1742"),
        })
        .await;

    assert_eq!(h.coordinator.injection_count(TabId(7)), Some(1));
    assert_eq!(h.bridge.last_badge(TabId(7)), Some("1".to_string()));
    assert_eq!(h.coordinator.lifetime_injection_count().await, Some(1));

    bridge
        .handle_event(HostEvent::NavigationCommitted {
            tab_id: TabId(7),
            frame_id: 0,
        })
        .await;

    assert_eq!(h.coordinator.injection_count(TabId(7)), Some(0));
    assert_eq!(h.bridge.last_badge(TabId(7)), Some(String::new()));
}

#[tokio::test]
async fn bridge_absorbs_orphaned_and_missing_tab_events() {
    let h = harness().await;
    let bridge = EventBridge::new(h.coordinator.clone());

    // None of these may panic or leave state behind.
    bridge
        .handle_event(HostEvent::RequestRedirecting {
            request_id: RequestId::from("999"),
        })
        .await;
    bridge
        .handle_event(HostEvent::RequestErrored {
            request_id: RequestId::from("999"),
        })
        .await;
    bridge
        .handle_event(HostEvent::SubstitutionApplied {
            tab_id: TabId(404),
            injection: jquery(),
        })
        .await;
    bridge
        .handle_event(HostEvent::NavigationCommitted {
            tab_id: TabId(404),
            frame_id: 0,
        })
        .await;

    assert_eq!(h.coordinator.pending_request_count(), 0);
    assert!(!h.coordinator.is_tab_tracked(TabId(404)));
}

#[tokio::test]
async fn snapshot_event_primes_registry_and_listeners() {
    let bridge = Arc::new(MockBridge::default());
    let store = Arc::new(MemoryStore::new());
    let coordinator = Arc::new(StateCoordinator::new(
        bridge.clone(),
        store,
        supported_hosts(),
    ));
    let events = EventBridge::new(coordinator.clone());

    events
        .handle_event(HostEvent::TabsSnapshot {
            tabs: vec![TabId(1), TabId(2)],
        })
        .await;

    assert!(coordinator.is_tab_tracked(TabId(1)));
    assert!(coordinator.is_tab_tracked(TabId(2)));

    let request_listeners: Vec<TabId> = bridge
        .commands()
        .iter()
        .filter_map(|command| match command {
            HostCommand::AddRequestListener { tab_id, urls } => {
                assert!(urls.contains(&"*://ajax.googleapis.com/*".to_string()));
                Some(*tab_id)
            }
            _ => None,
        })
        .collect();
    assert_eq!(request_listeners, vec![TabId(1), TabId(2)]);
}

#[tokio::test]
async fn persisted_counter_resumes_across_restart() {
    let h = harness_with_store(MemoryStore::new().with_entry(keys::AMOUNT_INJECTED, json!(41))).await;
    h.coordinator.create_tab(TabId(7)).await;

    h.coordinator.register_injection(TabId(7), jquery()).await.unwrap();

    assert_eq!(h.coordinator.lifetime_injection_count().await, Some(42));
    assert_eq!(h.store.get(keys::AMOUNT_INJECTED).await.unwrap(), Some(json!(42)));
}
