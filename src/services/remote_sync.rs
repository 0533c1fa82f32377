//! Remote change-feed reconciliation.
//!
//! The [`RemoteSyncAdapter`] subscribes to the three change-feed events of
//! the per-user remote document store (`created`, `updated`, `removed`)
//! and reconciles them into registry mutations, keeping sessions and the
//! unread aggregator in lock-step. Every apply runs through
//! `ServiceRegistry::apply_remote_change`, so local mirrors see one
//! coalesced resynchronize instead of a stream of re-entrant change
//! events.
//!
//! Outbound persistence of locally created services goes through the
//! [`RemoteStore`] trait; its completions interleave with later events,
//! which is safe for the same reason.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::domain::{Alignment, RemoteKey, Service, ServiceId, ServiceType, TrustLevel};
use crate::services::registry::ServiceRegistry;
use crate::services::session::SessionManager;
use crate::services::unread::NotificationAggregator;

/// Errors that can occur reconciling remote state.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A remote child is missing a required field. The event is skipped
    /// with a warning; no partial mutation occurs.
    #[error("malformed remote payload for {key}: missing {field}")]
    MalformedPayload { key: String, field: &'static str },

    /// A remote persistence call failed. Not retried automatically; the
    /// caller must re-trigger the mutation.
    #[error("remote persistence failed: {0}")]
    Persistence(String),
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// One child of the per-user remote namespace, as delivered by the feed.
///
/// Required fields are optional at the wire level so a malformed child
/// can be diagnosed rather than rejected by the deserializer; custom
/// fields pass through in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemotePayload {
    pub name: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub service_type: Option<String>,
    pub align: Option<Alignment>,
    pub position: Option<u32>,
    pub notifications: Option<bool>,
    pub muted: Option<bool>,
    pub logo: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RemotePayload {
    fn require<'a>(
        field: &'static str,
        value: &'a Option<String>,
        key: &RemoteKey,
    ) -> SyncResult<&'a str> {
        match value.as_deref() {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(SyncError::MalformedPayload {
                key: key.0.clone(),
                field,
            }),
        }
    }

    /// Validates the required fields, returning them borrowed.
    fn validate(&self, key: &RemoteKey) -> SyncResult<(&str, &str, ServiceType)> {
        let name = Self::require("name", &self.name, key)?;
        let url = Self::require("url", &self.url, key)?;
        let ty = Self::require("type", &self.service_type, key)?;
        Ok((name, url, ServiceType::parse(ty)))
    }

    fn extra_bool(&self, field: &str) -> Option<bool> {
        self.extra.get(field).and_then(|v| v.as_bool())
    }

    fn extra_str(&self, field: &str) -> Option<&str> {
        self.extra.get(field).and_then(|v| v.as_str())
    }
}

/// A change-feed notification. Out-of-order and at-least-once delivery
/// are expected; every handler is idempotent and keyed by the store's own
/// stable key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RemoteEvent {
    Created {
        key: RemoteKey,
        value: RemotePayload,
        #[serde(default)]
        previous_key: Option<RemoteKey>,
    },
    Updated {
        key: RemoteKey,
        value: RemotePayload,
        #[serde(default)]
        previous_key: Option<RemoteKey>,
    },
    Removed {
        key: RemoteKey,
    },
}

/// Outbound persistence to the remote document store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Persists a new service, returning its assigned remote key.
    async fn persist(&self, service: &Service) -> SyncResult<RemoteKey>;

    /// Writes updated fields for an already-synced service.
    async fn update(&self, key: &RemoteKey, service: &Service) -> SyncResult<()>;

    /// Deletes a child from the remote namespace.
    async fn delete(&self, key: &RemoteKey) -> SyncResult<()>;
}

/// In-memory [`RemoteStore`], used when no remote account is configured
/// and by the replay harness. Keys are sequential.
#[derive(Default)]
pub struct MemoryRemoteStore {
    children: RwLock<HashMap<RemoteKey, Service>>,
    counter: std::sync::atomic::AtomicU64,
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn persist(&self, service: &Service) -> SyncResult<RemoteKey> {
        let n = self
            .counter
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let key = RemoteKey(format!("-local{n:06}"));
        self.children
            .write()
            .await
            .insert(key.clone(), service.clone());
        Ok(key)
    }

    async fn update(&self, key: &RemoteKey, service: &Service) -> SyncResult<()> {
        self.children
            .write()
            .await
            .insert(key.clone(), service.clone());
        Ok(())
    }

    async fn delete(&self, key: &RemoteKey) -> SyncResult<()> {
        self.children.write().await.remove(key);
        Ok(())
    }
}

/// Reconciles remote change-feed events into local state.
///
/// Holds the registry, session factory, and aggregator it was constructed
/// with; everything runs synchronously on the control thread.
pub struct RemoteSyncAdapter {
    registry: Arc<Mutex<ServiceRegistry>>,
    sessions: Arc<Mutex<SessionManager>>,
    aggregator: Arc<Mutex<NotificationAggregator>>,
    /// Events delivered while detached are dropped. Detaching mid-batch
    /// stops the remaining entries of that batch too.
    attached: bool,
}

impl RemoteSyncAdapter {
    /// Creates an adapter over the shared core components. Starts
    /// detached; call [`attach`](Self::attach) once the feed subscription
    /// is live.
    pub fn new(
        registry: Arc<Mutex<ServiceRegistry>>,
        sessions: Arc<Mutex<SessionManager>>,
        aggregator: Arc<Mutex<NotificationAggregator>>,
    ) -> Self {
        Self {
            registry,
            sessions,
            aggregator,
            attached: false,
        }
    }

    /// Marks the feed subscription live.
    pub fn attach(&mut self) {
        self.attached = true;
        info!("remote feed attached");
    }

    /// Marks the feed subscription torn down. In-flight callbacks from
    /// the previous subscription are dropped from here on.
    pub fn detach(&mut self) {
        self.attached = false;
        info!("remote feed detached");
    }

    /// Whether a feed subscription is live.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Handles one change-feed event. Events arriving while detached are
    /// dropped with a debug log.
    pub fn handle_event(&mut self, event: RemoteEvent) {
        if !self.attached {
            debug!(?event, "remote event while detached dropped");
            return;
        }
        match event {
            RemoteEvent::Created { key, value, .. } => self.apply_created(key, value),
            RemoteEvent::Updated { key, value, .. } => self.apply_updated(key, value),
            RemoteEvent::Removed { key } => self.apply_removed(key),
        }
    }

    /// Handles a batch. A failure on one entry never aborts the rest.
    pub fn handle_batch(&mut self, events: impl IntoIterator<Item = RemoteEvent>) {
        for event in events {
            self.handle_event(event);
        }
    }

    fn apply_created(&self, key: RemoteKey, value: RemotePayload) {
        let (name, url, service_type) = match value.validate(&key) {
            Ok(fields) => fields,
            Err(err) => {
                warn!(%err, "skipping malformed created event");
                return;
            }
        };
        let name = name.to_owned();
        let url = url.to_owned();

        let mut registry = self.registry.lock().unwrap();
        let mut sessions = self.sessions.lock().unwrap();
        let mut aggregator = self.aggregator.lock().unwrap();

        registry.apply_remote_change(|registry| {
            // Match by remote key, falling back to a bare local id equal to
            // the key, which is how pre-sync installs migrate.
            let existing = registry
                .find_by_remote_key(&key)
                .map(|s| s.id.clone())
                .or_else(|| registry.get(&ServiceId(key.0.clone())).map(|s| s.id.clone()));

            match existing {
                Some(id) => {
                    let mut service = match registry.get(&id) {
                        Some(s) => s.clone(),
                        None => return,
                    };
                    merge_payload(&mut service, &value, &name, &url, service_type);
                    service.remote_key = Some(key);
                    registry.upsert(service.clone());
                    if let Some(position) = value.position {
                        if position != service.order {
                            registry.move_to(&id, position);
                        }
                    }
                    sessions.update_for(&service);
                    aggregator.track(&service);
                    debug!(service = %id, "created event folded into existing service");
                }
                None => {
                    let service = service_from_payload(&key, &value, name, url, service_type);
                    registry.upsert(service.clone());
                    sessions.create_for(&service);
                    aggregator.track(&service);
                    info!(service = %service.id, "service created from remote event");
                }
            }
        });
    }

    fn apply_updated(&self, key: RemoteKey, value: RemotePayload) {
        let (name, url, service_type) = match value.validate(&key) {
            Ok(fields) => fields,
            Err(err) => {
                warn!(%err, "skipping malformed updated event");
                return;
            }
        };
        let name = name.to_owned();
        let url = url.to_owned();

        let mut registry = self.registry.lock().unwrap();
        let mut sessions = self.sessions.lock().unwrap();
        let mut aggregator = self.aggregator.lock().unwrap();

        registry.apply_remote_change(|registry| {
            let Some(existing) = registry.find_by_remote_key(&key) else {
                debug!(%key, "updated event for unknown key dropped");
                return;
            };
            let id = existing.id.clone();
            let current_order = existing.order;

            let mut service = existing.clone();
            merge_payload(&mut service, &value, &name, &url, service_type);
            registry.upsert(service.clone());

            // The remote anchor carries tab positions; right-aligned
            // anchors are one past the boundary marker, matching the
            // created-path convention.
            if let Some(position) = value.position {
                if position != current_order {
                    registry.move_to(&id, position);
                }
            }

            sessions.update_for(&service);
            aggregator.track(&service);
        });
    }

    fn apply_removed(&self, key: RemoteKey) {
        let mut registry = self.registry.lock().unwrap();
        let mut sessions = self.sessions.lock().unwrap();
        let mut aggregator = self.aggregator.lock().unwrap();

        registry.apply_remote_change(|registry| {
            let Some(service) = registry.find_by_remote_key(&key) else {
                debug!(%key, "removed event for unknown key is a no-op");
                return;
            };
            let id = service.id.clone();
            // Session teardown first, then the registry entry, keeping the
            // one-session-per-live-service invariant.
            sessions.destroy(&id);
            aggregator.forget(&id);
            registry.remove(&id);
            info!(service = %id, "service removed by remote event");
        });
    }
}

/// Applies remote fields onto an existing service, preserving identity.
fn merge_payload(
    service: &mut Service,
    payload: &RemotePayload,
    name: &str,
    url: &str,
    service_type: ServiceType,
) {
    service.name = name.to_owned();
    service.url = url.to_owned();
    service.service_type = service_type;
    if let Some(align) = payload.align {
        service.alignment = align;
    }
    if let Some(notifications) = payload.notifications {
        service.notifications_enabled = notifications;
    }
    if let Some(muted) = payload.muted {
        service.muted = muted;
    }
    if payload.logo.is_some() {
        service.logo = payload.logo.clone();
    }
    if let Some(include) = payload.extra_bool("includeInGlobalUnreadCounter") {
        service.include_in_global_count = include;
    }
    if let Some(display) = payload.extra_bool("displayTabUnreadCounter") {
        service.display_unread_in_title = display;
    }
    if let Some(visible) = payload.extra_bool("statusBarVisible") {
        service.status_bar_visible = visible;
    }
    if let Some(trust) = payload.extra_bool("trust") {
        service.trust_level = if trust {
            TrustLevel::TrustInvalidCertificates
        } else {
            TrustLevel::Standard
        };
    }
    if let Some(script) = payload.extra_str("js_unread") {
        service.custom_script = (!script.is_empty()).then(|| script.to_owned());
    }
}

/// Builds a brand-new service from a created event. The remote key is
/// known up front, unlike the local creation path where it arrives with
/// the first successful persist.
fn service_from_payload(
    key: &RemoteKey,
    payload: &RemotePayload,
    name: String,
    url: String,
    service_type: ServiceType,
) -> Service {
    let mut service = Service::new(name.clone(), url.clone(), service_type);
    service.remote_key = Some(key.clone());
    service.alignment = payload.align.unwrap_or(Alignment::Left);
    service.order = payload.position.unwrap_or(0);
    merge_payload(&mut service, payload, &name, &url, service_type);
    service
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::events::EventBus;
    use crate::services::session::{BrowserSession, SessionHost};
    use std::time::Duration;

    struct NullSession;

    impl BrowserSession for NullSession {
        fn navigate(&mut self, _url: &str) {}
        fn set_audio_muted(&mut self, _muted: bool) {}
        fn inject_script(&mut self, _script: &str) {}
        fn destroy(&mut self) {}
    }

    struct NullHost;

    impl SessionHost for NullHost {
        fn create_session(
            &self,
            _partition: &str,
            _url: &str,
            _user_agent: Option<&str>,
        ) -> Box<dyn BrowserSession> {
            Box::new(NullSession)
        }
        fn open_external(&self, _url: &str) {}
        fn set_spinner(&self, _service_id: &ServiceId, _visible: bool) {}
    }

    struct Fixture {
        registry: Arc<Mutex<ServiceRegistry>>,
        sessions: Arc<Mutex<SessionManager>>,
        aggregator: Arc<Mutex<NotificationAggregator>>,
        adapter: RemoteSyncAdapter,
    }

    fn fixture() -> Fixture {
        let bus = EventBus::new();
        let registry = Arc::new(Mutex::new(ServiceRegistry::new(bus.clone())));
        let sessions = Arc::new(Mutex::new(SessionManager::new(
            Arc::new(NullHost),
            Duration::from_secs(30),
            bus.clone(),
        )));
        let aggregator = Arc::new(Mutex::new(NotificationAggregator::new(bus)));
        let mut adapter = RemoteSyncAdapter::new(
            Arc::clone(&registry),
            Arc::clone(&sessions),
            Arc::clone(&aggregator),
        );
        adapter.attach();
        Fixture {
            registry,
            sessions,
            aggregator,
            adapter,
        }
    }

    fn payload(name: &str, url: &str, ty: &str) -> RemotePayload {
        RemotePayload {
            name: Some(name.to_owned()),
            url: Some(url.to_owned()),
            service_type: Some(ty.to_owned()),
            ..Default::default()
        }
    }

    fn created(key: &str, value: RemotePayload) -> RemoteEvent {
        RemoteEvent::Created {
            key: RemoteKey::from(key),
            value,
            previous_key: None,
        }
    }

    #[test]
    fn created_inserts_service_and_session() {
        let mut fx = fixture();
        fx.adapter
            .handle_event(created("rk-1", payload("Work", "https://w.example/", "slack")));

        let registry = fx.registry.lock().unwrap();
        let service = registry.find_by_remote_key(&RemoteKey::from("rk-1")).unwrap();
        assert_eq!(service.name, "Work");
        assert_eq!(service.service_type, ServiceType::Slack);
        assert!(fx.sessions.lock().unwrap().contains(&service.id));
        assert_eq!(fx.aggregator.lock().unwrap().unread_for(&service.id), Some(0));
    }

    #[test]
    fn created_is_idempotent_by_remote_key() {
        let mut fx = fixture();
        let event = created("rk-1", payload("Work", "https://w.example/", "slack"));
        fx.adapter.handle_event(event.clone());
        fx.adapter.handle_event(event);

        assert_eq!(fx.registry.lock().unwrap().len(), 1);
        assert_eq!(fx.sessions.lock().unwrap().len(), 1);
    }

    #[test]
    fn created_matches_presync_install_by_bare_id() {
        let mut fx = fixture();
        // A pre-sync install has a service whose local id equals the key
        // the store later assigns.
        {
            let mut registry = fx.registry.lock().unwrap();
            let mut svc =
                Service::new("Old name", "https://w.example/", ServiceType::Slack);
            svc.id = ServiceId::from("rk-7");
            registry.upsert(svc);
        }

        fx.adapter
            .handle_event(created("rk-7", payload("New name", "https://w.example/", "slack")));

        let registry = fx.registry.lock().unwrap();
        assert_eq!(registry.len(), 1);
        let service = registry.get(&ServiceId::from("rk-7")).unwrap();
        assert_eq!(service.remote_key, Some(RemoteKey::from("rk-7")));
        assert_eq!(service.name, "New name");
    }

    #[test]
    fn created_left_inserts_before_boundary_right_appends() {
        let mut fx = fixture();
        let mut right = payload("R1", "https://r.example/", "gmail");
        right.align = Some(Alignment::Right);
        fx.adapter.handle_event(created("rk-r1", right));

        let mut left = payload("L1", "https://l.example/", "gmail");
        left.align = Some(Alignment::Left);
        left.position = Some(9);
        fx.adapter.handle_event(created("rk-l1", left));

        let mut right2 = payload("R2", "https://r2.example/", "gmail");
        right2.align = Some(Alignment::Right);
        fx.adapter.handle_event(created("rk-r2", right2));

        let registry = fx.registry.lock().unwrap();
        let left: Vec<_> = registry
            .list(Alignment::Left)
            .iter()
            .map(|s| s.name.clone())
            .collect();
        let right: Vec<_> = registry
            .list(Alignment::Right)
            .iter()
            .map(|s| s.name.clone())
            .collect();
        assert_eq!(left, ["L1"]);
        assert_eq!(right, ["R1", "R2"]);
    }

    #[test]
    fn malformed_created_is_skipped_with_no_partial_mutation() {
        let mut fx = fixture();
        let mut bad = payload("Work", "https://w.example/", "slack");
        bad.url = None;
        fx.adapter.handle_event(created("rk-bad", bad));

        let mut empty_name = payload("", "https://w.example/", "slack");
        empty_name.name = Some(String::new());
        fx.adapter.handle_event(created("rk-bad2", empty_name));

        assert!(fx.registry.lock().unwrap().is_empty());
        assert!(fx.sessions.lock().unwrap().is_empty());
    }

    #[test]
    fn malformed_entry_does_not_abort_batch() {
        let mut fx = fixture();
        let mut bad = payload("Broken", "https://b.example/", "slack");
        bad.service_type = None;
        fx.adapter.handle_batch([
            created("rk-bad", bad),
            created("rk-ok", payload("Fine", "https://f.example/", "gmail")),
        ]);

        let registry = fx.registry.lock().unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.find_by_remote_key(&RemoteKey::from("rk-ok")).is_some());
    }

    #[test]
    fn updated_applies_field_merge() {
        let mut fx = fixture();
        fx.adapter
            .handle_event(created("rk-1", payload("Work", "https://w.example/", "slack")));

        let mut update = payload("Renamed", "https://w.example/", "slack");
        update.muted = Some(true);
        update
            .extra
            .insert("includeInGlobalUnreadCounter".into(), false.into());
        fx.adapter.handle_event(RemoteEvent::Updated {
            key: RemoteKey::from("rk-1"),
            value: update,
            previous_key: None,
        });

        let registry = fx.registry.lock().unwrap();
        let service = registry.find_by_remote_key(&RemoteKey::from("rk-1")).unwrap();
        assert_eq!(service.name, "Renamed");
        assert!(service.muted);
        assert!(!service.include_in_global_count);
    }

    #[test]
    fn updated_twice_is_idempotent() {
        let mut fx = fixture();
        fx.adapter
            .handle_event(created("rk-1", payload("Work", "https://w.example/", "slack")));
        fx.adapter
            .handle_event(created("rk-2", payload("Home", "https://h.example/", "gmail")));

        let mut update = payload("Renamed", "https://w.example/", "slack");
        update.position = Some(1);
        let event = RemoteEvent::Updated {
            key: RemoteKey::from("rk-1"),
            value: update,
            previous_key: None,
        };

        fx.adapter.handle_event(event.clone());
        let first: Vec<Service> = fx.registry.lock().unwrap().iter().cloned().collect();
        fx.adapter.handle_event(event);
        let second: Vec<Service> = fx.registry.lock().unwrap().iter().cloned().collect();

        assert_eq!(first, second);
    }

    #[test]
    fn updated_position_moves_tab() {
        let mut fx = fixture();
        let mut first = payload("A", "https://a.example/", "gmail");
        first.position = Some(0);
        fx.adapter.handle_event(created("rk-1", first));
        let mut second = payload("B", "https://b.example/", "gmail");
        second.position = Some(1);
        fx.adapter.handle_event(created("rk-2", second));

        let mut update = payload("A", "https://a.example/", "gmail");
        update.position = Some(1);
        fx.adapter.handle_event(RemoteEvent::Updated {
            key: RemoteKey::from("rk-1"),
            value: update,
            previous_key: None,
        });

        let registry = fx.registry.lock().unwrap();
        let names: Vec<_> = registry.iter().map(|s| s.name.clone()).collect();
        assert_eq!(names, ["B", "A"]);
    }

    #[test]
    fn removed_tears_down_session_then_registry() {
        let mut fx = fixture();
        fx.adapter
            .handle_event(created("rk-1", payload("Work", "https://w.example/", "slack")));
        let id = fx
            .registry
            .lock()
            .unwrap()
            .find_by_remote_key(&RemoteKey::from("rk-1"))
            .map(|s| s.id.clone())
            .unwrap();

        fx.adapter.handle_event(RemoteEvent::Removed {
            key: RemoteKey::from("rk-1"),
        });

        assert!(fx.registry.lock().unwrap().is_empty());
        assert!(!fx.sessions.lock().unwrap().contains(&id));
        assert!(fx.aggregator.lock().unwrap().unread_for(&id).is_none());
    }

    #[test]
    fn removed_unknown_key_is_noop() {
        let mut fx = fixture();
        fx.adapter
            .handle_event(created("rk-1", payload("Work", "https://w.example/", "slack")));

        fx.adapter.handle_event(RemoteEvent::Removed {
            key: RemoteKey::from("rk-ghost"),
        });

        assert_eq!(fx.registry.lock().unwrap().len(), 1);
    }

    #[test]
    fn events_while_detached_are_dropped() {
        let mut fx = fixture();
        fx.adapter.detach();
        fx.adapter
            .handle_event(created("rk-1", payload("Work", "https://w.example/", "slack")));
        assert!(fx.registry.lock().unwrap().is_empty());
    }

    #[test]
    fn detach_mid_batch_drops_remaining_events() {
        // Simulates teardown racing an in-flight dispatch: the first entry
        // lands, then the subscription detaches, and the remainder of the
        // old subscription's batch must not mutate state.
        let mut fx = fixture();
        fx.adapter
            .handle_event(created("rk-1", payload("A", "https://a.example/", "gmail")));
        fx.adapter.detach();
        fx.adapter.handle_batch([
            created("rk-2", payload("B", "https://b.example/", "gmail")),
            RemoteEvent::Removed {
                key: RemoteKey::from("rk-1"),
            },
        ]);

        let registry = fx.registry.lock().unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.find_by_remote_key(&RemoteKey::from("rk-1")).is_some());
    }

    #[test]
    fn reattach_resumes_processing() {
        let mut fx = fixture();
        fx.adapter.detach();
        fx.adapter
            .handle_event(created("rk-1", payload("A", "https://a.example/", "gmail")));
        fx.adapter.attach();
        fx.adapter
            .handle_event(created("rk-1", payload("A", "https://a.example/", "gmail")));

        assert_eq!(fx.registry.lock().unwrap().len(), 1);
    }

    #[test]
    fn unknown_type_string_falls_back_to_custom() {
        let mut fx = fixture();
        fx.adapter.handle_event(created(
            "rk-1",
            payload("Odd", "https://odd.example/", "carrier-pigeon"),
        ));

        let registry = fx.registry.lock().unwrap();
        let service = registry.find_by_remote_key(&RemoteKey::from("rk-1")).unwrap();
        assert_eq!(service.service_type, ServiceType::Custom);
    }

    #[test]
    fn passthrough_fields_map_onto_service_flags() {
        let mut fx = fixture();
        let mut value = payload("Work", "https://w.example/", "slack");
        value.extra.insert("trust".into(), true.into());
        value.extra.insert("js_unread".into(), "probe();".into());
        value
            .extra
            .insert("displayTabUnreadCounter".into(), false.into());
        fx.adapter.handle_event(created("rk-1", value));

        let registry = fx.registry.lock().unwrap();
        let service = registry.find_by_remote_key(&RemoteKey::from("rk-1")).unwrap();
        assert_eq!(service.trust_level, TrustLevel::TrustInvalidCertificates);
        assert_eq!(service.custom_script.as_deref(), Some("probe();"));
        assert!(!service.display_unread_in_title);
    }

    #[tokio::test]
    async fn memory_store_assigns_sequential_keys() {
        let store = MemoryRemoteStore::default();
        let svc = Service::new("A", "https://a.example/", ServiceType::Gmail);
        let k1 = store.persist(&svc).await.unwrap();
        let k2 = store.persist(&svc).await.unwrap();
        assert_ne!(k1, k2);

        store.delete(&k1).await.unwrap();
        assert!(store.children.read().await.get(&k1).is_none());
        assert!(store.children.read().await.get(&k2).is_some());
    }

    #[test]
    fn remote_event_wire_format() {
        let json = r#"{
            "event": "created",
            "key": "rk-1",
            "value": {
                "name": "Work",
                "url": "https://w.example/",
                "type": "slack",
                "align": "left",
                "position": 0,
                "notifications": true,
                "muted": false,
                "trust": true
            }
        }"#;
        let event: RemoteEvent = serde_json::from_str(json).unwrap();
        match event {
            RemoteEvent::Created { key, value, .. } => {
                assert_eq!(key, RemoteKey::from("rk-1"));
                assert_eq!(value.extra_bool("trust"), Some(true));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
