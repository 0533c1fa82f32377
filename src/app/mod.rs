//! Application wiring and lifecycle management.
//!
//! [`App`] owns the core components and connects them: registry mutations
//! flow onto the event bus, the remote adapter reconciles the change
//! feed, session events feed the unread aggregator, and the aggregate
//! total drives the dock badge.

pub mod events;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::config::Settings;
use crate::domain::{expand_url, profile, Alignment, Service, ServiceId, ServiceType};
use crate::services::badge::{subscribe_badge, BadgeRenderer, BadgeSink};
use crate::services::registry::ServiceRegistry;
use crate::services::remote_sync::{RemoteEvent, RemoteStore, RemoteSyncAdapter};
use crate::services::session::{SessionEvent, SessionHost, SessionManager};
use crate::services::unread::{NotificationAggregator, ProbeSignal};
use events::{EventBus, SubscriberId};

/// Request to add a new service locally.
#[derive(Debug, Clone)]
pub struct NewServiceRequest {
    /// Display name shown on the tab.
    pub name: String,
    /// Resolved page URL.
    pub url: String,
    /// Provider type.
    pub service_type: ServiceType,
    /// Which tab group the service joins.
    pub alignment: Alignment,
    /// Whether desktop notifications are enabled.
    pub notifications_enabled: bool,
    /// Whether audio starts muted.
    pub muted: bool,
}

impl NewServiceRequest {
    /// Creates a request for a catalog provider, resolving its URL
    /// template. `team` fills the subdomain placeholder for providers
    /// that have one and is ignored otherwise.
    pub fn for_provider(service_type: ServiceType, team: &str) -> Self {
        let p = profile(service_type);
        Self {
            name: p.label.to_string(),
            url: expand_url(p.url_template, team),
            service_type,
            alignment: Alignment::Left,
            notifications_enabled: true,
            muted: false,
        }
    }

    /// Creates a request for an arbitrary page.
    pub fn custom(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            service_type: ServiceType::Custom,
            alignment: Alignment::Left,
            notifications_enabled: true,
            muted: false,
        }
    }

    /// Overrides the display name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Places the service in the right-aligned group.
    pub fn aligned_right(mut self) -> Self {
        self.alignment = Alignment::Right;
        self
    }

    /// Starts with notifications off.
    pub fn notifications_disabled(mut self) -> Self {
        self.notifications_enabled = false;
        self
    }

    /// Starts audio-muted.
    pub fn muted(mut self) -> Self {
        self.muted = true;
        self
    }

    fn into_service(self) -> Service {
        let mut service = Service::new(self.name, self.url, self.service_type);
        service.alignment = self.alignment;
        service.notifications_enabled = self.notifications_enabled;
        service.muted = self.muted;
        service
    }
}

/// The assembled application core.
pub struct App {
    settings: Settings,
    events: EventBus,
    registry: Arc<Mutex<ServiceRegistry>>,
    sessions: Arc<Mutex<SessionManager>>,
    aggregator: Arc<Mutex<NotificationAggregator>>,
    adapter: RemoteSyncAdapter,
    store: Arc<dyn RemoteStore>,
    badge: Option<Arc<Mutex<BadgeRenderer>>>,
    _badge_subscription: Option<SubscriberId>,
}

impl App {
    /// Wires up the core components against the embedder's session host,
    /// remote store, and badge surface.
    pub fn new(
        settings: Settings,
        host: Arc<dyn SessionHost>,
        store: Arc<dyn RemoteStore>,
        badge_sink: Box<dyn BadgeSink>,
    ) -> Self {
        let events = EventBus::new();
        let registry = Arc::new(Mutex::new(ServiceRegistry::new(events.clone())));
        let sessions = Arc::new(Mutex::new(
            SessionManager::new(
                host,
                Duration::from_secs(settings.sessions.load_timeout_seconds),
                events.clone(),
            )
            .with_start_muted(settings.sessions.start_muted),
        ));
        let aggregator = Arc::new(Mutex::new(NotificationAggregator::new(events.clone())));
        aggregator
            .lock()
            .unwrap()
            .set_do_not_disturb(settings.notifications.do_not_disturb);

        let mut adapter = RemoteSyncAdapter::new(
            Arc::clone(&registry),
            Arc::clone(&sessions),
            Arc::clone(&aggregator),
        );
        if settings.sync.enabled {
            adapter.attach();
        }

        let (badge, badge_subscription) = if settings.badge.enabled {
            let renderer = Arc::new(Mutex::new(BadgeRenderer::new(badge_sink)));
            let subscription = subscribe_badge(&events, Arc::clone(&renderer));
            (Some(renderer), Some(subscription))
        } else {
            (None, None)
        };

        info!(
            sync = settings.sync.enabled,
            badge = settings.badge.enabled,
            "application core assembled"
        );

        Self {
            settings,
            events,
            registry,
            sessions,
            aggregator,
            adapter,
            store,
            badge,
            _badge_subscription: badge_subscription,
        }
    }

    /// The shared event bus.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Current settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Adds a locally created service: registry entry and session first,
    /// then remote persistence. A persistence failure leaves the local
    /// service in place without a remote key; it is not retried.
    pub async fn add_service(&mut self, request: NewServiceRequest) -> ServiceId {
        let service = request.into_service();
        let id = service.id.clone();

        {
            let mut registry = self.registry.lock().unwrap();
            let mut sessions = self.sessions.lock().unwrap();
            let mut aggregator = self.aggregator.lock().unwrap();
            registry.upsert(service.clone());
            sessions.create_for(&service);
            aggregator.track(&service);
        }

        match self.store.persist(&service).await {
            Ok(key) => {
                let mut registry = self.registry.lock().unwrap();
                registry.apply_remote_change(|registry| {
                    registry.assign_remote_key(&id, key);
                });
            }
            Err(err) => {
                warn!(service = %id, %err, "service persisted locally only");
            }
        }

        id
    }

    /// Removes a service: session teardown, aggregator, registry entry,
    /// then the remote child if one exists.
    pub async fn remove_service(&mut self, id: &ServiceId) {
        let removed = {
            let mut registry = self.registry.lock().unwrap();
            let mut sessions = self.sessions.lock().unwrap();
            let mut aggregator = self.aggregator.lock().unwrap();
            sessions.destroy(id);
            aggregator.forget(id);
            registry.remove(id)
        };

        if let Some(key) = removed.and_then(|s| s.remote_key) {
            if let Err(err) = self.store.delete(&key).await {
                warn!(%key, %err, "remote delete failed");
            }
        }
    }

    /// Feeds one remote change-feed event to the sync adapter.
    pub fn handle_remote_event(&mut self, event: RemoteEvent) {
        self.adapter.handle_event(event);
    }

    /// Attaches the sync adapter to a (re)established feed subscription.
    pub fn attach_sync(&mut self) {
        self.adapter.attach();
    }

    /// Detaches the sync adapter; later feed callbacks are dropped.
    pub fn detach_sync(&mut self) {
        self.adapter.detach();
    }

    /// Routes an embedder session event; page titles go on to the unread
    /// aggregator.
    pub fn on_session_event(&mut self, id: &ServiceId, event: SessionEvent) {
        let title = self.sessions.lock().unwrap().on_session_event(id, event);
        if let Some(title) = title {
            self.aggregator.lock().unwrap().on_title_changed(id, &title);
        }
    }

    /// Routes an injected-probe signal to the unread aggregator.
    pub fn on_probe_signal(&mut self, id: &ServiceId, signal: ProbeSignal) {
        self.aggregator.lock().unwrap().on_probe_signal(id, signal);
    }

    /// Toggles do-not-disturb, persisting the preference in settings.
    pub fn set_do_not_disturb(&mut self, enabled: bool) {
        self.settings.notifications.do_not_disturb = enabled;
        self.aggregator.lock().unwrap().set_do_not_disturb(enabled);
    }

    /// Mutes or unmutes a service's audio, updating both the registry
    /// entry and the live session.
    pub fn set_service_muted(&mut self, id: &ServiceId, muted: bool) {
        let mut registry = self.registry.lock().unwrap();
        if let Some(service) = registry.get(id) {
            let mut service = service.clone();
            service.muted = muted;
            registry.upsert(service);
        }
        self.sessions.lock().unwrap().set_muted(id, muted);
    }

    /// Periodic tick; drives the splash gate's load deadline.
    pub fn poll(&mut self, now: Instant) {
        self.sessions.lock().unwrap().poll(now);
    }

    /// Aggregate unread total across included services.
    pub fn total_unread(&self) -> u64 {
        self.aggregator.lock().unwrap().total()
    }

    /// Whether the startup splash has been dismissed.
    pub fn splash_dismissed(&self) -> bool {
        self.sessions.lock().unwrap().splash_dismissed()
    }

    /// Shared registry handle, for UI layers that render the tab strip.
    pub fn registry(&self) -> Arc<Mutex<ServiceRegistry>> {
        Arc::clone(&self.registry)
    }

    /// Shared session manager handle.
    pub fn sessions(&self) -> Arc<Mutex<SessionManager>> {
        Arc::clone(&self.sessions)
    }

    /// Badge renderer handle, present when the badge is enabled.
    pub fn badge(&self) -> Option<Arc<Mutex<BadgeRenderer>>> {
        self.badge.as_ref().map(Arc::clone)
    }
}
