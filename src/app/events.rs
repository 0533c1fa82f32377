//! Event bus for cross-component communication.
//!
//! Provides a publish-subscribe system for domain events that enables
//! loose coupling between the registry, the sync adapter, the unread
//! aggregator, and the host UI.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::domain::{Service, ServiceId};

/// Domain events for cross-component communication.
///
/// Handlers run synchronously on the control thread, often while the
/// component that published the event is still borrowed. Handlers must not
/// call back into the publishing component; remote-driven mutations go
/// through `ServiceRegistry::apply_remote_change` for exactly this reason.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A service was added to the registry.
    ServiceAdded(Service),
    /// A service's fields changed.
    ServiceUpdated(Service),
    /// A service was removed from the registry.
    ServiceRemoved(ServiceId),
    /// A remote-driven batch of registry mutations finished applying and
    /// derived caches were reloaded. Coalesces the per-service events that
    /// were suppressed during the apply.
    RegistryResynchronized,
    /// The global unread total changed.
    UnreadCountChanged(u64),
    /// Every live session is either ready or past its load deadline; the
    /// splash screen may be dismissed.
    SplashDismissable,
    /// A session's unread count rose on a provider that raises no
    /// notifications of its own; the shell should show one.
    NotificationRequested {
        service_id: ServiceId,
        service_name: String,
        unread: u32,
    },
}

/// Subscriber ID for unsubscribing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Event handler function type.
pub type EventHandler = Box<dyn Fn(&AppEvent) + Send + Sync>;

/// Event bus for publish-subscribe communication.
///
/// Allows components to publish events and subscribe to events they care
/// about. Clones share the same subscriber table.
pub struct EventBus {
    handlers: Arc<Mutex<HashMap<u64, EventHandler>>>,
    next_id: Arc<Mutex<u64>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create a new event bus.
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(Mutex::new(0)),
        }
    }

    /// Subscribe to all events.
    ///
    /// Returns a subscriber ID that can be used to unsubscribe.
    pub fn subscribe<F>(&self, handler: F) -> SubscriberId
    where
        F: Fn(&AppEvent) + Send + Sync + 'static,
    {
        let mut next_id = self.next_id.lock().unwrap();
        let id = *next_id;
        *next_id += 1;

        let mut handlers = self.handlers.lock().unwrap();
        handlers.insert(id, Box::new(handler));

        SubscriberId(id)
    }

    /// Unsubscribe from events.
    pub fn unsubscribe(&self, subscriber_id: SubscriberId) {
        let mut handlers = self.handlers.lock().unwrap();
        handlers.remove(&subscriber_id.0);
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: AppEvent) {
        let handlers = self.handlers.lock().unwrap();
        for handler in handlers.values() {
            handler(&event);
        }
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.handlers.lock().unwrap().len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            handlers: Arc::clone(&self.handlers),
            next_id: Arc::clone(&self.next_id),
        }
    }
}
