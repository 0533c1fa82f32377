//! Unread-signal aggregation.
//!
//! No provider here exposes a push API; unread detection is heuristic,
//! driven by page-title changes and, for stubborn providers, injected
//! probe signals. The [`NotificationAggregator`] keeps one small state
//! machine per service and a global total that always equals the sum of
//! the per-service counts for services included in the global counter.

use std::collections::HashMap;

use tracing::debug;

use crate::app::events::{AppEvent, EventBus};
use crate::domain::{catalog, Service, ServiceId, UnreadSignal};

/// Resolved unread-detection strategy for one service.
///
/// Resolved once when the service is tracked, instead of re-branching on
/// the service type for every title event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnreadStrategy {
    /// Take the leading `(<digits>)` count at face value; no match means
    /// zero.
    TitleCount,
    /// The bracketed count is transient. It never regresses to zero just
    /// because the bracket is momentarily absent; only the exact idle
    /// title clears it.
    StickyCount { idle_title: String },
    /// Binary: the marker substring in the title means one unread, its
    /// absence means none.
    MarkerFlag { marker: String },
}

impl UnreadStrategy {
    /// Resolves the strategy for a service from the provider catalog.
    pub fn for_service(service: &Service) -> Self {
        match catalog::profile(service.service_type).unread_signal {
            UnreadSignal::TitleCount => Self::TitleCount,
            UnreadSignal::StickyCount { idle_title } => Self::StickyCount {
                idle_title: idle_title.to_owned(),
            },
            UnreadSignal::MarkerFlag { marker } => Self::MarkerFlag {
                marker: marker.to_owned(),
            },
        }
    }

    /// Applies one title signal to the current count.
    pub fn apply(&self, current: u32, title: &str) -> u32 {
        let parsed = parse_leading_count(title);
        match self {
            Self::TitleCount => parsed,
            Self::StickyCount { idle_title } => {
                if parsed != current && parsed > 0 {
                    parsed
                } else if title == idle_title {
                    0
                } else {
                    current
                }
            }
            Self::MarkerFlag { marker } => {
                if title.contains(marker.as_str()) {
                    1
                } else {
                    0
                }
            }
        }
    }

    /// Whether this title is an explicit "everything read" signal.
    pub fn is_reset_signal(&self, title: &str) -> bool {
        match self {
            Self::TitleCount => parse_leading_count(title) == 0,
            Self::StickyCount { idle_title } => title == idle_title,
            Self::MarkerFlag { marker } => !title.contains(marker.as_str()),
        }
    }
}

/// Parses a leading `(<digits>) rest` count from a page title.
///
/// Digit runs inside the parentheses are joined before parsing, because
/// some providers format thousands with separators, e.g. `(1,024) Inbox`.
/// Anything without a leading parenthesized digit group yields zero.
pub fn parse_leading_count(title: &str) -> u32 {
    let Some(rest) = title.strip_prefix('(') else {
        return 0;
    };
    let Some(end) = rest.find(')') else {
        return 0;
    };
    let digits: String = rest[..end].chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Signal produced by an injected probe, for providers where title text
/// alone is insufficient. How the probe samples the page is the embedded
/// browser collaborator's concern; the aggregator consumes only the
/// result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeSignal {
    /// The probe counted unread items.
    Count(u32),
    /// The probe saw an unread marker but no usable count.
    Marker,
    /// The probe observed an explicit cleared state.
    Clear,
}

/// Per-service unread state.
#[derive(Debug, Clone)]
pub struct NotificationState {
    /// The raw title or probe text last observed.
    pub last_raw_signal: String,
    /// Current unread count, never negative.
    pub unread_count: u32,
    /// Resolved detection strategy.
    pub strategy: UnreadStrategy,
}

struct TrackedService {
    state: NotificationState,
    include_in_global: bool,
    notifications_enabled: bool,
    manual_notifications: bool,
    name: String,
}

/// Aggregates per-service unread signals into one global total.
pub struct NotificationAggregator {
    tracked: HashMap<ServiceId, TrackedService>,
    total: u64,
    do_not_disturb: bool,
    events: EventBus,
}

impl NotificationAggregator {
    /// Creates an aggregator publishing totals on the given bus.
    pub fn new(events: EventBus) -> Self {
        Self {
            tracked: HashMap::new(),
            total: 0,
            do_not_disturb: false,
            events,
        }
    }

    /// Starts tracking a service, resolving its strategy once.
    ///
    /// Re-tracking an already-known service refreshes its flags and
    /// strategy but keeps its current count.
    pub fn track(&mut self, service: &Service) {
        let profile = catalog::profile(service.service_type);
        let strategy = UnreadStrategy::for_service(service);
        let entry = self
            .tracked
            .entry(service.id.clone())
            .or_insert_with(|| TrackedService {
                state: NotificationState {
                    last_raw_signal: String::new(),
                    unread_count: 0,
                    strategy: strategy.clone(),
                },
                include_in_global: service.include_in_global_count,
                notifications_enabled: service.notifications_enabled,
                manual_notifications: profile.manual_notifications,
                name: service.name.clone(),
            });

        entry.state.strategy = strategy;
        entry.notifications_enabled = service.notifications_enabled;
        entry.manual_notifications = profile.manual_notifications;
        entry.name = service.name.clone();

        if entry.include_in_global != service.include_in_global_count {
            if service.include_in_global_count {
                self.total += u64::from(entry.state.unread_count);
            } else {
                self.total -= u64::from(entry.state.unread_count);
            }
            entry.include_in_global = service.include_in_global_count;
            self.publish_total();
        }
    }

    /// Stops tracking a service, deducting its contribution from the
    /// total. Unknown ids are a no-op.
    pub fn forget(&mut self, id: &ServiceId) {
        let Some(entry) = self.tracked.remove(id) else {
            return;
        };
        if entry.include_in_global && entry.state.unread_count > 0 {
            self.total -= u64::from(entry.state.unread_count);
            self.publish_total();
        }
    }

    /// Handles a title-changed event from a session.
    pub fn on_title_changed(&mut self, id: &ServiceId, title: &str) {
        let Some(entry) = self.tracked.get_mut(id) else {
            debug!(service = %id, "title change for untracked service dropped");
            return;
        };
        let new_count = entry.state.strategy.apply(entry.state.unread_count, title);
        entry.state.last_raw_signal = title.to_owned();
        self.set_count(id, new_count);
    }

    /// Handles a signal from an injected probe.
    pub fn on_probe_signal(&mut self, id: &ServiceId, signal: ProbeSignal) {
        if !self.tracked.contains_key(id) {
            debug!(service = %id, "probe signal for untracked service dropped");
            return;
        }
        let new_count = match signal {
            ProbeSignal::Count(n) => n,
            ProbeSignal::Marker => 1,
            ProbeSignal::Clear => 0,
        };
        if let Some(entry) = self.tracked.get_mut(id) {
            entry.state.last_raw_signal = format!("{signal:?}");
        }
        self.set_count(id, new_count);
    }

    /// Current unread count for one service.
    pub fn unread_for(&self, id: &ServiceId) -> Option<u32> {
        self.tracked.get(id).map(|t| t.state.unread_count)
    }

    /// The global total over services included in the global counter.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Suppresses manual notifications while enabled. Counts keep
    /// updating; only the desktop-notification requests stop.
    pub fn set_do_not_disturb(&mut self, enabled: bool) {
        self.do_not_disturb = enabled;
    }

    fn set_count(&mut self, id: &ServiceId, new_count: u32) {
        let Some(entry) = self.tracked.get_mut(id) else {
            return;
        };
        let old_count = entry.state.unread_count;
        if new_count == old_count {
            return;
        }
        entry.state.unread_count = new_count;

        let rose = new_count > old_count;
        let should_notify = rose
            && entry.manual_notifications
            && entry.notifications_enabled
            && !self.do_not_disturb;
        let name = entry.name.clone();

        if entry.include_in_global {
            self.total = self.total - u64::from(old_count) + u64::from(new_count);
            self.publish_total();
        }

        if should_notify {
            self.events.publish(AppEvent::NotificationRequested {
                service_id: id.clone(),
                service_name: name,
                unread: new_count,
            });
        }
    }

    fn publish_total(&self) {
        self.events.publish(AppEvent::UnreadCountChanged(self.total));
    }
}

impl std::fmt::Debug for NotificationAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationAggregator")
            .field("tracked", &self.tracked.len())
            .field("total", &self.total)
            .finish()
    }
}
