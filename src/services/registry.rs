//! Service registry.
//!
//! The [`ServiceRegistry`] is the authoritative in-memory ordered
//! collection of configured services. The tab strip orders left-aligned
//! services first, then the alignment boundary marker, then right-aligned
//! services; the registry models the marker as a boundary index into one
//! vector.
//!
//! A single registry is constructed at startup and handed to the sync
//! adapter, the session factory, and the unread aggregator explicitly.

use std::collections::HashMap;

use tracing::debug;

use crate::app::events::{AppEvent, EventBus};
use crate::domain::{Alignment, RemoteKey, Service, ServiceId};

/// Outcome of an upsert, for callers that care whether a session needs to
/// be created or refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The service was not present and has been inserted.
    Added,
    /// An existing record (matched by id or remote key) was updated in
    /// place. Duplicates never produce a second entry.
    Updated,
}

/// Authoritative ordered collection of [`Service`] records.
pub struct ServiceRegistry {
    /// Left-aligned services in `0..boundary`, right-aligned in
    /// `boundary..len`.
    services: Vec<Service>,
    boundary: usize,
    /// Derived cache, rebuilt by [`reindex`](Self::reindex).
    by_remote_key: HashMap<RemoteKey, ServiceId>,
    events: EventBus,
    /// Suppresses outward change events during a remote apply.
    quiet: bool,
}

impl ServiceRegistry {
    /// Creates an empty registry publishing on the given bus.
    pub fn new(events: EventBus) -> Self {
        Self {
            services: Vec::new(),
            boundary: 0,
            by_remote_key: HashMap::new(),
            events,
            quiet: false,
        }
    }

    /// Number of configured services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// All services in tab order.
    pub fn iter(&self) -> impl Iterator<Item = &Service> {
        self.services.iter()
    }

    /// Looks up a service by local id.
    pub fn get(&self, id: &ServiceId) -> Option<&Service> {
        self.services.iter().find(|s| &s.id == id)
    }

    /// Looks up a service by its remote store key.
    pub fn find_by_remote_key(&self, key: &RemoteKey) -> Option<&Service> {
        let id = self.by_remote_key.get(key)?;
        self.get(id)
    }

    /// Services on one side of the boundary, in order.
    pub fn list(&self, alignment: Alignment) -> Vec<&Service> {
        match alignment {
            Alignment::Left => self.services[..self.boundary].iter().collect(),
            Alignment::Right => self.services[self.boundary..].iter().collect(),
        }
    }

    /// Index of the alignment boundary marker within the tab strip.
    pub fn boundary_index(&self) -> usize {
        self.boundary
    }

    /// Position of a service in the tab strip, counting the boundary
    /// marker as one slot. Right-aligned services sit one past their
    /// vector index, which is the `+1` convention remote anchors use.
    pub fn tab_index_of(&self, id: &ServiceId) -> Option<usize> {
        let idx = self.services.iter().position(|s| &s.id == id)?;
        Some(if idx < self.boundary { idx } else { idx + 1 })
    }

    /// Inserts or updates a service.
    ///
    /// Matching is by local id first, then by remote key, so a record that
    /// arrives twice under different local ids but the same remote key is
    /// folded into one entry. Applying the same logical update twice
    /// produces identical state.
    pub fn upsert(&mut self, service: Service) -> UpsertOutcome {
        let existing = self
            .services
            .iter()
            .position(|s| s.id == service.id)
            .or_else(|| {
                let key = service.remote_key.as_ref()?;
                self.services
                    .iter()
                    .position(|s| s.remote_key.as_ref() == Some(key))
            });

        match existing {
            Some(idx) => {
                // Identity follows the record already there.
                let id = self.services[idx].id.clone();
                if service.alignment != self.services[idx].alignment {
                    // Alignment flips are structural: the entry leaves its
                    // group and joins the other one at its implied position.
                    self.services.remove(idx);
                    if idx < self.boundary {
                        self.boundary -= 1;
                    }
                    let record = Service { id, ..service };
                    let left = record.alignment == Alignment::Left;
                    let insert_at = match record.alignment {
                        Alignment::Left => (record.order as usize).min(self.boundary),
                        Alignment::Right => self.services.len(),
                    };
                    self.services.insert(insert_at, record);
                    if left {
                        self.boundary += 1;
                    }
                    self.renumber();
                    self.reindex();
                    let updated = self.services[insert_at].clone();
                    self.emit(AppEvent::ServiceUpdated(updated));
                    return UpsertOutcome::Updated;
                }
                let updated = Service {
                    id,
                    order: self.services[idx].order,
                    ..service
                };
                if self.services[idx] != updated {
                    self.services[idx] = updated.clone();
                    self.reindex();
                    self.emit(AppEvent::ServiceUpdated(updated));
                }
                UpsertOutcome::Updated
            }
            None => {
                let idx = match service.alignment {
                    // Strictly before the boundary marker, at the implied
                    // position.
                    Alignment::Left => (service.order as usize).min(self.boundary),
                    // Appended after all existing right-aligned entries.
                    Alignment::Right => self.services.len(),
                };
                self.services.insert(idx, service);
                if idx <= self.boundary && self.services[idx].alignment == Alignment::Left {
                    self.boundary += 1;
                }
                self.renumber();
                self.reindex();
                let added = self.services[idx].clone();
                self.emit(AppEvent::ServiceAdded(added));
                UpsertOutcome::Added
            }
        }
    }

    /// Removes a service by local id. Absent ids are a no-op, never an
    /// error. Returns the removed record so the caller can tear down the
    /// session in lock-step.
    pub fn remove(&mut self, id: &ServiceId) -> Option<Service> {
        let idx = self.services.iter().position(|s| &s.id == id)?;
        let removed = self.services.remove(idx);
        if idx < self.boundary {
            self.boundary -= 1;
        }
        self.renumber();
        self.reindex();
        self.emit(AppEvent::ServiceRemoved(removed.id.clone()));
        Some(removed)
    }

    /// Removes a service by remote key. Absent keys are a no-op.
    pub fn remove_by_remote_key(&mut self, key: &RemoteKey) -> Option<Service> {
        let id = self.by_remote_key.get(key)?.clone();
        self.remove(&id)
    }

    /// Moves a service to a new position within its alignment group,
    /// clamping to the group bounds. Returns false for unknown ids.
    pub fn move_to(&mut self, id: &ServiceId, new_order: u32) -> bool {
        let Some(idx) = self.services.iter().position(|s| &s.id == id) else {
            return false;
        };
        let service = self.services.remove(idx);
        let left = service.alignment == Alignment::Left;
        if left {
            self.boundary -= 1;
        }
        let (group_start, group_len) = if left {
            (0, self.boundary)
        } else {
            (self.boundary, self.services.len() - self.boundary)
        };
        let target = group_start + (new_order as usize).min(group_len);
        self.services.insert(target, service);
        if left {
            self.boundary += 1;
        }
        self.renumber();
        let moved = self.services[target.min(self.services.len() - 1)].clone();
        self.emit(AppEvent::ServiceUpdated(moved));
        true
    }

    /// Stamps the remote key on a service after a successful persist.
    ///
    /// The stamp is itself the completion of an asynchronous remote call,
    /// so it goes through the quiet path and shows up in the coalesced
    /// resynchronize event of the caller.
    pub fn assign_remote_key(&mut self, id: &ServiceId, key: RemoteKey) -> bool {
        let Some(service) = self.services.iter_mut().find(|s| &s.id == id) else {
            return false;
        };
        service.remote_key = Some(key);
        let updated = service.clone();
        self.reindex();
        self.emit(AppEvent::ServiceUpdated(updated));
        true
    }

    /// Runs a remote-driven mutation with outward change events
    /// suppressed, then reloads derived caches once and emits a single
    /// coalesced [`AppEvent::RegistryResynchronized`].
    ///
    /// This is what keeps an adapter → registry → local mirror → adapter
    /// feedback loop from forming while a remote apply is in flight.
    pub fn apply_remote_change<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.quiet = true;
        let out = f(self);
        self.quiet = false;
        self.reindex();
        debug!(services = self.services.len(), "registry resynchronized");
        self.events.publish(AppEvent::RegistryResynchronized);
        out
    }

    /// Rebuilds the remote-key cache from the backing vector.
    fn reindex(&mut self) {
        self.by_remote_key.clear();
        for service in &self.services {
            if let Some(key) = &service.remote_key {
                self.by_remote_key.insert(key.clone(), service.id.clone());
            }
        }
    }

    /// Restores `order` to the group-relative index after any structural
    /// change, keeping the strict total order per alignment group.
    fn renumber(&mut self) {
        for idx in 0..self.services.len() {
            let order = if idx < self.boundary {
                idx
            } else {
                idx - self.boundary
            };
            self.services[idx].order = order as u32;
        }
    }

    fn emit(&self, event: AppEvent) {
        if !self.quiet {
            self.events.publish(event);
        }
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.services.len())
            .field("boundary", &self.boundary)
            .finish()
    }
}
