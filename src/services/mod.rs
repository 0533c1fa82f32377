//! Core services layer.
//!
//! This module contains the services that orchestrate the aggregator's
//! state, coordinating between the embedder, remote store, and domain
//! types.
//!
//! # Architecture
//!
//! Services sit between the application layer and the embedder:
//!
//! ```text
//! Application Layer (wiring, events, settings)
//!          |
//!          v
//!    Services Layer  <-- You are here
//!          |
//!          v
//! Embedder (browser sessions, badge surface, remote store)
//! ```
//!
//! # Services Overview
//!
//! - [`ServiceRegistry`]: Ordered two-group collection of configured services
//! - [`RemoteSyncAdapter`]: Reconciles remote change-feed events into local state
//! - [`SessionManager`]: One browser session per live service, plus the splash gate
//! - [`NotificationAggregator`]: Per-service unread counts and the global total
//! - [`BadgeRenderer`]: Dock badge label and disc from the global total

pub mod badge;
pub mod registry;
pub mod remote_sync;
pub mod session;
pub mod unread;

pub use badge::{format_count, BadgeImage, BadgeRenderer, BadgeSink};
pub use registry::{ServiceRegistry, UpsertOutcome};
pub use remote_sync::{
    MemoryRemoteStore, RemoteEvent, RemotePayload, RemoteStore, RemoteSyncAdapter, SyncError,
    SyncResult,
};
pub use session::{
    partition_key, BrowserSession, SessionController, SessionEvent, SessionHost, SessionManager,
    SessionSignal, SessionState,
};
pub use unread::{NotificationAggregator, ProbeSignal, UnreadStrategy};
