//! Domain layer types for the switchboard aggregator.
//!
//! This module contains the core domain types used throughout the
//! application: services, provider catalog entries, and identifier
//! newtypes.

pub mod catalog;
mod service;
mod types;

pub use catalog::{expand_url, profile, ProviderProfile, UnreadSignal, URL_PLACEHOLDER};
pub use service::{Alignment, Service, ServiceType, TrustLevel};
pub use types::{RemoteKey, ServiceId};
