//! switchboard - A multi-service messaging aggregator core
//!
//! This crate provides the core functionality for the switchboard
//! desktop aggregator: the service registry, remote sync reconciliation,
//! browser session lifecycle, unread aggregation, and badge rendering.

pub mod app;
pub mod config;
pub mod domain;
pub mod services;

pub use app::App;
