//! switchboard - Headless entry point for the aggregator core
//!
//! Reads newline-delimited JSON change-feed events from stdin and replays
//! them through the sync adapter, logging the resulting tab layout. The
//! desktop embedder links the library crate directly; this binary exists
//! for exercising the core against recorded feeds.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use switchboard::config::Settings;
use switchboard::domain::{Alignment, ServiceId};
use switchboard::services::badge::{BadgeImage, BadgeSink};
use switchboard::services::remote_sync::{MemoryRemoteStore, RemoteEvent};
use switchboard::services::session::{BrowserSession, SessionHost};
use switchboard::App;

/// Session host that logs instead of embedding a browser.
struct HeadlessHost;

struct HeadlessSession {
    partition: String,
}

impl BrowserSession for HeadlessSession {
    fn navigate(&mut self, url: &str) {
        tracing::debug!(partition = %self.partition, url, "navigate");
    }

    fn set_audio_muted(&mut self, muted: bool) {
        tracing::debug!(partition = %self.partition, muted, "audio");
    }

    fn inject_script(&mut self, _script: &str) {
        tracing::debug!(partition = %self.partition, "inject probe");
    }

    fn destroy(&mut self) {
        tracing::debug!(partition = %self.partition, "session destroyed");
    }
}

impl SessionHost for HeadlessHost {
    fn create_session(
        &self,
        partition: &str,
        url: &str,
        _user_agent: Option<&str>,
    ) -> Box<dyn BrowserSession> {
        tracing::debug!(partition, url, "session created");
        Box::new(HeadlessSession {
            partition: partition.to_owned(),
        })
    }

    fn open_external(&self, url: &str) {
        tracing::info!(url, "would open in default browser");
    }

    fn set_spinner(&self, service_id: &ServiceId, visible: bool) {
        tracing::debug!(service = %service_id, visible, "spinner");
    }
}

/// Badge surface that logs repaints.
struct HeadlessBadge;

impl BadgeSink for HeadlessBadge {
    fn apply(&mut self, image: Option<&BadgeImage>, raw_count: u64) {
        match image {
            Some(image) => tracing::info!(label = %image.text, raw_count, "badge"),
            None => tracing::info!("badge cleared"),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting switchboard");

    if let Err(e) = run().await {
        tracing::error!("Application error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let settings = match Settings::default_path() {
        Some(path) => Settings::load(&path)?,
        None => Settings::default(),
    };

    let mut app = App::new(
        settings,
        Arc::new(HeadlessHost),
        Arc::new(MemoryRemoteStore::default()),
        Box::new(HeadlessBadge),
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<RemoteEvent>(line) {
            Ok(event) => app.handle_remote_event(event),
            Err(err) => tracing::warn!(%err, "skipping unparseable feed line"),
        }
    }

    app.poll(Instant::now());

    let registry = app.registry();
    let registry = registry.lock().unwrap();
    for alignment in [Alignment::Left, Alignment::Right] {
        for service in registry.list(alignment) {
            tracing::info!(
                name = %service.name,
                kind = service.service_type.as_str(),
                align = ?alignment,
                order = service.order,
                "tab"
            );
        }
    }
    tracing::info!(total_unread = app.total_unread(), "replay complete");

    Ok(())
}
