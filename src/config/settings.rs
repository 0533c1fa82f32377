//! Application settings and configuration types.
//!
//! Settings are persisted to `~/.config/switchboard/settings.json` (or
//! XDG equivalent) and loaded at application startup.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Top-level application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Notification preferences.
    pub notifications: NotificationSettings,
    /// Browser session behavior.
    pub sessions: SessionSettings,
    /// Dock badge preferences.
    pub badge: BadgeSettings,
    /// Remote sync preferences.
    pub sync: SyncSettings,
}

/// Notification preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// Master switch for desktop notifications.
    pub enabled: bool,
    /// Suppresses notifications without touching per-service settings.
    pub do_not_disturb: bool,
    /// Whether to play notification sounds.
    pub sound_enabled: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            do_not_disturb: false,
            sound_enabled: true,
        }
    }
}

/// Browser session behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Seconds a session may stay loading before the splash screen stops
    /// waiting for it.
    pub load_timeout_seconds: u64,
    /// Whether newly created sessions start audio-muted.
    pub start_muted: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            load_timeout_seconds: 30,
            start_muted: false,
        }
    }
}

/// Dock badge preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeSettings {
    /// Master switch for the unread badge.
    pub enabled: bool,
}

impl Default for BadgeSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Remote sync preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Whether to attach to the remote change feed at startup.
    pub enabled: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Settings {
    /// Platform config file location, e.g. `~/.config/switchboard/settings.json`.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "switchboard").map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Loads settings from `path`, falling back to defaults when the file
    /// does not exist yet. Unknown fields in the file are ignored.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing settings from {}", path.display()))
    }

    /// Writes settings to `path`, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(self).context("serializing settings")?;
        fs::write(path, raw).with_context(|| format!("writing settings to {}", path.display()))
    }
}
