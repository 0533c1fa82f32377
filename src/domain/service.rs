//! Service domain types.
//!
//! A [`Service`] is one configured messaging-provider instance: which
//! provider it is, where its tab sits in the shell, and how its unread
//! signals and notifications should be treated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{RemoteKey, ServiceId};

/// One configured messaging-provider instance managed by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    /// Stable local identifier.
    pub id: ServiceId,
    /// Key in the remote document store, once synced.
    pub remote_key: Option<RemoteKey>,
    /// Display name shown on the tab.
    pub name: String,
    /// Service URL. May still embed the `___` subdomain placeholder if the
    /// provider is team-scoped and no team has been configured yet.
    pub url: String,
    /// Which provider this is.
    pub service_type: ServiceType,
    /// Which side of the tab strip the service lives on.
    pub alignment: Alignment,
    /// Position within the alignment group. Strict total order per group.
    pub order: u32,
    /// Whether the service may raise desktop notifications.
    pub notifications_enabled: bool,
    /// Whether the session audio is muted.
    pub muted: bool,
    /// Whether the per-session status bar is shown.
    pub status_bar_visible: bool,
    /// Whether the unread count is shown on the tab itself.
    pub display_unread_in_title: bool,
    /// Whether this service contributes to the global unread total.
    pub include_in_global_count: bool,
    /// Certificate trust policy for the embedded session.
    pub trust_level: TrustLevel,
    /// Whether link clicks may be handed to the system browser.
    pub allow_external_navigation: bool,
    /// Extra script injected into the session to sample unread indicators.
    pub custom_script: Option<String>,
    /// Logo reference (catalog icon name or user-supplied URL).
    pub logo: Option<String>,
    /// When this service was configured.
    pub created_at: DateTime<Utc>,
}

impl Service {
    /// Creates a service with defaults from the provider catalog.
    ///
    /// The URL defaults to the provider's template; callers configuring a
    /// team-scoped provider should expand the `___` placeholder first via
    /// [`catalog::expand_url`](super::catalog::expand_url).
    pub fn new(name: impl Into<String>, url: impl Into<String>, service_type: ServiceType) -> Self {
        Self {
            id: ServiceId::generate(),
            remote_key: None,
            name: name.into(),
            url: url.into(),
            service_type,
            alignment: Alignment::Left,
            order: 0,
            notifications_enabled: true,
            muted: false,
            status_bar_visible: true,
            display_unread_in_title: true,
            include_in_global_count: true,
            trust_level: TrustLevel::Standard,
            allow_external_navigation: true,
            custom_script: None,
            logo: None,
            created_at: Utc::now(),
        }
    }

    /// Returns whether this service has been persisted to the remote store.
    pub fn is_synced(&self) -> bool {
        self.remote_key.is_some()
    }
}

/// Known messaging providers, plus a catch-all for user-defined sites.
///
/// Unrecognized type strings coming off the wire deserialize to
/// [`ServiceType::Custom`], which falls back to default title parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    WhatsApp,
    Messenger,
    Telegram,
    Slack,
    Skype,
    Hangouts,
    Gmail,
    Discord,
    Outlook,
    RocketChat,
    Mattermost,
    #[serde(other)]
    Custom,
}

impl ServiceType {
    /// Parses a wire type string, falling back to [`ServiceType::Custom`]
    /// for anything unrecognized.
    pub fn parse(s: &str) -> Self {
        match s {
            "whatsapp" => Self::WhatsApp,
            "messenger" => Self::Messenger,
            "telegram" => Self::Telegram,
            "slack" => Self::Slack,
            "skype" => Self::Skype,
            "hangouts" => Self::Hangouts,
            "gmail" => Self::Gmail,
            "discord" => Self::Discord,
            "outlook" => Self::Outlook,
            "rocketchat" => Self::RocketChat,
            "mattermost" => Self::Mattermost,
            _ => Self::Custom,
        }
    }

    /// The wire/storage-partition name for this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WhatsApp => "whatsapp",
            Self::Messenger => "messenger",
            Self::Telegram => "telegram",
            Self::Slack => "slack",
            Self::Skype => "skype",
            Self::Hangouts => "hangouts",
            Self::Gmail => "gmail",
            Self::Discord => "discord",
            Self::Outlook => "outlook",
            Self::RocketChat => "rocketchat",
            Self::Mattermost => "mattermost",
            Self::Custom => "custom",
        }
    }
}

/// Which side of the alignment boundary a tab sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Right,
}

/// Certificate trust policy for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    /// Reject invalid certificates.
    Standard,
    /// Accept self-signed certificates (self-hosted providers).
    TrustInvalidCertificates,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_defaults() {
        let svc = Service::new("Work Chat", "https://example.slack.com/", ServiceType::Slack);
        assert!(svc.remote_key.is_none());
        assert!(!svc.is_synced());
        assert!(svc.include_in_global_count);
        assert_eq!(svc.alignment, Alignment::Left);
        assert_eq!(svc.trust_level, TrustLevel::Standard);
    }

    #[test]
    fn service_type_parse_known() {
        assert_eq!(ServiceType::parse("whatsapp"), ServiceType::WhatsApp);
        assert_eq!(ServiceType::parse("slack"), ServiceType::Slack);
    }

    #[test]
    fn service_type_parse_unknown_falls_back_to_custom() {
        assert_eq!(ServiceType::parse("carrier-pigeon"), ServiceType::Custom);
        assert_eq!(ServiceType::parse(""), ServiceType::Custom);
    }

    #[test]
    fn service_type_wire_roundtrip() {
        for ty in [
            ServiceType::WhatsApp,
            ServiceType::Messenger,
            ServiceType::Gmail,
            ServiceType::Custom,
        ] {
            assert_eq!(ServiceType::parse(ty.as_str()), ty);
        }
    }

    #[test]
    fn unknown_wire_type_deserializes_to_custom() {
        let ty: ServiceType = serde_json::from_str("\"carrier-pigeon\"").unwrap();
        assert_eq!(ty, ServiceType::Custom);
    }

    #[test]
    fn alignment_serialization() {
        assert_eq!(serde_json::to_string(&Alignment::Left).unwrap(), "\"left\"");
        let align: Alignment = serde_json::from_str("\"right\"").unwrap();
        assert_eq!(align, Alignment::Right);
    }

    #[test]
    fn service_serialization_roundtrip() {
        let svc = Service::new("Personal", "https://web.whatsapp.com/", ServiceType::WhatsApp);
        let json = serde_json::to_string(&svc).unwrap();
        let back: Service = serde_json::from_str(&json).unwrap();
        assert_eq!(back, svc);
    }
}
