//! Static catalog of known provider profiles.
//!
//! Each known [`ServiceType`] carries the defaults the shell needs when it
//! instantiates a session for that provider: URL template, unread-signal
//! shape, and a handful of behavioral flags. Custom services get the
//! fallback profile.

use super::ServiceType;

/// Placeholder token in team-scoped URL templates, e.g.
/// `https://___.slack.com/`.
pub const URL_PLACEHOLDER: &str = "___";

/// How a provider signals unread messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnreadSignal {
    /// Page title carries a leading `(<digits>)` count; absent means zero.
    TitleCount,
    /// The bracketed count is transient: it only ever grows, and clears on
    /// an exact match with the provider's idle title.
    StickyCount {
        /// Canonical title when nothing is unread.
        idle_title: &'static str,
    },
    /// No granularity; a marker substring in the title means "something
    /// unread".
    MarkerFlag {
        /// Substring whose presence signals unread content.
        marker: &'static str,
    },
}

/// Catalog entry for one provider.
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    /// Human-readable provider name.
    pub label: &'static str,
    /// Default URL; may contain [`URL_PLACEHOLDER`] for team-scoped
    /// providers.
    pub url_template: &'static str,
    /// Unread-signal shape for this provider.
    pub unread_signal: UnreadSignal,
    /// The provider blinks its title with a transient count.
    pub title_blink: bool,
    /// The provider raises no notifications of its own, so the shell must.
    pub manual_notifications: bool,
    /// The provider needs pop-up windows (calls, composers).
    pub allow_popups: bool,
    /// User-agent override, where the provider blocks embedded browsers.
    pub user_agent: Option<&'static str>,
}

const FIREFOX_UA: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:70.0) Gecko/20100101 Firefox/70.0";

const CUSTOM_PROFILE: ProviderProfile = ProviderProfile {
    label: "Custom Service",
    url_template: URL_PLACEHOLDER,
    unread_signal: UnreadSignal::TitleCount,
    title_blink: false,
    manual_notifications: false,
    allow_popups: false,
    user_agent: None,
};

/// Looks up the profile for a provider type.
pub fn profile(service_type: ServiceType) -> &'static ProviderProfile {
    match service_type {
        ServiceType::WhatsApp => &ProviderProfile {
            label: "WhatsApp",
            url_template: "https://web.whatsapp.com/",
            unread_signal: UnreadSignal::StickyCount {
                idle_title: "WhatsApp",
            },
            title_blink: false,
            manual_notifications: false,
            allow_popups: false,
            user_agent: None,
        },
        ServiceType::Messenger => &ProviderProfile {
            label: "Messenger",
            url_template: "https://www.messenger.com/login/",
            unread_signal: UnreadSignal::StickyCount {
                idle_title: "Messenger",
            },
            title_blink: true,
            manual_notifications: false,
            allow_popups: false,
            user_agent: None,
        },
        ServiceType::Telegram => &ProviderProfile {
            label: "Telegram",
            url_template: "https://web.telegram.org/",
            unread_signal: UnreadSignal::StickyCount {
                idle_title: "Telegram Web",
            },
            title_blink: false,
            manual_notifications: true,
            allow_popups: false,
            user_agent: None,
        },
        ServiceType::Slack => &ProviderProfile {
            label: "Slack",
            url_template: "https://___.slack.com/",
            unread_signal: UnreadSignal::TitleCount,
            title_blink: false,
            manual_notifications: false,
            allow_popups: true,
            user_agent: None,
        },
        ServiceType::Skype => &ProviderProfile {
            label: "Skype",
            url_template: "https://web.skype.com/",
            unread_signal: UnreadSignal::TitleCount,
            title_blink: true,
            manual_notifications: true,
            allow_popups: false,
            user_agent: Some(FIREFOX_UA),
        },
        ServiceType::Hangouts => &ProviderProfile {
            label: "Hangouts",
            url_template: "https://hangouts.google.com/",
            unread_signal: UnreadSignal::MarkerFlag { marker: "\u{25cf}" },
            title_blink: false,
            manual_notifications: false,
            allow_popups: true,
            user_agent: None,
        },
        ServiceType::Gmail => &ProviderProfile {
            label: "Gmail",
            url_template: "https://mail.google.com/",
            unread_signal: UnreadSignal::TitleCount,
            title_blink: false,
            manual_notifications: false,
            allow_popups: false,
            user_agent: None,
        },
        ServiceType::Discord => &ProviderProfile {
            label: "Discord",
            url_template: "https://discord.com/login",
            unread_signal: UnreadSignal::TitleCount,
            title_blink: false,
            manual_notifications: false,
            allow_popups: false,
            user_agent: None,
        },
        ServiceType::Outlook => &ProviderProfile {
            label: "Outlook",
            url_template: "https://outlook.live.com/",
            unread_signal: UnreadSignal::TitleCount,
            title_blink: true,
            manual_notifications: false,
            allow_popups: false,
            user_agent: None,
        },
        ServiceType::RocketChat => &ProviderProfile {
            label: "Rocket.Chat",
            url_template: "https://___.rocket.chat/",
            unread_signal: UnreadSignal::TitleCount,
            title_blink: false,
            manual_notifications: false,
            allow_popups: false,
            user_agent: None,
        },
        ServiceType::Mattermost => &ProviderProfile {
            label: "Mattermost",
            url_template: URL_PLACEHOLDER,
            unread_signal: UnreadSignal::TitleCount,
            title_blink: false,
            manual_notifications: false,
            allow_popups: false,
            user_agent: None,
        },
        ServiceType::Custom => &CUSTOM_PROFILE,
    }
}

/// Expands the `___` placeholder in a URL template with a team name.
///
/// Templates without the placeholder are returned unchanged; a template
/// that is *only* the placeholder expects a full URL in its place.
pub fn expand_url(template: &str, team: &str) -> String {
    if template == URL_PLACEHOLDER {
        team.to_owned()
    } else {
        template.replace(URL_PLACEHOLDER, team)
    }
}
