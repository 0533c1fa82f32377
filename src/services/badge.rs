//! Dock and tray badge rendering.
//!
//! Turns the aggregate unread total into a short human-readable label
//! (`"42"`, `"2K"`, `"1M"`) and a flat disc image description the
//! embedder rasterizes. The renderer deduplicates by raw count, so a
//! burst of title churn that lands on the same total repaints nothing.

use tracing::debug;

use crate::app::events::EventBus;

/// Magnitude suffixes, largest first so the scan picks the tightest one.
const SUFFIXES: [(u64, &str); 6] = [
    (1_000_000_000_000_000_000, "P"),
    (1_000_000_000_000_000, "E"),
    (1_000_000_000_000, "T"),
    (1_000_000_000, "G"),
    (1_000_000, "M"),
    (1_000, "K"),
];

/// Formats a raw unread total for the badge. Zero renders no badge at
/// all, counts under 1000 render verbatim, and larger counts collapse to
/// at most one leading group plus a magnitude suffix, rounded to nearest.
pub fn format_count(count: u64) -> Option<String> {
    if count == 0 {
        return None;
    }
    for (scale, suffix) in SUFFIXES {
        if count >= scale {
            let rounded = (count + scale / 2) / scale;
            return Some(format!("{rounded}{suffix}"));
        }
    }
    Some(count.to_string())
}

/// Text size tier for the disc, keyed by label length. Longer labels get
/// smaller glyphs so they stay inside the disc.
fn font_px(text: &str) -> u32 {
    match text.chars().count() {
        0 | 1 => 32,
        2 => 26,
        _ => 20,
    }
}

/// A rasterizable badge: white text centered on a flat red disc.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeImage {
    pub text: String,
    pub font_px: u32,
    pub diameter_px: u32,
    pub background_rgba: [u8; 4],
    pub text_rgba: [u8; 4],
}

impl BadgeImage {
    fn for_label(text: String) -> Self {
        let font_px = font_px(&text);
        Self {
            text,
            font_px,
            diameter_px: 44,
            background_rgba: [0xd3, 0x2f, 0x2f, 0xff],
            text_rgba: [0xff, 0xff, 0xff, 0xff],
        }
    }
}

/// Platform surface that displays the badge. `None` clears it.
pub trait BadgeSink: Send {
    fn apply(&mut self, image: Option<&BadgeImage>, raw_count: u64);
}

/// Listens for aggregate unread changes and repaints the badge when the
/// raw count actually moved.
pub struct BadgeRenderer {
    sink: Box<dyn BadgeSink>,
    last: Option<u64>,
}

impl BadgeRenderer {
    pub fn new(sink: Box<dyn BadgeSink>) -> Self {
        Self { sink, last: None }
    }

    /// Pushes a new aggregate total to the sink. Repeated totals are
    /// dropped without touching the sink.
    pub fn publish(&mut self, count: u64) {
        if self.last == Some(count) {
            return;
        }
        self.last = Some(count);
        let image = format_count(count).map(BadgeImage::for_label);
        debug!(count, label = ?image.as_ref().map(|i| i.text.as_str()), "badge repaint");
        self.sink.apply(image.as_ref(), count);
    }
}

/// Wires a renderer to the event bus so every `UnreadCountChanged`
/// repaints. Returns the subscription id for teardown.
pub fn subscribe_badge(
    events: &EventBus,
    renderer: std::sync::Arc<std::sync::Mutex<BadgeRenderer>>,
) -> crate::app::events::SubscriberId {
    events.subscribe(move |event| {
        if let crate::app::events::AppEvent::UnreadCountChanged(total) = event {
            renderer.lock().unwrap().publish(*total);
        }
    })
}
