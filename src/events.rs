//! Outward event sink.
//!
//! Everything this crate reports — transcripts, lifecycle transitions,
//! failures — leaves through an [`EventSink`]. Delivery is fire-and-forget:
//! a sink must never block or fail the audio path.

use std::fmt;
use std::sync::Mutex;

/// Category tag attached to every published event record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    /// Session and channel lifecycle transitions.
    SessionLifecycle,
    /// Interim recognition result from an engine.
    Recognizing,
    /// Finalized recognition result from an engine.
    Recognized,
    /// Engine-reported cancellation.
    Canceled,
    /// Non-fatal failure (capacity, push, disposal).
    Error,
    /// Video frame received and discarded.
    Video,
    /// Screen-share frame received and discarded.
    ScreenShare,
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            EventCategory::SessionLifecycle => "SESSION",
            EventCategory::Recognizing => "RECOGNIZING",
            EventCategory::Recognized => "RECOGNIZED",
            EventCategory::Canceled => "CANCELED",
            EventCategory::Error => "ERROR",
            EventCategory::Video => "VIDEO",
            EventCategory::ScreenShare => "SCREENSHARE",
        };
        write!(f, "{}", tag)
    }
}

/// Fire-and-forget sink for structured event records.
pub trait EventSink: Send + Sync {
    /// Publishes one event record. Must not block and must not fail.
    fn publish(&self, category: EventCategory, payload: &str);
}

/// Sink that forwards events to `tracing`, mapping categories to levels.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, category: EventCategory, payload: &str) {
        match category {
            EventCategory::Error => tracing::error!(%category, "{}", payload),
            EventCategory::Canceled => tracing::warn!(%category, "{}", payload),
            EventCategory::Recognizing
            | EventCategory::Video
            | EventCategory::ScreenShare => {
                tracing::debug!(%category, "{}", payload)
            }
            EventCategory::Recognized | EventCategory::SessionLifecycle => {
                tracing::info!(%category, "{}", payload)
            }
        }
    }
}

/// Sink that accumulates events in memory for test assertions.
#[derive(Debug, Default)]
pub struct CollectorSink {
    events: Mutex<Vec<(EventCategory, String)>>,
}

impl CollectorSink {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all collected events in publish order.
    pub fn events(&self) -> Vec<(EventCategory, String)> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Returns payloads of the given category, in publish order.
    pub fn of_category(&self, category: EventCategory) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|(c, _)| *c == category)
            .map(|(_, p)| p)
            .collect()
    }
}

impl EventSink for CollectorSink {
    fn publish(&self, category: EventCategory, payload: &str) {
        // A poisoned lock still holds valid data; recording must not fail.
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((category, payload.to_string()));
    }
}
