//! Transport-abstraction boundary.
//!
//! The conferencing transport delivers media on its own callback threads and
//! exposes subscribe/unsubscribe controls for video sources. This crate only
//! sees the traits below; registration with the real transport happens once,
//! at session construction, outside the router.

use crate::error::Result;
use crate::media::frame::{AudioEvent, VideoEvent};
use std::fmt;

/// Kind of a video media stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoKind {
    /// Participant camera video.
    Video,
    /// Screen-share (view-based screen sharing).
    ScreenShare,
}

impl fmt::Display for VideoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoKind::Video => write!(f, "video"),
            VideoKind::ScreenShare => write!(f, "screenshare"),
        }
    }
}

/// Receiver for media events delivered by the transport.
///
/// Delivery is serialized per session: the transport never invokes
/// `on_audio_event` concurrently for the same session, though the thread may
/// differ between calls. Implementations must return normally — never panic
/// across this boundary — so the transport's delivery loop stays stable.
pub trait MediaSink {
    /// Handles one audio event. The event's buffers are released when the
    /// event drops, on every path.
    fn on_audio_event(&mut self, event: AudioEvent<'_>);

    /// Handles one video or screen-share frame.
    fn on_video_event(&mut self, kind: VideoKind, event: VideoEvent<'_>);
}

/// Subscribe/unsubscribe controls exposed by the transport for video sources.
pub trait VideoControl: Send + Sync {
    /// Subscribes the given socket to a video source.
    fn subscribe(&self, kind: VideoKind, source_id: u32, socket_id: u32) -> Result<()>;

    /// Unsubscribes the given socket.
    fn unsubscribe(&self, kind: VideoKind, socket_id: u32) -> Result<()>;
}

/// Mock video control recording calls for test assertions.
#[derive(Debug, Default)]
pub struct MockVideoControl {
    calls: std::sync::Mutex<Vec<String>>,
    fail: bool,
}

impl MockVideoControl {
    /// Creates a mock that accepts all calls.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the mock to fail every call.
    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Returns recorded calls in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn record(&self, call: String) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }
}

impl VideoControl for MockVideoControl {
    fn subscribe(&self, kind: VideoKind, source_id: u32, socket_id: u32) -> Result<()> {
        if self.fail {
            return Err(crate::error::CallscribeError::InvalidSubscription {
                message: "mock subscription failure".to_string(),
            });
        }
        self.record(format!("subscribe {kind} {source_id} {socket_id}"));
        Ok(())
    }

    fn unsubscribe(&self, kind: VideoKind, socket_id: u32) -> Result<()> {
        if self.fail {
            return Err(crate::error::CallscribeError::InvalidSubscription {
                message: "mock unsubscription failure".to_string(),
            });
        }
        self.record(format!("unsubscribe {kind} {socket_id}"));
        Ok(())
    }
}
