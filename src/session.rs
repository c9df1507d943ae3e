//! Session host: owns the router and pool for one call's media lifetime.

use crate::channel::ChannelPool;
use crate::config::Config;
use crate::engine::EngineFactory;
use crate::error::{CallscribeError, Result};
use crate::events::{EventCategory, EventSink};
use crate::media::{AudioEvent, MediaSink, VideoControl, VideoEvent, VideoKind};
use crate::roster::{Roster, SpeakerDirectory};
use crate::router::AudioRouter;
use std::sync::Arc;

struct VideoSubscriptions {
    control: Arc<dyn VideoControl>,
    video_sockets: usize,
    screen_share_sockets: usize,
}

/// One media session: channel pool, router, video subscription state.
///
/// Created when the call's media session starts, torn down when it ends.
/// The transport drives it through [`MediaSink`]; call control drives video
/// subscriptions and teardown.
pub struct SessionHost {
    session_id: String,
    router: AudioRouter,
    video: Option<VideoSubscriptions>,
    sink: Arc<dyn EventSink>,
    torn_down: bool,
}

impl SessionHost {
    /// Starts the channel pool and router for a new session.
    ///
    /// Slots whose engine fails to start leave the session degraded, not
    /// failed; the pool may come up with fewer usable channels than
    /// configured.
    pub fn new(
        session_id: impl Into<String>,
        config: &Config,
        factory: &dyn EngineFactory,
        roster: Roster,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let session_id = session_id.into();
        let pool = ChannelPool::start(
            &session_id,
            config.session.pool_size,
            factory,
            config.speech.start_timeout(),
            config.speech.stop_timeout(),
            sink.clone(),
        );
        sink.publish(
            EventCategory::SessionLifecycle,
            &format!(
                "{session_id} session started, {}/{} channels usable",
                pool.usable(),
                pool.size()
            ),
        );
        let router = AudioRouter::new(
            pool,
            SpeakerDirectory::new(roster),
            config.session.routing_mode,
            config.session.idle_release_ticks,
            sink.clone(),
        );
        Self {
            session_id,
            router,
            video: None,
            sink,
            torn_down: false,
        }
    }

    /// Attaches the transport's video controls with per-kind socket counts.
    pub fn with_video_control(
        mut self,
        control: Arc<dyn VideoControl>,
        video_sockets: usize,
        screen_share_sockets: usize,
    ) -> Self {
        self.video = Some(VideoSubscriptions {
            control,
            video_sockets,
            screen_share_sockets,
        });
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The router, for inspecting pool state.
    pub fn router(&self) -> &AudioRouter {
        &self.router
    }

    /// Subscribes a video socket to a participant's source.
    ///
    /// Validates the socket index against the transport's socket count for
    /// the requested kind before calling out.
    pub fn subscribe_video(&self, kind: VideoKind, source_id: u32, socket_id: u32) -> Result<()> {
        let video = self.video_subscriptions(kind, socket_id)?;
        video.control.subscribe(kind, source_id, socket_id)
    }

    /// Unsubscribes a video socket.
    pub fn unsubscribe_video(&self, kind: VideoKind, socket_id: u32) -> Result<()> {
        let video = self.video_subscriptions(kind, socket_id)?;
        video.control.unsubscribe(kind, socket_id)
    }

    fn video_subscriptions(&self, kind: VideoKind, socket_id: u32) -> Result<&VideoSubscriptions> {
        let video = self
            .video
            .as_ref()
            .ok_or_else(|| CallscribeError::InvalidSubscription {
                message: "session has no video control".to_string(),
            })?;
        let sockets = match kind {
            VideoKind::Video => video.video_sockets,
            VideoKind::ScreenShare => video.screen_share_sockets,
        };
        if socket_id as usize >= sockets {
            return Err(CallscribeError::InvalidSubscription {
                message: format!("socket {socket_id} out of range for {kind} ({sockets} sockets)"),
            });
        }
        Ok(video)
    }

    /// Disposes every live channel. Idempotent; per-channel failures are
    /// logged and never stop the remaining cleanup.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.sink.publish(
            EventCategory::SessionLifecycle,
            &format!("{} >> tearing down session", self.session_id),
        );
        self.router.dispose();
        self.sink.publish(
            EventCategory::SessionLifecycle,
            &format!("{} << session torn down", self.session_id),
        );
    }
}

impl MediaSink for SessionHost {
    fn on_audio_event(&mut self, event: AudioEvent<'_>) {
        if self.torn_down {
            tracing::warn!(session = %self.session_id, "audio event after teardown, dropping");
            return;
        }
        self.router.route(event);
    }

    fn on_video_event(&mut self, kind: VideoKind, event: VideoEvent<'_>) {
        // Received, logged, discarded. The release guard fires on drop.
        let category = match kind {
            VideoKind::Video => EventCategory::Video,
            VideoKind::ScreenShare => EventCategory::ScreenShare,
        };
        self.sink.publish(
            category,
            &format!(
                "{kind} frame on socket {}, {} bytes",
                event.socket_id,
                event.data.len()
            ),
        );
    }
}

impl Drop for SessionHost {
    fn drop(&mut self) {
        self.teardown();
    }
}
