//! Audio router: speaker-to-channel assignment and silence backfill.
//!
//! Invoked synchronously on the transport's audio callback. Per-session
//! delivery is serialized by the transport, so slot bindings need no locking
//! here; the only blocking anywhere is the channel-start handshake at session
//! construction. Nothing on this path panics or propagates errors outward.

use crate::channel::{ChannelPool, SpeakerBinding};
use crate::config::RoutingMode;
use crate::events::{EventCategory, EventSink};
use crate::media::AudioEvent;
use crate::roster::SpeakerDirectory;
use std::sync::Arc;

/// Routes delivered audio events onto the fixed channel pool.
///
/// In unmixed mode each per-speaker sub-buffer goes to the slot bound to that
/// speaker (claiming a free slot on first appearance), and every usable slot
/// with no real audio this tick receives a silence buffer, so each channel's
/// input timeline stays contiguous. In mixed mode the whole buffer goes to a
/// single default channel.
pub struct AudioRouter {
    pool: ChannelPool,
    directory: SpeakerDirectory,
    mode: RoutingMode,
    idle_release_ticks: u32,
    /// Zero-filled buffer captured from the first observed silent frame and
    /// reused for all backfill pushes.
    silence: Option<Vec<u8>>,
    sink: Arc<dyn EventSink>,
}

impl AudioRouter {
    pub fn new(
        pool: ChannelPool,
        directory: SpeakerDirectory,
        mode: RoutingMode,
        idle_release_ticks: u32,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            pool,
            directory,
            mode,
            idle_release_ticks,
            silence: None,
            sink,
        }
    }

    /// Routes one audio event. Best-effort: failures on one channel never
    /// stop delivery to the remaining channels this tick, and the transport
    /// buffer is released when `event` drops, on every path.
    pub fn route(&mut self, event: AudioEvent<'_>) {
        match self.mode {
            RoutingMode::Mixed => self.route_mixed(&event),
            RoutingMode::Unmixed => self.route_unmixed(&event),
        }
    }

    /// Mixed mode: one default transcription path, fed unconditionally.
    fn route_mixed(&mut self, event: &AudioEvent<'_>) {
        if let Some(slot) = (0..self.pool.size()).find(|&i| self.pool.is_usable(i)) {
            self.pool.push(slot, event.data);
        }
    }

    fn route_unmixed(&mut self, event: &AudioEvent<'_>) {
        if event.is_silence && self.silence.is_none() {
            self.silence = Some(vec![0u8; event.data.len()]);
            tracing::debug!(len = event.data.len(), "silence template captured");
        }

        let mut pending: Vec<usize> = (0..self.pool.size())
            .filter(|&i| self.pool.is_usable(i))
            .collect();

        if let Some(subs) = &event.unmixed {
            for sub in subs {
                let binding = match self.directory.resolve(sub.active_speaker_id) {
                    Some(name) => SpeakerBinding::Named(name),
                    None => SpeakerBinding::Unresolved(sub.active_speaker_id),
                };

                let slot = match self.pool.find_bound(&binding) {
                    Some(slot) => slot,
                    None => match self.pool.first_unbound() {
                        Some(slot) => {
                            self.pool.bind(slot, binding.clone());
                            slot
                        }
                        None => {
                            tracing::warn!(
                                speaker = %binding,
                                len = sub.data.len(),
                                "no free channel, dropping sub-buffer"
                            );
                            self.sink.publish(
                                EventCategory::Error,
                                &format!("routing capacity exceeded, dropped audio for {binding}"),
                            );
                            continue;
                        }
                    },
                };

                self.pool.push(slot, sub.data);
                self.pool.touch(slot);
                pending.retain(|&i| i != slot);
            }
        }

        self.backfill(event, &pending);

        // Bound slots that carried no real audio this tick age toward release.
        for slot in pending {
            if self.pool.binding(slot).is_some()
                && self.pool.tick_idle(slot) >= self.idle_release_ticks
            {
                self.pool.release(slot);
            }
        }
    }

    /// Pushes silence into every slot that received no speech this tick.
    fn backfill(&mut self, event: &AudioEvent<'_>, pending: &[usize]) {
        if pending.is_empty() {
            return;
        }
        match &self.silence {
            Some(template) => {
                for &slot in pending {
                    self.pool.push(slot, template);
                }
            }
            None => {
                // No silent frame observed yet; synthesize zeros sized to
                // this event's sub-buffer (or mixed-buffer) length.
                let len = event
                    .unmixed
                    .as_ref()
                    .and_then(|subs| subs.first())
                    .map_or(event.data.len(), |sub| sub.data.len());
                let zeros = vec![0u8; len];
                for &slot in pending {
                    self.pool.push(slot, &zeros);
                }
            }
        }
    }

    /// Disposes every channel in the pool. Idempotent.
    pub fn dispose(&mut self) {
        self.pool.dispose_all();
    }

    /// The underlying channel pool.
    pub fn pool(&self) -> &ChannelPool {
        &self.pool
    }
}
