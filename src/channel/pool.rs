//! Fixed pool of transcription channel slots.
//!
//! The pool is mechanical: it owns the slots, their speaker bindings, and
//! their idle counters. Assignment policy (who gets a slot, when a slot is
//! released) lives in the router.

use crate::channel::transcription::TranscriptionChannel;
use crate::engine::EngineFactory;
use crate::events::{EventCategory, EventSink};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Identity a channel slot is bound to.
///
/// Unresolved speakers are keyed by their media-stream source id, so two
/// different unresolved speakers never share a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeakerBinding {
    /// Speaker resolved to a roster display name.
    Named(String),
    /// Speaker not found in the roster, keyed by source id.
    Unresolved(u32),
}

impl SpeakerBinding {
    /// Display name used to tag transcripts; unresolved speakers stay untagged.
    pub fn display_name(&self) -> Option<&str> {
        match self {
            SpeakerBinding::Named(name) => Some(name),
            SpeakerBinding::Unresolved(_) => None,
        }
    }
}

impl fmt::Display for SpeakerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeakerBinding::Named(name) => write!(f, "{name}"),
            SpeakerBinding::Unresolved(source_id) => write!(f, "msi:{source_id}"),
        }
    }
}

/// One pool slot: a channel (if it started), its binding, and idle age.
struct ChannelSlot {
    channel: Option<TranscriptionChannel>,
    binding: Option<SpeakerBinding>,
    idle_ticks: u32,
}

/// Fixed-size pool of transcription channels.
///
/// Slots whose engine session fails to start are dead for the session's
/// lifetime: never bound, never backfilled, never retried.
pub struct ChannelPool {
    slots: Vec<ChannelSlot>,
}

impl ChannelPool {
    /// Starts `size` channels labeled `"{session_id}-{slot}"`.
    ///
    /// A slot whose engine fails to construct or start is logged and left
    /// dead; the pool continues with reduced capacity.
    pub fn start(
        session_id: &str,
        size: usize,
        factory: &dyn EngineFactory,
        start_timeout: Duration,
        stop_timeout: Duration,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let mut slots = Vec::with_capacity(size);
        for index in 0..size {
            let label = format!("{session_id}-{index}");
            let channel = factory
                .create(&label)
                .and_then(|engine| {
                    TranscriptionChannel::start(
                        &label,
                        engine,
                        start_timeout,
                        stop_timeout,
                        sink.clone(),
                    )
                })
                .map_err(|e| {
                    tracing::warn!(%label, error = %e, "channel slot failed to start");
                    sink.publish(
                        EventCategory::Error,
                        &format!("{label} channel failed to start: {e}"),
                    );
                })
                .ok();
            slots.push(ChannelSlot {
                channel,
                binding: None,
                idle_ticks: 0,
            });
        }
        Self { slots }
    }

    /// Configured pool size, dead slots included.
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots with a live channel.
    pub fn usable(&self) -> usize {
        self.slots.iter().filter(|s| s.channel.is_some()).count()
    }

    /// True if the slot has a live channel.
    pub fn is_usable(&self, index: usize) -> bool {
        self.slots
            .get(index)
            .is_some_and(|s| s.channel.is_some())
    }

    /// Current binding of a slot.
    pub fn binding(&self, index: usize) -> Option<&SpeakerBinding> {
        self.slots.get(index).and_then(|s| s.binding.as_ref())
    }

    /// Idle age of a slot, in ticks.
    pub fn idle_ticks(&self, index: usize) -> u32 {
        self.slots.get(index).map_or(0, |s| s.idle_ticks)
    }

    /// Finds the slot currently bound to `binding`.
    pub fn find_bound(&self, binding: &SpeakerBinding) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.binding.as_ref() == Some(binding))
    }

    /// Finds the lowest-index usable slot with no binding.
    pub fn first_unbound(&self) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.channel.is_some() && s.binding.is_none())
    }

    /// Binds a slot to a speaker and resets its idle age.
    pub fn bind(&mut self, index: usize, binding: SpeakerBinding) {
        if let Some(slot) = self.slots.get_mut(index) {
            if let Some(channel) = &slot.channel {
                channel.bind_speaker(binding.display_name().map(str::to_string));
                tracing::debug!(label = channel.label(), speaker = %binding, "slot bound");
            }
            slot.binding = Some(binding);
            slot.idle_ticks = 0;
        }
    }

    /// Releases a slot's binding, returning it to the free set.
    pub fn release(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            if let (Some(channel), Some(binding)) = (&slot.channel, &slot.binding) {
                tracing::debug!(label = channel.label(), speaker = %binding, "slot released");
                channel.bind_speaker(None);
            }
            slot.binding = None;
            slot.idle_ticks = 0;
        }
    }

    /// Resets a slot's idle age after it carried real audio this tick.
    pub fn touch(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.idle_ticks = 0;
        }
    }

    /// Ages a slot by one idle tick and returns its new age.
    pub fn tick_idle(&mut self, index: usize) -> u32 {
        match self.slots.get_mut(index) {
            Some(slot) => {
                slot.idle_ticks = slot.idle_ticks.saturating_add(1);
                slot.idle_ticks
            }
            None => 0,
        }
    }

    /// Pushes bytes into a slot's channel; a dead slot is a no-op.
    pub fn push(&self, index: usize, bytes: &[u8]) {
        if let Some(channel) = self.slots.get(index).and_then(|s| s.channel.as_ref()) {
            channel.push(bytes);
        }
    }

    /// Disposes every live channel. Idempotent.
    pub fn dispose_all(&mut self) {
        for slot in &mut self.slots {
            if let Some(mut channel) = slot.channel.take() {
                channel.dispose();
            }
            slot.binding = None;
            slot.idle_ticks = 0;
        }
    }
}

impl Drop for ChannelPool {
    fn drop(&mut self) {
        self.dispose_all();
    }
}
