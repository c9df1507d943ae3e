//! Frame types delivered by the conferencing transport.
//!
//! Audio and video events borrow the transport's buffers for the duration of
//! one callback. The lifetime parameter statically prevents retaining
//! transport memory past the callback; bytes a component needs to keep must
//! be copied out. A [`ReleaseGuard`] notifies the transport when the event is
//! dropped, so the per-frame release happens deterministically on every path.

use std::fmt;

/// PCM format descriptor for a delivered audio frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Bits per sample.
    pub bits_per_sample: u16,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: crate::defaults::SAMPLE_RATE,
            channels: crate::defaults::CHANNELS,
            bits_per_sample: crate::defaults::BITS_PER_SAMPLE,
        }
    }
}

impl AudioFormat {
    /// Returns the duration in milliseconds of `byte_len` bytes of PCM in
    /// this format.
    pub fn duration_ms(&self, byte_len: usize) -> u32 {
        let bytes_per_sec =
            self.sample_rate as u64 * self.channels as u64 * (self.bits_per_sample as u64 / 8);
        if bytes_per_sec == 0 {
            return 0;
        }
        ((byte_len as u64 * 1000) / bytes_per_sec) as u32
    }
}

/// Callback invoked exactly once when a transport-owned buffer is released.
pub struct ReleaseGuard(Option<Box<dyn FnOnce() + Send>>);

impl ReleaseGuard {
    /// Creates a guard that runs `release` when the owning event is dropped.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self(Some(Box::new(release)))
    }

    /// Creates a guard with no release action (for transports that manage
    /// buffer lifetimes themselves, and for tests).
    pub fn noop() -> Self {
        Self(None)
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        if let Some(release) = self.0.take() {
            release();
        }
    }
}

impl fmt::Debug for ReleaseGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReleaseGuard")
            .field(&self.0.as_ref().map(|_| "pending").unwrap_or("noop"))
            .finish()
    }
}

/// One per-active-speaker segment within an unmixed audio event.
#[derive(Debug, Clone, Copy)]
pub struct UnmixedSubBuffer<'a> {
    /// Numeric media-stream source identifier tagging the speaker.
    pub active_speaker_id: u32,
    /// Raw PCM bytes, owned by the transport.
    pub data: &'a [u8],
}

/// One audio event delivered on the transport's audio callback.
///
/// `unmixed` is `Some` when the event carries per-speaker sub-buffers; the
/// set size and membership may change between consecutive events.
#[derive(Debug)]
pub struct AudioEvent<'a> {
    pub format: AudioFormat,
    /// Monotonic timestamp supplied by the transport.
    pub timestamp: u64,
    /// True when the mixed buffer represents silence.
    pub is_silence: bool,
    /// The mixed buffer, owned by the transport.
    pub data: &'a [u8],
    /// Per-speaker sub-buffers, in delivered order.
    pub unmixed: Option<Vec<UnmixedSubBuffer<'a>>>,
    /// Fires when the event is dropped.
    pub release: ReleaseGuard,
}

impl<'a> AudioEvent<'a> {
    /// Creates a mixed-buffer event with no release action.
    pub fn mixed(data: &'a [u8], timestamp: u64, is_silence: bool) -> Self {
        Self {
            format: AudioFormat::default(),
            timestamp,
            is_silence,
            data,
            unmixed: None,
            release: ReleaseGuard::noop(),
        }
    }

    /// Creates an event carrying unmixed sub-buffers with no release action.
    pub fn with_unmixed(
        data: &'a [u8],
        timestamp: u64,
        unmixed: Vec<UnmixedSubBuffer<'a>>,
    ) -> Self {
        Self {
            format: AudioFormat::default(),
            timestamp,
            is_silence: false,
            data,
            unmixed: Some(unmixed),
            release: ReleaseGuard::noop(),
        }
    }

    /// Attaches a release action fired when the event is dropped.
    pub fn with_release(mut self, release: impl FnOnce() + Send + 'static) -> Self {
        self.release = ReleaseGuard::new(release);
        self
    }
}

/// One video or screen-share frame. Received, logged, discarded.
#[derive(Debug)]
pub struct VideoEvent<'a> {
    /// Transport socket the frame arrived on.
    pub socket_id: u32,
    /// Raw frame bytes, owned by the transport.
    pub data: &'a [u8],
    /// Fires when the event is dropped.
    pub release: ReleaseGuard,
}

impl<'a> VideoEvent<'a> {
    /// Creates a video event with no release action.
    pub fn new(socket_id: u32, data: &'a [u8]) -> Self {
        Self {
            socket_id,
            data,
            release: ReleaseGuard::noop(),
        }
    }
}
