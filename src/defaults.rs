//! Default configuration constants for callscribe.
//!
//! Shared constants used across configuration types to ensure consistency
//! and eliminate duplication.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and matches what the
/// conferencing transport delivers on the audio socket.
pub const SAMPLE_RATE: u32 = 16000;

/// Default channel count for delivered audio frames.
pub const CHANNELS: u16 = 1;

/// Default bit depth for delivered PCM frames.
pub const BITS_PER_SAMPLE: u16 = 16;

/// Default number of transcription channel slots.
///
/// The transport delivers at most this many unmixed per-speaker sub-buffers
/// in a single audio event; additional concurrent speakers are dropped for
/// that tick rather than growing the pool.
pub const POOL_SIZE: usize = 4;

/// Default recognition-engine startup confirmation timeout in milliseconds.
///
/// A channel whose engine does not confirm startup within this window is
/// marked permanently unusable. It is never retried — the session continues
/// degraded on the remaining slots.
pub const START_TIMEOUT_MS: u64 = 5000;

/// Default engine session-stop confirmation timeout in milliseconds.
///
/// Disposal waits this long for the engine to acknowledge the stop, then
/// abandons the wait so session teardown can proceed to the next channel.
pub const STOP_TIMEOUT_MS: u64 = 2000;

/// Default number of consecutive silence ticks before a speaker binding
/// is released.
///
/// A binding survives the current and the immediately preceding event; a
/// speaker silent for this many ticks frees the slot for new speakers.
pub const IDLE_RELEASE_TICKS: u32 = 2;

/// Default recognition service region.
pub const REGION: &str = "eastus";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        assert!(POOL_SIZE >= 1);
        assert!(IDLE_RELEASE_TICKS >= 1);
        assert!(START_TIMEOUT_MS > 0);
        assert!(STOP_TIMEOUT_MS > 0);
        assert_eq!(SAMPLE_RATE, 16000);
    }
}
