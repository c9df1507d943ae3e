//! Transcription channel lifecycle and the fixed channel pool.

pub mod pool;
pub mod transcription;

pub use pool::{ChannelPool, SpeakerBinding};
pub use transcription::{ChannelState, TranscriptionChannel};
