//! callscribe - Real-time audio-channel routing for conference-call transcription
//!
//! Maps a varying set of active speakers onto a fixed pool of transcription
//! channels, keeping every channel's input timeline contiguous via silence
//! backfill, without blocking the transport's audio callback.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod channel;
pub mod config;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod events;
pub mod media;
pub mod roster;
pub mod router;
pub mod session;

pub use channel::{ChannelPool, ChannelState, SpeakerBinding, TranscriptionChannel};
pub use config::{Config, RoutingMode};
pub use engine::{EngineEvent, EngineFactory, SpeechEngine};
pub use error::{CallscribeError, Result};
pub use events::{EventCategory, EventSink, TracingSink};
pub use media::{AudioEvent, AudioFormat, MediaSink, UnmixedSubBuffer, VideoControl, VideoEvent, VideoKind};
pub use roster::{Participant, Roster, SpeakerDirectory};
pub use router::AudioRouter;
pub use session::SessionHost;
