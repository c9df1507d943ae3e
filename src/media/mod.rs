//! Media frame types and the transport-abstraction boundary.

pub mod frame;
pub mod transport;

pub use frame::{AudioEvent, AudioFormat, ReleaseGuard, UnmixedSubBuffer, VideoEvent};
pub use transport::{MediaSink, MockVideoControl, VideoControl, VideoKind};
