//! Live participant roster and speaker resolution.
//!
//! Call control mutates the roster concurrently with audio delivery; lookups
//! treat it as a read-only snapshot per call and tolerate concurrent mutation.
//! Stale reads are acceptable, crashes are not.

use std::sync::{Arc, RwLock};

/// One call participant as known to call control.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    /// Human-readable display name.
    pub display_name: String,
    /// True while the participant waits in the lobby.
    pub in_lobby: bool,
    /// Media-stream source identifiers owned by this participant.
    pub media_stream_ids: Vec<u32>,
}

impl Participant {
    /// Creates an in-call participant with the given stream sources.
    pub fn new(display_name: impl Into<String>, media_stream_ids: Vec<u32>) -> Self {
        Self {
            display_name: display_name.into(),
            in_lobby: false,
            media_stream_ids,
        }
    }

    /// Marks the participant as waiting in the lobby.
    pub fn in_lobby(mut self) -> Self {
        self.in_lobby = true;
        self
    }
}

/// Shared view of the live participant set.
///
/// Cheap to clone; all clones observe the same underlying roster.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    inner: Arc<RwLock<Vec<Participant>>>,
}

impl Roster {
    /// Creates an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the entire participant set.
    pub fn replace(&self, participants: Vec<Participant>) {
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = participants;
    }

    /// Adds one participant.
    pub fn add(&self, participant: Participant) {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(participant);
    }

    /// Removes every participant with the given display name.
    pub fn remove(&self, display_name: &str) {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|p| p.display_name != display_name);
    }

    /// Returns a point-in-time copy of the participant set.
    pub fn snapshot(&self) -> Vec<Participant> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Resolves media-stream source identifiers to speaker identities.
#[derive(Debug, Clone)]
pub struct SpeakerDirectory {
    roster: Roster,
}

impl SpeakerDirectory {
    /// Creates a directory backed by the given roster.
    pub fn new(roster: Roster) -> Self {
        Self { roster }
    }

    /// Resolves a source identifier to a display name.
    ///
    /// Returns `None` when no in-call participant owns the source — a
    /// legitimate, common case (speaker left, still in the lobby, or the MSI
    /// is not yet mapped). O(participants), side-effect free.
    pub fn resolve(&self, source_id: u32) -> Option<String> {
        let guard = self.roster.inner.read().unwrap_or_else(|e| e.into_inner());
        guard
            .iter()
            .find(|p| !p.in_lobby && p.media_stream_ids.contains(&source_id))
            .map(|p| p.display_name.clone())
    }
}
