//! One transcription channel: a stateful recognition session plus the
//! forwarder that tags its results with the currently bound speaker.

use crate::engine::{EngineEvent, SpeechEngine};
use crate::error::{CallscribeError, Result};
use crate::events::{EventCategory, EventSink};
use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Lifecycle of a transcription channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Uninitialized,
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// Wraps one recognition engine session.
///
/// Construction starts the engine and waits for its startup confirmation
/// with a bounded timeout; a channel that fails to construct is never retried.
/// Engine events are consumed on a dedicated forwarder thread and published to
/// the event sink tagged with whichever speaker is bound *at callback time* —
/// an accepted approximation, since engines expose no push-time provenance.
pub struct TranscriptionChannel {
    label: String,
    engine: Arc<Mutex<Box<dyn SpeechEngine>>>,
    state: Arc<Mutex<ChannelState>>,
    speaker: Arc<Mutex<Option<String>>>,
    stopped_rx: Receiver<()>,
    stop_timeout: Duration,
    sink: Arc<dyn EventSink>,
    forwarder: Option<JoinHandle<()>>,
}

impl TranscriptionChannel {
    /// Starts a channel over the given engine session.
    ///
    /// Blocks until the engine confirms startup or `start_timeout` elapses.
    /// On timeout or a terminal cancellation during startup, returns an error
    /// and the caller marks the slot permanently unusable.
    pub fn start(
        label: impl Into<String>,
        mut engine: Box<dyn SpeechEngine>,
        start_timeout: Duration,
        stop_timeout: Duration,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let label = label.into();
        sink.publish(
            EventCategory::SessionLifecycle,
            &format!("{label} >> starting transcription channel"),
        );

        let state = Arc::new(Mutex::new(ChannelState::Uninitialized));
        let (events_tx, events_rx) = unbounded();

        set_state(&state, ChannelState::Starting);
        engine.start(events_tx)?;

        // Wait for the engine's startup confirmation, consuming (and logging)
        // any stray events that arrive first.
        let deadline = Instant::now() + start_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match events_rx.recv_timeout(remaining) {
                Ok(EngineEvent::SessionStarted) => break,
                Ok(EngineEvent::Canceled {
                    is_error: true,
                    message,
                }) => {
                    set_state(&state, ChannelState::Stopped);
                    return Err(CallscribeError::EngineStart { label, message });
                }
                Ok(other) => {
                    tracing::debug!(%label, event = ?other, "event before startup confirmation");
                }
                Err(_) => {
                    set_state(&state, ChannelState::Stopped);
                    return Err(CallscribeError::EngineStartTimeout {
                        label,
                        timeout_ms: start_timeout.as_millis() as u64,
                    });
                }
            }
        }

        set_state(&state, ChannelState::Running);

        let engine = Arc::new(Mutex::new(engine));
        let speaker = Arc::new(Mutex::new(None));
        let (stopped_tx, stopped_rx) = bounded(1);

        let forwarder = {
            let label = label.clone();
            let engine = engine.clone();
            let state = state.clone();
            let speaker = speaker.clone();
            let sink = sink.clone();
            thread::spawn(move || {
                forward_events(label, events_rx, engine, state, speaker, sink, stopped_tx);
            })
        };

        sink.publish(
            EventCategory::SessionLifecycle,
            &format!("{label} << transcription channel running"),
        );

        Ok(Self {
            label,
            engine,
            state,
            speaker,
            stopped_rx,
            stop_timeout,
            sink,
            forwarder: Some(forwarder),
        })
    }

    /// Channel label (session id + slot index).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ChannelState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Binds the speaker label attached to future transcript events.
    pub fn bind_speaker(&self, name: Option<String>) {
        *self.speaker.lock().unwrap_or_else(|e| e.into_inner()) = name;
    }

    /// Currently bound speaker label, if any.
    pub fn speaker(&self) -> Option<String> {
        self.speaker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Appends PCM bytes to the engine's input stream.
    ///
    /// Safe to call from the transport callback thread; never blocks on
    /// recognition and never propagates failure. A push on a channel that is
    /// not running is a logged no-op.
    pub fn push(&self, bytes: &[u8]) {
        {
            let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if *state != ChannelState::Running {
                tracing::warn!(
                    label = %self.label,
                    state = ?*state,
                    len = bytes.len(),
                    "push on non-running channel, dropping"
                );
                return;
            }
        }

        let mut engine = self.engine.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = engine.push(bytes) {
            tracing::warn!(label = %self.label, error = %e, "engine push failed");
            self.sink.publish(
                EventCategory::Error,
                &format!("{} push failed: {e}", self.label),
            );
        }
    }

    /// Stops the engine session and releases its resources.
    ///
    /// Idempotent; waits for the engine's stop confirmation up to the stop
    /// timeout, then abandons the wait so teardown can proceed. Safe to call
    /// while a push is in flight — later pushes become logged no-ops.
    pub fn dispose(&mut self) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if matches!(*state, ChannelState::Stopping | ChannelState::Stopped) {
                return;
            }
            *state = ChannelState::Stopping;
        }

        self.sink.publish(
            EventCategory::SessionLifecycle,
            &format!("{} >> disposing transcription channel", self.label),
        );

        {
            let mut engine = self.engine.lock().unwrap_or_else(|e| e.into_inner());
            if let Err(e) = engine.stop() {
                tracing::warn!(label = %self.label, error = %e, "engine stop failed");
                self.sink.publish(
                    EventCategory::Error,
                    &format!("{} engine stop failed: {e}", self.label),
                );
            }
        }

        if self.stopped_rx.recv_timeout(self.stop_timeout).is_err() {
            tracing::warn!(
                label = %self.label,
                "no stop confirmation within {}ms, abandoning wait",
                self.stop_timeout.as_millis()
            );
        }

        // The forwarder exits once the engine closes its event stream; join
        // it only if already finished, otherwise detach.
        if let Some(handle) = self.forwarder.take()
            && handle.is_finished()
        {
            let _ = handle.join();
        }

        set_state(&self.state, ChannelState::Stopped);
        self.sink.publish(
            EventCategory::SessionLifecycle,
            &format!("{} << transcription channel disposed", self.label),
        );
    }
}

impl Drop for TranscriptionChannel {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn set_state(state: &Arc<Mutex<ChannelState>>, next: ChannelState) {
    *state.lock().unwrap_or_else(|e| e.into_inner()) = next;
}

/// Consumes engine events on the forwarder thread, tagging transcripts with
/// the currently bound speaker and publishing them to the sink.
fn forward_events(
    label: String,
    events_rx: Receiver<EngineEvent>,
    engine: Arc<Mutex<Box<dyn SpeechEngine>>>,
    state: Arc<Mutex<ChannelState>>,
    speaker: Arc<Mutex<Option<String>>>,
    sink: Arc<dyn EventSink>,
    stopped_tx: Sender<()>,
) {
    while let Ok(event) = events_rx.recv() {
        match event {
            EngineEvent::Partial(text) => {
                sink.publish(EventCategory::Recognizing, &tagged(&speaker, &text));
            }
            EngineEvent::Final(text) => {
                sink.publish(EventCategory::Recognized, &tagged(&speaker, &text));
            }
            EngineEvent::Canceled { is_error, message } => {
                sink.publish(
                    EventCategory::Canceled,
                    &format!("{label} recognition canceled: {message}"),
                );
                if is_error {
                    // Terminal for this channel only; siblings continue.
                    set_state(&state, ChannelState::Stopping);
                    {
                        let mut engine = engine.lock().unwrap_or_else(|e| e.into_inner());
                        if let Err(e) = engine.stop() {
                            tracing::warn!(%label, error = %e, "engine stop after cancellation failed");
                        }
                    }
                    set_state(&state, ChannelState::Stopped);
                    break;
                }
            }
            EngineEvent::SessionStopped => {
                sink.publish(
                    EventCategory::SessionLifecycle,
                    &format!("{label} recognition session stopped"),
                );
                break;
            }
            EngineEvent::SessionStarted => {
                tracing::debug!(%label, "duplicate startup confirmation ignored");
            }
        }
    }
    let _ = stopped_tx.try_send(());
}

fn tagged(speaker: &Arc<Mutex<Option<String>>>, text: &str) -> String {
    match speaker
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .as_deref()
    {
        Some(name) => format!("{name}: {text}"),
        None => text.to_string(),
    }
}
