//! Recognition engine boundary.
//!
//! The speech engine is a black box: a push-style byte sink that runs its own
//! background threads for network I/O and emits asynchronous recognition
//! events. This crate only depends on the traits below; real engine bindings
//! live in the host application.

use crate::error::{CallscribeError, Result};
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Asynchronous event reported by a recognition engine session.
///
/// Events arrive on engine-owned threads, in the engine's own order.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The engine confirmed the session is live and accepting audio.
    SessionStarted,
    /// The engine confirmed the session has stopped.
    SessionStopped,
    /// Interim recognition result.
    Partial(String),
    /// Finalized recognition result.
    Final(String),
    /// The engine canceled recognition. `is_error` marks terminal failures.
    Canceled { is_error: bool, message: String },
}

/// One stateful recognition session.
///
/// `start` hands the engine a sender for its event stream and kicks off
/// continuous recognition; the engine must emit [`EngineEvent::SessionStarted`]
/// once live. `push` appends PCM bytes to the engine's input stream and must
/// not block on recognition — it is fire-and-forget into the engine's own
/// buffering. `stop` requests shutdown; the engine must emit
/// [`EngineEvent::SessionStopped`] and drop its sender.
pub trait SpeechEngine: Send {
    /// Starts continuous recognition, reporting events through `events`.
    fn start(&mut self, events: Sender<EngineEvent>) -> Result<()>;

    /// Appends raw PCM bytes to the engine's input stream.
    fn push(&mut self, bytes: &[u8]) -> Result<()>;

    /// Requests the session to stop.
    fn stop(&mut self) -> Result<()>;
}

/// Creates one engine session per transcription channel slot.
pub trait EngineFactory: Send + Sync {
    /// Creates a session labeled `label` (typically `"{session_id}-{slot}"`).
    fn create(&self, label: &str) -> Result<Box<dyn SpeechEngine>>;
}

/// Observer handle into a [`MockEngine`], retained by tests after the engine
/// itself moves into a channel.
#[derive(Debug, Clone, Default)]
pub struct MockEngineHandle {
    pushed: Arc<Mutex<Vec<Vec<u8>>>>,
    events: Arc<Mutex<Option<Sender<EngineEvent>>>>,
    stopped: Arc<AtomicBool>,
}

impl MockEngineHandle {
    /// Returns every byte buffer pushed so far, in push order.
    pub fn pushed(&self) -> Vec<Vec<u8>> {
        self.pushed.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Returns the number of pushes received.
    pub fn push_count(&self) -> usize {
        self.pushed.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// True once `stop` has been called on the engine.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Emits an event as if from the engine's background thread.
    ///
    /// Returns false if the engine has not started or the channel is closed.
    pub fn emit(&self, event: EngineEvent) -> bool {
        let guard = self.events.lock().unwrap_or_else(|e| e.into_inner());
        match guard.as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }
}

/// Mock recognition engine for testing.
#[derive(Debug, Default)]
pub struct MockEngine {
    fail_start: bool,
    skip_start_confirmation: bool,
    fail_push: bool,
    fail_stop: bool,
    handle: MockEngineHandle,
}

impl MockEngine {
    /// Creates a mock engine that starts, records pushes, and stops cleanly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures `start` to fail immediately.
    pub fn with_start_failure(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Configures the engine to never confirm startup (timeout path).
    pub fn without_start_confirmation(mut self) -> Self {
        self.skip_start_confirmation = true;
        self
    }

    /// Configures `push` to fail.
    pub fn with_push_failure(mut self) -> Self {
        self.fail_push = true;
        self
    }

    /// Configures `stop` to fail without confirming the session stop.
    pub fn with_stop_failure(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    /// Returns an observer handle that outlives the engine move.
    pub fn handle(&self) -> MockEngineHandle {
        self.handle.clone()
    }
}

impl SpeechEngine for MockEngine {
    fn start(&mut self, events: Sender<EngineEvent>) -> Result<()> {
        if self.fail_start {
            return Err(CallscribeError::EngineStart {
                label: "mock".to_string(),
                message: "mock start failure".to_string(),
            });
        }

        if !self.skip_start_confirmation {
            let _ = events.send(EngineEvent::SessionStarted);
        }
        *self
            .handle
            .events
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(events);
        Ok(())
    }

    fn push(&mut self, bytes: &[u8]) -> Result<()> {
        if self.handle.stopped.load(Ordering::SeqCst) {
            return Err(CallscribeError::EnginePush {
                message: "engine already stopped".to_string(),
            });
        }
        if self.fail_push {
            return Err(CallscribeError::EnginePush {
                message: "mock push failure".to_string(),
            });
        }
        self.handle
            .pushed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(bytes.to_vec());
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.handle.stopped.store(true, Ordering::SeqCst);
        let tx = self
            .handle
            .events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if self.fail_stop {
            // The event stream still closes (tx dropped), but no
            // SessionStopped confirmation is ever emitted.
            return Err(CallscribeError::EngineStop {
                message: "mock stop failure".to_string(),
            });
        }
        // Confirm the stop and close the event stream so consumers exit.
        if let Some(tx) = tx {
            let _ = tx.send(EngineEvent::SessionStopped);
        }
        Ok(())
    }
}

/// Factory producing [`MockEngine`] sessions, retaining an observer handle
/// per created session in creation order (which matches slot order).
#[derive(Debug, Default)]
pub struct MockEngineFactory {
    fail_slots: Vec<usize>,
    unconfirmed_slots: Vec<usize>,
    push_fail_slots: Vec<usize>,
    stop_fail_slots: Vec<usize>,
    created: Mutex<Vec<MockEngineHandle>>,
    counter: AtomicUsize,
}

impl MockEngineFactory {
    /// Creates a factory whose sessions all start cleanly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the nth created session fail to start.
    pub fn with_failed_slot(mut self, slot: usize) -> Self {
        self.fail_slots.push(slot);
        self
    }

    /// Makes the nth created session never confirm startup.
    pub fn with_unconfirmed_slot(mut self, slot: usize) -> Self {
        self.unconfirmed_slots.push(slot);
        self
    }

    /// Makes the nth created session fail every push.
    pub fn with_push_failure_slot(mut self, slot: usize) -> Self {
        self.push_fail_slots.push(slot);
        self
    }

    /// Makes the nth created session fail to stop.
    pub fn with_stop_failure_slot(mut self, slot: usize) -> Self {
        self.stop_fail_slots.push(slot);
        self
    }

    /// Returns observer handles for every created session, in slot order.
    pub fn handles(&self) -> Vec<MockEngineHandle> {
        self.created
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl EngineFactory for MockEngineFactory {
    fn create(&self, _label: &str) -> Result<Box<dyn SpeechEngine>> {
        let index = self.counter.fetch_add(1, Ordering::SeqCst);

        let mut engine = MockEngine::new();
        if self.fail_slots.contains(&index) {
            engine = engine.with_start_failure();
        }
        if self.unconfirmed_slots.contains(&index) {
            engine = engine.without_start_confirmation();
        }
        if self.push_fail_slots.contains(&index) {
            engine = engine.with_push_failure();
        }
        if self.stop_fail_slots.contains(&index) {
            engine = engine.with_stop_failure();
        }

        self.created
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(engine.handle());
        Ok(Box::new(engine))
    }
}
