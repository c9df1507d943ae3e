//! End-to-end routing scenarios: transport events in, tagged transcripts out.

use callscribe::config::Config;
use callscribe::engine::{EngineEvent, MockEngineFactory};
use callscribe::events::{CollectorSink, EventCategory};
use callscribe::media::{AudioEvent, MediaSink, UnmixedSubBuffer};
use callscribe::roster::{Participant, Roster};
use callscribe::session::SessionHost;
use callscribe::SpeakerBinding;
use std::sync::Arc;
use std::time::{Duration, Instant};

const FRAME: usize = 640;
static MIXED: [u8; FRAME] = [0u8; FRAME];

fn conference_roster() -> Roster {
    let roster = Roster::new();
    roster.replace(vec![
        Participant::new("Alice", vec![1001]),
        Participant::new("Bob", vec![1002]),
        Participant::new("Carol", vec![1003]),
        Participant::new("Dave", vec![1004]),
        Participant::new("Erin", vec![1005]),
    ]);
    roster
}

fn start_session(factory: &MockEngineFactory, sink: Arc<CollectorSink>) -> SessionHost {
    let mut config = Config::default();
    config.speech.start_timeout_ms = 500;
    config.speech.stop_timeout_ms = 500;
    SessionHost::new("call-42", &config, factory, conference_roster(), sink)
}

fn speech<'a>(subs: &[(u32, &'a [u8])], timestamp: u64) -> AudioEvent<'a> {
    AudioEvent::with_unmixed(
        &MIXED,
        timestamp,
        subs.iter()
            .map(|&(active_speaker_id, data)| UnmixedSubBuffer {
                active_speaker_id,
                data,
            })
            .collect(),
    )
}

fn silence(timestamp: u64) -> AudioEvent<'static> {
    let mut event = AudioEvent::mixed(&MIXED, timestamp, true);
    event.unmixed = Some(vec![]);
    event
}

/// Polls until `predicate` holds or one second elapses.
fn wait_for(mut predicate: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(1);
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    predicate()
}

#[test]
fn two_speakers_are_routed_and_the_rest_backfilled() {
    let factory = MockEngineFactory::new();
    let sink = Arc::new(CollectorSink::new());
    let mut session = start_session(&factory, sink);

    let alice = vec![1u8; FRAME];
    let bob = vec![2u8; FRAME];
    session.on_audio_event(speech(&[(1001, &alice), (1002, &bob)], 0));

    let handles = factory.handles();
    assert_eq!(handles[0].pushed(), vec![alice]);
    assert_eq!(handles[1].pushed(), vec![bob]);
    assert_eq!(handles[2].pushed(), vec![vec![0u8; FRAME]]);
    assert_eq!(handles[3].pushed(), vec![vec![0u8; FRAME]]);
}

#[test]
fn speaker_keeps_her_channel_while_active() {
    let factory = MockEngineFactory::new();
    let sink = Arc::new(CollectorSink::new());
    let mut session = start_session(&factory, sink);

    let bytes: Vec<Vec<u8>> = (0..5).map(|i| vec![i as u8 + 1; FRAME]).collect();
    for (tick, chunk) in bytes.iter().enumerate() {
        session.on_audio_event(speech(&[(1001, chunk)], tick as u64));
    }

    // All of Alice's audio lands on slot 0, in order, with no reordering.
    assert_eq!(factory.handles()[0].pushed(), bytes);
    assert_eq!(
        session.router().pool().binding(0),
        Some(&SpeakerBinding::Named("Alice".to_string()))
    );
}

#[test]
fn excess_speakers_are_dropped_exactly() {
    let factory = MockEngineFactory::new();
    let sink = Arc::new(CollectorSink::new());
    let mut session = start_session(&factory, sink.clone());

    // Five distinct speakers, four slots: exactly one drop.
    let chunks: Vec<Vec<u8>> = (0..5).map(|i| vec![i as u8 + 1; FRAME]).collect();
    let subs: Vec<(u32, &[u8])> = chunks
        .iter()
        .enumerate()
        .map(|(i, c)| (1001 + i as u32, c.as_slice()))
        .collect();
    session.on_audio_event(speech(&subs, 0));

    let routed: usize = factory
        .handles()
        .iter()
        .map(|h| h.push_count())
        .sum();
    assert_eq!(routed, 4);
    assert_eq!(sink.of_category(EventCategory::Error).len(), 1);
}

#[test]
fn idle_speaker_keeps_her_slot_for_one_silent_event() {
    let factory = MockEngineFactory::new();
    let sink = Arc::new(CollectorSink::new());
    let mut session = start_session(&factory, sink);

    let alice = vec![1u8; FRAME];
    let carol = vec![3u8; FRAME];
    session.on_audio_event(speech(&[(1001, &alice)], 0));
    session.on_audio_event(speech(&[(1003, &carol)], 1));

    // Carol lands on a fresh slot; slot 0 stays Alice's and gets silence.
    let pool = session.router().pool();
    assert_eq!(
        pool.binding(0),
        Some(&SpeakerBinding::Named("Alice".to_string()))
    );
    assert_eq!(
        pool.binding(1),
        Some(&SpeakerBinding::Named("Carol".to_string()))
    );
    let handles = factory.handles();
    assert_eq!(handles[0].pushed()[1], vec![0u8; FRAME]);
    assert_eq!(handles[1].pushed()[1], carol);
}

#[test]
fn dead_slot_is_skipped_for_assignment_and_backfill() {
    let factory = MockEngineFactory::new().with_failed_slot(2);
    let sink = Arc::new(CollectorSink::new());
    let mut session = start_session(&factory, sink.clone());

    assert!(
        sink.of_category(EventCategory::SessionLifecycle)
            .iter()
            .any(|p| p.contains("3/4 channels usable"))
    );

    let alice = vec![1u8; FRAME];
    session.on_audio_event(speech(&[(1001, &alice)], 0));
    session.on_audio_event(silence(1));

    let handles = factory.handles();
    assert_eq!(handles[2].push_count(), 0);
    assert_eq!(handles[0].push_count(), 2);
    assert_eq!(handles[1].push_count(), 2);
    assert_eq!(handles[3].push_count(), 2);
}

#[test]
fn unresolved_speaker_audio_is_not_discarded() {
    let factory = MockEngineFactory::new();
    let sink = Arc::new(CollectorSink::new());
    let mut session = start_session(&factory, sink);

    // 7777 is not in the roster (already left, or still in the lobby).
    let unknown = vec![9u8; FRAME];
    session.on_audio_event(speech(&[(7777, &unknown)], 0));

    assert_eq!(factory.handles()[0].pushed(), vec![unknown]);
    assert_eq!(
        session.router().pool().binding(0),
        Some(&SpeakerBinding::Unresolved(7777))
    );
}

#[test]
fn transcripts_come_out_tagged_with_the_bound_speaker() {
    let factory = MockEngineFactory::new();
    let sink = Arc::new(CollectorSink::new());
    let mut session = start_session(&factory, sink.clone());

    let alice = vec![1u8; FRAME];
    session.on_audio_event(speech(&[(1001, &alice)], 0));

    let handles = factory.handles();
    assert!(handles[0].emit(EngineEvent::Partial("good mor".to_string())));
    assert!(handles[0].emit(EngineEvent::Final("good morning".to_string())));

    assert!(wait_for(|| {
        sink.of_category(EventCategory::Recognized)
            .contains(&"Alice: good morning".to_string())
    }));
    assert!(
        sink.of_category(EventCategory::Recognizing)
            .contains(&"Alice: good mor".to_string())
    );
}

#[test]
fn push_failure_on_one_channel_does_not_stop_the_tick() {
    let factory = MockEngineFactory::new().with_push_failure_slot(0);
    let sink = Arc::new(CollectorSink::new());
    let mut session = start_session(&factory, sink.clone());

    let alice = vec![1u8; FRAME];
    let bob = vec![2u8; FRAME];
    session.on_audio_event(speech(&[(1001, &alice), (1002, &bob)], 0));

    // Alice's bytes are rejected by her engine; the failure is published and
    // the rest of the tick (Bob's speech, both backfills) lands untouched.
    let handles = factory.handles();
    assert_eq!(handles[0].push_count(), 0);
    assert_eq!(handles[1].pushed(), vec![bob]);
    assert_eq!(handles[2].pushed(), vec![vec![0u8; FRAME]]);
    assert_eq!(handles[3].pushed(), vec![vec![0u8; FRAME]]);
    assert!(
        sink.of_category(EventCategory::Error)
            .iter()
            .any(|p| p.contains("push failed"))
    );
}

#[test]
fn teardown_proceeds_past_a_channel_that_fails_to_stop() {
    let factory = MockEngineFactory::new().with_stop_failure_slot(1);
    let sink = Arc::new(CollectorSink::new());
    let mut session = start_session(&factory, sink.clone());

    session.teardown();

    for handle in factory.handles() {
        assert!(handle.is_stopped());
    }
    assert!(
        sink.of_category(EventCategory::Error)
            .iter()
            .any(|p| p.contains("stop failed"))
    );
    assert!(
        sink.of_category(EventCategory::SessionLifecycle)
            .iter()
            .any(|p| p.contains("<< session torn down"))
    );
}

#[test]
fn engine_failure_on_one_channel_leaves_siblings_running() {
    let factory = MockEngineFactory::new();
    let sink = Arc::new(CollectorSink::new());
    let mut session = start_session(&factory, sink.clone());

    let alice = vec![1u8; FRAME];
    let bob = vec![2u8; FRAME];
    session.on_audio_event(speech(&[(1001, &alice), (1002, &bob)], 0));

    let handles = factory.handles();
    assert!(handles[0].emit(EngineEvent::Canceled {
        is_error: true,
        message: "transport closed".to_string(),
    }));
    assert!(wait_for(|| handles[0].is_stopped()));

    // The failed channel drops further audio; Bob's channel keeps flowing.
    session.on_audio_event(speech(&[(1001, &alice), (1002, &bob)], 1));
    assert_eq!(handles[0].push_count(), 1);
    assert_eq!(handles[1].push_count(), 2);
}

#[test]
fn teardown_is_idempotent_and_stops_every_channel() {
    let factory = MockEngineFactory::new();
    let sink = Arc::new(CollectorSink::new());
    let mut session = start_session(&factory, sink.clone());

    let alice = vec![1u8; FRAME];
    session.on_audio_event(speech(&[(1001, &alice)], 0));

    session.teardown();
    session.teardown();

    for handle in factory.handles() {
        assert!(handle.is_stopped());
    }
    let torn_down = sink
        .of_category(EventCategory::SessionLifecycle)
        .iter()
        .filter(|p| p.contains("<< session torn down"))
        .count();
    assert_eq!(torn_down, 1);
}

#[test]
fn mixed_mode_session_uses_a_single_channel() {
    let factory = MockEngineFactory::new();
    let sink = Arc::new(CollectorSink::new());
    let mut config = Config::default();
    config.session.routing_mode = callscribe::RoutingMode::Mixed;
    config.session.pool_size = 1;
    config.speech.start_timeout_ms = 500;
    let mut session = SessionHost::new("call-42", &config, &factory, conference_roster(), sink);

    let data = vec![1u8; FRAME];
    session.on_audio_event(AudioEvent::mixed(&data, 0, false));
    session.on_audio_event(AudioEvent::mixed(&MIXED, 1, true));

    let handles = factory.handles();
    assert_eq!(handles.len(), 1);
    assert_eq!(handles[0].push_count(), 2);
    assert_eq!(handles[0].pushed()[0], data);
}
