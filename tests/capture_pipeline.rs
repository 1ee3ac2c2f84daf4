//! End-to-end pipeline scenarios over the mock media host: orchestrator →
//! capture context → engine → sink, with real worker threads.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel::bounded;
use tabscribe::capture::{CaptureConfig, CaptureContext, FramePhase, MediaHost, MockMediaHost};
use tabscribe::engine::{InferenceParams, MockTranscriberFactory, TranscriberFactory};
use tabscribe::messages::{TargetId, TranscriptEvent};
use tabscribe::orchestrator::{
    CaptureState, MockIndicator, Orchestrator, OrchestratorCommand, TranscriptHistory,
    TranscriptSink,
};

const TARGET: TargetId = TargetId(7);

/// Sink recording delivered segments behind a shared handle.
#[derive(Clone, Default)]
struct SharedSink {
    delivered: Arc<Mutex<Vec<String>>>,
}

impl TranscriptSink for SharedSink {
    fn deliver(&mut self, _target: TargetId, event: &TranscriptEvent) -> tabscribe::Result<()> {
        if let Ok(mut delivered) = self.delivered.lock() {
            delivered.push(event.text.clone());
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "shared"
    }
}

struct Pipeline {
    commands: crossbeam_channel::Sender<OrchestratorCommand>,
    indicator: MockIndicator,
    sink: SharedSink,
    handle: Option<tabscribe::OrchestratorHandle>,
}

impl Pipeline {
    /// Wires a full pipeline with real capture/engine workers over mocks.
    fn launch(host: MockMediaHost, factory: MockTranscriberFactory) -> Self {
        let host: Arc<dyn MediaHost> = Arc::new(host);
        let factory: Arc<dyn TranscriberFactory> = Arc::new(factory);
        let indicator = MockIndicator::new();
        let sink = SharedSink::default();

        let capture_config = CaptureConfig {
            chunk_ms: 2000,
            // One full chunk arrives per poll; 20ms leaves the instant mock
            // engine plenty of headroom between submissions.
            poll_interval: Duration::from_millis(20),
            heartbeat_interval: Duration::from_millis(50),
            inference: InferenceParams::default(),
            inference_timeout: Duration::from_secs(30),
        };

        let spawner_host = Arc::clone(&host);
        let (orchestrator, commands) = Orchestrator::new(
            host,
            Box::new(move |target, events_tx| {
                CaptureContext::spawn(
                    target,
                    Arc::clone(&spawner_host),
                    Arc::clone(&factory),
                    events_tx,
                    capture_config.clone(),
                )
            }),
            Box::new(indicator.clone()),
            Box::new(sink.clone()),
            TranscriptHistory::default(),
        );

        Self {
            commands,
            indicator,
            sink,
            handle: Some(orchestrator.spawn()),
        }
    }

    fn trigger(&self) {
        self.commands
            .send(OrchestratorCommand::Trigger { target: TARGET })
            .expect("orchestrator alive");
    }

    fn stop(&self) {
        self.commands
            .send(OrchestratorCommand::Stop { target: TARGET })
            .expect("orchestrator alive");
    }

    fn state(&self) -> CaptureState {
        let (reply_tx, reply_rx) = bounded(1);
        self.commands
            .send(OrchestratorCommand::Status { reply: reply_tx })
            .expect("orchestrator alive");
        reply_rx
            .recv_timeout(Duration::from_secs(2))
            .expect("status reply")
            .into_iter()
            .find(|(target, _)| *target == TARGET)
            .map(|(_, state)| state)
            .unwrap_or(CaptureState::Idle)
    }

    fn wait_for_state(&self, state: CaptureState) -> bool {
        wait_until(Duration::from_secs(5), || self.state() == state)
    }

    fn shutdown(mut self) {
        let _ = self.commands.send(OrchestratorCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            handle.join();
        }
    }
}

fn wait_until<F: FnMut() -> bool>(timeout: Duration, mut predicate: F) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    predicate()
}

/// Three 2s chunks of 48kHz silence delivered one per read.
fn silent_host() -> MockMediaHost {
    MockMediaHost::new()
        .with_sample_rate(48000)
        .with_frame_sequence(vec![FramePhase {
            samples: vec![0.0; 96000],
            count: 3,
        }])
}

#[test]
fn start_three_silent_chunks_stop() {
    let host = silent_host();
    let counters = host.counters();
    let factory = MockTranscriberFactory::new().with_response("");
    let creates = factory.creates();
    let sample_counts = factory.sample_counts();

    let pipeline = Pipeline::launch(host, factory);
    pipeline.trigger();

    assert!(
        pipeline.wait_for_state(CaptureState::Listening),
        "one CaptureStarted must move the session to Listening"
    );

    // All three chunks resampled and transcribed.
    assert!(
        wait_until(Duration::from_secs(5), || sample_counts
            .lock()
            .unwrap()
            .len()
            >= 3),
        "expected 3 transcribed chunks, got {:?}",
        sample_counts.lock().unwrap()
    );
    {
        let counts = sample_counts.lock().unwrap();
        assert_eq!(counts.len(), 3, "exactly 3 chunks (one per resample call)");
        assert!(
            counts.iter().all(|&n| n == 32000),
            "every chunk arrives at 16kHz (2s = 32000 samples): {counts:?}"
        );
    }

    pipeline.stop();
    assert!(pipeline.wait_for_state(CaptureState::Idle));

    // One teardown each for recorder stream, audio graph, and engine.
    assert!(
        wait_until(Duration::from_secs(2), || counters
            .streams_closed
            .load(Ordering::SeqCst)
            == 1),
        "stream must be closed exactly once"
    );
    assert_eq!(counters.loopbacks_closed.load(Ordering::SeqCst), 1);
    assert_eq!(counters.streams_opened.load(Ordering::SeqCst), 1);
    assert_eq!(
        creates.load(Ordering::SeqCst),
        1,
        "one model instance for the whole session"
    );

    // Empty-string transcripts are fine; none may arrive after the stop.
    let delivered = pipeline.sink.delivered.lock().unwrap().clone();
    assert!(delivered.iter().all(|text| text.is_empty()));

    pipeline.shutdown();
}

#[test]
fn permission_denied_start_aborts_cleanly() {
    let host = MockMediaHost::new().with_stream_failure("permission denied by user");
    let counters = host.counters();
    let factory = MockTranscriberFactory::new();
    let creates = factory.creates();

    let pipeline = Pipeline::launch(host, factory);
    pipeline.trigger();

    // Error badge appears, then the session routes back to Idle.
    assert!(
        wait_until(Duration::from_secs(5), || {
            pipeline
                .indicator
                .changes()
                .iter()
                .any(|(_, state)| *state == tabscribe::orchestrator::IndicatorState::Error)
        }),
        "error badge expected after permission denial"
    );
    assert!(pipeline.wait_for_state(CaptureState::Idle));

    // Zero recorder creation: no stream, no loopback, no model.
    assert_eq!(counters.streams_opened.load(Ordering::SeqCst), 0);
    assert_eq!(counters.loopbacks_opened.load(Ordering::SeqCst), 0);
    assert_eq!(creates.load(Ordering::SeqCst), 0);
    assert!(pipeline.sink.delivered.lock().unwrap().is_empty());

    pipeline.shutdown();
}

#[test]
fn transcripts_flow_to_the_sink_while_listening() {
    let host = MockMediaHost::new()
        .with_sample_rate(16000)
        .with_frame_sequence(vec![FramePhase {
            samples: vec![0.05; 32000],
            count: 2,
        }]);
    let factory = MockTranscriberFactory::new().with_response("hello world");

    let pipeline = Pipeline::launch(host, factory);
    pipeline.trigger();
    assert!(pipeline.wait_for_state(CaptureState::Listening));

    assert!(
        wait_until(Duration::from_secs(5), || {
            pipeline
                .sink
                .delivered
                .lock()
                .unwrap()
                .iter()
                .any(|text| text == "hello world")
        }),
        "transcripts must reach the sink"
    );

    pipeline.stop();
    pipeline.shutdown();
}

#[test]
fn toggle_while_listening_stops_the_session() {
    let host = MockMediaHost::new().as_live_source();
    let counters = host.counters();

    let pipeline = Pipeline::launch(host, MockTranscriberFactory::new());
    pipeline.trigger();
    assert!(pipeline.wait_for_state(CaptureState::Listening));

    // Second trigger is the stop gesture.
    pipeline.trigger();
    assert!(pipeline.wait_for_state(CaptureState::Idle));
    assert!(
        wait_until(Duration::from_secs(2), || counters
            .streams_closed
            .load(Ordering::SeqCst)
            == 1),
        "toggle-stop must release the stream"
    );

    pipeline.shutdown();
}

#[test]
fn stop_without_session_is_harmless() {
    let host = MockMediaHost::new();
    let counters = host.counters();

    let pipeline = Pipeline::launch(host, MockTranscriberFactory::new());
    pipeline.stop();
    pipeline.stop();

    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(pipeline.state(), CaptureState::Idle);
    assert_eq!(counters.streams_opened.load(Ordering::SeqCst), 0);
    assert_eq!(counters.streams_closed.load(Ordering::SeqCst), 0);

    pipeline.shutdown();
}

#[test]
fn heartbeat_keeps_arriving_while_listening() {
    // 50ms cadence configured in Pipeline::launch; a listening session must
    // keep producing pings until stopped.
    let host = MockMediaHost::new().as_live_source();
    let pipeline = Pipeline::launch(host, MockTranscriberFactory::new());

    pipeline.trigger();
    assert!(pipeline.wait_for_state(CaptureState::Listening));
    std::thread::sleep(Duration::from_millis(300));

    pipeline.stop();
    assert!(pipeline.wait_for_state(CaptureState::Idle));
    pipeline.shutdown();
}

#[test]
fn model_failure_tears_the_session_down() {
    let host = MockMediaHost::new()
        .with_sample_rate(16000)
        .with_frame_sequence(vec![FramePhase {
            samples: vec![0.0; 32000],
            count: 1,
        }]);
    let counters = host.counters();
    let factory = MockTranscriberFactory::new().with_init_failure("model file corrupt");

    let pipeline = Pipeline::launch(host, factory);
    pipeline.trigger();

    // First chunk trips the lazy init failure; the orchestrator must force
    // a stop that releases everything.
    assert!(
        wait_until(Duration::from_secs(5), || counters
            .streams_closed
            .load(Ordering::SeqCst)
            == 1),
        "fatal model error must release the stream"
    );
    assert!(pipeline.wait_for_state(CaptureState::Idle));

    pipeline.shutdown();
}
