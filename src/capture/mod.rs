//! Capture context: an isolated worker that owns stream acquisition, the
//! loopback fix, chunked recording, resampling, and the engine/heartbeat
//! lifetime for one capture target.

pub mod loopback;
pub mod media;
pub mod recorder;
#[cfg(feature = "cpal-audio")]
pub mod system;
pub mod wav;
mod worker;

pub use loopback::LoopbackGuard;
pub use media::{
    AudioOutput, FramePhase, MediaHost, MediaStream, MockAudioOutput, MockMediaHost,
    MockMediaStream,
};
pub use recorder::ChunkRecorder;
#[cfg(feature = "cpal-audio")]
pub use system::SystemMediaHost;
pub use wav::WavMediaStream;
pub use worker::CaptureConfig;
pub(crate) use worker::CaptureWorker;

use crate::engine::TranscriberFactory;
use crate::messages::{CaptureEvent, ControlMessage, EventSender, TargetId};
use crossbeam_channel::{Sender, bounded};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Handle to a spawned capture context.
///
/// The orchestrator creates at most one per target (idempotent existence
/// check on its side) and talks to it exclusively through fire-and-forget
/// control messages.
pub struct CaptureContext {
    control_tx: Option<Sender<ControlMessage>>,
    thread: Option<JoinHandle<()>>,
}

impl CaptureContext {
    /// Spawns the capture worker thread for `target`.
    ///
    /// Events the context produces arrive on `events_tx` tagged with the
    /// target.
    pub fn spawn(
        target: TargetId,
        host: Arc<dyn MediaHost>,
        factory: Arc<dyn TranscriberFactory>,
        events_tx: Sender<(TargetId, CaptureEvent)>,
        config: CaptureConfig,
    ) -> Self {
        let (control_tx, control_rx) = bounded(16);
        let events = EventSender::new(target, events_tx);
        let worker = CaptureWorker::new(host, factory, events, config);
        let thread = thread::spawn(move || worker.run(control_rx));

        Self {
            control_tx: Some(control_tx),
            thread: Some(thread),
        }
    }

    /// Wraps an existing control channel instead of spawning a worker.
    /// Used by tests and embedders that provide their own capture side.
    pub fn from_sender(control_tx: Sender<ControlMessage>) -> Self {
        Self {
            control_tx: Some(control_tx),
            thread: None,
        }
    }

    /// Sends a control message. Returns false when the context is gone.
    pub fn send(&self, message: ControlMessage) -> bool {
        match self.control_tx {
            Some(ref tx) => tx.send(message).is_ok(),
            None => false,
        }
    }

    /// Stops any session and destroys the context.
    ///
    /// The worker tears down its session on channel disconnect, so this is
    /// safe even when the stop message cannot be delivered.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.control_tx.take() {
            let _ = tx.send(ControlMessage::StopCapture);
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for CaptureContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MockTranscriberFactory;
    use crate::messages::MediaHandle;
    use std::sync::atomic::Ordering;
    use std::time::{Duration, Instant};

    fn fast_config() -> CaptureConfig {
        CaptureConfig {
            poll_interval: Duration::from_millis(1),
            heartbeat_interval: Duration::from_secs(60),
            ..Default::default()
        }
    }

    fn wait_for<F: FnMut() -> bool>(mut predicate: F, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if predicate() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        predicate()
    }

    #[test]
    fn spawned_context_serves_start_and_stop() {
        let host = MockMediaHost::new();
        let counters = host.counters();
        let (events_tx, events_rx) = bounded(64);

        let mut context = CaptureContext::spawn(
            TargetId(5),
            Arc::new(host),
            Arc::new(MockTranscriberFactory::new()),
            events_tx,
            fast_config(),
        );

        assert!(context.send(ControlMessage::StartCapture {
            handle: MediaHandle::new("h"),
        }));

        let (target, event) = events_rx
            .recv_timeout(Duration::from_secs(2))
            .expect("CaptureStarted expected");
        assert_eq!(target, TargetId(5));
        assert_eq!(event, CaptureEvent::CaptureStarted);

        assert!(context.send(ControlMessage::StopCapture));
        assert!(
            wait_for(
                || counters.streams_closed.load(Ordering::SeqCst) == 1,
                Duration::from_secs(2)
            ),
            "stop must close the stream"
        );

        context.shutdown();
    }

    #[test]
    fn shutdown_tears_down_running_session() {
        let host = MockMediaHost::new().as_live_source();
        let counters = host.counters();
        let (events_tx, events_rx) = bounded(64);

        let mut context = CaptureContext::spawn(
            TargetId(1),
            Arc::new(host),
            Arc::new(MockTranscriberFactory::new()),
            events_tx,
            fast_config(),
        );

        context.send(ControlMessage::StartCapture {
            handle: MediaHandle::new("h"),
        });
        let _ = events_rx.recv_timeout(Duration::from_secs(2));

        context.shutdown();
        assert_eq!(counters.streams_closed.load(Ordering::SeqCst), 1);
        assert_eq!(counters.loopbacks_closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn send_after_shutdown_returns_false() {
        let (events_tx, _events_rx) = bounded(4);
        let mut context = CaptureContext::spawn(
            TargetId(1),
            Arc::new(MockMediaHost::new()),
            Arc::new(MockTranscriberFactory::new()),
            events_tx,
            fast_config(),
        );

        context.shutdown();
        assert!(!context.send(ControlMessage::StopCapture));
    }

    #[test]
    fn from_sender_forwards_messages() {
        let (control_tx, control_rx) = bounded(4);
        let context = CaptureContext::from_sender(control_tx);

        assert!(context.send(ControlMessage::StopCapture));
        assert_eq!(control_rx.recv().unwrap(), ControlMessage::StopCapture);
    }
}
