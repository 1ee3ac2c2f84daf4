//! Message contract between the orchestrator, capture, and engine contexts.
//!
//! Each context runs in its own thread and communicates exclusively over
//! bounded channels carrying these types. Payloads that hold PCM buffers are
//! moved, never copied, so they are plain Rust enums rather than wire types
//! (the JSON wire protocol for external clients lives in `ipc::protocol`).

use crossbeam_channel::Sender;
use std::fmt;
use std::time::SystemTime;

/// Identifier of a capture target (a tab, call window, or similar surface
/// known to the host platform).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u64);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque stream token issued by the host platform.
///
/// Valid for the lifetime of one capture activation; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHandle(String);

impl MediaHandle {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Control messages sent by the orchestrator to a capture context.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    /// Begin a capture session using the given host-issued handle.
    StartCapture { handle: MediaHandle },
    /// End the session. Idempotent; safe when nothing is running.
    StopCapture,
}

/// Events sent by a capture context (and its engine worker) to the
/// orchestrator.
///
/// Delivery preserves per-sender order only; the orchestrator treats
/// `CaptureStarted` and `CaptureError` as racing.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    /// Recording and the engine pipeline are live.
    CaptureStarted,
    /// The model is not yet warm; first chunk triggered lazy initialization.
    ModelLoading,
    /// The model finished loading and is serving chunks.
    ModelReady,
    /// One finalized transcript segment (may be empty when no speech was
    /// detected; that is not an error).
    TranscriptReady { text: String },
    /// A single chunk failed to transcribe; the session continues.
    TranscriptionError { message: String },
    /// Unrecoverable session failure; the orchestrator must force a stop.
    CaptureError { message: String },
    /// Liveness signal, sent on a fixed cadence while listening.
    HeartbeatPing,
}

/// One finalized transcript segment as relayed to consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEvent {
    pub text: String,
    pub emitted_at: SystemTime,
}

impl TranscriptEvent {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emitted_at: SystemTime::now(),
        }
    }
}

/// Fire-and-forget event sender bound to one capture target.
///
/// Cloned into the engine worker and heartbeat so every event a session
/// produces arrives at the orchestrator tagged with its target. Send
/// failures mean the orchestrator is gone; there is nobody left to tell.
#[derive(Debug, Clone)]
pub struct EventSender {
    target: TargetId,
    tx: Sender<(TargetId, CaptureEvent)>,
}

impl EventSender {
    pub fn new(target: TargetId, tx: Sender<(TargetId, CaptureEvent)>) -> Self {
        Self { target, tx }
    }

    pub fn target(&self) -> TargetId {
        self.target
    }

    /// Sends an event without blocking.
    ///
    /// A full or disconnected channel drops the event: the orchestrator is
    /// either far behind or gone, and a capture thread must never stall on
    /// it.
    pub fn send(&self, event: CaptureEvent) {
        let _ = self.tx.try_send((self.target, event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn target_id_display() {
        assert_eq!(TargetId(7).to_string(), "7");
    }

    #[test]
    fn media_handle_round_trip() {
        let handle = MediaHandle::new("stream-abc");
        assert_eq!(handle.as_str(), "stream-abc");
    }

    #[test]
    fn event_sender_tags_events_with_target() {
        let (tx, rx) = bounded(4);
        let sender = EventSender::new(TargetId(3), tx);

        sender.send(CaptureEvent::CaptureStarted);
        sender.send(CaptureEvent::HeartbeatPing);

        assert_eq!(rx.recv().unwrap(), (TargetId(3), CaptureEvent::CaptureStarted));
        assert_eq!(rx.recv().unwrap(), (TargetId(3), CaptureEvent::HeartbeatPing));
    }

    #[test]
    fn event_sender_survives_disconnected_receiver() {
        let (tx, rx) = bounded(1);
        let sender = EventSender::new(TargetId(1), tx);
        drop(rx);

        // Must not panic or error out.
        sender.send(CaptureEvent::CaptureStarted);
    }

    #[test]
    fn transcript_event_carries_text_and_timestamp() {
        let before = SystemTime::now();
        let event = TranscriptEvent::new("hello");
        assert_eq!(event.text, "hello");
        assert!(event.emitted_at >= before);
    }
}
