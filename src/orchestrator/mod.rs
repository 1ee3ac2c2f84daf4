//! Orchestrator: session lifecycle and status surface.
//!
//! Owns every per-target `CaptureSession`, reacts to user triggers and
//! target lifecycle notifications, relays control messages to capture
//! contexts, and forwards transcripts to the current consumer. Runs in its
//! own thread; each handler runs to completion before the next message.

pub mod history;
pub mod session;
pub mod sink;
pub mod status;

pub use history::TranscriptHistory;
pub use session::{CaptureSession, CaptureState};
pub use sink::{BroadcastSink, CollectorSink, NullSink, TranscriptSink};
pub use status::{IndicatorState, LogIndicator, MockIndicator, StatusIndicator};

use crate::capture::{CaptureContext, MediaHost};
use crate::messages::{CaptureEvent, ControlMessage, TargetId, TranscriptEvent};
use crossbeam_channel::{Receiver, Sender, bounded, select};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::SystemTime;

/// Spawns a capture context for a target; injected so tests can substitute
/// a stub for the real worker.
pub type CaptureSpawner =
    Box<dyn Fn(TargetId, Sender<(TargetId, CaptureEvent)>) -> CaptureContext + Send>;

/// Commands driving the orchestrator.
#[derive(Debug)]
pub enum OrchestratorCommand {
    /// User trigger: start capture, or stop it when already listening.
    Trigger { target: TargetId },
    /// Explicit stop.
    Stop { target: TargetId },
    /// The target no longer exists; capture must not continue against it.
    TargetRemoved { target: TargetId },
    /// The target changed context; same consequence as removal.
    TargetNavigated { target: TargetId },
    /// Request/acknowledge status snapshot.
    Status {
        reply: Sender<Vec<(TargetId, CaptureState)>>,
    },
    /// Stop every session and exit the run loop.
    Shutdown,
}

/// The orchestrator context. Construct with [`Orchestrator::new`], then
/// either call [`Orchestrator::run`] on a dedicated thread or drive it
/// manually in tests via the handler methods.
pub struct Orchestrator {
    host: Arc<dyn MediaHost>,
    spawner: CaptureSpawner,
    events_tx: Sender<(TargetId, CaptureEvent)>,
    events_rx: Receiver<(TargetId, CaptureEvent)>,
    commands_rx: Receiver<OrchestratorCommand>,
    sessions: HashMap<TargetId, CaptureSession>,
    contexts: HashMap<TargetId, CaptureContext>,
    indicator: Box<dyn StatusIndicator>,
    sink: Box<dyn TranscriptSink>,
    history: TranscriptHistory,
    heartbeats_received: u64,
}

impl Orchestrator {
    /// Creates an orchestrator and the command sender that drives it.
    pub fn new(
        host: Arc<dyn MediaHost>,
        spawner: CaptureSpawner,
        indicator: Box<dyn StatusIndicator>,
        sink: Box<dyn TranscriptSink>,
        history: TranscriptHistory,
    ) -> (Self, Sender<OrchestratorCommand>) {
        let (commands_tx, commands_rx) = bounded(64);
        let (events_tx, events_rx) = bounded(256);
        let orchestrator = Self {
            host,
            spawner,
            events_tx,
            events_rx,
            commands_rx,
            sessions: HashMap::new(),
            contexts: HashMap::new(),
            indicator,
            sink,
            history,
            heartbeats_received: 0,
        };
        (orchestrator, commands_tx)
    }

    /// Runs the message loop until shutdown or both channels disconnect.
    pub fn run(mut self) {
        loop {
            select! {
                recv(self.commands_rx) -> command => match command {
                    Ok(OrchestratorCommand::Shutdown) => break,
                    Ok(command) => self.handle_command(command),
                    Err(_) => break,
                },
                recv(self.events_rx) -> event => match event {
                    Ok((target, event)) => self.handle_event(target, event),
                    // events_tx is held by self; this arm cannot disconnect
                    // while the orchestrator is alive.
                    Err(_) => break,
                },
            }
        }

        // Stop every active session before exiting.
        let targets: Vec<TargetId> = self.sessions.keys().copied().collect();
        for target in targets {
            self.stop_target(target);
        }
        self.contexts.clear();
    }

    /// Spawns this orchestrator on its own thread.
    pub fn spawn(self) -> OrchestratorHandle {
        let thread = thread::spawn(move || self.run());
        OrchestratorHandle {
            thread: Some(thread),
        }
    }

    // ── Command handlers ─────────────────────────────────────────────────

    pub fn handle_command(&mut self, command: OrchestratorCommand) {
        match command {
            OrchestratorCommand::Trigger { target } => self.on_trigger(target),
            OrchestratorCommand::Stop { target } => {
                if self.session_state(target).is_active() {
                    self.stop_target(target);
                }
            }
            OrchestratorCommand::TargetRemoved { target }
            | OrchestratorCommand::TargetNavigated { target } => {
                // Capture must never continue against a target that no
                // longer exists or has changed context.
                if self.session_state(target).is_active() {
                    self.stop_target(target);
                }
                self.sessions.remove(&target);
                self.contexts.remove(&target);
            }
            OrchestratorCommand::Status { reply } => {
                let mut snapshot: Vec<(TargetId, CaptureState)> = self
                    .sessions
                    .values()
                    .map(|s| (s.target, s.state()))
                    .collect();
                snapshot.sort_by_key(|(target, _)| *target);
                let _ = reply.send(snapshot);
            }
            OrchestratorCommand::Shutdown => {}
        }
    }

    /// User trigger: toggle semantics.
    fn on_trigger(&mut self, target: TargetId) {
        match self.session_state(target) {
            CaptureState::Listening => {
                self.stop_target(target);
            }
            CaptureState::Starting => {
                // Double-start is a no-op; one session per target.
            }
            _ => self.start_target(target),
        }
    }

    fn start_target(&mut self, target: TargetId) {
        let mut session = CaptureSession::begin(target);
        self.indicator.set(target, IndicatorState::Working);

        let handle = match self.host.request_media_handle(target) {
            Ok(handle) => handle,
            Err(e) => {
                // Failure obtaining the handle: revert to Idle and clear
                // the indicator; nothing was acquired.
                eprintln!("tabscribe: target {target}: {e}");
                let _ = session.advance(CaptureState::Idle);
                self.sessions.insert(target, session);
                self.indicator.set(target, IndicatorState::Idle);
                return;
            }
        };

        self.sessions.insert(target, session);
        self.ensure_context(target)
            .send(ControlMessage::StartCapture { handle });
    }

    fn stop_target(&mut self, target: TargetId) {
        if let Some(context) = self.contexts.get(&target) {
            context.send(ControlMessage::StopCapture);
        }
        if let Some(session) = self.sessions.get_mut(&target) {
            let _ = session.advance(CaptureState::Idle);
        }
        self.indicator.set(target, IndicatorState::Idle);
    }

    /// Returns the capture context for `target`, creating it if absent.
    /// The existence check makes context creation idempotent.
    fn ensure_context(&mut self, target: TargetId) -> &CaptureContext {
        self.contexts
            .entry(target)
            .or_insert_with(|| (self.spawner)(target, self.events_tx.clone()))
    }

    // ── Event handlers ───────────────────────────────────────────────────

    pub fn handle_event(&mut self, target: TargetId, event: CaptureEvent) {
        match event {
            CaptureEvent::CaptureStarted => self.on_capture_started(target),
            CaptureEvent::ModelLoading => {
                self.indicator.set(target, IndicatorState::Working);
            }
            CaptureEvent::ModelReady => {
                if self.session_state(target) == CaptureState::Listening {
                    self.indicator.set(target, IndicatorState::Active);
                }
            }
            CaptureEvent::TranscriptReady { text } => self.on_transcript(target, text),
            CaptureEvent::TranscriptionError { message } => {
                // Scoped to one chunk; surface it and keep the session.
                eprintln!("tabscribe: target {target}: transcription error: {message}");
            }
            CaptureEvent::CaptureError { message } => self.on_capture_error(target, message),
            CaptureEvent::HeartbeatPing => {
                // Being received is the whole point: it resets the host's
                // idle-reclaim timer.
                self.heartbeats_received += 1;
            }
        }
    }

    fn on_capture_started(&mut self, target: TargetId) {
        let Some(session) = self.sessions.get_mut(&target) else {
            return;
        };
        // A late CaptureStarted that lost the race against CaptureError is
        // rejected by the state machine and ignored here.
        if session.advance(CaptureState::Listening).is_ok() {
            self.indicator.set(target, IndicatorState::Active);
        }
    }

    fn on_transcript(&mut self, target: TargetId, text: String) {
        // Transcripts from a session that has already ended are discarded.
        if self.session_state(target) != CaptureState::Listening {
            return;
        }

        let event = TranscriptEvent::new(text);
        self.history.push(event.clone());
        self.history.prune(SystemTime::now());

        // Best-effort forward; no consumer attached is expected.
        let _ = self.sink.deliver(target, &event);
    }

    fn on_capture_error(&mut self, target: TargetId, message: String) {
        let Some(session) = self.sessions.get_mut(&target) else {
            return;
        };
        // The state machine admits Error only from Starting/Listening, so a
        // duplicate CaptureError cannot trigger a second teardown.
        if session.advance(CaptureState::Error).is_err() {
            return;
        }

        eprintln!("tabscribe: target {target}: capture error: {message}");
        self.indicator.set(target, IndicatorState::Error);

        // Unconditional stop guarantees resource release even when the
        // error originated mid-chunk; then route back to Idle so the next
        // trigger attempts a clean restart. The error badge stays.
        if let Some(context) = self.contexts.get(&target) {
            context.send(ControlMessage::StopCapture);
        }
        if let Some(session) = self.sessions.get_mut(&target) {
            let _ = session.advance(CaptureState::Idle);
        }
    }

    // ── Introspection ────────────────────────────────────────────────────

    fn session_state(&self, target: TargetId) -> CaptureState {
        self.sessions
            .get(&target)
            .map(|s| s.state())
            .unwrap_or(CaptureState::Idle)
    }

    /// Heartbeat pings received over the orchestrator's lifetime.
    pub fn heartbeats_received(&self) -> u64 {
        self.heartbeats_received
    }

    /// Recent transcript history, age-filtered as of now.
    pub fn recent_transcripts(&self) -> Vec<TranscriptEvent> {
        self.history.recent(SystemTime::now())
    }
}

/// Join handle for a spawned orchestrator.
pub struct OrchestratorHandle {
    thread: Option<JoinHandle<()>>,
}

impl OrchestratorHandle {
    /// Waits for the orchestrator loop to exit (after a Shutdown command).
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
