//! Capture worker: turns a host-provided media handle into a stream of
//! resampled PCM chunks, while keeping the source audible.
//!
//! One worker thread per capture context. All session resources live in an
//! explicit [`ActiveSession`] constructed on start and consumed on stop, so
//! "is there a session" is never a question of scattered field checks.

use crate::audio::{ResampledChunk, resample};
use crate::capture::loopback::LoopbackGuard;
use crate::capture::media::MediaHost;
use crate::capture::recorder::ChunkRecorder;
use crate::defaults;
use crate::engine::{EngineHandle, InferenceParams, TranscriberFactory};
use crate::heartbeat::Heartbeat;
use crate::messages::{CaptureEvent, ControlMessage, EventSender, MediaHandle};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

/// Read failures tolerated in a row before the session is declared dead.
const MAX_CONSECUTIVE_READ_ERRORS: u32 = 10;

/// Configuration for one capture context.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Duration of one recorded chunk in milliseconds.
    pub chunk_ms: u32,
    /// Cadence at which the worker polls its media stream.
    pub poll_interval: Duration,
    /// Cadence of heartbeat pings while listening.
    pub heartbeat_interval: Duration,
    /// Inference parameters handed to the engine.
    pub inference: InferenceParams,
    /// Maximum queue age before the engine drops a chunk.
    pub inference_timeout: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            chunk_ms: defaults::CHUNK_INTERVAL_MS,
            poll_interval: Duration::from_millis(defaults::POLL_INTERVAL_MS),
            heartbeat_interval: Duration::from_secs(defaults::HEARTBEAT_INTERVAL_SECS),
            inference: InferenceParams::default(),
            inference_timeout: Duration::from_secs(defaults::INFERENCE_TIMEOUT_SECS),
        }
    }
}

/// Everything one running session owns.
///
/// Constructed by `start_capture`, consumed by `stop_capture`. Each resource
/// guards its own teardown, so partial-failure states cannot leave a
/// dangling handle.
struct ActiveSession {
    stream: Box<dyn crate::capture::media::MediaStream>,
    loopback: LoopbackGuard,
    recorder: ChunkRecorder,
    engine: EngineHandle,
    heartbeat: Heartbeat,
    source_rate: u32,
    consecutive_read_errors: u32,
    dropped_chunks: u64,
    warned_dropped: bool,
}

pub(crate) struct CaptureWorker {
    host: Arc<dyn MediaHost>,
    factory: Arc<dyn TranscriberFactory>,
    events: EventSender,
    config: CaptureConfig,
    session: Option<ActiveSession>,
}

impl CaptureWorker {
    pub(crate) fn new(
        host: Arc<dyn MediaHost>,
        factory: Arc<dyn TranscriberFactory>,
        events: EventSender,
        config: CaptureConfig,
    ) -> Self {
        Self {
            host,
            factory,
            events,
            config,
            session: None,
        }
    }

    /// Main loop: serve control messages, and between them poll the stream.
    ///
    /// Handlers run to completion before the next message is processed.
    /// Exits when the control channel disconnects, tearing down any session.
    pub(crate) fn run(mut self, control_rx: Receiver<ControlMessage>) {
        loop {
            let message = if self.session.is_some() {
                match control_rx.recv_timeout(self.config.poll_interval) {
                    Ok(message) => Some(message),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            } else {
                // Nothing to poll; block until told otherwise.
                match control_rx.recv() {
                    Ok(message) => Some(message),
                    Err(_) => break,
                }
            };

            match message {
                Some(ControlMessage::StartCapture { handle }) => self.start_capture(handle),
                Some(ControlMessage::StopCapture) => self.stop_capture(),
                None => {
                    if let Some(fatal) = self.poll_session() {
                        self.events
                            .send(CaptureEvent::CaptureError { message: fatal });
                        // Release resources immediately; the orchestrator's
                        // forced StopCapture will find nothing left to do.
                        self.stop_capture();
                    }
                }
            }
        }

        self.stop_capture();
    }

    /// Begins a session for `handle`.
    ///
    /// Idempotent: if already recording this returns immediately, so no
    /// duplicate sessions. On acquisition failure, reports `CaptureError`
    /// and performs no further setup.
    fn start_capture(&mut self, handle: MediaHandle) {
        if self.session.is_some() {
            return;
        }

        let mut stream = match self.host.open_stream(&handle) {
            Ok(stream) => stream,
            Err(e) => {
                self.events.send(CaptureEvent::CaptureError {
                    message: e.to_string(),
                });
                return;
            }
        };

        // Loopback fix: capturing the stream silenced it at the platform
        // mixing layer; reconnect it to the default output device before
        // anything else. Without this the user's call goes mute.
        let loopback = match self.host.open_loopback() {
            Ok(output) => LoopbackGuard::connect(output),
            Err(e) => {
                stream.close();
                self.events.send(CaptureEvent::CaptureError {
                    message: e.to_string(),
                });
                return;
            }
        };

        let source_rate = stream.sample_rate();
        let recorder = ChunkRecorder::new(source_rate, self.config.chunk_ms);
        let engine = EngineHandle::spawn(
            Arc::clone(&self.factory),
            self.events.clone(),
            self.config.inference.clone(),
            self.config.inference_timeout,
        );

        let mut heartbeat = Heartbeat::new(self.config.heartbeat_interval);
        heartbeat.start(self.events.clone());

        self.session = Some(ActiveSession {
            stream,
            loopback,
            recorder,
            engine,
            heartbeat,
            source_rate,
            consecutive_read_errors: 0,
            dropped_chunks: 0,
            warned_dropped: false,
        });

        self.events.send(CaptureEvent::CaptureStarted);
    }

    /// Ends the session. Idempotent; safe to call when nothing is running.
    ///
    /// Every teardown step independently guards its resource: the heartbeat
    /// stops its own timer, the loopback closes its own route, the stream
    /// and engine release on their side. Audio still buffered in the
    /// recorder (less than one chunk) is discarded.
    fn stop_capture(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        session.heartbeat.stop();
        session.loopback.disconnect();
        session.stream.close();
        session.engine.terminate();
    }

    /// Pulls captured audio, feeds the loopback, and forwards any completed
    /// chunk to the engine. Returns a fatal error message when the stream
    /// has failed for good.
    fn poll_session(&mut self) -> Option<String> {
        let session = self.session.as_mut()?;

        let samples = match session.stream.read_samples() {
            Ok(samples) => {
                session.consecutive_read_errors = 0;
                samples
            }
            Err(e) => {
                session.consecutive_read_errors += 1;
                if session.consecutive_read_errors >= MAX_CONSECUTIVE_READ_ERRORS {
                    return Some(format!(
                        "audio capture failed {} times in a row: {e}",
                        session.consecutive_read_errors
                    ));
                }
                return None;
            }
        };

        if samples.is_empty() {
            // Live source warming up, or finite source exhausted. Either
            // way there is nothing to do until a control message arrives.
            return None;
        }

        session.loopback.forward(&samples, session.source_rate);
        session.recorder.push(&samples);

        while let Some(chunk) = session.recorder.poll_chunk() {
            let resampled = resample(
                chunk.samples,
                chunk.source_rate,
                defaults::TARGET_SAMPLE_RATE,
            );
            if !session.engine.submit(ResampledChunk::new(resampled)) {
                session.dropped_chunks += 1;
                if !session.warned_dropped {
                    session.warned_dropped = true;
                    eprintln!(
                        "tabscribe: inference is falling behind, dropping audio chunks \
                         (engine busy)"
                    );
                }
            }
        }

        None
    }

    #[cfg(test)]
    fn has_session(&self) -> bool {
        self.session.is_some()
    }
}
