//! Engine worker thread and its handle.
//!
//! The worker owns the transcriber singleton for one capture session. It
//! consumes resampled chunks from a depth-1 bounded queue: if a new chunk
//! arrives while the previous inference is still running, the new chunk is
//! rejected at submit time and dropped by the caller. Chunks that sat queued
//! past the inference timeout are dropped at dequeue with a non-fatal error.

use crate::audio::ResampledChunk;
use crate::defaults;
use crate::engine::transcriber::{InferenceParams, Transcriber, TranscriberFactory, split_windows};
use crate::messages::{CaptureEvent, EventSender};
use crossbeam_channel::{Receiver, Sender, bounded};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Handle to a running engine worker, owned by the capture session.
///
/// Terminating the handle disconnects the queue; the worker exits after the
/// inference currently in flight, which is never waited on. Transcripts
/// emitted after the session ended are discarded by the orchestrator.
pub struct EngineHandle {
    chunk_tx: Option<Sender<ResampledChunk>>,
    thread: Option<JoinHandle<()>>,
}

impl EngineHandle {
    /// Spawns the engine worker for one session.
    pub fn spawn(
        factory: Arc<dyn TranscriberFactory>,
        events: EventSender,
        params: InferenceParams,
        inference_timeout: Duration,
    ) -> Self {
        let (chunk_tx, chunk_rx) = bounded(1);
        let thread = thread::spawn(move || {
            run_worker(factory, events, params, inference_timeout, chunk_rx);
        });
        Self {
            chunk_tx: Some(chunk_tx),
            thread: Some(thread),
        }
    }

    /// Offers a chunk to the engine, transferring ownership of the buffer.
    ///
    /// Returns false when the queue is full (a previous inference is still
    /// running) or the worker has exited; the chunk is dropped either way.
    pub fn submit(&self, chunk: ResampledChunk) -> bool {
        match self.chunk_tx {
            Some(ref tx) => tx.try_send(chunk).is_ok(),
            None => false,
        }
    }

    /// Whether the worker thread is still alive.
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Disconnects the queue and detaches the worker.
    ///
    /// Does not wait for in-flight inference: a stop request must be honored
    /// even while a chunk is being transcribed.
    pub fn terminate(&mut self) {
        self.chunk_tx.take();
        // Dropping the JoinHandle detaches the thread; it exits on its own
        // once the disconnected queue is observed.
        self.thread.take();
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn run_worker(
    factory: Arc<dyn TranscriberFactory>,
    events: EventSender,
    params: InferenceParams,
    inference_timeout: Duration,
    chunk_rx: Receiver<ResampledChunk>,
) {
    let mut model: Option<Box<dyn Transcriber>> = None;
    let mut warned_slow = false;

    while let Ok(chunk) = chunk_rx.recv() {
        // Stale chunks are dropped unprocessed so a slow model cannot make
        // the session appear stuck behind an ever-growing backlog.
        let waited = chunk.queued_at.elapsed();
        if waited > inference_timeout {
            events.send(CaptureEvent::TranscriptionError {
                message: format!(
                    "dropping chunk queued {}ms ago (timeout {}ms)",
                    waited.as_millis(),
                    inference_timeout.as_millis()
                ),
            });
            continue;
        }

        // Lazy singleton init: first chunk pays the model load. A failed
        // load is fatal to the session and the worker exits.
        if model.is_none() {
            events.send(CaptureEvent::ModelLoading);
            match factory.create() {
                Ok(t) => {
                    events.send(CaptureEvent::ModelReady);
                    model = Some(t);
                }
                Err(e) => {
                    events.send(CaptureEvent::CaptureError {
                        message: e.to_string(),
                    });
                    return;
                }
            }
        }
        let Some(transcriber) = model.as_mut() else {
            continue;
        };

        let started = Instant::now();
        let chunk_duration_ms = chunk.duration_ms();
        match transcribe_chunk(transcriber.as_mut(), &chunk, &params) {
            Ok(text) => {
                events.send(CaptureEvent::TranscriptReady { text });
            }
            Err(message) => {
                // A single bad chunk is not fatal; keep serving.
                events.send(CaptureEvent::TranscriptionError { message });
            }
        }

        if !warned_slow {
            let elapsed_ms = started.elapsed().as_millis() as u32;
            if elapsed_ms > chunk_duration_ms {
                warned_slow = true;
                eprintln!(
                    "tabscribe: transcription slower than real-time ({elapsed_ms}ms for {chunk_duration_ms}ms of audio)"
                );
                eprintln!("  Consider a smaller model or enable GPU acceleration.");
            }
        }
    }
}

/// Runs inference over one chunk, splitting it into analysis windows when it
/// exceeds the configured window length.
fn transcribe_chunk(
    transcriber: &mut dyn Transcriber,
    chunk: &ResampledChunk,
    params: &InferenceParams,
) -> Result<String, String> {
    let window = params.window_secs as usize * defaults::TARGET_SAMPLE_RATE as usize;
    let stride = params.stride_secs as usize * defaults::TARGET_SAMPLE_RATE as usize;

    let mut pieces = Vec::new();
    for (start, end) in split_windows(chunk.samples.len(), window, stride) {
        let text = transcriber
            .transcribe(&chunk.samples[start..end])
            .map_err(|e| e.to_string())?;
        let text = text.trim();
        if !text.is_empty() {
            pieces.push(text.to_string());
        }
    }
    // Empty string when no speech was detected; not an error.
    Ok(pieces.join(" "))
}
