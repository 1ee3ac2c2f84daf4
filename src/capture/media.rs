//! Host-platform media boundary.
//!
//! The host is an external collaborator with a narrow contract: issue a
//! capturable handle for a target, open a pull-based audio stream for that
//! handle, and open a route to the default output device so captured audio
//! can be looped back (capturing a stream silences it at the platform mixing
//! layer; see `capture::loopback`).

use crate::error::{Result, TabscribeError};
use crate::messages::{MediaHandle, TargetId};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// A pull-based audio source obtained from the host for one capture
/// activation.
pub trait MediaStream: Send {
    /// Native sample rate of the stream.
    fn sample_rate(&self) -> u32;

    /// Read mono samples accumulated since the last read. An empty read from
    /// a live stream is normal while the device warms up; from a finite
    /// stream it means exhaustion.
    fn read_samples(&mut self) -> Result<Vec<f32>>;

    /// True for bounded sources (file replay); false for live capture.
    fn is_finite(&self) -> bool {
        false
    }

    /// Release the underlying platform resources. Idempotent.
    fn close(&mut self);
}

/// A playback route to the default output device, used for the loopback fix.
pub trait AudioOutput: Send {
    /// Queue samples for playback at the given rate.
    fn play(&mut self, samples: &[f32], sample_rate: u32) -> Result<()>;

    /// Release the route. Idempotent.
    fn close(&mut self);
}

/// Host-platform boundary consumed by the orchestrator and capture context.
pub trait MediaHost: Send + Sync {
    /// Request a capturable handle scoped to `target`. Fails with a
    /// permission or availability error.
    fn request_media_handle(&self, target: TargetId) -> Result<MediaHandle>;

    /// Acquire the audio stream for a previously issued handle.
    fn open_stream(&self, handle: &MediaHandle) -> Result<Box<dyn MediaStream>>;

    /// Open a playback route to the default output device.
    fn open_loopback(&self) -> Result<Box<dyn AudioOutput>>;
}

/// One phase of mock stream output: `samples` returned `count` times.
#[derive(Debug, Clone)]
pub struct FramePhase {
    pub samples: Vec<f32>,
    pub count: u32,
}

/// Shared counters exposed by [`MockMediaHost`] for assertions.
#[derive(Debug, Default)]
pub struct MockHostCounters {
    pub handles_requested: AtomicUsize,
    pub streams_opened: AtomicUsize,
    pub streams_closed: AtomicUsize,
    pub loopbacks_opened: AtomicUsize,
    pub loopbacks_closed: AtomicUsize,
    pub samples_played: AtomicUsize,
}

/// Mock media host for testing the pipeline without platform audio.
#[derive(Clone)]
pub struct MockMediaHost {
    counters: Arc<MockHostCounters>,
    phases: Vec<FramePhase>,
    sample_rate: u32,
    finite: bool,
    handle_error: Option<String>,
    stream_error: Option<String>,
    loopback_error: Option<String>,
}

impl MockMediaHost {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(MockHostCounters::default()),
            phases: Vec::new(),
            sample_rate: 48000,
            finite: true,
            handle_error: None,
            stream_error: None,
            loopback_error: None,
        }
    }

    /// Configure the sample batches the opened stream will return, in order.
    pub fn with_frame_sequence(mut self, phases: Vec<FramePhase>) -> Self {
        self.phases = phases;
        self
    }

    /// Configure the native rate reported by opened streams.
    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = rate;
        self
    }

    /// Treat opened streams as live sources (empty reads keep polling).
    pub fn as_live_source(mut self) -> Self {
        self.finite = false;
        self
    }

    /// Fail `request_media_handle` with the given message.
    pub fn with_handle_failure(mut self, message: &str) -> Self {
        self.handle_error = Some(message.to_string());
        self
    }

    /// Fail `open_stream` with the given message.
    pub fn with_stream_failure(mut self, message: &str) -> Self {
        self.stream_error = Some(message.to_string());
        self
    }

    /// Fail `open_loopback` with the given message.
    pub fn with_loopback_failure(mut self, message: &str) -> Self {
        self.loopback_error = Some(message.to_string());
        self
    }

    pub fn counters(&self) -> Arc<MockHostCounters> {
        Arc::clone(&self.counters)
    }
}

impl Default for MockMediaHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaHost for MockMediaHost {
    fn request_media_handle(&self, target: TargetId) -> Result<MediaHandle> {
        self.counters
            .handles_requested
            .fetch_add(1, Ordering::SeqCst);
        if let Some(ref message) = self.handle_error {
            return Err(TabscribeError::MediaUnavailable {
                target: target.0,
                message: message.clone(),
            });
        }
        Ok(MediaHandle::new(format!("mock-stream-{target}")))
    }

    fn open_stream(&self, _handle: &MediaHandle) -> Result<Box<dyn MediaStream>> {
        if let Some(ref message) = self.stream_error {
            return Err(TabscribeError::MediaPermissionDenied {
                message: message.clone(),
            });
        }
        self.counters.streams_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockMediaStream {
            counters: Arc::clone(&self.counters),
            phases: self.phases.clone(),
            phase_index: 0,
            reads_in_phase: 0,
            sample_rate: self.sample_rate,
            finite: self.finite,
            closed: false,
        }))
    }

    fn open_loopback(&self) -> Result<Box<dyn AudioOutput>> {
        if let Some(ref message) = self.loopback_error {
            return Err(TabscribeError::Loopback {
                message: message.clone(),
            });
        }
        self.counters
            .loopbacks_opened
            .fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockAudioOutput {
            counters: Arc::clone(&self.counters),
            closed: false,
        }))
    }
}

/// Mock stream that plays back the host's configured frame phases.
pub struct MockMediaStream {
    counters: Arc<MockHostCounters>,
    phases: Vec<FramePhase>,
    phase_index: usize,
    reads_in_phase: u32,
    sample_rate: u32,
    finite: bool,
    closed: bool,
}

impl MediaStream for MockMediaStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read_samples(&mut self) -> Result<Vec<f32>> {
        while let Some(phase) = self.phases.get(self.phase_index) {
            if self.reads_in_phase < phase.count {
                self.reads_in_phase += 1;
                return Ok(phase.samples.clone());
            }
            self.phase_index += 1;
            self.reads_in_phase = 0;
        }
        // Exhausted all phases.
        Ok(Vec::new())
    }

    fn is_finite(&self) -> bool {
        self.finite
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.counters.streams_closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Mock output route that counts the samples it is asked to play.
pub struct MockAudioOutput {
    counters: Arc<MockHostCounters>,
    closed: bool,
}

impl AudioOutput for MockAudioOutput {
    fn play(&mut self, samples: &[f32], _sample_rate: u32) -> Result<()> {
        self.counters
            .samples_played
            .fetch_add(samples.len(), Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.counters
                .loopbacks_closed
                .fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Failure flag an output mock can trip after construction.
pub struct FailingAudioOutput {
    pub fail: Arc<AtomicBool>,
}

impl AudioOutput for FailingAudioOutput {
    fn play(&mut self, _samples: &[f32], _sample_rate: u32) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            Err(TabscribeError::Loopback {
                message: "output route lost".to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn close(&mut self) {}
}
