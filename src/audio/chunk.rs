//! Chunk types moved between the capture context and the inference engine.

use crate::defaults;
use std::time::Instant;

/// A fixed-duration slice of recorded audio at the source's native rate.
///
/// Produced by the recorder every chunk interval, consumed and discarded
/// immediately after resampling; at most one chunk is in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    /// Mono PCM samples in [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Native sample rate of the captured stream.
    pub source_rate: u32,
}

impl AudioChunk {
    pub fn new(samples: Vec<f32>, source_rate: u32) -> Self {
        Self {
            samples,
            source_rate,
        }
    }

    /// Duration of this chunk in milliseconds.
    pub fn duration_ms(&self) -> u32 {
        if self.source_rate == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000 / self.source_rate as u64) as u32
    }
}

/// A chunk resampled to the engine's required rate.
///
/// Ownership of the buffer transfers into the engine queue; nothing is
/// copied on the way.
#[derive(Debug, Clone)]
pub struct ResampledChunk {
    /// Mono PCM samples in [-1.0, 1.0] at `sample_rate`.
    pub samples: Vec<f32>,
    /// Always the engine target rate.
    pub sample_rate: u32,
    /// When this chunk entered the engine queue; used for staleness drops.
    pub queued_at: Instant,
}

impl ResampledChunk {
    pub fn new(samples: Vec<f32>) -> Self {
        Self {
            samples,
            sample_rate: defaults::TARGET_SAMPLE_RATE,
            queued_at: Instant::now(),
        }
    }

    /// Duration of this chunk in milliseconds.
    pub fn duration_ms(&self) -> u32 {
        (self.samples.len() as u64 * 1000 / self.sample_rate as u64) as u32
    }
}
