//! WAV-backed media stream.
//!
//! Lets pre-recorded call audio run through the full pipeline: the file is
//! decoded up front and replayed in fixed batches as a finite stream.

use crate::capture::media::MediaStream;
use crate::error::{Result, TabscribeError};
use std::io::Read;

/// Finite [`MediaStream`] over decoded WAV samples.
pub struct WavMediaStream {
    samples: Vec<f32>,
    sample_rate: u32,
    position: usize,
    batch: usize,
}

impl WavMediaStream {
    /// Parses WAV data from a reader, mixing multi-channel audio to mono.
    pub fn from_reader(reader: Box<dyn Read + Send>) -> Result<Self> {
        let mut wav = hound::WavReader::new(reader).map_err(|e| TabscribeError::AudioCapture {
            message: format!("Failed to parse WAV data: {}", e),
        })?;

        let spec = wav.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => wav
                .samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| TabscribeError::AudioCapture {
                    message: format!("Failed to read WAV samples: {}", e),
                })?,
            hound::SampleFormat::Int => {
                let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
                wav.samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| TabscribeError::AudioCapture {
                        message: format!("Failed to read WAV samples: {}", e),
                    })?
            }
        };

        // Mix to mono by averaging channels.
        let samples: Vec<f32> = if channels == 1 {
            interleaved
        } else {
            interleaved
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect()
        };

        // Replay in 100ms batches.
        let batch = (spec.sample_rate as usize / 10).max(1);

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
            position: 0,
            batch,
        })
    }

    /// Consumes the stream and returns all remaining samples.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples[self.position..].to_vec()
    }
}

impl MediaStream for WavMediaStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read_samples(&mut self) -> Result<Vec<f32>> {
        if self.position >= self.samples.len() {
            return Ok(Vec::new());
        }
        let end = (self.position + self.batch).min(self.samples.len());
        let batch = self.samples[self.position..end].to_vec();
        self.position = end;
        Ok(batch)
    }

    fn is_finite(&self) -> bool {
        true
    }

    fn close(&mut self) {
        self.position = self.samples.len();
    }
}
