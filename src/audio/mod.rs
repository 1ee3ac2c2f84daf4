//! Audio data types and signal processing for the capture pipeline.

pub mod chunk;
pub mod resample;

pub use chunk::{AudioChunk, ResampledChunk};
pub use resample::resample;
