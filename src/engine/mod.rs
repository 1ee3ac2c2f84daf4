//! Inference engine: lazy, singleton, stateful speech recognition over PCM
//! chunks, hosted in its own worker thread per capture session.

pub mod transcriber;
pub mod whisper;
mod worker;

pub use transcriber::{
    InferenceParams, MockTranscriber, MockTranscriberFactory, Transcriber, TranscriberFactory,
    split_windows,
};
pub use whisper::{WhisperConfig, WhisperTranscriber, WhisperTranscriberFactory};
pub use worker::EngineHandle;
