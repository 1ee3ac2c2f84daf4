//! tabscribe - Live on-device transcription of captured call audio
//!
//! Captures a target's audio through the host platform, keeps it audible via
//! the loopback fix, chunks and resamples it, and feeds a lazily-loaded
//! speech model, publishing transcripts to whichever consumer is attached.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod capture;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod daemon;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod heartbeat;
pub mod ipc;
pub mod messages;
pub mod orchestrator;
#[cfg(feature = "cli")]
pub mod output;

// Core traits (host boundary → capture → engine → sink)
pub use capture::{AudioOutput, MediaHost, MediaStream};
pub use engine::{Transcriber, TranscriberFactory};
pub use orchestrator::{StatusIndicator, TranscriptSink};

// Pipeline surface
pub use capture::{CaptureConfig, CaptureContext};
pub use orchestrator::{Orchestrator, OrchestratorCommand, OrchestratorHandle};

// Message contract
pub use messages::{CaptureEvent, ControlMessage, MediaHandle, TargetId, TranscriptEvent};

// Error handling
pub use error::{Result, TabscribeError};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.2.0+abc1234"` when git hash is available, `"0.2.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
