//! Default configuration constants for tabscribe.
//!
//! Shared constants used across the capture, engine, and orchestrator
//! configuration types to ensure consistency and eliminate duplication.

/// Sample rate required by the inference engine, in Hz.
///
/// 16kHz is the standard for speech recognition; every captured chunk is
/// resampled to exactly this rate before it reaches the engine.
pub const TARGET_SAMPLE_RATE: u32 = 16000;

/// Duration of one recorded chunk in milliseconds.
///
/// The recorder emits a chunk of captured audio every 2 seconds. This is the
/// unit of work between the capture context and the inference engine.
pub const CHUNK_INTERVAL_MS: u32 = 2000;

/// Interval between heartbeat pings in seconds.
///
/// A ping every 20 seconds keeps the orchestrator's host context from being
/// reclaimed as idle while a capture session is listening.
pub const HEARTBEAT_INTERVAL_SECS: u64 = 20;

/// Cadence at which the capture worker polls its media stream, in milliseconds.
pub const POLL_INTERVAL_MS: u64 = 16;

/// Analysis window passed to the inference engine, in seconds.
///
/// Chunks longer than this are split into overlapping windows before
/// transcription. With the default 2s chunk this never binds.
pub const WINDOW_SECS: u32 = 30;

/// Overlap between consecutive analysis windows, in seconds.
pub const STRIDE_SECS: u32 = 5;

/// Maximum age of a queued chunk before the engine drops it unprocessed,
/// in seconds.
///
/// Bounds how "stuck" a session can appear when inference falls far behind:
/// stale chunks are dropped with a per-chunk error instead of piling up.
pub const INFERENCE_TIMEOUT_SECS: u64 = 30;

/// Default transcription language code.
///
/// "auto" lets the model detect the spoken language; set a specific code
/// (e.g., "en", "de") to force one.
pub const DEFAULT_LANGUAGE: &str = "auto";

/// Language value that triggers automatic language detection.
pub const AUTO_LANGUAGE: &str = "auto";

/// Default Whisper model path.
pub const DEFAULT_MODEL_PATH: &str = "models/ggml-base.bin";

/// Maximum number of entries kept in the recent-transcript history.
pub const HISTORY_MAX_ENTRIES: usize = 100;

/// Maximum age of a history entry in seconds; older entries are pruned.
pub const HISTORY_MAX_AGE_SECS: u64 = 300;
