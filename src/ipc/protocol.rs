//! JSON message protocol for IPC communication between CLI and daemon.

use crate::orchestrator::session::CaptureState;
use serde::{Deserialize, Serialize};

/// Commands sent by clients to the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Toggle capture for a target: start when idle, stop when listening.
    Toggle { target: u64 },
    /// Stop capture for a target.
    Stop { target: u64 },
    /// Notify that a target was closed.
    TargetRemoved { target: u64 },
    /// Notify that a target navigated to a different context.
    TargetNavigated { target: u64 },
    /// Get per-target session states.
    Status,
    /// Stream transcript events until the connection closes.
    Follow,
    /// Shut the daemon down.
    Shutdown,
}

impl Command {
    /// Serialize command to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize command from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Per-target session state included in a status response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub target: u64,
    pub state: CaptureState,
}

/// Responses sent by the daemon to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Command succeeded
    Ok,
    /// Current session states
    Status { sessions: Vec<SessionStatus> },
    /// Error occurred
    Error { message: String },
}

impl Response {
    /// Serialize response to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize response from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Events streamed to `follow` clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// One finalized transcript segment.
    Transcript {
        target: u64,
        text: String,
        emitted_at_ms: u64,
    },
    /// A session changed state.
    State { target: u64, state: CaptureState },
}

impl Event {
    /// Serialize event to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize event from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
