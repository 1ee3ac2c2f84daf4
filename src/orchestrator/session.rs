//! Per-target capture session state machine.
//!
//! All state changes go through a single transition function; transitions
//! that would violate the one-session invariant are rejected instead of
//! silently absorbed.

use crate::error::{Result, TabscribeError};
use crate::messages::TargetId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// Lifecycle state of a capture session.
///
/// `Idle → Starting → Listening → Idle`, with `Error` reachable from
/// `Starting` or `Listening` and always routing back to `Idle` after the
/// forced stop. Terminal state is `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    Idle,
    Starting,
    Listening,
    Error,
}

impl CaptureState {
    /// Whether a start trigger may begin a new session from this state.
    pub fn can_start(&self) -> bool {
        matches!(self, CaptureState::Idle | CaptureState::Error)
    }

    /// Whether the session currently holds capture resources.
    pub fn is_active(&self) -> bool {
        matches!(self, CaptureState::Starting | CaptureState::Listening)
    }
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaptureState::Idle => "idle",
            CaptureState::Starting => "starting",
            CaptureState::Listening => "listening",
            CaptureState::Error => "error",
        };
        write!(f, "{name}")
    }
}

/// One capture session, owned exclusively by the orchestrator.
#[derive(Debug, Clone)]
pub struct CaptureSession {
    pub target: TargetId,
    state: CaptureState,
    pub started_at: SystemTime,
}

impl CaptureSession {
    /// Creates a session entering `Starting`.
    pub fn begin(target: TargetId) -> Self {
        Self {
            target,
            state: CaptureState::Starting,
            started_at: SystemTime::now(),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// The single transition function.
    ///
    /// Allowed: `Idle→Starting`, `Starting→Listening`,
    /// `Starting|Listening→Error`, and anything `→Idle`. Everything else is
    /// rejected, including `Error -> Listening`, which is how a stale
    /// `CaptureStarted` losing the race against `CaptureError` is ignored.
    pub fn advance(&mut self, to: CaptureState) -> Result<()> {
        use CaptureState::*;
        let allowed = matches!(
            (self.state, to),
            (Idle, Starting)
                | (Starting, Listening)
                | (Starting, Error)
                | (Listening, Error)
                | (_, Idle)
        );
        if !allowed {
            return Err(TabscribeError::SessionState {
                message: format!("target {}: {} -> {}", self.target, self.state, to),
            });
        }
        self.state = to;
        Ok(())
    }
}
