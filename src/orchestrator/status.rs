//! Status indicator surface.
//!
//! A persistent badge reflects each session's state at all times. The trait
//! seam keeps the orchestrator testable and lets embedders plug in a real
//! UI surface.

use crate::messages::TargetId;
use std::sync::{Arc, Mutex};

/// Badge shown for a capture target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorState {
    /// No session; badge cleared.
    Idle,
    /// Starting up or model warming.
    Working,
    /// Live and transcribing.
    Active,
    /// Session failed; detailed text is in the logs.
    Error,
}

/// Receives badge updates from the orchestrator.
pub trait StatusIndicator: Send {
    fn set(&mut self, target: TargetId, state: IndicatorState);
}

/// Default indicator: one stderr line per badge change.
#[derive(Debug, Default)]
pub struct LogIndicator;

impl StatusIndicator for LogIndicator {
    fn set(&mut self, target: TargetId, state: IndicatorState) {
        let badge = match state {
            IndicatorState::Idle => "idle",
            IndicatorState::Working => "working",
            IndicatorState::Active => "listening",
            IndicatorState::Error => "error",
        };
        eprintln!("tabscribe: target {target}: {badge}");
    }
}

/// Indicator that records every badge change for assertions.
#[derive(Debug, Clone, Default)]
pub struct MockIndicator {
    changes: Arc<Mutex<Vec<(TargetId, IndicatorState)>>>,
}

impl MockIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changes(&self) -> Vec<(TargetId, IndicatorState)> {
        self.changes.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// The most recent badge for a target, if any was ever set.
    pub fn current(&self, target: TargetId) -> Option<IndicatorState> {
        self.changes()
            .into_iter()
            .rev()
            .find(|(t, _)| *t == target)
            .map(|(_, state)| state)
    }
}

impl StatusIndicator for MockIndicator {
    fn set(&mut self, target: TargetId, state: IndicatorState) {
        if let Ok(mut changes) = self.changes.lock() {
            changes.push((target, state));
        }
    }
}
