//! Transcript sink bridge.
//!
//! The orchestrator forwards every finished segment to whichever foreground
//! consumer is currently attached. Delivery is best-effort: a missing
//! consumer is the normal case, not an error.

use crate::error::{Result, TabscribeError};
use crate::messages::{TargetId, TranscriptEvent};

/// Pluggable transcript output. Pairs with the capture side's media traits:
/// this is where finished text leaves the pipeline.
pub trait TranscriptSink: Send {
    /// Deliver one segment to the current consumer. An `Err` means no
    /// consumer received it; the orchestrator swallows that.
    fn deliver(&mut self, target: TargetId, event: &TranscriptEvent) -> Result<()>;

    /// Name for logging/debugging.
    fn name(&self) -> &'static str {
        "sink"
    }
}

/// Sink for sessions without a consumer surface.
#[derive(Debug, Default)]
pub struct NullSink;

impl TranscriptSink for NullSink {
    fn deliver(&mut self, _target: TargetId, _event: &TranscriptEvent) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "null"
    }
}

/// Collects non-empty segments for library use and tests.
#[derive(Debug, Default)]
pub struct CollectorSink {
    collected: Vec<String>,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulated text joined with spaces, or None when nothing arrived.
    pub fn finish(&self) -> Option<String> {
        if self.collected.is_empty() {
            None
        } else {
            Some(self.collected.join(" "))
        }
    }
}

impl TranscriptSink for CollectorSink {
    fn deliver(&mut self, _target: TargetId, event: &TranscriptEvent) -> Result<()> {
        if !event.text.trim().is_empty() {
            self.collected.push(event.text.clone());
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "collector"
    }
}

/// Bridges transcripts onto a broadcast channel consumed by IPC `follow`
/// clients.
///
/// `broadcast::Sender::send` fails exactly when no receiver is subscribed,
/// which is the expected "consumer disappeared" case.
pub struct BroadcastSink {
    tx: tokio::sync::broadcast::Sender<crate::ipc::protocol::Event>,
}

impl BroadcastSink {
    pub fn new(tx: tokio::sync::broadcast::Sender<crate::ipc::protocol::Event>) -> Self {
        Self { tx }
    }
}

impl TranscriptSink for BroadcastSink {
    fn deliver(&mut self, target: TargetId, event: &TranscriptEvent) -> Result<()> {
        let emitted_at_ms = event
            .emitted_at
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        self.tx
            .send(crate::ipc::protocol::Event::Transcript {
                target: target.0,
                text: event.text.clone(),
                emitted_at_ms,
            })
            .map(|_| ())
            .map_err(|_| TabscribeError::IpcConnection {
                message: "no follow client attached".to_string(),
            })
    }

    fn name(&self) -> &'static str {
        "broadcast"
    }
}
