//! Recent-transcript history: a capped, age-filtered buffer owned by the
//! orchestrator.

use crate::defaults;
use crate::messages::TranscriptEvent;
use std::collections::VecDeque;
use std::time::{Duration, SystemTime};

/// Bounded buffer of recent transcript segments.
///
/// Entries are evicted when the cap is exceeded and filtered out of reads
/// once they exceed the maximum age.
#[derive(Debug)]
pub struct TranscriptHistory {
    entries: VecDeque<TranscriptEvent>,
    max_entries: usize,
    max_age: Duration,
}

impl TranscriptHistory {
    pub fn new(max_entries: usize, max_age: Duration) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries.min(64)),
            max_entries,
            max_age,
        }
    }

    /// Appends a segment, evicting the oldest entries over the cap.
    pub fn push(&mut self, event: TranscriptEvent) {
        self.entries.push_back(event);
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    /// Returns entries no older than the age limit relative to `now`,
    /// oldest first.
    pub fn recent(&self, now: SystemTime) -> Vec<TranscriptEvent> {
        self.entries
            .iter()
            .filter(|event| {
                now.duration_since(event.emitted_at)
                    .map(|age| age <= self.max_age)
                    // An entry stamped "in the future" (clock adjustment)
                    // is kept rather than dropped.
                    .unwrap_or(true)
            })
            .cloned()
            .collect()
    }

    /// Drops entries older than the age limit relative to `now`.
    pub fn prune(&mut self, now: SystemTime) {
        let max_age = self.max_age;
        self.entries.retain(|event| {
            now.duration_since(event.emitted_at)
                .map(|age| age <= max_age)
                .unwrap_or(true)
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TranscriptHistory {
    fn default() -> Self {
        Self::new(
            defaults::HISTORY_MAX_ENTRIES,
            Duration::from_secs(defaults::HISTORY_MAX_AGE_SECS),
        )
    }
}
