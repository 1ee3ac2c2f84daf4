//! Heartbeat: periodic liveness pings for the duration of a capture session.
//!
//! The orchestrator's host environment reclaims idle background contexts;
//! receiving a ping resets that idle timer. The heartbeat is a sibling
//! component started and stopped explicitly by the session's start/stop
//! transitions, never a wrapper around them.

use crate::messages::{CaptureEvent, EventSender};
use crossbeam_channel::{Sender, bounded};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Sends a [`CaptureEvent::HeartbeatPing`] on a fixed cadence while running.
///
/// Starting twice keeps the original timer; stopping is idempotent and also
/// runs on drop, so no stop path can leave a timer behind.
pub struct Heartbeat {
    interval: Duration,
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Heartbeat {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            stop_tx: None,
            thread: None,
        }
    }

    /// Starts the timer. No-op if already running.
    pub fn start(&mut self, events: EventSender) {
        if self.thread.is_some() {
            return;
        }

        let (stop_tx, stop_rx) = bounded::<()>(0);
        let interval = self.interval;
        let thread = thread::spawn(move || {
            // The stop sender is dropped on stop(); the disconnect wakes the
            // timer immediately instead of waiting out the interval.
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                        events.send(CaptureEvent::HeartbeatPing);
                    }
                    _ => break,
                }
            }
        });

        self.stop_tx = Some(stop_tx);
        self.thread = Some(thread);
    }

    /// Whether the timer is running.
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stops the timer. Safe to call when nothing is running.
    pub fn stop(&mut self) {
        self.stop_tx.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}
