//! Loopback fix: keep captured audio audible.
//!
//! Acquiring a target's audio for processing silences it at the platform
//! mixing layer, so the capture context must explicitly reconnect the
//! captured stream to the default output device. Omitting this mutes the
//! user's call audio.

use crate::capture::media::AudioOutput;

/// Owns the output route for one capture session and forwards every
/// captured batch back to it.
///
/// Disconnect is idempotent and also runs on drop, so no stop path can leak
/// the route.
pub struct LoopbackGuard {
    output: Option<Box<dyn AudioOutput>>,
    warned: bool,
}

impl LoopbackGuard {
    pub fn connect(output: Box<dyn AudioOutput>) -> Self {
        Self {
            output: Some(output),
            warned: false,
        }
    }

    /// Forwards captured samples to the output device.
    ///
    /// Playback failures do not interrupt capture; transcription still works
    /// with a lost monitor. Warn once so the muted call is explainable.
    pub fn forward(&mut self, samples: &[f32], sample_rate: u32) {
        if let Some(ref mut output) = self.output
            && let Err(e) = output.play(samples, sample_rate)
            && !self.warned
        {
            self.warned = true;
            eprintln!("tabscribe: loopback playback failed, call audio may be muted: {e}");
        }
    }

    /// Whether the route is still connected.
    pub fn is_connected(&self) -> bool {
        self.output.is_some()
    }

    /// Releases the output route. Safe to call more than once.
    pub fn disconnect(&mut self) {
        if let Some(mut output) = self.output.take() {
            output.close();
        }
    }
}

impl Drop for LoopbackGuard {
    fn drop(&mut self) {
        self.disconnect();
    }
}
