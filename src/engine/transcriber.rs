//! Transcriber trait and inference parameters.
//!
//! The engine worker owns exactly one `Transcriber` per capture session,
//! created lazily by a `TranscriberFactory` on the first chunk.

use crate::defaults;
use crate::error::{Result, TabscribeError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Fixed chunking parameters applied to every inference call.
#[derive(Debug, Clone)]
pub struct InferenceParams {
    /// Language code, or "auto" for detection.
    pub language: String,
    /// Analysis window in seconds; longer chunks are split.
    pub window_secs: u32,
    /// Overlap between consecutive windows in seconds.
    pub stride_secs: u32,
    /// Number of inference threads (None = auto-detect).
    pub threads: Option<usize>,
}

impl Default for InferenceParams {
    fn default() -> Self {
        Self {
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            window_secs: defaults::WINDOW_SECS,
            stride_secs: defaults::STRIDE_SECS,
            threads: None,
        }
    }
}

/// Splits `len` samples into analysis windows of `window` samples stepping
/// by `window - stride`, so consecutive windows overlap by `stride`.
///
/// Returns `(start, end)` ranges covering the whole input. A degenerate
/// stride (>= window) falls back to non-overlapping windows.
pub fn split_windows(len: usize, window: usize, stride: usize) -> Vec<(usize, usize)> {
    if len == 0 || window == 0 {
        return Vec::new();
    }
    if len <= window {
        return vec![(0, len)];
    }

    let step = if stride < window { window - stride } else { window };
    let mut ranges = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + window).min(len);
        ranges.push((start, end));
        if end == len {
            break;
        }
        start += step;
    }
    ranges
}

/// Speech-to-text over mono f32 PCM at the engine target rate.
pub trait Transcriber: Send {
    /// Transcribe one analysis window. Returns the raw text; the engine
    /// trims it. An empty result means no speech was detected.
    fn transcribe(&mut self, samples: &[f32]) -> Result<String>;

    /// Name of the loaded model.
    fn model_name(&self) -> &str;
}

/// Constructs the transcriber on first use, inside the engine worker.
pub trait TranscriberFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn Transcriber>>;
}

/// Mock transcriber for testing.
pub struct MockTranscriber {
    model_name: String,
    response: String,
    should_fail: bool,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
    sample_counts: Arc<std::sync::Mutex<Vec<usize>>>,
}

impl MockTranscriber {
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            response: "mock transcription".to_string(),
            should_fail: false,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
            sample_counts: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    /// Configure the mock to return a specific response.
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Configure the mock to fail on transcribe.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Configure the mock to sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shared call counter for assertions.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    /// Shared record of the sample count passed to each call.
    pub fn sample_counts(&self) -> Arc<std::sync::Mutex<Vec<usize>>> {
        Arc::clone(&self.sample_counts)
    }
}

impl Transcriber for MockTranscriber {
    fn transcribe(&mut self, samples: &[f32]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut counts) = self.sample_counts.lock() {
            counts.push(samples.len());
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.should_fail {
            Err(TabscribeError::TranscriptionFailed {
                message: "mock transcription failure".to_string(),
            })
        } else {
            Ok(self.response.clone())
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Factory producing configured [`MockTranscriber`]s, with shared counters
/// so tests can observe what the engine worker did with them.
pub struct MockTranscriberFactory {
    response: String,
    should_fail: bool,
    init_failure: Option<String>,
    delay: Option<Duration>,
    creates: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
    sample_counts: Arc<std::sync::Mutex<Vec<usize>>>,
}

impl MockTranscriberFactory {
    pub fn new() -> Self {
        Self {
            response: String::new(),
            should_fail: false,
            init_failure: None,
            delay: None,
            creates: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(AtomicUsize::new(0)),
            sample_counts: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    pub fn with_transcribe_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Make `create` fail, simulating a model that cannot load.
    pub fn with_init_failure(mut self, message: &str) -> Self {
        self.init_failure = Some(message.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `create` calls (the model-singleton invariant: one per
    /// session).
    pub fn creates(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.creates)
    }

    /// Total transcribe calls across all created transcribers.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn sample_counts(&self) -> Arc<std::sync::Mutex<Vec<usize>>> {
        Arc::clone(&self.sample_counts)
    }
}

impl Default for MockTranscriberFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriberFactory for MockTranscriberFactory {
    fn create(&self) -> Result<Box<dyn Transcriber>> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if let Some(ref message) = self.init_failure {
            return Err(TabscribeError::ModelLoadFailed {
                message: message.clone(),
            });
        }
        let mut transcriber = MockTranscriber::new("mock").with_response(&self.response);
        if let Some(delay) = self.delay {
            transcriber = transcriber.with_delay(delay);
        }
        transcriber.calls = Arc::clone(&self.calls);
        transcriber.sample_counts = Arc::clone(&self.sample_counts);
        if self.should_fail {
            transcriber = transcriber.with_failure();
        }
        Ok(Box::new(transcriber))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_transcriber_returns_response() {
        let mut transcriber = MockTranscriber::new("test-model").with_response("hello world");
        let result = transcriber.transcribe(&[0.0; 100]).unwrap();
        assert_eq!(result, "hello world");
        assert_eq!(transcriber.model_name(), "test-model");
    }

    #[test]
    fn mock_transcriber_counts_calls_and_samples() {
        let mut transcriber = MockTranscriber::new("m").with_response("x");
        let calls = transcriber.calls();
        let counts = transcriber.sample_counts();

        transcriber.transcribe(&[0.0; 10]).unwrap();
        transcriber.transcribe(&[0.0; 20]).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(*counts.lock().unwrap(), vec![10, 20]);
    }

    #[test]
    fn mock_transcriber_failure() {
        let mut transcriber = MockTranscriber::new("m").with_failure();
        match transcriber.transcribe(&[0.0; 10]) {
            Err(TabscribeError::TranscriptionFailed { message }) => {
                assert_eq!(message, "mock transcription failure");
            }
            _ => panic!("Expected TranscriptionFailed error"),
        }
    }

    #[test]
    fn factory_init_failure() {
        let factory = MockTranscriberFactory::new().with_init_failure("no model file");
        match factory.create() {
            Err(TabscribeError::ModelLoadFailed { message }) => {
                assert_eq!(message, "no model file");
            }
            _ => panic!("Expected ModelLoadFailed error"),
        }
        assert_eq!(factory.creates().load(Ordering::SeqCst), 1);
    }

    #[test]
    fn factory_shares_call_counter_across_created_transcribers() {
        let factory = MockTranscriberFactory::new().with_response("y");
        let calls = factory.calls();

        let mut first = factory.create().unwrap();
        let mut second = factory.create().unwrap();
        first.transcribe(&[0.0; 4]).unwrap();
        second.transcribe(&[0.0; 4]).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(factory.creates().load(Ordering::SeqCst), 2);
    }

    #[test]
    fn inference_params_defaults() {
        let params = InferenceParams::default();
        assert_eq!(params.language, "auto");
        assert_eq!(params.window_secs, 30);
        assert_eq!(params.stride_secs, 5);
        assert_eq!(params.threads, None);
    }

    // ── split_windows ────────────────────────────────────────────────────

    #[test]
    fn split_windows_short_input_is_one_window() {
        assert_eq!(split_windows(100, 300, 50), vec![(0, 100)]);
        assert_eq!(split_windows(300, 300, 50), vec![(0, 300)]);
    }

    #[test]
    fn split_windows_empty_input() {
        assert!(split_windows(0, 300, 50).is_empty());
    }

    #[test]
    fn split_windows_overlapping() {
        // window 10, stride 4 -> step 6.
        let ranges = split_windows(22, 10, 4);
        assert_eq!(ranges, vec![(0, 10), (6, 16), (12, 22)]);
    }

    #[test]
    fn split_windows_covers_tail() {
        let ranges = split_windows(25, 10, 4);
        assert_eq!(ranges.last().copied(), Some((18, 25)));
        // Every sample is covered by at least one window.
        let covered = ranges.iter().all(|&(s, e)| s < e);
        assert!(covered);
        assert_eq!(ranges.first().copied(), Some((0, 10)));
    }

    #[test]
    fn split_windows_degenerate_stride_falls_back_to_tiling() {
        let ranges = split_windows(20, 10, 10);
        assert_eq!(ranges, vec![(0, 10), (10, 20)]);
    }
}
