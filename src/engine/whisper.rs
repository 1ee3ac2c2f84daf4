//! Whisper-based speech-to-text backend.
//!
//! Implements the [`Transcriber`] trait using whisper-rs.
//!
//! # Feature Gate
//!
//! The real implementation requires the `whisper` feature and cmake to
//! build. Without the feature a stub is compiled that fails with a
//! descriptive error on use, so the rest of the pipeline still builds.

use crate::defaults;
use crate::engine::transcriber::{InferenceParams, Transcriber, TranscriberFactory};
use crate::error::{Result, TabscribeError};
use std::path::PathBuf;

#[cfg(feature = "whisper")]
use std::sync::Once;
#[cfg(feature = "whisper")]
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, install_logging_hooks,
};

#[cfg(feature = "whisper")]
static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// Configuration for the Whisper backend.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Path to the Whisper model file.
    pub model_path: PathBuf,
    /// Inference parameters (language, windowing, threads).
    pub params: InferenceParams,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(defaults::DEFAULT_MODEL_PATH),
            params: InferenceParams::default(),
        }
    }
}

/// Whisper transcriber.
///
/// Owns the model context for the lifetime of one engine worker; the engine
/// guarantees single-threaded access, so no internal locking is needed.
#[cfg(feature = "whisper")]
pub struct WhisperTranscriber {
    context: WhisperContext,
    config: WhisperConfig,
    model_name: String,
}

/// Whisper transcriber placeholder (without the `whisper` feature).
#[cfg(not(feature = "whisper"))]
pub struct WhisperTranscriber {
    config: WhisperConfig,
    model_name: String,
}

fn model_name_from_path(path: &std::path::Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(feature = "whisper")]
impl WhisperTranscriber {
    /// Loads the model from `config.model_path`.
    ///
    /// # Errors
    /// `ModelNotFound` when the file is missing, `ModelLoadFailed` when
    /// whisper rejects it.
    pub fn new(config: WhisperConfig) -> Result<Self> {
        // Install logging hooks to suppress whisper.cpp output (only once)
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });

        if !config.model_path.exists() {
            return Err(TabscribeError::ModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = model_name_from_path(&config.model_path);

        let context_params = WhisperContextParameters::default();
        let context = WhisperContext::new_with_params(
            config
                .model_path
                .to_str()
                .ok_or_else(|| TabscribeError::ModelLoadFailed {
                    message: "Invalid UTF-8 in model path".to_string(),
                })?,
            context_params,
        )
        .map_err(|e| TabscribeError::ModelLoadFailed {
            message: format!("Failed to load Whisper model: {}", e),
        })?;

        Ok(Self {
            context,
            config,
            model_name,
        })
    }

    pub fn config(&self) -> &WhisperConfig {
        &self.config
    }
}

#[cfg(not(feature = "whisper"))]
impl WhisperTranscriber {
    /// Stub constructor: validates the path so configuration errors surface
    /// the same way as in the real backend.
    pub fn new(config: WhisperConfig) -> Result<Self> {
        if !config.model_path.exists() {
            return Err(TabscribeError::ModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = model_name_from_path(&config.model_path);
        Ok(Self { config, model_name })
    }

    pub fn config(&self) -> &WhisperConfig {
        &self.config
    }
}

#[cfg(feature = "whisper")]
impl Transcriber for WhisperTranscriber {
    fn transcribe(&mut self, samples: &[f32]) -> Result<String> {
        let mut state =
            self.context
                .create_state()
                .map_err(|e| TabscribeError::TranscriptionFailed {
                    message: format!("Failed to create Whisper state: {}", e),
                })?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        // Transcription task with a fixed target language ("auto" = detect).
        params.set_translate(false);
        if self.config.params.language == defaults::AUTO_LANGUAGE {
            params.set_language(None);
        } else {
            params.set_language(Some(&self.config.params.language));
        }

        if let Some(threads) = self.config.params.threads {
            params.set_n_threads(threads as i32);
        }

        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, samples)
            .map_err(|e| TabscribeError::TranscriptionFailed {
                message: format!("Whisper inference failed: {}", e),
            })?;

        let mut transcription = String::new();
        for segment in state.as_iter() {
            transcription.push_str(&segment.to_string());
        }

        Ok(transcription.trim().to_string())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(not(feature = "whisper"))]
impl Transcriber for WhisperTranscriber {
    fn transcribe(&mut self, _samples: &[f32]) -> Result<String> {
        Err(TabscribeError::TranscriptionFailed {
            message: concat!(
                "Whisper feature not enabled. This binary was built without speech recognition.\n",
                "To fix: cargo build --release (whisper is enabled by default)\n",
                "If build fails with cmake errors, install: sudo apt install cmake"
            )
            .to_string(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Factory that builds a [`WhisperTranscriber`] inside the engine worker,
/// deferring the model load until the first chunk arrives.
pub struct WhisperTranscriberFactory {
    config: WhisperConfig,
}

impl WhisperTranscriberFactory {
    pub fn new(config: WhisperConfig) -> Self {
        Self { config }
    }
}

impl TranscriberFactory for WhisperTranscriberFactory {
    fn create(&self) -> Result<Box<dyn Transcriber>> {
        Ok(Box::new(WhisperTranscriber::new(self.config.clone())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::transcriber::TranscriberFactory;

    #[test]
    fn whisper_config_default() {
        let config = WhisperConfig::default();
        assert_eq!(config.model_path, PathBuf::from("models/ggml-base.bin"));
        assert_eq!(config.params.language, defaults::AUTO_LANGUAGE);
        assert_eq!(config.params.threads, None);
    }

    #[test]
    fn missing_model_is_reported_with_path() {
        let config = WhisperConfig {
            model_path: PathBuf::from("/nonexistent/model.bin"),
            ..Default::default()
        };

        match WhisperTranscriber::new(config) {
            Err(TabscribeError::ModelNotFound { path }) => {
                assert_eq!(path, "/nonexistent/model.bin");
            }
            _ => panic!("Expected ModelNotFound error"),
        }
    }

    #[test]
    fn factory_defers_model_load_until_create() {
        // Construction of the factory itself never touches the filesystem;
        // only create() does, which is what the engine calls lazily.
        let factory = WhisperTranscriberFactory::new(WhisperConfig {
            model_path: PathBuf::from("/nonexistent/model.bin"),
            ..Default::default()
        });

        assert!(factory.create().is_err());
    }

    #[test]
    fn model_name_extraction() {
        assert_eq!(
            model_name_from_path(std::path::Path::new("/models/ggml-base.bin")),
            "ggml-base"
        );
        assert_eq!(model_name_from_path(std::path::Path::new("")), "unknown");
    }

    #[cfg(not(feature = "whisper"))]
    #[test]
    fn stub_transcribe_returns_descriptive_error() {
        use tempfile::NamedTempFile;

        let file = NamedTempFile::new().unwrap();
        let config = WhisperConfig {
            model_path: file.path().to_path_buf(),
            ..Default::default()
        };
        let mut transcriber = WhisperTranscriber::new(config).unwrap();

        match transcriber.transcribe(&[0.0; 160]) {
            Err(TabscribeError::TranscriptionFailed { message }) => {
                assert!(message.contains("Whisper feature not enabled"));
            }
            _ => panic!("Expected TranscriptionFailed error"),
        }
    }
}
