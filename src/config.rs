use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureSettings,
    pub engine: EngineSettings,
    pub heartbeat: HeartbeatSettings,
    pub history: HistorySettings,
}

/// Capture context configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaptureSettings {
    /// Input device name (None = system default)
    pub device: Option<String>,
    /// Duration of one recorded chunk in milliseconds
    pub chunk_ms: u32,
    /// Stream poll cadence in milliseconds
    pub poll_interval_ms: u64,
}

/// Inference engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    /// Path to the Whisper model file
    pub model: PathBuf,
    /// Language code, or "auto" for detection
    pub language: String,
    /// Analysis window in seconds
    pub window_secs: u32,
    /// Overlap between consecutive windows in seconds
    pub stride_secs: u32,
    /// Inference threads (None = auto-detect)
    pub threads: Option<usize>,
    /// Maximum queue age before a chunk is dropped, in seconds
    pub inference_timeout_secs: u64,
}

/// Heartbeat configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeartbeatSettings {
    /// Ping cadence in seconds
    pub interval_secs: u64,
}

/// Recent-transcript history configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistorySettings {
    /// Maximum entries kept
    pub max_entries: usize,
    /// Maximum entry age in seconds
    pub max_age_secs: u64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            device: None,
            chunk_ms: defaults::CHUNK_INTERVAL_MS,
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            model: PathBuf::from(defaults::DEFAULT_MODEL_PATH),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            window_secs: defaults::WINDOW_SECS,
            stride_secs: defaults::STRIDE_SECS,
            threads: None,
            inference_timeout_secs: defaults::INFERENCE_TIMEOUT_SECS,
        }
    }
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self {
            interval_secs: defaults::HEARTBEAT_INTERVAL_SECS,
        }
    }
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            max_entries: defaults::HISTORY_MAX_ENTRIES,
            max_age_secs: defaults::HISTORY_MAX_AGE_SECS,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Self::default()
                } else {
                    // Re-panic on invalid TOML or other errors
                    panic!("Failed to load config from {}: {}", path.display(), e);
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - TABSCRIBE_MODEL → engine.model
    /// - TABSCRIBE_LANGUAGE → engine.language
    /// - TABSCRIBE_AUDIO_DEVICE → capture.device
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("TABSCRIBE_MODEL")
            && !model.is_empty()
        {
            self.engine.model = PathBuf::from(model);
        }

        if let Ok(language) = std::env::var("TABSCRIBE_LANGUAGE")
            && !language.is_empty()
        {
            self.engine.language = language;
        }

        if let Ok(device) = std::env::var("TABSCRIBE_AUDIO_DEVICE")
            && !device.is_empty()
        {
            self.capture.device = Some(device);
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/tabscribe/config.toml on Linux
    #[cfg(feature = "cli")]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .expect("Could not determine config directory")
            .join("tabscribe")
            .join("config.toml")
    }
}
