//! Error types for tabscribe.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TabscribeError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Host media boundary errors
    #[error("Media capture permission denied: {message}")]
    MediaPermissionDenied { message: String },

    #[error("No capturable media for target {target}: {message}")]
    MediaUnavailable { target: u64, message: String },

    // Capture errors
    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    #[error("Loopback output failed: {message}")]
    Loopback { message: String },

    // Session state errors
    #[error("Invalid session transition: {message}")]
    SessionState { message: String },

    // Inference errors
    #[error("Transcription model not found at {path}")]
    ModelNotFound { path: String },

    #[error("Transcription model failed to load: {message}")]
    ModelLoadFailed { message: String },

    #[error("Transcription inference failed: {message}")]
    TranscriptionFailed { message: String },

    // IPC errors
    #[error("IPC socket error: {message}")]
    IpcSocket { message: String },

    #[error("IPC protocol error: {message}")]
    IpcProtocol { message: String },

    #[error("IPC connection failed: {message}")]
    IpcConnection { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, TabscribeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_media_permission_denied_display() {
        let error = TabscribeError::MediaPermissionDenied {
            message: "user dismissed the capture prompt".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Media capture permission denied: user dismissed the capture prompt"
        );
    }

    #[test]
    fn test_media_unavailable_display() {
        let error = TabscribeError::MediaUnavailable {
            target: 42,
            message: "target is already being captured".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "No capturable media for target 42: target is already being captured"
        );
    }

    #[test]
    fn test_audio_capture_display() {
        let error = TabscribeError::AudioCapture {
            message: "device busy".to_string(),
        };
        assert_eq!(error.to_string(), "Audio capture failed: device busy");
    }

    #[test]
    fn test_loopback_display() {
        let error = TabscribeError::Loopback {
            message: "no default output device".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Loopback output failed: no default output device"
        );
    }

    #[test]
    fn test_session_state_display() {
        let error = TabscribeError::SessionState {
            message: "idle -> listening".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid session transition: idle -> listening"
        );
    }

    #[test]
    fn test_model_not_found_display() {
        let error = TabscribeError::ModelNotFound {
            path: "/models/whisper.bin".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Transcription model not found at /models/whisper.bin"
        );
    }

    #[test]
    fn test_model_load_failed_display() {
        let error = TabscribeError::ModelLoadFailed {
            message: "out of memory".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Transcription model failed to load: out of memory"
        );
    }

    #[test]
    fn test_transcription_failed_display() {
        let error = TabscribeError::TranscriptionFailed {
            message: "invalid audio format".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Transcription inference failed: invalid audio format"
        );
    }

    #[test]
    fn test_ipc_socket_display() {
        let error = TabscribeError::IpcSocket {
            message: "bind failed".to_string(),
        };
        assert_eq!(error.to_string(), "IPC socket error: bind failed");
    }

    #[test]
    fn test_other_display() {
        let error = TabscribeError::Other("unexpected error".to_string());
        assert_eq!(error.to_string(), "unexpected error");
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: TabscribeError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_str = "invalid = toml = syntax";
        let toml_error = toml::from_str::<toml::Value>(toml_str).unwrap_err();
        let error: TabscribeError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<TabscribeError>();
        assert_sync::<TabscribeError>();
    }

    #[test]
    fn test_error_source_chain_io() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let error: TabscribeError = io_error.into();

        let error_trait: &dyn std::error::Error = &error;
        assert!(error_trait.source().is_some());
    }
}
