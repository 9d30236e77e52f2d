//! Application-level error handling
//!
//! `AppError` aggregates the per-module errors so `main` can classify a
//! failure: the operator interrupt is expected and ends the process cleanly;
//! everything else is fatal.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio::error::AudioError;
use crate::config::ConfigError;
use crate::recognition::RecognitionError;
use crate::transcription::TranscriptionError;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Audio error
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    /// Recognition service error
    #[error("Recognition error: {0}")]
    Recognition(#[from] RecognitionError),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Transcription error
    #[error("Transcription error: {0}")]
    Transcription(#[from] TranscriptionError),
}

/// Stable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No usable microphone
    DeviceUnavailable,
    /// Audio stream failed after opening
    AudioStreamError,
    /// Credentials rejected or unreadable
    AuthFailed,
    /// Any other recognition service failure
    ServiceError,
    /// Configuration could not be loaded
    ConfigLoadFailed,
    /// Configuration has an unusable value
    ConfigInvalid,
    /// Transcript output failed
    OutputFailed,
    /// Operator stopped the session
    UserInterrupt,
}

/// Result type for application operations
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Audio(AudioError::DeviceUnavailable(_)) => ErrorCode::DeviceUnavailable,
            AppError::Audio(_) => ErrorCode::AudioStreamError,

            AppError::Recognition(e) => recognition_code(e),

            AppError::Config(ConfigError::Invalid { .. }) => ErrorCode::ConfigInvalid,
            AppError::Config(ConfigError::Json(_)) => ErrorCode::ConfigInvalid,
            AppError::Config(_) => ErrorCode::ConfigLoadFailed,

            AppError::Transcription(TranscriptionError::Interrupted { .. }) => {
                ErrorCode::UserInterrupt
            }
            AppError::Transcription(TranscriptionError::Recognition(e)) => recognition_code(e),
            AppError::Transcription(TranscriptionError::Output(_)) => ErrorCode::OutputFailed,
        }
    }

    /// Whether this is the expected operator interrupt
    pub fn is_user_interrupt(&self) -> bool {
        self.code() == ErrorCode::UserInterrupt
    }

    /// A hint for the operator, if one applies
    pub fn recovery_hint(&self) -> Option<&'static str> {
        match self.code() {
            ErrorCode::DeviceUnavailable => {
                Some("Check that a microphone is connected and audio.device names it")
            }
            ErrorCode::AuthFailed => {
                Some("Check the credential file named by the credentials environment variable")
            }
            ErrorCode::ConfigLoadFailed | ErrorCode::ConfigInvalid => {
                Some("Check the file named by MICSCRIBE_CONFIG")
            }
            _ => None,
        }
    }
}

fn recognition_code(error: &RecognitionError) -> ErrorCode {
    match error {
        RecognitionError::AuthenticationFailed | RecognitionError::Credentials(_) => {
            ErrorCode::AuthFailed
        }
        _ => ErrorCode::ServiceError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = AppError::Audio(AudioError::DeviceUnavailable("none".to_string()));
        assert_eq!(err.code(), ErrorCode::DeviceUnavailable);

        let err = AppError::Audio(AudioError::StreamError("xrun".to_string()));
        assert_eq!(err.code(), ErrorCode::AudioStreamError);

        let err = AppError::Recognition(RecognitionError::AuthenticationFailed);
        assert_eq!(err.code(), ErrorCode::AuthFailed);

        let err = AppError::Recognition(RecognitionError::ServiceError("boom".to_string()));
        assert_eq!(err.code(), ErrorCode::ServiceError);

        let err = AppError::Transcription(TranscriptionError::Recognition(
            RecognitionError::Timeout(100),
        ));
        assert_eq!(err.code(), ErrorCode::ServiceError);
    }

    #[test]
    fn test_user_interrupt() {
        let err = AppError::from(TranscriptionError::Interrupted { transcripts: 3 });

        assert!(err.is_user_interrupt());
        assert_eq!(err.recovery_hint(), None);

        let err = AppError::Recognition(RecognitionError::ServiceError("x".to_string()));
        assert!(!err.is_user_interrupt());
    }

    #[test]
    fn test_recovery_hint() {
        let err = AppError::Audio(AudioError::DeviceUnavailable("none".to_string()));
        assert!(err.recovery_hint().unwrap().contains("microphone"));

        let err = AppError::Config(ConfigError::Invalid {
            field: "audio.chunk_ms",
            reason: "zero".to_string(),
        });
        assert_eq!(err.code(), ErrorCode::ConfigInvalid);
        assert!(err.recovery_hint().is_some());
    }

    #[test]
    fn test_error_display() {
        let err = AppError::Audio(AudioError::DeviceUnavailable("no input device".to_string()));
        assert_eq!(
            err.to_string(),
            "Audio error: Audio device unavailable: no input device"
        );
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::DeviceUnavailable).unwrap();
        assert_eq!(json, "\"DEVICE_UNAVAILABLE\"");

        let code: ErrorCode = serde_json::from_str("\"USER_INTERRUPT\"").unwrap();
        assert_eq!(code, ErrorCode::UserInterrupt);
    }
}
