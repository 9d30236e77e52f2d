//! Application configuration
//!
//! The program takes no flags. Settings come from a JSON file named by the
//! `MICSCRIBE_CONFIG` environment variable, or built-in defaults when it is
//! unset. Missing keys fall back to their defaults.
//!
//! ```json
//! {
//!   "audio": { "sample_rate": 16000, "chunk_ms": 100, "device": null },
//!   "recognition": {
//!     "endpoint": "wss://speech.example.com/v1/speech:streamingRecognize",
//!     "language_code": "en-US",
//!     "enable_automatic_punctuation": true,
//!     "interim_results": true,
//!     "connect_timeout_ms": 10000,
//!     "credentials_env": "MICSCRIBE_CREDENTIALS"
//!   },
//!   "behavior": { "shutdown_grace_ms": 1500 }
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::audio::CaptureFormat;
use crate::recognition::connection::DEFAULT_ENDPOINT;
use crate::recognition::{ConnectionConfig, StreamingRecognitionConfig, DEFAULT_CREDENTIALS_ENV};

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "MICSCRIBE_CONFIG";

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A setting has an unusable value
    #[error("Invalid setting {field}: {reason}")]
    Invalid {
        /// Dotted path of the setting
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Capture settings
    pub audio: AudioConfig,
    /// Recognition service settings
    pub recognition: RecognitionSettings,
    /// Runtime behavior
    pub behavior: BehaviorConfig,
}

/// Capture settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Milliseconds of audio per captured chunk
    pub chunk_ms: u32,
    /// Input device name (None = system default)
    pub device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            chunk_ms: 100,
            device: None,
        }
    }
}

/// Recognition service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionSettings {
    /// WebSocket URL of the streaming endpoint
    pub endpoint: String,
    /// BCP-47 language tag
    pub language_code: String,
    /// Ask the service to punctuate transcripts
    pub enable_automatic_punctuation: bool,
    /// Ask the service for interim results
    pub interim_results: bool,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Environment variable naming the credential file
    pub credentials_env: String,
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            language_code: "en-US".to_string(),
            enable_automatic_punctuation: true,
            interim_results: true,
            connect_timeout_ms: 10000,
            credentials_env: DEFAULT_CREDENTIALS_ENV.to_string(),
        }
    }
}

/// Runtime behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// How long to wait for trailing results after an interrupt (ms)
    pub shutdown_grace_ms: u64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            shutdown_grace_ms: 1500,
        }
    }
}

impl AppConfig {
    /// Reject settings the capture or recognition layers cannot use
    pub fn validate(&self) -> ConfigResult<()> {
        if self.audio.sample_rate == 0 {
            return Err(invalid("audio.sample_rate", "must be greater than zero"));
        }
        if self.audio.chunk_ms == 0 {
            return Err(invalid("audio.chunk_ms", "must be greater than zero"));
        }
        if self.capture_format().frames_per_buffer == 0 {
            return Err(invalid(
                "audio.chunk_ms",
                "too short to hold a single frame at this sample rate",
            ));
        }
        if self.recognition.endpoint.trim().is_empty() {
            return Err(invalid("recognition.endpoint", "must not be empty"));
        }
        if self.recognition.language_code.trim().is_empty() {
            return Err(invalid("recognition.language_code", "must not be empty"));
        }
        if self.recognition.credentials_env.trim().is_empty() {
            return Err(invalid("recognition.credentials_env", "must not be empty"));
        }
        Ok(())
    }

    /// Capture format derived from the audio settings
    pub fn capture_format(&self) -> CaptureFormat {
        CaptureFormat::mono(self.audio.sample_rate, self.audio.chunk_ms)
    }

    /// Streaming configuration sent to the recognition service
    pub fn streaming_config(&self) -> StreamingRecognitionConfig {
        StreamingRecognitionConfig::new(
            self.audio.sample_rate,
            self.recognition.language_code.clone(),
        )
        .with_automatic_punctuation(self.recognition.enable_automatic_punctuation)
        .with_interim_results(self.recognition.interim_results)
    }

    /// Connection settings for the recognition client
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::new(self.recognition.endpoint.clone())
            .with_timeout(self.recognition.connect_timeout_ms)
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

/// Configuration loading and saving
pub struct ConfigManager;

impl ConfigManager {
    /// Path named by `MICSCRIBE_CONFIG`, if set
    pub fn config_path() -> Option<PathBuf> {
        std::env::var_os(CONFIG_ENV).map(PathBuf::from)
    }

    /// Load the configuration file named by `MICSCRIBE_CONFIG`, or defaults
    pub fn load() -> ConfigResult<AppConfig> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("{} not set, using default configuration", CONFIG_ENV);
                Ok(AppConfig::default())
            }
        }
    }

    /// Load and validate a configuration file
    pub fn load_from(path: &Path) -> ConfigResult<AppConfig> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate()?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Write a configuration file
    pub fn save_to(path: &Path, config: &AppConfig) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(path, content)?;

        debug!("Saved configuration to {}", path.display());
        Ok(())
    }
}
