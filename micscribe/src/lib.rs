/// Audio capture and the capture-to-network bridge
pub mod audio;

/// Application configuration
pub mod config;

/// Streaming speech recognition client
pub mod recognition;

/// Transcript printing and session management
pub mod transcription;

/// Utility modules
pub mod utils;
