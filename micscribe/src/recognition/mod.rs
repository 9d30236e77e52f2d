/// Streaming speech recognition
///
/// This module provides the recognition capability used by the transcription
/// loop, and a WebSocket client implementing it.

/// Recognition client and capability trait
pub mod client;

/// WebSocket connection management
pub mod connection;

/// Service credentials
pub mod credentials;

/// Recognition error types
pub mod error;

/// Message type definitions
pub mod messages;

/// Async tasks for concurrent send/receive operations
pub mod tasks;

// Re-export commonly used types
pub use client::{ResponseStream, SpeechClient, SpeechRecognizer};
pub use connection::{ConnectionConfig, RecognizerConnection, WsReader, WsWriter};
pub use credentials::{Credentials, DEFAULT_CREDENTIALS_ENV};
pub use error::{RecognitionError, RecognitionResult};
pub use messages::{
    AudioEncoding, ClientMessage, RecognitionConfig, ServiceStatus, SpeechRecognitionAlternative,
    StreamingRecognitionConfig, StreamingRecognitionResult, StreamingRecognizeResponse,
};
pub use tasks::ResponseItem;
