/// Error types for the recognition client
///
/// Every variant is fatal to a session: there is no retry loop.

use thiserror::Error;

/// Recognition-related errors
#[derive(Error, Debug)]
pub enum RecognitionError {
    /// Failed to connect to server
    #[error("Failed to connect to server: {0}")]
    ConnectionFailed(String),

    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: invalid credentials")]
    AuthenticationFailed,

    /// Connection timeout
    #[error("Connection timeout after {0}ms")]
    Timeout(u64),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),

    /// Failed to (de)serialize message
    #[error("Failed to serialize message: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Credential file missing or malformed
    #[error("Credential error: {0}")]
    Credentials(String),

    /// The service reported an error
    #[error("Service error: {0}")]
    ServiceError(String),

    /// A client task stopped unexpectedly
    #[error("Client task failed: {0}")]
    TaskFailed(String),
}

impl RecognitionError {
    /// Whether a write failed only because the service already closed the
    /// connection
    pub fn is_closed_by_peer(&self) -> bool {
        use tokio_tungstenite::tungstenite::error::ProtocolError;
        use tokio_tungstenite::tungstenite::Error as WsError;

        matches!(
            self,
            RecognitionError::WebSocketError(
                WsError::ConnectionClosed
                    | WsError::AlreadyClosed
                    | WsError::Protocol(ProtocolError::SendAfterClosing)
            )
        )
    }
}

/// Result type for recognition operations
pub type RecognitionResult<T> = Result<T, RecognitionError>;
