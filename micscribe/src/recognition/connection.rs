/// WebSocket connection to the streaming recognition endpoint

use crate::recognition::credentials::Credentials;
use crate::recognition::error::{RecognitionError, RecognitionResult};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest,
        http::{header::AUTHORIZATION, HeaderValue, StatusCode},
        Message,
    },
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write half of the WebSocket stream
pub type WsWriter = SplitSink<WsStream, Message>;

/// Read half of the WebSocket stream
pub type WsReader = SplitStream<WsStream>;

/// Default streaming endpoint
pub const DEFAULT_ENDPOINT: &str = "wss://speech.example.com/v1/speech:streamingRecognize";

/// Configuration for the WebSocket connection
///
/// # Example
/// ```
/// use micscribe_lib::recognition::ConnectionConfig;
///
/// let config = ConnectionConfig::new("ws://127.0.0.1:9000/stream")
///     .with_timeout(5000);
/// assert_eq!(config.timeout_ms, 5000);
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// WebSocket URL of the streaming endpoint
    pub endpoint: String,

    /// Connection timeout in milliseconds
    pub timeout_ms: u64,
}

impl ConnectionConfig {
    /// Create a configuration for the given endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout_ms: 10000, // 10 seconds default
        }
    }

    /// Set connection timeout in milliseconds
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    fn validate(&self) -> RecognitionResult<()> {
        if !(self.endpoint.starts_with("ws://") || self.endpoint.starts_with("wss://")) {
            return Err(RecognitionError::InvalidConfig(format!(
                "endpoint must be a ws:// or wss:// URL: {}",
                self.endpoint
            )));
        }
        Ok(())
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

/// An established streaming connection
#[derive(Debug)]
pub struct RecognizerConnection {
    ws_stream: WsStream,
}

impl RecognizerConnection {
    /// Connect to the recognition endpoint
    ///
    /// Credentials, when present, are sent as a bearer token on the upgrade
    /// request.
    ///
    /// # Errors
    /// Returns `RecognitionError::Timeout` if the handshake does not finish in
    /// time, `AuthenticationFailed` on HTTP 401/403, and `ConnectionFailed`
    /// for any other failure.
    pub async fn connect(
        credentials: Option<&Credentials>,
        config: &ConnectionConfig,
    ) -> RecognitionResult<Self> {
        config.validate()?;
        info!("Connecting to recognition service");
        debug!("Connection URL: {}", config.endpoint);

        let mut request = config.endpoint.as_str().into_client_request()?;
        if let Some(credentials) = credentials {
            let value = HeaderValue::from_str(&credentials.bearer())
                .map_err(|e| RecognitionError::Credentials(e.to_string()))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let timeout = tokio::time::Duration::from_millis(config.timeout_ms);
        let (ws_stream, response) = tokio::time::timeout(timeout, connect_async(request))
            .await
            .map_err(|_| RecognitionError::Timeout(config.timeout_ms))?
            .map_err(|e| {
                if let tokio_tungstenite::tungstenite::Error::Http(resp) = &e {
                    if resp.status() == StatusCode::UNAUTHORIZED
                        || resp.status() == StatusCode::FORBIDDEN
                    {
                        return RecognitionError::AuthenticationFailed;
                    }
                }
                RecognitionError::ConnectionFailed(e.to_string())
            })?;

        info!(
            "Connected to recognition service (status: {})",
            response.status()
        );

        Ok(Self { ws_stream })
    }

    /// Split the connection into separate write and read halves
    pub fn split(self) -> (WsWriter, WsReader) {
        self.ws_stream.split()
    }
}
