/// Streaming speech recognition client
///
/// `SpeechRecognizer` is the capability the transcription layer depends on;
/// `SpeechClient` implements it over a WebSocket connection.

use crate::audio::AudioChunk;
use crate::recognition::connection::{ConnectionConfig, RecognizerConnection};
use crate::recognition::credentials::Credentials;
use crate::recognition::error::{RecognitionError, RecognitionResult};
use crate::recognition::messages::StreamingRecognitionConfig;
use crate::recognition::tasks::{receiver_task, sender_task, ResponseItem};
use futures_util::Stream;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Streaming speech recognition capability
///
/// Accepts a configuration and an ordered stream of audio blocks, and yields
/// recognition responses in the order the service produced them.
pub trait SpeechRecognizer {
    /// Ordered stream of responses
    type Responses: Stream<Item = ResponseItem> + Send + Unpin + 'static;

    /// Start a streaming recognition session over `audio`
    fn streaming_recognize<S>(
        &self,
        config: StreamingRecognitionConfig,
        audio: S,
    ) -> impl Future<Output = RecognitionResult<Self::Responses>> + Send
    where
        S: Stream<Item = AudioChunk> + Send + Unpin + 'static;
}

/// WebSocket recognition client
///
/// # Example
/// ```no_run
/// use futures_util::{stream, StreamExt};
/// use micscribe_lib::recognition::{
///     ConnectionConfig, SpeechClient, SpeechRecognizer, StreamingRecognitionConfig,
/// };
///
/// #[tokio::main]
/// async fn main() {
///     let client = SpeechClient::from_env(ConnectionConfig::default(), "MICSCRIBE_CREDENTIALS")
///         .unwrap();
///     let config = StreamingRecognitionConfig::new(16000, "en-US");
///     let audio = stream::iter(vec![vec![0u8; 3200]]);
///
///     let mut responses = client.streaming_recognize(config, audio).await.unwrap();
///     while let Some(response) = responses.next().await {
///         println!("{:?}", response);
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SpeechClient {
    connection: ConnectionConfig,
    credentials: Option<Credentials>,
}

impl SpeechClient {
    /// Create a client with explicit credentials
    pub fn new(connection: ConnectionConfig, credentials: Option<Credentials>) -> Self {
        Self {
            connection,
            credentials,
        }
    }

    /// Create a client whose credentials come from the file named by `env_var`
    pub fn from_env(connection: ConnectionConfig, env_var: &str) -> RecognitionResult<Self> {
        let credentials = Credentials::from_env(env_var)?;
        Ok(Self::new(connection, credentials))
    }

    /// Endpoint configuration
    pub fn connection(&self) -> &ConnectionConfig {
        &self.connection
    }
}

impl SpeechRecognizer for SpeechClient {
    type Responses = ResponseStream;

    fn streaming_recognize<S>(
        &self,
        config: StreamingRecognitionConfig,
        audio: S,
    ) -> impl Future<Output = RecognitionResult<Self::Responses>> + Send
    where
        S: Stream<Item = AudioChunk> + Send + Unpin + 'static,
    {
        let connection = self.connection.clone();
        let credentials = self.credentials.clone();

        async move {
            let conn = RecognizerConnection::connect(credentials.as_ref(), &connection).await?;
            let (writer, reader) = conn.split();

            let (response_tx, response_rx) = mpsc::channel::<ResponseItem>(100);

            let sender = tokio::spawn(sender_task(writer, config, audio));
            let receiver = tokio::spawn(receiver_task(reader, response_tx));

            info!("Streaming recognition started");

            Ok(ResponseStream {
                response_rx,
                sender: Some(sender),
                receiver: Some(receiver),
            })
        }
    }
}

/// Responses of a `SpeechClient` session
///
/// The stream ends when the service closes the connection, even if audio is
/// still being captured; the sender is stopped at that point. A sender
/// failure is yielded as `RecognitionError::TaskFailed`. Dropping the stream
/// aborts the session's background tasks.
#[derive(Debug)]
pub struct ResponseStream {
    response_rx: mpsc::Receiver<ResponseItem>,
    sender: Option<JoinHandle<RecognitionResult<u64>>>,
    receiver: Option<JoinHandle<RecognitionResult<()>>>,
}

impl ResponseStream {
    /// Check the sender without blocking; yields its failure, if any
    fn poll_sender(&mut self, cx: &mut Context<'_>) -> Option<ResponseItem> {
        let sender = self.sender.as_mut()?;
        let Poll::Ready(joined) = Pin::new(sender).poll(cx) else {
            return None;
        };
        self.sender = None;

        match joined {
            Ok(Ok(blocks)) => {
                debug!("Sender finished after {} audio blocks", blocks);
                None
            }
            Ok(Err(e)) => Some(Err(RecognitionError::TaskFailed(e.to_string()))),
            Err(e) if e.is_cancelled() => None,
            Err(e) => Some(Err(RecognitionError::TaskFailed(e.to_string()))),
        }
    }

    fn stop_sender(&mut self) {
        if let Some(sender) = self.sender.take() {
            if !sender.is_finished() {
                debug!("Response stream ended, stopping sender");
                sender.abort();
            }
        }
    }
}

impl Stream for ResponseStream {
    type Item = ResponseItem;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        match this.response_rx.poll_recv(cx) {
            Poll::Ready(Some(item)) => Poll::Ready(Some(item)),
            Poll::Ready(None) => {
                this.receiver = None;
                this.stop_sender();
                Poll::Ready(None)
            }
            Poll::Pending => match this.poll_sender(cx) {
                Some(failure) => Poll::Ready(Some(failure)),
                None => Poll::Pending,
            },
        }
    }
}

impl Drop for ResponseStream {
    fn drop(&mut self) {
        if let Some(sender) = self.sender.take() {
            if !sender.is_finished() {
                debug!("Aborting sender task");
                sender.abort();
            }
        }
        if let Some(receiver) = self.receiver.take() {
            if !receiver.is_finished() {
                debug!("Aborting receiver task");
                receiver.abort();
            }
        }
    }
}
