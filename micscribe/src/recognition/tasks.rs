/// Async tasks for sending audio and receiving recognition responses
///
/// The two halves of a connection run concurrently: `sender_task` drains the
/// audio stream into the socket while `receiver_task` forwards responses.

use crate::audio::AudioChunk;
use crate::recognition::connection::{WsReader, WsWriter};
use crate::recognition::error::{RecognitionError, RecognitionResult};
use crate::recognition::messages::{
    ClientMessage, StreamingRecognitionConfig, StreamingRecognizeResponse,
};
use futures_util::{SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// Item forwarded by `receiver_task`
pub type ResponseItem = RecognitionResult<StreamingRecognizeResponse>;

async fn send_message(ws_writer: &mut WsWriter, message: &ClientMessage) -> RecognitionResult<()> {
    let json = serde_json::to_string(message)?;
    ws_writer.send(Message::Text(json.into())).await?;
    Ok(())
}

/// Send one message; `Ok(false)` when the service has already closed the
/// connection
async fn send_or_closed(
    ws_writer: &mut WsWriter,
    message: &ClientMessage,
) -> RecognitionResult<bool> {
    match send_message(ws_writer, message).await {
        Ok(()) => Ok(true),
        Err(e) if e.is_closed_by_peer() => {
            info!("Service closed the connection, no more audio will be sent");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Sender task that streams audio blocks to the service
///
/// Sends the streaming configuration first, then every block of `audio` in
/// order, then an end-of-stream marker once `audio` is exhausted. The socket
/// is left open so trailing results can still arrive.
///
/// If the service closes the connection first, the task stops sending and
/// finishes successfully; the remaining audio is not consumed.
///
/// # Returns
/// The number of audio blocks sent
pub async fn sender_task<S>(
    mut ws_writer: WsWriter,
    streaming_config: StreamingRecognitionConfig,
    mut audio: S,
) -> RecognitionResult<u64>
where
    S: Stream<Item = AudioChunk> + Unpin,
{
    info!("Sender task started");

    let mut block_count = 0u64;

    if !send_or_closed(&mut ws_writer, &ClientMessage::config(streaming_config)).await? {
        return Ok(block_count);
    }
    debug!("Streaming configuration sent");

    let mut byte_count = 0u64;

    while let Some(block) = audio.next().await {
        debug!(
            "Sending audio block #{} ({} bytes)",
            block_count + 1,
            block.len()
        );

        if !send_or_closed(&mut ws_writer, &ClientMessage::audio(&block)).await? {
            return Ok(block_count);
        }
        block_count += 1;
        byte_count += block.len() as u64;
    }

    if !send_or_closed(&mut ws_writer, &ClientMessage::EndOfStream).await? {
        return Ok(block_count);
    }

    info!(
        "Sender task completed: {} blocks ({} bytes) sent, audio stream ended",
        block_count, byte_count
    );

    Ok(block_count)
}

/// Receiver task that forwards recognition responses to a channel
///
/// A response carrying an `error` object is forwarded as
/// `RecognitionError::ServiceError` and ends the task.
pub async fn receiver_task(
    mut ws_reader: WsReader,
    response_tx: mpsc::Sender<ResponseItem>,
) -> RecognitionResult<()> {
    info!("Receiver task started");

    let mut response_count = 0u64;

    while let Some(msg_result) = ws_reader.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                let response = match serde_json::from_str::<StreamingRecognizeResponse>(&text) {
                    Ok(response) => response,
                    Err(e) => {
                        error!("Failed to deserialize response: {}", e);
                        let _ = response_tx
                            .send(Err(RecognitionError::SerializationError(e)))
                            .await;
                        return Err(RecognitionError::ServiceError(
                            "malformed response".to_string(),
                        ));
                    }
                };

                if let Some(status) = &response.error {
                    error!("Service error {}: {}", status.code, status.message);
                    let message = format!("{} (code {})", status.message, status.code);
                    let _ = response_tx
                        .send(Err(RecognitionError::ServiceError(message.clone())))
                        .await;
                    return Err(RecognitionError::ServiceError(message));
                }

                response_count += 1;
                debug!(
                    "Response #{}: {} result(s)",
                    response_count,
                    response.results.len()
                );

                if response_tx.send(Ok(response)).await.is_err() {
                    warn!("Response receiver dropped, stopping");
                    break;
                }
            }
            Ok(Message::Close(frame)) => {
                info!("Received close frame: {:?}", frame);
                break;
            }
            Ok(Message::Ping(data)) => {
                // Pong is handled by the underlying library
                debug!("Received ping, length: {} bytes", data.len());
            }
            Ok(Message::Pong(_)) => {
                debug!("Received pong");
            }
            Ok(Message::Binary(data)) => {
                warn!("Received unexpected binary message: {} bytes", data.len());
            }
            Ok(Message::Frame(_)) => {
                debug!("Received raw frame");
            }
            Err(e) => {
                error!("WebSocket error: {}", e);
                let message = e.to_string();
                let _ = response_tx
                    .send(Err(RecognitionError::WebSocketError(e)))
                    .await;
                return Err(RecognitionError::ConnectionFailed(message));
            }
        }
    }

    info!(
        "Receiver task completed: {} responses received, stream ended",
        response_count
    );

    Ok(())
}
