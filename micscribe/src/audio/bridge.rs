//! Bridge between the audio driver's callback thread and the network client.
//!
//! The driver pushes chunks into an unbounded queue through a non-blocking
//! callback. The consumer drains the queue through [`Chunks`], which blocks (or
//! awaits) for the first available chunk and then coalesces everything else
//! already queued into one block.
//!
//! ```text
//!  driver thread                         consumer
//!  ─────────────                         ────────
//!  on_capture(c1) ──┐
//!  on_capture(c2) ──┼──► [c1 c2 c3 … End] ──► Chunks::next() ──► c1‖c2‖c3
//!  on_capture(c3) ──┘                                         ──► None
//!                    close() ──► End
//! ```
//!
//! The queue is unbounded: if the consumer stalls, memory grows instead of
//! audio being dropped.

use crate::audio::device::{AudioChunk, AudioInput, CaptureFormat, InputStream};
use crate::audio::error::AudioResult;
use futures_util::Stream;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, info, warn};

/// Queue item: a captured chunk or the end-of-stream sentinel
#[derive(Debug)]
enum Frame {
    Audio(AudioChunk),
    End,
}

/// Queue shared between the capture callback and the consumer
#[derive(Debug)]
struct ChunkQueue {
    tx: mpsc::UnboundedSender<Frame>,
    closed: AtomicBool,
    captured: AtomicU64,
}

impl ChunkQueue {
    fn push(&self, chunk: AudioChunk) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        if self.tx.send(Frame::Audio(chunk)).is_ok() {
            self.captured.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Mark closed and enqueue the sentinel; `false` if already closed
    fn finish(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        let _ = self.tx.send(Frame::End);
        true
    }
}

/// Non-owning handle the capture callback uses to enqueue audio
///
/// Holds a weak reference: once the owning [`MicrophoneStream`] is gone,
/// captured chunks are silently discarded.
#[derive(Debug, Clone)]
pub struct CaptureHandle {
    queue: Weak<ChunkQueue>,
}

impl CaptureHandle {
    /// Enqueue one captured chunk
    ///
    /// Never blocks and never fails. Chunks captured after the session was
    /// closed are discarded.
    pub fn on_capture(&self, chunk: AudioChunk) {
        if let Some(queue) = self.queue.upgrade() {
            queue.push(chunk);
        }
    }
}

/// A scoped microphone capture session
///
/// Owns the device stream and the chunk queue. The device is released by
/// [`close`](Self::close) or, failing that, when the session is dropped.
///
/// # Example
/// ```no_run
/// use micscribe_lib::audio::{CaptureFormat, CpalInput, MicrophoneStream};
///
/// let mut mic = MicrophoneStream::open(&CpalInput::new(None), CaptureFormat::default())?;
/// let chunks = mic.chunks();
///
/// std::thread::spawn(move || {
///     for block in chunks {
///         println!("{} bytes", block.len());
///     }
/// });
///
/// std::thread::sleep(std::time::Duration::from_secs(3));
/// mic.close();
/// # Ok::<(), micscribe_lib::audio::AudioError>(())
/// ```
pub struct MicrophoneStream<S: InputStream> {
    /// Device stream (None once closed)
    stream: Option<S>,
    /// Owning reference to the queue
    queue: Arc<ChunkQueue>,
    /// Consumer end, handed out once by `chunks()`
    receiver: Option<mpsc::UnboundedReceiver<Frame>>,
    format: CaptureFormat,
}

impl<S: InputStream> MicrophoneStream<S> {
    /// Open the input device and begin asynchronous capture
    ///
    /// # Errors
    /// Returns `AudioError::DeviceUnavailable` if there is no input device or
    /// the driver refuses the stream. No device handle is held on failure.
    pub fn open<I>(input: &I, format: CaptureFormat) -> AudioResult<Self>
    where
        I: AudioInput<Stream = S>,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let queue = Arc::new(ChunkQueue {
            tx,
            closed: AtomicBool::new(false),
            captured: AtomicU64::new(0),
        });

        let handle = CaptureHandle {
            queue: Arc::downgrade(&queue),
        };
        let mut stream =
            input.open_input(&format, Box::new(move |chunk| handle.on_capture(chunk)))?;

        if let Err(e) = stream.start() {
            stream.close();
            return Err(e);
        }

        info!(
            "Microphone stream opened ({} Hz, {} frames per buffer)",
            format.sample_rate, format.frames_per_buffer
        );

        Ok(Self {
            stream: Some(stream),
            queue,
            receiver: Some(rx),
            format,
        })
    }

    /// Another handle onto the capture callback's queue
    pub fn capture_handle(&self) -> CaptureHandle {
        CaptureHandle {
            queue: Arc::downgrade(&self.queue),
        }
    }

    /// Lazy sequence of coalesced audio blocks
    ///
    /// Can be taken once; later calls return an already-terminated sequence.
    pub fn chunks(&mut self) -> Chunks {
        match self.receiver.take() {
            Some(receiver) => Chunks {
                receiver: Some(receiver),
                blocks: 0,
                bytes: 0,
            },
            None => {
                warn!("Chunk sequence already taken");
                Chunks::terminated()
            }
        }
    }

    /// Stop and release the device, then signal end-of-stream
    ///
    /// Call once. Repeated calls, including the implicit one on drop, do
    /// nothing.
    pub fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.stop() {
                warn!("Failed to stop audio stream: {}", e);
            }
            stream.close();
        }

        if self.queue.finish() {
            info!(
                "Microphone stream closed ({} chunks captured)",
                self.captured_chunks()
            );
        } else {
            debug!("Microphone stream already closed");
        }
    }

    /// Whether `close()` has run
    pub fn is_closed(&self) -> bool {
        self.queue.closed.load(Ordering::Acquire)
    }

    /// Chunks accepted onto the queue so far
    pub fn captured_chunks(&self) -> u64 {
        self.queue.captured.load(Ordering::Relaxed)
    }

    /// Capture format of this session
    pub fn format(&self) -> CaptureFormat {
        self.format
    }
}

impl<S: InputStream> Drop for MicrophoneStream<S> {
    fn drop(&mut self) {
        if !self.is_closed() {
            self.close();
        }
    }
}

/// Lazy, finite sequence of coalesced audio blocks
///
/// Use it as an [`Iterator`] from a plain thread, or as a [`Stream`] inside an
/// async runtime. The blocking `Iterator::next` must not be called from
/// within an async context.
#[derive(Debug)]
pub struct Chunks {
    /// None once terminated
    receiver: Option<mpsc::UnboundedReceiver<Frame>>,
    blocks: u64,
    bytes: u64,
}

impl Chunks {
    fn terminated() -> Self {
        Self {
            receiver: None,
            blocks: 0,
            bytes: 0,
        }
    }

    /// Whether the sequence has ended
    pub fn is_terminated(&self) -> bool {
        self.receiver.is_none()
    }

    /// Blocks yielded so far
    pub fn blocks_yielded(&self) -> u64 {
        self.blocks
    }

    /// Bytes yielded so far
    pub fn bytes_yielded(&self) -> u64 {
        self.bytes
    }

    /// Merge `first` with everything queued right now
    ///
    /// Data queued ahead of the sentinel is still yielded; the sequence ends
    /// on the following call.
    fn coalesce(&mut self, first: Option<Frame>) -> Option<AudioChunk> {
        let Some(Frame::Audio(mut block)) = first else {
            self.terminate();
            return None;
        };

        let mut ended = false;
        if let Some(receiver) = self.receiver.as_mut() {
            loop {
                match receiver.try_recv() {
                    Ok(Frame::Audio(chunk)) => block.extend_from_slice(&chunk),
                    Ok(Frame::End) | Err(TryRecvError::Disconnected) => {
                        ended = true;
                        break;
                    }
                    Err(TryRecvError::Empty) => break,
                }
            }
        }

        self.blocks += 1;
        self.bytes += block.len() as u64;

        if ended {
            self.terminate();
        }

        Some(block)
    }

    fn terminate(&mut self) {
        if self.receiver.take().is_some() {
            debug!(
                blocks = self.blocks,
                bytes = self.bytes,
                "Chunk sequence terminated"
            );
        }
    }
}

impl Iterator for Chunks {
    type Item = AudioChunk;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.receiver.as_mut()?.blocking_recv();
        self.coalesce(first)
    }
}

impl Stream for Chunks {
    type Item = AudioChunk;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(receiver) = this.receiver.as_mut() else {
            return Poll::Ready(None);
        };

        match receiver.poll_recv(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(first) => Poll::Ready(this.coalesce(first)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::mock::MockInput;

    fn open_mock() -> (MockInput, MicrophoneStream<crate::audio::mock::MockStream>) {
        let input = MockInput::new();
        let mic = MicrophoneStream::open(&input, CaptureFormat::default()).unwrap();
        (input, mic)
    }

    #[test]
    fn test_open_starts_capture() {
        let (input, mic) = open_mock();

        assert!(input.is_running());
        assert!(!mic.is_closed());
        assert_eq!(input.format(), Some(CaptureFormat::default()));
        assert_eq!(mic.format(), CaptureFormat::default());
    }

    #[test]
    fn test_open_unavailable_device() {
        let input = MockInput::unavailable("no microphone");
        let result = MicrophoneStream::open(&input, CaptureFormat::default());

        match result {
            Err(e) => assert!(e.is_device_unavailable()),
            Ok(_) => panic!("Expected DeviceUnavailable"),
        }
    }

    #[test]
    fn test_queued_chunks_coalesce_into_one_block() {
        let (input, mut mic) = open_mock();
        let feeder = input.feeder();

        feeder.capture(vec![1, 2]);
        feeder.capture(vec![3]);
        feeder.capture(vec![4, 5, 6]);

        let mut chunks = mic.chunks();
        assert_eq!(chunks.next(), Some(vec![1, 2, 3, 4, 5, 6]));
        assert_eq!(chunks.blocks_yielded(), 1);
        assert_eq!(chunks.bytes_yielded(), 6);
        assert!(!chunks.is_terminated());

        mic.close();
        assert_eq!(chunks.next(), None);
        assert!(chunks.is_terminated());
    }

    #[test]
    fn test_data_before_sentinel_is_flushed() {
        let (input, mut mic) = open_mock();
        input.feeder().capture(vec![7; 4]);
        mic.close();

        let mut chunks = mic.chunks();
        assert_eq!(chunks.next(), Some(vec![7; 4]));
        assert!(chunks.is_terminated());
        assert_eq!(chunks.next(), None);
    }

    #[test]
    fn test_close_releases_device_and_is_repeatable() {
        let (input, mut mic) = open_mock();

        mic.close();
        assert!(mic.is_closed());
        assert!(input.is_released());
        assert_eq!(input.stop_calls(), 1);

        mic.close();
        assert_eq!(input.stop_calls(), 1);
    }

    #[test]
    fn test_chunks_after_close_are_discarded() {
        let (input, mut mic) = open_mock();
        let handle = mic.capture_handle();
        let feeder = input.feeder();

        feeder.capture(vec![1]);
        mic.close();
        handle.on_capture(vec![2]);
        assert!(!feeder.capture_late(vec![3]));

        let blocks: Vec<_> = Iterator::collect(mic.chunks());
        assert_eq!(blocks, vec![vec![1]]);
        assert_eq!(mic.captured_chunks(), 1);
    }

    #[test]
    fn test_chunks_is_not_restartable() {
        let (_input, mut mic) = open_mock();

        let first = mic.chunks();
        assert!(!first.is_terminated());

        let mut second = mic.chunks();
        assert!(second.is_terminated());
        assert_eq!(second.next(), None);
    }

    #[test]
    fn test_handle_outliving_session_is_harmless() {
        let (_input, mic) = open_mock();
        let handle = mic.capture_handle();
        drop(mic);

        handle.on_capture(vec![0; 3200]);
    }

    #[tokio::test]
    async fn test_stream_coalesces_and_terminates() {
        let (input, mut mic) = open_mock();
        let feeder = input.feeder();
        let mut chunks = mic.chunks();

        feeder.capture(vec![1; 10]);
        feeder.capture(vec![2; 10]);
        let block = futures_util::StreamExt::next(&mut chunks).await.unwrap();
        assert_eq!(block.len(), 20);
        assert_eq!(&block[..10], &[1; 10]);

        mic.close();
        assert_eq!(futures_util::StreamExt::next(&mut chunks).await, None);
        assert!(chunks.is_terminated());
    }

    #[tokio::test]
    async fn test_stream_wakes_on_capture() {
        let (input, mut mic) = open_mock();
        let feeder = input.feeder();
        let mut chunks = mic.chunks();

        let consumer = tokio::spawn(async move { futures_util::StreamExt::next(&mut chunks).await });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        feeder.capture(vec![9; 3200]);

        let block = consumer.await.unwrap();
        assert_eq!(block, Some(vec![9; 3200]));
    }
}
