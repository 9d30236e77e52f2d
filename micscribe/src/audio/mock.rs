//! Hardware-free audio input for tests and CI.
//!
//! `MockInput` implements the capture capability without a driver. Audio is
//! pushed through a `MockFeeder`, usually from a dedicated thread standing in
//! for the driver's callback thread.

use crate::audio::device::{AudioChunk, AudioInput, CaptureFormat, ChunkCallback, InputStream};
use crate::audio::error::{AudioError, AudioResult};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct MockState {
    callback: Option<ChunkCallback>,
    format: Option<CaptureFormat>,
    running: bool,
    released: bool,
    stop_calls: usize,
    fail_open: Option<String>,
}

/// Shared handle to a mock device's state
#[derive(Clone, Default)]
struct Shared(Arc<Mutex<MockState>>);

impl Shared {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the device state from others
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A mock audio input device
///
/// # Example
/// ```
/// use micscribe_lib::audio::mock::MockInput;
/// use micscribe_lib::audio::{AudioInput, CaptureFormat, InputStream};
///
/// let input = MockInput::new();
/// let feeder = input.feeder();
///
/// let mut stream = input
///     .open_input(&CaptureFormat::default(), Box::new(|_chunk| {}))
///     .unwrap();
/// stream.start().unwrap();
///
/// assert!(feeder.capture(vec![0u8; 3200]));
/// ```
#[derive(Clone, Default)]
pub struct MockInput {
    shared: Shared,
}

impl MockInput {
    /// Create a working mock device
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock device whose `open_input` always fails
    pub fn unavailable(reason: impl Into<String>) -> Self {
        let input = Self::default();
        input.shared.lock().fail_open = Some(reason.into());
        input
    }

    /// Handle used to deliver captured chunks to the registered callback
    pub fn feeder(&self) -> MockFeeder {
        MockFeeder {
            shared: self.shared.clone(),
        }
    }

    /// Format requested by the last successful `open_input`
    pub fn format(&self) -> Option<CaptureFormat> {
        self.shared.lock().format
    }

    /// Whether the opened stream has been released
    pub fn is_released(&self) -> bool {
        self.shared.lock().released
    }

    /// Whether the opened stream is currently delivering audio
    pub fn is_running(&self) -> bool {
        self.shared.lock().running
    }

    /// Number of times `stop` was called on the opened stream
    pub fn stop_calls(&self) -> usize {
        self.shared.lock().stop_calls
    }
}

impl AudioInput for MockInput {
    type Stream = MockStream;

    fn open_input(
        &self,
        format: &CaptureFormat,
        on_chunk: ChunkCallback,
    ) -> AudioResult<Self::Stream> {
        format.validate()?;

        let mut state = self.shared.lock();
        if let Some(reason) = state.fail_open.clone() {
            return Err(AudioError::DeviceUnavailable(reason));
        }

        state.callback = Some(on_chunk);
        state.format = Some(*format);
        state.released = false;

        Ok(MockStream {
            shared: self.shared.clone(),
        })
    }
}

/// Driver-side handle of a mock device
#[derive(Clone)]
pub struct MockFeeder {
    shared: Shared,
}

impl MockFeeder {
    /// Deliver one chunk to the callback, as a driver would
    ///
    /// Returns `false` when the stream is not running and the chunk was not
    /// delivered.
    pub fn capture(&self, chunk: AudioChunk) -> bool {
        let mut state = self.shared.lock();
        if !state.running {
            return false;
        }
        match state.callback.as_mut() {
            Some(callback) => {
                callback(chunk);
                true
            }
            None => false,
        }
    }

    /// Deliver a chunk even if the stream is stopped
    ///
    /// Mimics a driver that fires one last callback while stopping.
    pub fn capture_late(&self, chunk: AudioChunk) -> bool {
        let mut state = self.shared.lock();
        match state.callback.as_mut() {
            Some(callback) => {
                callback(chunk);
                true
            }
            None => false,
        }
    }
}

/// An open mock input stream
pub struct MockStream {
    shared: Shared,
}

impl MockStream {
    fn release(&self) {
        let mut state = self.shared.lock();
        state.running = false;
        state.released = true;
        state.callback = None;
    }
}

impl InputStream for MockStream {
    fn start(&mut self) -> AudioResult<()> {
        self.shared.lock().running = true;
        Ok(())
    }

    fn stop(&mut self) -> AudioResult<()> {
        let mut state = self.shared.lock();
        state.running = false;
        state.stop_calls += 1;
        Ok(())
    }

    fn close(self) {
        self.release();
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.release();
    }
}
