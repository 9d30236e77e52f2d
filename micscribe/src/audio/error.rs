use thiserror::Error;

/// Audio-related errors
#[derive(Error, Debug)]
pub enum AudioError {
    /// No usable input device, or the driver refused to open a stream
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The requested capture format cannot be expressed
    #[error("Invalid capture format: {0}")]
    InvalidFormat(String),

    /// Starting or stopping an open stream failed
    #[error("Audio stream error: {0}")]
    StreamError(String),

    /// Sample rate conversion failed
    #[error("Resampling failed: {0}")]
    ResampleFailed(String),

    /// Device name is invalid
    #[error("Device name is invalid UTF-8")]
    InvalidDeviceName,
}

impl AudioError {
    /// Whether this error means the capture device could not be acquired
    pub fn is_device_unavailable(&self) -> bool {
        matches!(self, AudioError::DeviceUnavailable(_))
    }
}

impl From<cpal::DevicesError> for AudioError {
    fn from(e: cpal::DevicesError) -> Self {
        AudioError::DeviceUnavailable(format!("cannot enumerate input devices: {}", e))
    }
}

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;
