/// Callback-to-consumer bridge for captured audio
pub mod bridge;

/// cpal-backed microphone capture
pub mod capture;

/// Native-format to requested-format conversion
pub mod convert;

/// Capture capability and device enumeration
pub mod device;

/// Audio-related error types
pub mod error;

/// Hardware-free capture device
pub mod mock;

/// Sample rate conversion
pub mod resampler;

// Re-export commonly used types
pub use bridge::{CaptureHandle, Chunks, MicrophoneStream};
pub use capture::{CpalInput, CpalStream};
pub use convert::ChunkConverter;
pub use device::{
    list_input_devices, AudioChunk, AudioDevice, AudioInput, CaptureFormat, ChunkCallback,
    InputStream,
};
pub use error::{AudioError, AudioResult};
