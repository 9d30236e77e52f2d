use crate::audio::error::{AudioError, AudioResult};
use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};
use serde::{Deserialize, Serialize};

/// A block of captured little-endian 16-bit PCM audio
pub type AudioChunk = Vec<u8>;

/// Callback registered with an input stream
///
/// Invoked on the driver thread for every captured buffer. Implementations
/// must return promptly and must never block.
pub type ChunkCallback = Box<dyn FnMut(AudioChunk) + Send + 'static>;

/// Capture format requested from the audio driver
///
/// Samples are always signed 16-bit integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels (1 for speech capture)
    pub channels: u16,
    /// Frames delivered per callback invocation
    pub frames_per_buffer: u32,
}

impl CaptureFormat {
    /// Mono capture at `sample_rate`, one callback every `chunk_ms` of audio
    ///
    /// # Example
    /// ```
    /// use micscribe_lib::audio::CaptureFormat;
    ///
    /// let format = CaptureFormat::mono(16000, 100);
    /// assert_eq!(format.frames_per_buffer, 1600);
    /// assert_eq!(format.bytes_per_buffer(), 3200);
    /// ```
    pub fn mono(sample_rate: u32, chunk_ms: u32) -> Self {
        Self {
            sample_rate,
            channels: 1,
            frames_per_buffer: (u64::from(sample_rate) * u64::from(chunk_ms) / 1000) as u32,
        }
    }

    /// Size in bytes of one full callback buffer
    pub fn bytes_per_buffer(&self) -> usize {
        self.frames_per_buffer as usize * self.channels as usize * 2
    }

    /// Check that the format can be requested from a driver
    pub fn validate(&self) -> AudioResult<()> {
        if self.sample_rate == 0 {
            return Err(AudioError::InvalidFormat("sample rate is zero".to_string()));
        }
        if self.channels == 0 {
            return Err(AudioError::InvalidFormat("channel count is zero".to_string()));
        }
        if self.frames_per_buffer == 0 {
            return Err(AudioError::InvalidFormat(
                "frames per buffer is zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CaptureFormat {
    fn default() -> Self {
        Self::mono(16000, 100)
    }
}

/// Audio input capability
///
/// Opens an input stream with a given format and registers the capture
/// callback. The callback starts firing once the returned stream is started.
pub trait AudioInput {
    /// Stream handle produced by this input
    type Stream: InputStream;

    /// Open an input stream and register `on_chunk` as its capture callback
    fn open_input(
        &self,
        format: &CaptureFormat,
        on_chunk: ChunkCallback,
    ) -> AudioResult<Self::Stream>;
}

/// An open input stream
pub trait InputStream {
    /// Begin delivering buffers to the registered callback
    fn start(&mut self) -> AudioResult<()>;

    /// Stop delivering buffers
    fn stop(&mut self) -> AudioResult<()>;

    /// Release the underlying device handle
    fn close(self)
    where
        Self: Sized;
}

/// Information about an audio device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioDevice {
    /// Device identifier (unique name)
    pub id: String,
    /// Human-readable device name
    pub name: String,
    /// Whether this is the default input device
    pub is_default: bool,
}

/// List all available input devices
///
/// # Errors
/// Returns `AudioError::DeviceUnavailable` if no input devices are found.
/// Driver enumeration failures are reported as `DeviceUnavailable` too.
///
/// # Example
/// ```no_run
/// use micscribe_lib::audio::device::list_input_devices;
///
/// let devices = list_input_devices().unwrap();
/// for device in devices {
///     println!("Device: {} ({})", device.name, device.id);
/// }
/// ```
pub fn list_input_devices() -> AudioResult<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let devices: Vec<Device> = host.input_devices()?.collect();

    if devices.is_empty() {
        return Err(AudioError::DeviceUnavailable(
            "no input devices found".to_string(),
        ));
    }

    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let mut audio_devices = Vec::with_capacity(devices.len());
    for device in devices {
        let name = device.name().map_err(|_| AudioError::InvalidDeviceName)?;
        let is_default = default_name.as_deref() == Some(name.as_str());

        audio_devices.push(AudioDevice {
            id: name.clone(),
            name,
            is_default,
        });
    }

    Ok(audio_devices)
}

/// Resolve an input device, by name or the host default
pub(crate) fn resolve_input_device(host: &Host, device_id: Option<&str>) -> AudioResult<Device> {
    match device_id {
        Some(id) => find_device_by_id(host, id),
        None => host
            .default_input_device()
            .ok_or_else(|| AudioError::DeviceUnavailable("no default input device".to_string())),
    }
}

/// Find a device by its ID (name)
fn find_device_by_id(host: &Host, device_id: &str) -> AudioResult<Device> {
    for device in host.input_devices()? {
        if let Ok(name) = device.name() {
            if name == device_id {
                return Ok(device);
            }
        }
    }

    Err(AudioError::DeviceUnavailable(format!(
        "input device '{}' not found",
        device_id
    )))
}
