use crate::audio::convert::ChunkConverter;
use crate::audio::device::{
    resolve_input_device, AudioInput, CaptureFormat, ChunkCallback, InputStream,
};
use crate::audio::error::{AudioError, AudioResult};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{
    BufferSize, Device, FromSample, Sample, SampleFormat, SampleRate, SizedSample, Stream,
    StreamConfig, SupportedBufferSize, SupportedStreamConfigRange,
};
use tracing::{debug, error, info, warn};

/// Microphone input backed by the host's default audio driver
///
/// Captures i16 at the requested rate directly when the device offers that
/// mode. Otherwise the device runs in its native format and the audio is
/// downmixed, resampled and converted before it reaches the callback. Either
/// way every chunk holds exactly `frames_per_buffer` mono frames.
///
/// # Example
/// ```no_run
/// use micscribe_lib::audio::{AudioInput, CaptureFormat, CpalInput, InputStream};
///
/// let input = CpalInput::new(None);
/// let mut stream = input
///     .open_input(&CaptureFormat::default(), Box::new(|chunk| {
///         println!("captured {} bytes", chunk.len());
///     }))
///     .unwrap();
/// stream.start().unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct CpalInput {
    /// Input device name; `None` selects the host default
    device_id: Option<String>,
}

impl CpalInput {
    /// Create an input bound to a named device, or the default one
    pub fn new(device_id: Option<&str>) -> Self {
        Self {
            device_id: device_id.map(str::to_string),
        }
    }

    /// Requested device name, if any
    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }
}

impl AudioInput for CpalInput {
    type Stream = CpalStream;

    fn open_input(
        &self,
        format: &CaptureFormat,
        on_chunk: ChunkCallback,
    ) -> AudioResult<Self::Stream> {
        format.validate()?;

        let host = cpal::default_host();
        let device = resolve_input_device(&host, self.device_id.as_deref())?;

        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Using audio input device: {}", device_name);

        let ranges: Vec<SupportedStreamConfigRange> = match device.supported_input_configs() {
            Ok(ranges) => ranges.collect(),
            Err(e) => {
                debug!("Cannot query supported configs: {}", e);
                Vec::new()
            }
        };

        let built = match direct_config(ranges, format) {
            Some(config) => {
                info!(
                    "Capture format: {} Hz, {} channel(s), i16 ({:?} buffer)",
                    format.sample_rate, format.channels, config.buffer_size
                );
                let converter = ChunkConverter::new(format.sample_rate, format.channels, format)?;
                build_i16_stream(&device, &config, converter, on_chunk)
            }
            None => {
                let native = device
                    .default_input_config()
                    .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;
                let config = native.config();

                info!(
                    "Device captures {:?} at {} Hz, {} channel(s); converting to {} Hz mono i16",
                    native.sample_format(),
                    config.sample_rate.0,
                    config.channels,
                    format.sample_rate
                );

                let converter =
                    ChunkConverter::new(config.sample_rate.0, config.channels, format)?;

                match native.sample_format() {
                    SampleFormat::I16 => build_i16_stream(&device, &config, converter, on_chunk),
                    SampleFormat::U16 => {
                        build_float_stream::<u16>(&device, &config, converter, on_chunk)
                    }
                    SampleFormat::I32 => {
                        build_float_stream::<i32>(&device, &config, converter, on_chunk)
                    }
                    SampleFormat::F32 => {
                        build_float_stream::<f32>(&device, &config, converter, on_chunk)
                    }
                    SampleFormat::F64 => {
                        build_float_stream::<f64>(&device, &config, converter, on_chunk)
                    }
                    other => {
                        return Err(AudioError::InvalidFormat(format!(
                            "unsupported device sample format {:?}",
                            other
                        )));
                    }
                }
            }
        };

        let stream = built.map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;

        Ok(CpalStream {
            stream: Some(stream),
        })
    }
}

/// Stream config for capturing `format` as i16 without conversion, if one of
/// the device's supported ranges allows it
fn direct_config<R>(ranges: R, format: &CaptureFormat) -> Option<StreamConfig>
where
    R: IntoIterator<Item = SupportedStreamConfigRange>,
{
    let range = ranges.into_iter().find(|range| {
        range.sample_format() == SampleFormat::I16
            && range.channels() == format.channels
            && range.min_sample_rate().0 <= format.sample_rate
            && format.sample_rate <= range.max_sample_rate().0
    })?;

    let buffer_size = match range.buffer_size() {
        SupportedBufferSize::Range { min, max }
            if (*min..=*max).contains(&format.frames_per_buffer) =>
        {
            BufferSize::Fixed(format.frames_per_buffer)
        }
        _ => BufferSize::Default,
    };

    Some(StreamConfig {
        channels: format.channels,
        sample_rate: SampleRate(format.sample_rate),
        buffer_size,
    })
}

fn build_i16_stream(
    device: &Device,
    config: &StreamConfig,
    mut converter: ChunkConverter,
    mut on_chunk: ChunkCallback,
) -> Result<Stream, cpal::BuildStreamError> {
    device.build_input_stream(
        config,
        move |data: &[i16], _: &cpal::InputCallbackInfo| {
            if let Err(e) = converter.push_i16(data, &mut on_chunk) {
                error!("Dropping captured buffer: {}", e);
            }
        },
        stream_error,
        None,
    )
}

fn build_float_stream<T>(
    device: &Device,
    config: &StreamConfig,
    mut converter: ChunkConverter,
    mut on_chunk: ChunkCallback,
) -> Result<Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let mut scratch: Vec<f32> = Vec::new();
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            scratch.clear();
            scratch.extend(data.iter().map(|sample| sample.to_sample::<f32>()));
            if let Err(e) = converter.push_f32(&scratch, &mut on_chunk) {
                error!("Dropping captured buffer: {}", e);
            }
        },
        stream_error,
        None,
    )
}

fn stream_error(err: cpal::StreamError) {
    // Production stops; the consumer stays blocked until close()
    error!("Audio stream error: {}", err);
}

/// An open cpal input stream
pub struct CpalStream {
    /// The audio input stream (None once closed)
    stream: Option<Stream>,
}

impl InputStream for CpalStream {
    fn start(&mut self) -> AudioResult<()> {
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| AudioError::StreamError("stream already closed".to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;

        info!("Audio capture started");
        Ok(())
    }

    fn stop(&mut self) -> AudioResult<()> {
        if let Some(stream) = self.stream.as_ref() {
            stream
                .pause()
                .map_err(|e| AudioError::StreamError(e.to_string()))?;
            debug!("Audio capture paused");
        }
        Ok(())
    }

    fn close(mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            info!("Audio device released");
        }
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        if self.stream.take().is_some() {
            warn!("Audio stream dropped without close");
        }
    }
}
