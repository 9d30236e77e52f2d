use crate::audio::error::{AudioError, AudioResult};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::{debug, info};

/// Mono sample rate converter for native-rate capture
///
/// Uses sinc interpolation in fixed 10ms input blocks. Input of any length is
/// accepted; samples that do not fill a whole block wait for the next call.
pub struct AudioResampler {
    resampler: SincFixedIn<f32>,
    /// Input buffer for rubato (channels x samples)
    input_buffer: Vec<Vec<f32>>,
    /// Output buffer for rubato (channels x samples)
    output_buffer: Vec<Vec<f32>>,
    /// Samples waiting for a full input block
    pending: Vec<f32>,
    input_rate: u32,
    output_rate: u32,
    /// Input samples per block
    chunk_size: usize,
}

impl AudioResampler {
    /// Create a resampler from `input_rate` to `output_rate`
    ///
    /// # Errors
    /// Returns `AudioError::ResampleFailed` if either rate is unusable.
    ///
    /// # Example
    /// ```
    /// use micscribe_lib::audio::resampler::AudioResampler;
    ///
    /// let mut resampler = AudioResampler::new(48000, 16000).unwrap();
    /// let output = resampler.process(&vec![0.0f32; 4800]).unwrap();
    /// assert!(output.len() <= 1600);
    /// ```
    pub fn new(input_rate: u32, output_rate: u32) -> AudioResult<Self> {
        if input_rate < 100 || output_rate == 0 {
            return Err(AudioError::ResampleFailed(format!(
                "unsupported rates: {} Hz -> {} Hz",
                input_rate, output_rate
            )));
        }

        let ratio = output_rate as f64 / input_rate as f64;

        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };

        let chunk_size = (input_rate / 100) as usize;

        let resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, chunk_size, 1)
            .map_err(|e| AudioError::ResampleFailed(format!("cannot create resampler: {}", e)))?;

        let input_buffer = resampler.input_buffer_allocate(true);
        let output_buffer = resampler.output_buffer_allocate(true);

        info!(
            "Resampling {} Hz -> {} Hz (ratio {:.6}, {} samples per block)",
            input_rate, output_rate, ratio, chunk_size
        );

        Ok(Self {
            resampler,
            input_buffer,
            output_buffer,
            pending: Vec::with_capacity(chunk_size * 2),
            input_rate,
            output_rate,
            chunk_size,
        })
    }

    /// Resample as many whole input blocks as are available
    ///
    /// Returns an empty vector while less than one block has accumulated.
    pub fn process(&mut self, input: &[f32]) -> AudioResult<Vec<f32>> {
        self.pending.extend_from_slice(input);

        let mut output = Vec::new();
        while self.pending.len() >= self.chunk_size {
            self.input_buffer[0].copy_from_slice(&self.pending[..self.chunk_size]);
            self.pending.drain(..self.chunk_size);

            let (_, generated) = self
                .resampler
                .process_into_buffer(&self.input_buffer, &mut self.output_buffer, None)
                .map_err(|e| AudioError::ResampleFailed(e.to_string()))?;

            output.extend_from_slice(&self.output_buffer[0][..generated]);
        }

        if !output.is_empty() {
            debug!("Resampled to {} samples", output.len());
        }
        Ok(output)
    }

    /// Input sample rate
    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    /// Output sample rate
    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    /// Input samples consumed per block
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}
