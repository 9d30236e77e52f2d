//! Conversion from a device's native capture format to the requested one
//!
//! Drivers deliver interleaved buffers of whatever size and rate they like.
//! [`ChunkConverter`] downmixes them to mono, resamples to the requested rate,
//! converts to little-endian i16 and re-chunks to exactly
//! `frames_per_buffer` frames per emitted chunk.

use crate::audio::device::{AudioChunk, CaptureFormat};
use crate::audio::error::{AudioError, AudioResult};
use crate::audio::resampler::AudioResampler;

/// Converts native driver buffers into fixed-size chunks
pub struct ChunkConverter {
    input_channels: usize,
    resampler: Option<AudioResampler>,
    /// Converted bytes not yet forming a whole chunk
    pending: Vec<u8>,
    chunk_bytes: usize,
}

impl ChunkConverter {
    /// Create a converter from the device's native rate and channel count
    ///
    /// # Errors
    /// Returns `AudioError::InvalidFormat` unless `format` is a valid mono
    /// format, and `AudioError::ResampleFailed` if the rates cannot be
    /// converted.
    pub fn new(input_rate: u32, input_channels: u16, format: &CaptureFormat) -> AudioResult<Self> {
        format.validate()?;
        if format.channels != 1 {
            return Err(AudioError::InvalidFormat(format!(
                "conversion produces mono audio, {} channels requested",
                format.channels
            )));
        }
        if input_channels == 0 {
            return Err(AudioError::InvalidFormat(
                "device reports zero channels".to_string(),
            ));
        }

        let resampler = if input_rate == format.sample_rate {
            None
        } else {
            Some(AudioResampler::new(input_rate, format.sample_rate)?)
        };

        Ok(Self {
            input_channels: input_channels as usize,
            resampler,
            pending: Vec::with_capacity(format.bytes_per_buffer() * 2),
            chunk_bytes: format.bytes_per_buffer(),
        })
    }

    /// Whether samples pass through without resampling
    pub fn is_passthrough(&self) -> bool {
        self.resampler.is_none()
    }

    /// Feed interleaved float samples in `[-1.0, 1.0]`
    pub fn push_f32<F>(&mut self, interleaved: &[f32], emit: &mut F) -> AudioResult<()>
    where
        F: FnMut(AudioChunk) + ?Sized,
    {
        let mono = downmix(interleaved, self.input_channels);
        let mono = match self.resampler.as_mut() {
            Some(resampler) => resampler.process(&mono)?,
            None => mono,
        };

        for sample in mono {
            self.pending.extend_from_slice(&f32_to_i16(sample).to_le_bytes());
        }
        self.flush_whole_chunks(emit);
        Ok(())
    }

    /// Feed interleaved i16 samples
    pub fn push_i16<F>(&mut self, interleaved: &[i16], emit: &mut F) -> AudioResult<()>
    where
        F: FnMut(AudioChunk) + ?Sized,
    {
        if self.input_channels == 1 && self.resampler.is_none() {
            for sample in interleaved {
                self.pending.extend_from_slice(&sample.to_le_bytes());
            }
            self.flush_whole_chunks(emit);
            return Ok(());
        }

        let floats: Vec<f32> = interleaved
            .iter()
            .map(|&s| s as f32 / i16::MAX as f32)
            .collect();
        self.push_f32(&floats, emit)
    }

    fn flush_whole_chunks<F>(&mut self, emit: &mut F)
    where
        F: FnMut(AudioChunk) + ?Sized,
    {
        while self.pending.len() >= self.chunk_bytes {
            let rest = self.pending.split_off(self.chunk_bytes);
            let chunk = std::mem::replace(&mut self.pending, rest);
            emit(chunk);
        }
    }
}

/// Average interleaved frames down to one channel
fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels == 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}
