//! Decoded PCM and 16-bit quantization

use crate::domain::error::PcmError;

/// Planar floating point PCM as produced by a decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl DecodedAudio {
    /// Build from one sample vector per channel; all channels must have the
    /// same number of frames.
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self, PcmError> {
        if sample_rate == 0 {
            return Err(PcmError::ZeroSampleRate);
        }
        let expected = channels.first().map(Vec::len).ok_or(PcmError::NoChannels)?;
        if let Some(ragged) = channels.iter().find(|c| c.len() != expected) {
            return Err(PcmError::RaggedChannels {
                expected,
                found: ragged.len(),
            });
        }
        Ok(Self {
            sample_rate,
            channels,
        })
    }

    /// Build from frame-interleaved samples
    pub fn from_interleaved(
        sample_rate: u32,
        channel_count: u16,
        samples: &[f32],
    ) -> Result<Self, PcmError> {
        if channel_count == 0 {
            return Err(PcmError::NoChannels);
        }
        let count = channel_count as usize;
        if samples.len() % count != 0 {
            return Err(PcmError::PartialFrame {
                len: samples.len(),
                channels: channel_count,
            });
        }

        let frames = samples.len() / count;
        let mut channels = vec![Vec::with_capacity(frames); count];
        for frame in samples.chunks_exact(count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Self::new(sample_rate, channels)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> u16 {
        self.channels.len() as u16
    }

    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Seconds of audio
    pub fn duration_secs(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// Frame-interleaved 16-bit samples, every channel kept (no downmix)
    pub fn interleave_i16(&self) -> Vec<i16> {
        let mut out = Vec::with_capacity(self.frame_count() * self.channels.len());
        for frame in 0..self.frame_count() {
            for channel in &self.channels {
                out.push(quantize_sample(channel[frame]));
            }
        }
        out
    }
}

/// Quantize one sample to signed 16 bits.
///
/// The input is clamped to [-1, 1]; negative values scale by 32768 and
/// non-negative values by 32767, so -1.0 maps to `i16::MIN` and 1.0 to
/// `i16::MAX`. NaN maps to 0.
pub fn quantize_sample(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}
