//! Canonical 16-bit PCM WAV synthesis
//!
//! Used when no lossless encoder is available. The header is the fixed
//! 44-byte RIFF/WAVE layout with a plain `fmt ` chunk (format tag 1).

use super::pcm::{quantize_sample, DecodedAudio};

/// Size of the canonical header in bytes
pub const WAV_HEADER_LEN: usize = 44;

const BYTES_PER_SAMPLE: u16 = 2;
const FORMAT_PCM: u16 = 1;

/// Header bytes counted by the RIFF size field
const RIFF_OVERHEAD: u32 = 36;

/// RIFF and data chunk sizes for `frames` frames.
///
/// Both fields are 32-bit; longer audio saturates them so the RIFF size stays
/// at `u32::MAX` instead of wrapping.
fn chunk_sizes(frames: usize, block_align: u16) -> (u32, u32) {
    let data_bytes = (frames as u64).saturating_mul(u64::from(block_align));
    let data_len = u32::try_from(data_bytes)
        .unwrap_or(u32::MAX)
        .min(u32::MAX - RIFF_OVERHEAD);
    (data_len + RIFF_OVERHEAD, data_len)
}

/// Write decoded PCM as a canonical 16-bit WAV file.
pub fn synthesize_wav(audio: &DecodedAudio) -> Vec<u8> {
    let channels = audio.channel_count();
    let sample_rate = audio.sample_rate();
    let frames = audio.frame_count();

    let block_align = channels * BYTES_PER_SAMPLE;
    let byte_rate = sample_rate.saturating_mul(u32::from(block_align));
    let (riff_len, data_len) = chunk_sizes(frames, block_align);

    let mut out = Vec::with_capacity(
        WAV_HEADER_LEN + frames.saturating_mul(usize::from(block_align)),
    );
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&riff_len.to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&FORMAT_PCM.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&(BYTES_PER_SAMPLE * 8).to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());

    for frame in 0..frames {
        for channel in 0..channels as usize {
            let sample = audio.channel(channel).map_or(0.0, |c| c[frame]);
            out.extend_from_slice(&quantize_sample(sample).to_le_bytes());
        }
    }

    out
}
