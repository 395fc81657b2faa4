//! In-process FLAC encoder built on the flacenc crate
//!
//! flacenc encodes whole buffers, so a session collects the submitted samples
//! and encodes them on `finish`, handing the stream to the callback in
//! fixed-size pieces.

use flacenc::bitsink::ByteSink;
use flacenc::component::BitRepr;
use flacenc::config;
use flacenc::error::Verify;
use flacenc::source::MemSource;

use crate::application::ports::{
    ChunkCallback, EncoderError, EncoderSession, EncoderSettings, LosslessEncoder,
};

use super::verify::decode_flac;

/// Size of the pieces handed to the chunk callback
const OUTPUT_CHUNK: usize = 4096;

/// FLAC stream marker
const FLAC_MAGIC: &[u8; 4] = b"fLaC";

/// Lossless encoder running inside the process
#[derive(Debug, Default)]
pub struct FlacencEncoder;

impl FlacencEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Fixed block size for a 0-8 compression level
    fn block_size(level: u8) -> usize {
        if level <= 2 {
            1152
        } else {
            4096
        }
    }
}

impl LosslessEncoder for FlacencEncoder {
    fn name(&self) -> &str {
        "flacenc"
    }

    fn readiness(&self) -> Option<bool> {
        Some(true)
    }

    fn create_session(
        &self,
        settings: &EncoderSettings,
        on_chunk: ChunkCallback,
    ) -> Result<Box<dyn EncoderSession>, EncoderError> {
        if settings.bits_per_sample != 16 {
            return Err(EncoderError::SessionRefused(format!(
                "{} bits per sample",
                settings.bits_per_sample
            )));
        }
        if settings.channels == 0 || settings.channels > 8 {
            return Err(EncoderError::SessionRefused(format!(
                "{} channels",
                settings.channels
            )));
        }
        if settings.sample_rate == 0 {
            return Err(EncoderError::SessionRefused("zero sample rate".to_string()));
        }

        let capacity = usize::try_from(settings.total_samples)
            .unwrap_or(0)
            .saturating_mul(usize::from(settings.channels));
        Ok(Box::new(FlacencSession {
            settings: *settings,
            samples: Vec::with_capacity(capacity),
            on_chunk,
            finished: false,
        }))
    }
}

struct FlacencSession {
    settings: EncoderSettings,
    samples: Vec<i32>,
    on_chunk: ChunkCallback,
    finished: bool,
}

impl EncoderSession for FlacencSession {
    fn process(&mut self, interleaved: &[i16]) -> Result<(), EncoderError> {
        if self.finished {
            return Err(EncoderError::Encode("session already finished".to_string()));
        }
        self.samples.extend(interleaved.iter().map(|&s| i32::from(s)));
        Ok(())
    }

    fn finish(&mut self) -> Result<(), EncoderError> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let flac = encode_samples(&self.samples, &self.settings)?;
        for piece in flac.chunks(OUTPUT_CHUNK) {
            (self.on_chunk)(piece);
        }
        Ok(())
    }
}

fn encode_samples(samples: &[i32], settings: &EncoderSettings) -> Result<Vec<u8>, EncoderError> {
    let channels = usize::from(settings.channels);
    if samples.len() % channels != 0 {
        return Err(EncoderError::Encode(format!(
            "{} samples do not fill whole frames of {} channels",
            samples.len(),
            channels
        )));
    }

    let mut encoder_config = config::Encoder::default();
    encoder_config.block_size = FlacencEncoder::block_size(settings.compression_level);
    let encoder_config = encoder_config
        .into_verified()
        .map_err(|(_, e)| EncoderError::Config(format!("{:?}", e)))?;

    let source = MemSource::from_samples(
        samples,
        channels,
        usize::from(settings.bits_per_sample),
        settings.sample_rate as usize,
    );

    let stream =
        flacenc::encode_with_fixed_block_size(&encoder_config, source, encoder_config.block_size)
            .map_err(|e| EncoderError::Encode(format!("{:?}", e)))?;

    let mut sink = ByteSink::new();
    stream
        .write(&mut sink)
        .map_err(|e| EncoderError::Encode(e.to_string()))?;
    let flac = sink.into_inner();

    if settings.verify {
        verify_stream(&flac, samples, settings)?;
    }
    Ok(flac)
}

/// Decode the encoded stream and require it to match the input exactly
fn verify_stream(
    flac: &[u8],
    samples: &[i32],
    settings: &EncoderSettings,
) -> Result<(), EncoderError> {
    if !flac.starts_with(FLAC_MAGIC) {
        return Err(EncoderError::Verify("missing fLaC stream marker".to_string()));
    }

    let decoded = decode_flac(flac)?;
    if decoded.sample_rate != settings.sample_rate || decoded.channels != settings.channels {
        return Err(EncoderError::Verify(format!(
            "stream is {} Hz x{}, expected {} Hz x{}",
            decoded.sample_rate, decoded.channels, settings.sample_rate, settings.channels
        )));
    }
    if decoded.samples.len() != samples.len() {
        return Err(EncoderError::Verify(format!(
            "decoded {} samples, encoded {}",
            decoded.samples.len(),
            samples.len()
        )));
    }
    if let Some(index) = decoded
        .samples
        .iter()
        .zip(samples)
        .position(|(&d, &s)| i32::from(d) != s)
    {
        return Err(EncoderError::Verify(format!(
            "sample {} differs after decoding",
            index
        )));
    }
    Ok(())
}
