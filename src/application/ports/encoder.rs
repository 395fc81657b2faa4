//! Lossless encoder port interfaces

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Encoder errors
#[derive(Debug, Clone, Error)]
pub enum EncoderError {
    #[error("Failed to load encoder: {0}")]
    LoadFailed(String),

    #[error("Encoder tool not found: {0}")]
    ToolNotFound(String),

    #[error("Encoder is missing entry point: {0}")]
    MissingEntryPoint(String),

    #[error("Encoder did not become ready")]
    NotReady,

    #[error("Encoder refused to create a session: {0}")]
    SessionRefused(String),

    #[error("FLAC config error: {0}")]
    Config(String),

    #[error("FLAC encoding failed: {0}")]
    Encode(String),

    #[error("FLAC verification failed: {0}")]
    Verify(String),
}

/// Parameters of one encoder session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderSettings {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    /// 0 (fastest) to 8 (smallest)
    pub compression_level: u8,
    /// Frames the caller intends to submit; 0 if unknown
    pub total_samples: u64,
    pub verify: bool,
}

/// Receives every chunk of encoded output, in order
pub type ChunkCallback = Box<dyn FnMut(&[u8]) + Send>;

/// One encoding run. Dropping the session releases it.
pub trait EncoderSession: Send {
    /// Submit frame-interleaved 16-bit samples.
    fn process(&mut self, interleaved: &[i16]) -> Result<(), EncoderError>;

    /// Flush everything; all output has reached the callback on return.
    fn finish(&mut self) -> Result<(), EncoderError>;
}

/// A loaded lossless encoder backend
pub trait LosslessEncoder: Send + Sync {
    fn name(&self) -> &str;

    /// Explicit readiness signal; `None` when the backend has none.
    fn readiness(&self) -> Option<bool> {
        None
    }

    /// Whether every operation the conversion needs is present.
    fn has_entry_points(&self) -> bool {
        true
    }

    fn create_session(
        &self,
        settings: &EncoderSettings,
        on_chunk: ChunkCallback,
    ) -> Result<Box<dyn EncoderSession>, EncoderError>;
}

/// Somewhere an encoder can be loaded from
#[async_trait]
pub trait EncoderSource: Send + Sync {
    fn name(&self) -> &str;

    async fn load(&self) -> Result<Arc<dyn LosslessEncoder>, EncoderError>;
}
