//! Audio decoder port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::media::{Artifact, DecodedAudio};

/// Decoding errors
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    #[error("Nothing to decode")]
    Empty,

    #[error("FFmpeg not found. Please install FFmpeg")]
    FfmpegNotFound,

    #[error("No audio stream found in {0}")]
    NoAudioStream(String),

    #[error("Audio decoding failed: {0}")]
    Failed(String),
}

/// Port for turning a recorded container into PCM
#[async_trait]
pub trait AudioDecoder: Send + Sync {
    async fn decode(&self, artifact: &Artifact) -> Result<DecodedAudio, DecodeError>;
}
