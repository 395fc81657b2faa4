//! Video conversion port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::media::Artifact;

/// Conversion errors
#[derive(Debug, Clone, Error)]
pub enum ConversionError {
    #[error("FFmpeg not found. Please install FFmpeg")]
    FfmpegNotFound,

    #[error("Video conversion failed: {0}")]
    Failed(String),
}

/// Port for producing the MP4-labeled video artifact
#[async_trait]
pub trait VideoConverter: Send + Sync {
    fn name(&self) -> &str;

    async fn convert(&self, artifact: &Artifact) -> Result<Artifact, ConversionError>;
}
