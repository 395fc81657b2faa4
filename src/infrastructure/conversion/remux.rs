//! Converter that remuxes into a real MP4 container

use async_trait::async_trait;

use crate::application::ports::{ConversionError, VideoConverter};
use crate::domain::media::{Artifact, ContainerType};
use crate::infrastructure::process::{run_piped, ToolError};

/// Copies the recorded streams into fragmented MP4 with `ffmpeg -c copy`.
///
/// Fails for codecs MP4 cannot carry; the caller then keeps the original.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRemuxer;

impl FfmpegRemuxer {
    pub fn new() -> Self {
        Self
    }

    fn args() -> Vec<String> {
        [
            "-hide_banner",
            "-loglevel",
            "error",
            "-i",
            "pipe:0",
            "-c",
            "copy",
            "-movflags",
            "frag_keyframe+empty_moov+default_base_moof",
            "-f",
            "mp4",
            "pipe:1",
        ]
        .map(String::from)
        .to_vec()
    }
}

#[async_trait]
impl VideoConverter for FfmpegRemuxer {
    fn name(&self) -> &str {
        "remux"
    }

    async fn convert(&self, artifact: &Artifact) -> Result<Artifact, ConversionError> {
        let data = run_piped("ffmpeg", &Self::args(), Some(artifact.data().to_vec()))
            .await
            .map_err(|e| match e {
                ToolError::NotFound(_) => ConversionError::FfmpegNotFound,
                other => ConversionError::Failed(other.to_string()),
            })?;
        if data.is_empty() {
            return Err(ConversionError::Failed("remux produced no output".to_string()));
        }
        Ok(Artifact::new(data, ContainerType::mp4()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_copy_to_fragmented_mp4() {
        let args = FfmpegRemuxer::args();
        assert!(args.windows(2).any(|w| w[0] == "-c" && w[1] == "copy"));
        assert!(args.iter().any(|a| a.contains("empty_moov")));
        assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
    }
}
