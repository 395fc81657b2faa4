//! Audio decoder adapter using ffprobe and FFmpeg

use async_trait::async_trait;

use crate::application::ports::{AudioDecoder, DecodeError};
use crate::domain::media::{Artifact, DecodedAudio};
use crate::infrastructure::process::{run_piped, ToolError};

/// Decodes any container FFmpeg reads into 32-bit float PCM
#[derive(Debug, Clone, Default)]
pub struct FfmpegDecoder;

/// Rate and channel count of the first audio stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StreamFormat {
    sample_rate: u32,
    channels: u16,
}

impl FfmpegDecoder {
    pub fn new() -> Self {
        Self
    }

    fn probe_args() -> Vec<String> {
        [
            "-v",
            "error",
            "-select_streams",
            "a:0",
            "-show_entries",
            "stream=sample_rate,channels",
            "-of",
            "default=noprint_wrappers=1",
            "-i",
            "pipe:0",
        ]
        .map(String::from)
        .to_vec()
    }

    fn decode_args(format: StreamFormat) -> Vec<String> {
        vec![
            "-v".to_string(),
            "error".to_string(),
            "-i".to_string(),
            "pipe:0".to_string(),
            "-vn".to_string(),
            "-ac".to_string(),
            format.channels.to_string(),
            "-ar".to_string(),
            format.sample_rate.to_string(),
            "-f".to_string(),
            "f32le".to_string(),
            "-acodec".to_string(),
            "pcm_f32le".to_string(),
            "pipe:1".to_string(),
        ]
    }
}

/// Parse ffprobe `key=value` lines
fn parse_probe(output: &str) -> Option<StreamFormat> {
    let mut sample_rate = None;
    let mut channels = None;
    for line in output.lines() {
        match line.trim().split_once('=') {
            Some(("sample_rate", value)) => sample_rate = value.parse().ok(),
            Some(("channels", value)) => channels = value.parse().ok(),
            _ => {}
        }
    }
    Some(StreamFormat {
        sample_rate: sample_rate.filter(|r| *r > 0)?,
        channels: channels.filter(|c| *c > 0)?,
    })
}

fn map_tool_error(e: ToolError) -> DecodeError {
    match e {
        ToolError::NotFound(_) => DecodeError::FfmpegNotFound,
        other => DecodeError::Failed(other.to_string()),
    }
}

#[async_trait]
impl AudioDecoder for FfmpegDecoder {
    async fn decode(&self, artifact: &Artifact) -> Result<DecodedAudio, DecodeError> {
        if artifact.is_empty() {
            return Err(DecodeError::Empty);
        }

        let probe = run_piped("ffprobe", &Self::probe_args(), Some(artifact.data().to_vec()))
            .await
            .map_err(map_tool_error)?;
        let format = parse_probe(&String::from_utf8_lossy(&probe))
            .ok_or_else(|| DecodeError::NoAudioStream(artifact.container().to_string()))?;

        let raw = run_piped(
            "ffmpeg",
            &Self::decode_args(format),
            Some(artifact.data().to_vec()),
        )
        .await
        .map_err(map_tool_error)?;

        let samples: Vec<f32> = raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        tracing::debug!(
            rate = format.sample_rate,
            channels = format.channels,
            samples = samples.len(),
            "audio decoded"
        );

        DecodedAudio::from_interleaved(format.sample_rate, format.channels, &samples)
            .map_err(|e| DecodeError::Failed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::media::ContainerType;

    #[test]
    fn parses_probe_output() {
        let format = parse_probe("sample_rate=48000\nchannels=2\n").unwrap();
        assert_eq!(
            format,
            StreamFormat {
                sample_rate: 48_000,
                channels: 2
            }
        );
    }

    #[test]
    fn probe_without_audio_is_none() {
        assert!(parse_probe("").is_none());
        assert!(parse_probe("sample_rate=0\nchannels=2").is_none());
    }

    #[test]
    fn decode_args_keep_native_format() {
        let args = FfmpegDecoder::decode_args(StreamFormat {
            sample_rate: 44_100,
            channels: 1,
        });
        assert!(args.windows(2).any(|w| w[0] == "-ar" && w[1] == "44100"));
        assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
    }

    #[tokio::test]
    async fn empty_artifact_is_rejected() {
        let artifact = Artifact::new(Vec::new(), ContainerType::new("audio/webm"));
        assert!(matches!(
            FfmpegDecoder::new().decode(&artifact).await,
            Err(DecodeError::Empty)
        ));
    }
}
