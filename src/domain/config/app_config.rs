//! Application configuration value object

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::recording::Duration;

/// Default encoder sources, primary first
pub const DEFAULT_ENCODER_SOURCES: &[&str] = &["builtin", "flac-cli"];

/// Default time an encoder gets to report readiness after loading
pub const DEFAULT_ENCODER_SETTLE_MS: u64 = 100;

/// Mid-range FLAC compression level
pub const DEFAULT_COMPRESSION_LEVEL: u8 = 5;

/// Highest FLAC compression level
pub const MAX_COMPRESSION_LEVEL: u8 = 8;

#[cfg(target_os = "linux")]
const DEFAULT_VIDEO_DEVICE: &str = "/dev/video0";

#[cfg(not(target_os = "linux"))]
const DEFAULT_VIDEO_DEVICE: &str = "0";

const DEFAULT_AUDIO_DEVICE: &str = "default";

/// How the video recording is turned into the MP4-labeled file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoConversion {
    /// Copy the bytes and change the label only
    #[default]
    Relabel,
    /// Remux the streams into an MP4 container with FFmpeg
    Remux,
}

impl VideoConversion {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Relabel => "relabel",
            Self::Remux => "remux",
        }
    }
}

impl fmt::Display for VideoConversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoConversion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "relabel" => Ok(Self::Relabel),
            "remux" => Ok(Self::Remux),
            other => Err(format!(
                "Unknown video conversion \"{}\". Valid values: relabel, remux",
                other
            )),
        }
    }
}

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub duration: Option<String>,
    pub output_dir: Option<String>,
    pub name: Option<String>,
    pub video_device: Option<String>,
    pub audio_device: Option<String>,
    pub encoder_sources: Option<Vec<String>>,
    pub encoder_settle_ms: Option<u64>,
    pub compression_level: Option<u8>,
    pub video_conversion: Option<String>,
    pub preview: Option<bool>,
    pub notify: Option<bool>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            duration: Some(Duration::default_duration().to_string()),
            output_dir: Some(".".to_string()),
            name: None,
            video_device: Some(DEFAULT_VIDEO_DEVICE.to_string()),
            audio_device: Some(DEFAULT_AUDIO_DEVICE.to_string()),
            encoder_sources: Some(
                DEFAULT_ENCODER_SOURCES
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            ),
            encoder_settle_ms: Some(DEFAULT_ENCODER_SETTLE_MS),
            compression_level: Some(DEFAULT_COMPRESSION_LEVEL),
            video_conversion: Some(VideoConversion::default().to_string()),
            preview: Some(false),
            notify: Some(false),
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            duration: other.duration.or(self.duration),
            output_dir: other.output_dir.or(self.output_dir),
            name: other.name.or(self.name),
            video_device: other.video_device.or(self.video_device),
            audio_device: other.audio_device.or(self.audio_device),
            encoder_sources: other.encoder_sources.or(self.encoder_sources),
            encoder_settle_ms: other.encoder_settle_ms.or(self.encoder_settle_ms),
            compression_level: other.compression_level.or(self.compression_level),
            video_conversion: other.video_conversion.or(self.video_conversion),
            preview: other.preview.or(self.preview),
            notify: other.notify.or(self.notify),
        }
    }

    /// Get duration as parsed Duration, or default if not set/invalid
    pub fn duration_or_default(&self) -> Duration {
        self.duration
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Duration::default_duration)
    }

    pub fn output_dir_or_default(&self) -> PathBuf {
        PathBuf::from(self.output_dir.as_deref().unwrap_or("."))
    }

    pub fn video_device_or_default(&self) -> &str {
        self.video_device.as_deref().unwrap_or(DEFAULT_VIDEO_DEVICE)
    }

    pub fn audio_device_or_default(&self) -> &str {
        self.audio_device.as_deref().unwrap_or(DEFAULT_AUDIO_DEVICE)
    }

    /// Encoder source names in load order
    pub fn encoder_sources_or_default(&self) -> Vec<String> {
        match &self.encoder_sources {
            Some(sources) if !sources.is_empty() => sources.clone(),
            _ => DEFAULT_ENCODER_SOURCES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    pub fn encoder_settle_ms_or_default(&self) -> u64 {
        self.encoder_settle_ms.unwrap_or(DEFAULT_ENCODER_SETTLE_MS)
    }

    /// Compression level, clamped to the valid 0-8 range
    pub fn compression_level_or_default(&self) -> u8 {
        self.compression_level
            .unwrap_or(DEFAULT_COMPRESSION_LEVEL)
            .min(MAX_COMPRESSION_LEVEL)
    }

    pub fn video_conversion_or_default(&self) -> VideoConversion {
        self.video_conversion
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    pub fn preview_or_default(&self) -> bool {
        self.preview.unwrap_or(false)
    }

    pub fn notify_or_default(&self) -> bool {
        self.notify.unwrap_or(false)
    }
}
