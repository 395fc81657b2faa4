//! Container type value object and format negotiation

use std::fmt;

/// MIME label every video artifact is offered under.
pub const MP4_VIDEO: &str = "video/mp4";

/// MIME label of a lossless audio artifact.
pub const FLAC_AUDIO: &str = "audio/flac";

/// MIME label of the uncompressed fallback audio artifact.
pub const WAV_AUDIO: &str = "audio/wav";

/// Video container candidates, most preferred first.
pub const VIDEO_CANDIDATES: &[&str] = &[
    MP4_VIDEO,
    "video/webm;codecs=vp9,opus",
    "video/webm;codecs=vp8,opus",
    "video/webm",
];

/// Audio-only container candidates, most preferred first.
pub const AUDIO_CANDIDATES: &[&str] = &[
    "audio/webm;codecs=opus",
    "audio/ogg;codecs=opus",
    "audio/webm",
    WAV_AUDIO,
];

/// A container MIME type, optionally carrying a `codecs` parameter.
///
/// Equality is on the full string: `video/webm` and `video/webm;codecs=vp9,opus`
/// are different recorder configurations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerType(String);

impl ContainerType {
    pub fn new(mime: impl Into<String>) -> Self {
        Self(mime.into().trim().to_string())
    }

    pub fn mp4() -> Self {
        Self::new(MP4_VIDEO)
    }

    pub fn flac() -> Self {
        Self::new(FLAC_AUDIO)
    }

    pub fn wav() -> Self {
        Self::new(WAV_AUDIO)
    }

    /// Full MIME string including parameters
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// MIME essence without parameters, e.g. `video/webm`
    pub fn essence(&self) -> &str {
        self.0.split(';').next().unwrap_or("").trim()
    }

    /// Codecs listed in the `codecs=` parameter, in order
    pub fn codecs(&self) -> Vec<&str> {
        self.0
            .split(';')
            .skip(1)
            .filter_map(|param| param.trim().strip_prefix("codecs="))
            .flat_map(|list| list.trim_matches('"').split(','))
            .map(str::trim)
            .filter(|codec| !codec.is_empty())
            .collect()
    }

    /// True when this is exactly the MP4 label (no parameters)
    pub fn is_mp4(&self) -> bool {
        self.0 == MP4_VIDEO
    }

    pub fn is_video(&self) -> bool {
        self.essence().starts_with("video/")
    }

    pub fn is_audio(&self) -> bool {
        self.essence().starts_with("audio/")
    }

    /// File extension matching the container essence
    pub fn extension(&self) -> &'static str {
        match self.essence() {
            "video/mp4" | "audio/mp4" => "mp4",
            "video/webm" | "audio/webm" => "webm",
            "audio/ogg" => "ogg",
            "audio/wav" | "audio/wave" | "audio/x-wav" => "wav",
            "audio/flac" => "flac",
            _ => "bin",
        }
    }
}

impl fmt::Display for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerType {
    fn from(mime: &str) -> Self {
        Self::new(mime)
    }
}

/// Pick the first candidate the runtime supports.
///
/// Falls back to the first candidate when none is reported as supported, so a
/// recorder is always configured with some type.
pub fn negotiate<F>(candidates: &[&str], is_supported: F) -> ContainerType
where
    F: Fn(&ContainerType) -> bool,
{
    candidates
        .iter()
        .map(|mime| ContainerType::new(*mime))
        .find(|container| is_supported(container))
        .or_else(|| candidates.first().map(|mime| ContainerType::new(*mime)))
        .unwrap_or_else(|| ContainerType::new("application/octet-stream"))
}
