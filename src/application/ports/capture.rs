//! Capture device port interfaces

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::media::ContainerType;

/// Device access errors, classified for the user
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Device not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

impl CaptureError {
    /// Message shown in the message area
    pub fn user_message(&self) -> String {
        match self {
            Self::PermissionDenied(_) => {
                "Camera/microphone permission denied. Please allow access and try again."
                    .to_string()
            }
            Self::NotFound(_) => "No camera or microphone found.".to_string(),
            Self::Other(detail) => format!("Could not access camera/microphone: {}", detail),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

/// One live capture track.
///
/// Tracks are shared by reference (`Arc`) between the session stream and any
/// stream derived from it; stopping a track stops it everywhere.
#[derive(Debug)]
pub struct MediaTrack {
    kind: TrackKind,
    label: String,
    source: String,
    live: AtomicBool,
}

impl MediaTrack {
    /// `source` is the adapter-specific device address (e.g. `/dev/video0`)
    pub fn new(kind: TrackKind, label: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            source: source.into(),
            live: AtomicBool::new(true),
        }
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }
}

static NEXT_STREAM_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Identifies the capture session a stream (or derived stream) belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamToken(u64);

impl StreamToken {
    fn next() -> Self {
        Self(NEXT_STREAM_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// A set of capture tracks
#[derive(Debug, Clone)]
pub struct MediaStream {
    token: StreamToken,
    tracks: Vec<Arc<MediaTrack>>,
}

impl MediaStream {
    /// New stream with a fresh session token
    pub fn new(tracks: Vec<Arc<MediaTrack>>) -> Self {
        Self {
            token: StreamToken::next(),
            tracks,
        }
    }

    /// Stream over a subset of tracks that keeps this stream's token
    pub fn derive(&self, tracks: Vec<Arc<MediaTrack>>) -> Self {
        Self {
            token: self.token,
            tracks,
        }
    }

    pub fn token(&self) -> StreamToken {
        self.token
    }

    pub fn tracks(&self) -> &[Arc<MediaTrack>] {
        &self.tracks
    }

    pub fn audio_tracks(&self) -> impl Iterator<Item = &Arc<MediaTrack>> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Audio)
    }

    pub fn video_tracks(&self) -> impl Iterator<Item = &Arc<MediaTrack>> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Video)
    }

    pub fn first_audio_track(&self) -> Option<Arc<MediaTrack>> {
        self.audio_tracks().next().cloned()
    }

    /// Stop every track
    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    #[default]
    User,
    Environment,
}

/// What to capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub audio: bool,
    pub video: bool,
    pub facing_mode: FacingMode,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
            facing_mode: FacingMode::User,
        }
    }
}

/// Port for capture devices
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Whether a recorder can produce this container type.
    fn is_type_supported(&self, container: &ContainerType) -> bool;

    /// Open the requested devices and return their tracks as one stream.
    async fn get_user_media(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<MediaStream, CaptureError>;
}

/// How the live preview is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewOptions {
    pub muted: bool,
    pub autoplay: bool,
    pub inline: bool,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            muted: true,
            autoplay: true,
            inline: true,
        }
    }
}

/// Port for the live preview surface
pub trait Preview: Send + Sync {
    fn attach(&self, stream: &MediaStream, options: PreviewOptions) -> Result<(), CaptureError>;

    fn detach(&self);
}
