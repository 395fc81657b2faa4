//! Chunked recorder port interfaces

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use super::capture::MediaStream;
use crate::domain::media::ContainerType;

/// Recording errors
#[derive(Debug, Clone, Error)]
pub enum RecordingError {
    #[error("Media stream not available")]
    StreamUnavailable,

    #[error("No audio track available in the media stream")]
    NoAudioTrack,

    #[error("Unsupported container type: {0}")]
    Unsupported(String),

    #[error("FFmpeg not found. Please install FFmpeg")]
    FfmpegNotFound,

    #[error("Failed to start recorder: {0}")]
    StartFailed(String),

    #[error("Failed to stop recorder: {0}")]
    StopFailed(String),
}

/// What a recorder reports while it runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderEvent {
    /// Bytes flushed since the previous chunk; may be empty
    Data(Vec<u8>),
    /// A non-fatal recorder error
    Error(String),
    /// No further events follow; sent after the final `Data`
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderStatus {
    Inactive,
    Recording,
}

/// One recorder bound to one stream and container type
#[async_trait]
pub trait ChunkRecorder: Send {
    /// Start recording, flushing a `Data` event every `timeslice`.
    async fn start(&mut self, timeslice: Duration) -> Result<(), RecordingError>;

    /// Stop recording. Remaining data is flushed, then `Stopped` is sent.
    async fn stop(&mut self) -> Result<(), RecordingError>;

    fn status(&self) -> RecorderStatus;

    fn container(&self) -> &ContainerType;
}

/// Port that builds recorders
pub trait RecorderFactory: Send + Sync {
    /// Build a recorder for `stream`. Events go to `events` until `Stopped`.
    fn create(
        &self,
        stream: &MediaStream,
        container: &ContainerType,
        events: UnboundedSender<RecorderEvent>,
    ) -> Result<Box<dyn ChunkRecorder>, RecordingError>;
}
