//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the capture logic and the
//! devices, processes, and files it drives.

pub mod capture;
pub mod config;
pub mod converter;
pub mod decoder;
pub mod downloads;
pub mod encoder;
pub mod notifier;
pub mod recorder;

// Re-export common types
pub use capture::{
    CaptureConstraints, CaptureError, FacingMode, MediaDevices, MediaStream, MediaTrack, Preview,
    PreviewOptions, StreamToken, TrackKind,
};
pub use config::ConfigStore;
pub use converter::{ConversionError, VideoConverter};
pub use decoder::{AudioDecoder, DecodeError};
pub use downloads::{DownloadError, DownloadHandle, DownloadRegistry};
pub use encoder::{
    ChunkCallback, EncoderError, EncoderSession, EncoderSettings, EncoderSource, LosslessEncoder,
};
pub use notifier::{NotificationError, NotificationIcon, Notifier};
pub use recorder::{ChunkRecorder, RecorderEvent, RecorderFactory, RecorderStatus, RecordingError};
