//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces,
//! integrating with FFmpeg, cpal, flacenc, the filesystem, etc.

pub mod capture;
pub mod config;
pub mod conversion;
pub mod decoding;
pub mod downloads;
pub mod encoding;
pub mod notification;
pub mod process;
pub mod recording;

// Re-export adapters
pub use capture::{create_preview, FfmpegDevices, FfplayPreview, NoopPreview};
pub use config::XdgConfigStore;
pub use conversion::{create_converter, FfmpegRemuxer, RelabelConverter};
pub use decoding::FfmpegDecoder;
pub use downloads::StagingDownloads;
pub use encoding::{
    decode_flac, sources_from_names, BuiltinSource, DecodedFlac, FlacCliSource, FlacencEncoder,
};
pub use notification::{create_notifier, NoopNotifier, NotifyRustNotifier};
pub use recording::FfmpegRecorderFactory;
