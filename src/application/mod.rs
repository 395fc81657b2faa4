//! Application layer - Use cases and port interfaces
//!
//! Contains the capture workflow and the trait definitions
//! for external system interactions.

pub mod bootstrap;
pub mod dual_recorder;
pub mod ports;
pub mod post_process;
pub mod studio;

// Re-export use cases
pub use bootstrap::{BootstrapError, EncoderBootstrap};
pub use dual_recorder::{CollectedTrack, DualRecorder, TrackRole, TIMESLICE};
pub use post_process::{AUDIO_CONVERSION_WARNING, FALLBACK_CAVEAT, VIDEO_CONVERSION_WARNING};
pub use studio::{CaptureStudio, RecordingOutput, StudioAdapters, StudioOptions};
