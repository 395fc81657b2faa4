//! Domain layer - Core capture logic
//!
//! Contains value objects, state machines, and domain errors.
//! This layer has no dependencies on devices, processes, or the filesystem.

pub mod config;
pub mod error;
pub mod media;
pub mod recording;

// Re-export common types
pub use config::AppConfig;
pub use error::*;
pub use media::{Artifact, ContainerType, DecodedAudio};
pub use recording::{Duration, RecorderState, RecordingBuffer, RecordingCycle};
