//! Dual Capture - record camera and microphone into two files at once
//!
//! One capture session feeds two recorders: the full audio+video stream ends
//! up as an MP4-labeled video file, and an audio-only view of the same stream
//! is decoded to PCM and encoded to FLAC (or saved as WAV when no lossless
//! encoder loads).
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Container types, PCM/WAV handling, recording state, config and errors
//! - **Application**: Port traits, the dual recorder, post-processing and the capture studio
//! - **Infrastructure**: Adapters for FFmpeg, cpal, flacenc, the `flac` tool, notifications and the filesystem
//! - **CLI**: Argument parsing, the presenter and Ctrl+C handling

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
