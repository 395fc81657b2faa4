//! Recording infrastructure module
//!
//! One FFmpeg process per recorder, streaming its container over stdout.

mod ffmpeg;

pub use ffmpeg::{FfmpegChunkRecorder, FfmpegRecorderFactory};
