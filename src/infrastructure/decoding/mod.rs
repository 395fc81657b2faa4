//! Audio decoding infrastructure module

mod ffmpeg;

pub use ffmpeg::FfmpegDecoder;
