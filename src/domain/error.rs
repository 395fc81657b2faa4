//! Domain error types

use thiserror::Error;

/// Error when parsing a duration string
#[derive(Debug, Clone, Error)]
#[error("Invalid duration format: \"{input}\". Expected <number> followed by h, m or s (e.g., 30s, 1m, 1h2m30s)")]
pub struct DurationParseError {
    pub input: String,
}

/// Error when decoded PCM does not describe a usable signal
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PcmError {
    #[error("PCM must have at least one channel")]
    NoChannels,

    #[error("PCM sample rate must be greater than zero")]
    ZeroSampleRate,

    #[error("PCM channels have different lengths ({expected} vs {found} frames)")]
    RaggedChannels { expected: usize, found: usize },

    #[error("Interleaved PCM length {len} is not a multiple of {channels} channels")]
    PartialFrame { len: usize, channels: u16 },
}

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid config value for '{key}': {message}")]
    ValidationError { key: String, message: String },

    #[error("Config file already exists at: {0}")]
    AlreadyExists(String),
}
