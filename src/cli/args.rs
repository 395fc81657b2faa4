//! CLI argument definitions using Clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::domain::config::AppConfig;

/// Dual Capture - record camera + microphone into an MP4 and a FLAC file
#[derive(Parser, Debug)]
#[command(name = "dual-capture")]
#[command(version)]
#[command(about = "Record camera and microphone into an MP4-labeled video and a FLAC-labeled audio file")]
#[command(long_about = None)]
pub struct Cli {
    /// Recording duration (e.g., 10s, 1m, 2m30s); Ctrl+C stops early
    #[arg(short = 'd', long, value_name = "TIME")]
    pub duration: Option<String>,

    /// Directory the finished files are saved into
    #[arg(short = 'o', long, value_name = "DIR", env = "DUAL_CAPTURE_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Base file name (default: recording-<unix-ms>)
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Camera device
    #[arg(long, value_name = "DEVICE")]
    pub video_device: Option<String>,

    /// Microphone device
    #[arg(long, value_name = "DEVICE")]
    pub audio_device: Option<String>,

    /// Lossless encoder source to try, in order (builtin, flac-cli)
    #[arg(long = "encoder-source", value_name = "SOURCE", action = ArgAction::Append)]
    pub encoder_sources: Vec<String>,

    /// Remux the video into a real MP4 container instead of relabeling it
    #[arg(long)]
    pub remux: bool,

    /// Show a live preview window
    #[arg(long)]
    pub preview: bool,

    /// Show desktop notifications
    #[arg(short = 'n', long)]
    pub notify: bool,

    /// Print a JSON manifest of the saved files
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Options given on the command line, as a config layer
    pub fn config_overrides(&self) -> AppConfig {
        AppConfig {
            duration: self.duration.clone(),
            output_dir: self
                .output_dir
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            name: self.name.clone(),
            video_device: self.video_device.clone(),
            audio_device: self.audio_device.clone(),
            encoder_sources: (!self.encoder_sources.is_empty())
                .then(|| self.encoder_sources.clone()),
            encoder_settle_ms: None,
            compression_level: None,
            video_conversion: self.remux.then(|| "remux".to_string()),
            preview: self.preview.then_some(true),
            notify: self.notify.then_some(true),
        }
    }
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show negotiated container types and encoder availability
    Probe,
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "duration",
    "output_dir",
    "name",
    "video_device",
    "audio_device",
    "encoder_sources",
    "encoder_settle_ms",
    "compression_level",
    "video_conversion",
    "preview",
    "notify",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}
