//! CLI layer - Command-line interface
//!
//! Argument parsing, output formatting, Ctrl+C handling and the runners
//! behind each command.

pub mod app;
pub mod args;
pub mod config_cmd;
pub mod presenter;
pub mod signals;

// Re-export commonly used types
pub use app::{
    load_merged_config, run_probe, run_record, RecordOptions, EXIT_ERROR, EXIT_SUCCESS,
    EXIT_USAGE_ERROR,
};
pub use args::{Cli, Commands, ConfigAction};
pub use presenter::Presenter;
