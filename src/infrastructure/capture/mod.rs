//! Capture device infrastructure module
//!
//! Devices are opened through FFmpeg's platform input formats (v4l2/alsa,
//! avfoundation, dshow); the microphone is looked up with cpal.

mod ffmpeg_devices;
pub mod formats;
mod preview;

pub use ffmpeg_devices::FfmpegDevices;
pub use preview::{FfplayPreview, NoopPreview};

use crate::application::ports::Preview;

/// Build the preview selected by configuration
pub fn create_preview(enabled: bool) -> Box<dyn Preview> {
    if enabled {
        Box::new(FfplayPreview::new())
    } else {
        Box::new(NoopPreview)
    }
}
