//! Video conversion infrastructure module

mod relabel;
mod remux;

pub use relabel::RelabelConverter;
pub use remux::FfmpegRemuxer;

use crate::application::ports::VideoConverter;
use crate::domain::config::VideoConversion;

/// Build the converter selected by configuration
pub fn create_converter(conversion: VideoConversion) -> Box<dyn VideoConverter> {
    match conversion {
        VideoConversion::Relabel => Box::new(RelabelConverter),
        VideoConversion::Remux => Box::new(FfmpegRemuxer::new()),
    }
}
