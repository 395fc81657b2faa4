//! Recording domain module

mod buffer;
mod duration;
mod state;

pub use buffer::RecordingBuffer;
pub use duration::{Duration, DEFAULT_DURATION_SECS};
pub use state::{InvalidStateTransition, RecorderState, RecordingCycle};
