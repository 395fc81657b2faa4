//! Media domain module

mod artifact;
pub mod container;
mod pcm;
pub mod wav;

pub use artifact::{human_size, Artifact};
pub use container::{negotiate, ContainerType, AUDIO_CANDIDATES, VIDEO_CANDIDATES};
pub use pcm::{quantize_sample, DecodedAudio};
pub use wav::{synthesize_wav, WAV_HEADER_LEN};
