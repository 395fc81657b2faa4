//! Lossless encoder infrastructure module
//!
//! The in-process flacenc encoder is the primary source; the external `flac`
//! tool is the fallback.

mod builtin;
mod flac_cli;
mod sources;
mod verify;

pub use builtin::FlacencEncoder;
pub use flac_cli::FlacCliEncoder;
pub use sources::{
    source_by_name, sources_from_names, BuiltinSource, FlacCliSource, BUILTIN_SOURCE,
    FLAC_CLI_SOURCE, KNOWN_SOURCES,
};
pub use verify::{decode_flac, DecodedFlac};
