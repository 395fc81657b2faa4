//! Download staging infrastructure module

mod staging;

pub use staging::StagingDownloads;
