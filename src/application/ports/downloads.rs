//! Download staging port interface

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::media::{Artifact, ContainerType};

/// Download errors
#[derive(Debug, Clone, Error)]
pub enum DownloadError {
    #[error("Failed to stage {filename}: {message}")]
    PublishFailed { filename: String, message: String },

    #[error("Failed to save {filename}: {message}")]
    SaveFailed { filename: String, message: String },

    #[error("Download handle for {0} was revoked")]
    Revoked(String),

    #[error("Failed to revoke {filename}: {message}")]
    RevokeFailed { filename: String, message: String },
}

/// A staged artifact the user can save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadHandle {
    pub id: u64,
    /// Name the file is offered under
    pub filename: String,
    pub container: ContainerType,
    pub size_bytes: usize,
    /// Where the staged bytes live
    pub location: PathBuf,
}

/// Port for staging artifacts until they are saved or revoked
#[async_trait]
pub trait DownloadRegistry: Send + Sync {
    async fn publish(
        &self,
        artifact: &Artifact,
        filename: &str,
    ) -> Result<DownloadHandle, DownloadError>;

    /// Copy the staged file into `dir` under its offered name.
    async fn save(&self, handle: &DownloadHandle, dir: &Path) -> Result<PathBuf, DownloadError>;

    /// Release the staged file. Revoking twice is not an error.
    async fn revoke(&self, handle: &DownloadHandle) -> Result<(), DownloadError>;
}
