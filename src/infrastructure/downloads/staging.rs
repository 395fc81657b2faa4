//! Download registry that stages artifacts on disk

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::fs;

use crate::application::ports::{DownloadError, DownloadHandle, DownloadRegistry};
use crate::domain::media::Artifact;

/// Keeps each published artifact in a staging directory until it is saved
/// elsewhere or revoked.
pub struct StagingDownloads {
    root: PathBuf,
    next_id: AtomicU64,
}

impl StagingDownloads {
    /// Stage under a per-process directory in the system temp dir
    pub fn new() -> Self {
        Self::with_root(std::env::temp_dir().join(format!("dual-capture-{}", std::process::id())))
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Remove the staging directory and anything still in it
    pub async fn close(&self) {
        if let Err(e) = fs::remove_dir_all(&self.root).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!("could not remove staging dir: {}", e);
            }
        }
    }
}

impl Default for StagingDownloads {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep only the final path component so a name cannot escape a directory
fn safe_filename(filename: &str) -> String {
    Path::new(filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "download".to_string())
}

#[async_trait]
impl DownloadRegistry for StagingDownloads {
    async fn publish(
        &self,
        artifact: &Artifact,
        filename: &str,
    ) -> Result<DownloadHandle, DownloadError> {
        let filename = safe_filename(filename);
        let failed = |e: std::io::Error| DownloadError::PublishFailed {
            filename: filename.clone(),
            message: e.to_string(),
        };

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        fs::create_dir_all(&self.root).await.map_err(failed)?;
        let location = self.root.join(format!("{}-{}", id, filename));
        fs::write(&location, artifact.data()).await.map_err(failed)?;

        tracing::debug!(id, filename = %filename, bytes = artifact.size_bytes(), "artifact staged");
        Ok(DownloadHandle {
            id,
            filename,
            container: artifact.container().clone(),
            size_bytes: artifact.size_bytes(),
            location,
        })
    }

    async fn save(&self, handle: &DownloadHandle, dir: &Path) -> Result<PathBuf, DownloadError> {
        if !fs::try_exists(&handle.location).await.unwrap_or(false) {
            return Err(DownloadError::Revoked(handle.filename.clone()));
        }
        let failed = |e: std::io::Error| DownloadError::SaveFailed {
            filename: handle.filename.clone(),
            message: e.to_string(),
        };

        fs::create_dir_all(dir).await.map_err(failed)?;
        let target = dir.join(&handle.filename);
        fs::copy(&handle.location, &target).await.map_err(failed)?;
        Ok(target)
    }

    async fn revoke(&self, handle: &DownloadHandle) -> Result<(), DownloadError> {
        match fs::remove_file(&handle.location).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DownloadError::RevokeFailed {
                filename: handle.filename.clone(),
                message: e.to_string(),
            }),
        }
    }
}
