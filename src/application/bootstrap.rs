//! Encoder bootstrap use case
//!
//! Loads the lossless encoder from the first source that works. Failure is
//! not fatal: callers treat it as "no encoder" and fall back to WAV.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use super::ports::{EncoderError, EncoderSource, LosslessEncoder};

/// How often readiness is polled during the settle delay
const READY_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Errors from the bootstrap
#[derive(Debug, Clone, Error)]
pub enum BootstrapError {
    #[error("No encoder sources configured")]
    NoSources,

    #[error("No encoder could be loaded ({})", .0.join("; "))]
    Unavailable(Vec<String>),
}

/// Tries encoder sources in order
pub struct EncoderBootstrap {
    sources: Vec<Arc<dyn EncoderSource>>,
    settle: Duration,
}

impl EncoderBootstrap {
    /// `settle` bounds how long a loaded encoder may take to report ready
    pub fn new(sources: Vec<Arc<dyn EncoderSource>>, settle: Duration) -> Self {
        Self { sources, settle }
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Resolve with the first ready encoder.
    pub async fn load(&self) -> Result<Arc<dyn LosslessEncoder>, BootstrapError> {
        if self.sources.is_empty() {
            return Err(BootstrapError::NoSources);
        }

        let mut failures = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            match self.try_source(source.as_ref()).await {
                Ok(encoder) => {
                    tracing::info!(source = source.name(), encoder = encoder.name(), "encoder loaded");
                    return Ok(encoder);
                }
                Err(e) => {
                    tracing::debug!(source = source.name(), "encoder source failed: {}", e);
                    failures.push(format!("{}: {}", source.name(), e));
                }
            }
        }

        Err(BootstrapError::Unavailable(failures))
    }

    async fn try_source(
        &self,
        source: &dyn EncoderSource,
    ) -> Result<Arc<dyn LosslessEncoder>, EncoderError> {
        let encoder = source.load().await?;
        wait_ready(encoder.as_ref(), self.settle).await?;
        if !encoder.has_entry_points() {
            return Err(EncoderError::MissingEntryPoint(encoder.name().to_string()));
        }
        Ok(encoder)
    }
}

/// Wait for an explicit ready signal until `settle` elapses.
///
/// A backend with no readiness signal is taken as ready once the delay has
/// passed; one still reporting not-ready at that point has failed.
async fn wait_ready(encoder: &dyn LosslessEncoder, settle: Duration) -> Result<(), EncoderError> {
    let deadline = Instant::now() + settle;
    loop {
        let now = Instant::now();
        match encoder.readiness() {
            Some(true) => return Ok(()),
            None if now >= deadline => return Ok(()),
            Some(false) if now >= deadline => return Err(EncoderError::NotReady),
            _ => {}
        }
        tokio::time::sleep(READY_POLL_INTERVAL.min(deadline - now)).await;
    }
}
