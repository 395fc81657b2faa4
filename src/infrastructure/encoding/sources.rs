//! Places a lossless encoder can be loaded from

use std::sync::Arc;

use async_trait::async_trait;

use super::builtin::FlacencEncoder;
use super::flac_cli::FlacCliEncoder;
use crate::application::ports::{EncoderError, EncoderSource, LosslessEncoder};
use crate::infrastructure::process::{run_piped, ToolError};

pub const BUILTIN_SOURCE: &str = "builtin";
pub const FLAC_CLI_SOURCE: &str = "flac-cli";

/// Names accepted by [`source_by_name`]
pub const KNOWN_SOURCES: &[&str] = &[BUILTIN_SOURCE, FLAC_CLI_SOURCE];

/// The encoder compiled into this binary
#[derive(Debug, Default)]
pub struct BuiltinSource;

#[async_trait]
impl EncoderSource for BuiltinSource {
    fn name(&self) -> &str {
        BUILTIN_SOURCE
    }

    async fn load(&self) -> Result<Arc<dyn LosslessEncoder>, EncoderError> {
        Ok(Arc::new(FlacencEncoder::new()))
    }
}

/// The `flac` tool, if installed
#[derive(Debug)]
pub struct FlacCliSource {
    program: &'static str,
}

impl FlacCliSource {
    pub fn new() -> Self {
        Self { program: "flac" }
    }
}

impl Default for FlacCliSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EncoderSource for FlacCliSource {
    fn name(&self) -> &str {
        FLAC_CLI_SOURCE
    }

    async fn load(&self) -> Result<Arc<dyn LosslessEncoder>, EncoderError> {
        let version = run_piped(self.program, &["--version".to_string()], None)
            .await
            .map_err(|e| match e {
                ToolError::NotFound(program) => EncoderError::ToolNotFound(program.to_string()),
                other => EncoderError::LoadFailed(other.to_string()),
            })?;
        tracing::debug!(version = %String::from_utf8_lossy(&version).trim(), "flac tool found");
        Ok(Arc::new(FlacCliEncoder::with_program(self.program)))
    }
}

/// Resolve a configured source name
pub fn source_by_name(name: &str) -> Option<Arc<dyn EncoderSource>> {
    match name.trim() {
        BUILTIN_SOURCE => Some(Arc::new(BuiltinSource)),
        FLAC_CLI_SOURCE => Some(Arc::new(FlacCliSource::new())),
        _ => None,
    }
}

/// Resolve every configured source, skipping unknown names
pub fn sources_from_names<S: AsRef<str>>(names: &[S]) -> Vec<Arc<dyn EncoderSource>> {
    names
        .iter()
        .filter_map(|name| {
            let source = source_by_name(name.as_ref());
            if source.is_none() {
                tracing::warn!("unknown encoder source '{}', skipping", name.as_ref());
            }
            source
        })
        .collect()
}
