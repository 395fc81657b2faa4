//! Converter that only changes the MIME label

use async_trait::async_trait;

use crate::application::ports::{ConversionError, VideoConverter};
use crate::domain::media::{Artifact, ContainerType};

/// Relabels the recording as `video/mp4` without touching its bytes.
///
/// No transcoding happens: a WebM recording comes out as WebM data under an
/// MP4 label.
#[derive(Debug, Clone, Default)]
pub struct RelabelConverter;

#[async_trait]
impl VideoConverter for RelabelConverter {
    fn name(&self) -> &str {
        "relabel"
    }

    async fn convert(&self, artifact: &Artifact) -> Result<Artifact, ConversionError> {
        Ok(artifact.clone().relabel(ContainerType::mp4()))
    }
}
