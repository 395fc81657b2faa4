//! Capture devices backed by FFmpeg and cpal

use std::collections::HashSet;
use std::io::ErrorKind;
use std::sync::Arc;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait};

use super::formats::{muxer_for, parse_encoder_list};
use crate::application::ports::{
    CaptureConstraints, CaptureError, MediaDevices, MediaStream, MediaTrack, TrackKind,
};
use crate::domain::media::ContainerType;
use crate::infrastructure::process::run_piped;

/// Opens the camera and microphone FFmpeg will record from.
///
/// Which containers are supported depends on the encoders compiled into the
/// local FFmpeg, probed once up front.
pub struct FfmpegDevices {
    video_device: String,
    audio_device: String,
    encoders: HashSet<String>,
}

impl FfmpegDevices {
    /// Probe FFmpeg's encoders. A missing FFmpeg leaves every type unsupported.
    pub async fn probe(video_device: impl Into<String>, audio_device: impl Into<String>) -> Self {
        let args = vec!["-hide_banner".to_string(), "-encoders".to_string()];
        let encoders = match run_piped("ffmpeg", &args, None).await {
            Ok(out) => parse_encoder_list(&String::from_utf8_lossy(&out))
                .into_iter()
                .collect(),
            Err(e) => {
                tracing::warn!("could not list FFmpeg encoders: {}", e);
                HashSet::new()
            }
        };
        tracing::debug!(count = encoders.len(), "FFmpeg encoders probed");
        Self::with_encoders(video_device, audio_device, encoders)
    }

    /// Build with a known encoder set
    pub fn with_encoders(
        video_device: impl Into<String>,
        audio_device: impl Into<String>,
        encoders: HashSet<String>,
    ) -> Self {
        Self {
            video_device: video_device.into(),
            audio_device: audio_device.into(),
            encoders,
        }
    }

    pub fn video_device(&self) -> &str {
        &self.video_device
    }

    pub fn audio_device(&self) -> &str {
        &self.audio_device
    }

    async fn open_camera(&self) -> Result<MediaTrack, CaptureError> {
        #[cfg(target_os = "linux")]
        {
            tokio::fs::File::open(&self.video_device)
                .await
                .map_err(|e| classify_io(&self.video_device, e))?;
        }
        Ok(MediaTrack::new(
            TrackKind::Video,
            format!("camera {}", self.video_device),
            self.video_device.clone(),
        ))
    }

    async fn open_microphone(&self) -> Result<MediaTrack, CaptureError> {
        let wanted = self.audio_device.clone();
        let label = tokio::task::spawn_blocking(move || find_input_device(&wanted))
            .await
            .map_err(|e| CaptureError::Other(e.to_string()))??;
        Ok(MediaTrack::new(
            TrackKind::Audio,
            label,
            self.audio_device.clone(),
        ))
    }
}

fn classify_io(device: &str, e: std::io::Error) -> CaptureError {
    match e.kind() {
        ErrorKind::NotFound => CaptureError::NotFound(device.to_string()),
        ErrorKind::PermissionDenied => CaptureError::PermissionDenied(device.to_string()),
        _ => CaptureError::Other(format!("{}: {}", device, e)),
    }
}

/// Look up an input device by name and return its label
fn find_input_device(wanted: &str) -> Result<String, CaptureError> {
    let host = cpal::default_host();
    let device = if wanted == "default" {
        host.default_input_device()
    } else {
        host.input_devices()
            .map_err(|e| CaptureError::Other(e.to_string()))?
            .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
    };

    let device = device.ok_or_else(|| CaptureError::NotFound(format!("microphone {}", wanted)))?;
    Ok(device.name().unwrap_or_else(|_| wanted.to_string()))
}

#[async_trait]
impl MediaDevices for FfmpegDevices {
    fn is_type_supported(&self, container: &ContainerType) -> bool {
        muxer_for(container)
            .map(|spec| spec.encoders().all(|enc| self.encoders.contains(enc)))
            .unwrap_or(false)
    }

    async fn get_user_media(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<MediaStream, CaptureError> {
        tracing::debug!(facing = ?constraints.facing_mode, "opening capture devices");
        let mut tracks = Vec::new();
        if constraints.video {
            tracks.push(Arc::new(self.open_camera().await?));
        }
        if constraints.audio {
            tracks.push(Arc::new(self.open_microphone().await?));
        }
        if tracks.is_empty() {
            return Err(CaptureError::Other("no devices requested".into()));
        }
        Ok(MediaStream::new(tracks))
    }
}
