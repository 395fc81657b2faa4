//! Capture studio use case
//!
//! Owns one capture session at a time: negotiates container types, records
//! the stream twice (full and audio-only), post-processes both recordings and
//! stages the results for download.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use super::bootstrap::EncoderBootstrap;
use super::dual_recorder::{DualRecorder, StoppedTracks};
use super::ports::{
    AudioDecoder, CaptureConstraints, CaptureError, DownloadError, DownloadHandle,
    DownloadRegistry, LosslessEncoder, MediaDevices, MediaStream, NotificationIcon, Notifier,
    Preview, PreviewOptions, RecorderFactory, RecordingError, VideoConverter,
};
use super::post_process::{
    process_audio, process_video, AudioPipeline, FALLBACK_CAVEAT,
};
use crate::domain::config::AppConfig;
use crate::domain::media::{negotiate, ContainerType, AUDIO_CANDIDATES, VIDEO_CANDIDATES};
use crate::domain::recording::RecorderState;

const APP_NAME: &str = "Dual Capture";

/// Knobs the studio takes from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudioOptions {
    /// Base file name; `recording-<unix-ms>` when unset
    pub name: Option<String>,
    pub compression_level: u8,
    pub notify: bool,
}

impl Default for StudioOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::defaults())
    }
}

impl StudioOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            name: config.name.clone(),
            compression_level: config.compression_level_or_default(),
            notify: config.notify_or_default(),
        }
    }
}

/// Adapters the studio drives
pub struct StudioAdapters<D, F, X, R, N> {
    pub devices: D,
    pub recorders: F,
    pub decoder: X,
    pub downloads: R,
    pub notifier: N,
    pub converter: Box<dyn VideoConverter>,
    pub preview: Box<dyn Preview>,
    pub bootstrap: EncoderBootstrap,
}

/// What one completed recording produced
#[derive(Debug, Clone, Default)]
pub struct RecordingOutput {
    pub video: Option<DownloadHandle>,
    pub audio: Option<DownloadHandle>,
    /// The audio artifact holds WAV data under a `.flac` name
    pub using_fallback_audio: bool,
    /// Warnings raised while post-processing, in order
    pub warnings: Vec<String>,
}

impl RecordingOutput {
    pub fn caveat(&self) -> Option<&'static str> {
        (self.using_fallback_audio && self.audio.is_some()).then_some(FALLBACK_CAVEAT)
    }
}

/// The capture component
pub struct CaptureStudio<D, F, X, R, N>
where
    D: MediaDevices,
    F: RecorderFactory,
    X: AudioDecoder,
    R: DownloadRegistry,
    N: Notifier,
{
    devices: D,
    recorders: F,
    decoder: X,
    downloads: R,
    notifier: N,
    converter: Box<dyn VideoConverter>,
    preview: Box<dyn Preview>,
    bootstrap: EncoderBootstrap,
    options: StudioOptions,

    stream: Option<MediaStream>,
    video_type: ContainerType,
    audio_type: ContainerType,
    encoder: Option<Arc<dyn LosslessEncoder>>,
    recorder: DualRecorder,
    message: Option<String>,
    video_download: Option<DownloadHandle>,
    audio_download: Option<DownloadHandle>,
    using_fallback_audio: bool,
}

impl<D, F, X, R, N> CaptureStudio<D, F, X, R, N>
where
    D: MediaDevices,
    F: RecorderFactory,
    X: AudioDecoder,
    R: DownloadRegistry,
    N: Notifier,
{
    pub fn new(adapters: StudioAdapters<D, F, X, R, N>, options: StudioOptions) -> Self {
        let StudioAdapters {
            devices,
            recorders,
            decoder,
            downloads,
            notifier,
            converter,
            preview,
            bootstrap,
        } = adapters;

        Self {
            devices,
            recorders,
            decoder,
            downloads,
            notifier,
            converter,
            preview,
            bootstrap,
            options,
            stream: None,
            video_type: ContainerType::new(VIDEO_CANDIDATES[0]),
            audio_type: ContainerType::new(AUDIO_CANDIDATES[0]),
            encoder: None,
            recorder: DualRecorder::new(),
            message: None,
            video_download: None,
            audio_download: None,
            using_fallback_audio: false,
        }
    }

    /// Load the encoder, negotiate formats and open the devices.
    ///
    /// An encoder failure only disables FLAC; a device failure is reported
    /// through [`message`](Self::message) and returned.
    pub async fn mount(&mut self) -> Result<(), CaptureError> {
        if self.stream.is_some() {
            tracing::debug!("remounting, tearing down previous session");
            self.unmount().await;
        }
        self.message = None;

        self.encoder = match self.bootstrap.load().await {
            Ok(encoder) => Some(encoder),
            Err(e) => {
                tracing::warn!("lossless encoder unavailable, audio will be WAV: {}", e);
                None
            }
        };

        let devices = &self.devices;
        self.video_type = negotiate(VIDEO_CANDIDATES, |c| devices.is_type_supported(c));
        self.audio_type = negotiate(AUDIO_CANDIDATES, |c| devices.is_type_supported(c));
        tracing::debug!(video = %self.video_type, audio = %self.audio_type, "container types negotiated");

        let stream = match self
            .devices
            .get_user_media(&CaptureConstraints::default())
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!("device access failed: {}", e);
                self.message = Some(e.user_message());
                return Err(e);
            }
        };

        if let Err(e) = self.preview.attach(&stream, PreviewOptions::default()) {
            tracing::warn!("preview unavailable: {}", e);
        }
        let labels: Vec<&str> = stream.tracks().iter().map(|t| t.label()).collect();
        tracing::info!(
            token = stream.token().value(),
            tracks = ?labels,
            "capture session mounted"
        );
        self.stream = Some(stream);
        Ok(())
    }

    /// Start both recorders.
    pub async fn start_recording(&mut self) -> Result<(), RecordingError> {
        self.message = None;
        let started = self
            .recorder
            .start(
                self.stream.as_ref(),
                &self.video_type,
                &self.audio_type,
                &self.recorders,
            )
            .await;

        if let Err(e) = started {
            let message = match e {
                RecordingError::StreamUnavailable | RecordingError::NoAudioTrack => e.to_string(),
                ref other => format!("Failed to start recording: {}", other),
            };
            tracing::warn!("{}", message);
            self.message = Some(message);
            return Err(e);
        }

        self.notify("Recording...", NotificationIcon::Recording).await;
        Ok(())
    }

    /// Stop both recorders and post-process what they captured.
    ///
    /// `Ok(None)` when nothing was recording.
    pub async fn stop_recording(&mut self) -> Result<Option<RecordingOutput>, RecordingError> {
        let tracks = match self.recorder.stop().await {
            Ok(Some(tracks)) => tracks,
            Ok(None) => return Ok(None),
            Err(e) => {
                let message = format!("Failed to stop recording: {}", e);
                tracing::warn!("{}", message);
                self.message = Some(message.clone());
                self.notify(&message, NotificationIcon::Error).await;
                return Err(e);
            }
        };

        self.notify("Processing...", NotificationIcon::Processing).await;
        let output = self.post_process(tracks).await;
        self.recorder.complete();

        match &self.message {
            Some(warning) => {
                let warning = warning.clone();
                self.notify(&warning, NotificationIcon::Warning).await;
            }
            None => self.notify("Recording ready", NotificationIcon::Saved).await,
        }
        Ok(Some(output))
    }

    async fn post_process(&mut self, tracks: StoppedTracks) -> RecordingOutput {
        let StoppedTracks { full, audio } = tracks;
        let video_type = &self.video_type;
        let audio_type = &self.audio_type;
        let converter = self.converter.as_ref();
        let pipeline = AudioPipeline {
            decoder: &self.decoder,
            encoder: self.encoder.clone(),
            compression_level: self.options.compression_level,
        };

        let video_flow = async move {
            let collected = full.finish().await?;
            let empty = collected.empty_warning();
            let outcome = process_video(collected.buffer, video_type, converter).await;
            Ok::<_, RecordingError>((empty, outcome))
        };
        let audio_flow = async move {
            let collected = audio.finish().await.map_err(|e| e.to_string())?;
            let empty = collected.empty_warning();
            let outcome = process_audio(collected.buffer, audio_type, pipeline).await?;
            Ok::<_, String>((empty, outcome))
        };
        let (video, audio) = tokio::join!(video_flow, audio_flow);

        let base = self.base_name();
        let mut output = RecordingOutput::default();

        match video {
            Ok((empty, None)) => output.warnings.extend(empty),
            Ok((_, Some(outcome))) => {
                output.warnings.extend(outcome.warning.map(String::from));
                let filename = format!("{}.mp4", base);
                match self.downloads.publish(&outcome.artifact, &filename).await {
                    Ok(handle) => {
                        let previous = self.video_download.replace(handle.clone());
                        self.revoke_superseded(previous).await;
                        output.video = Some(handle);
                    }
                    Err(e) => output.warnings.push(e.to_string()),
                }
            }
            Err(e) => output.warnings.push(format!("Failed to stop recording: {}", e)),
        }

        match audio {
            Ok((empty, None)) => output.warnings.extend(empty),
            Ok((_, Some(outcome))) => {
                output.warnings.extend(outcome.warning.map(String::from));
                let filename = format!("{}.flac", base);
                match self.downloads.publish(&outcome.artifact, &filename).await {
                    Ok(handle) => {
                        let previous = self.audio_download.replace(handle.clone());
                        self.revoke_superseded(previous).await;
                        self.using_fallback_audio = outcome.fallback;
                        output.using_fallback_audio = outcome.fallback;
                        output.audio = Some(handle);
                    }
                    Err(e) => output.warnings.push(e.to_string()),
                }
            }
            Err(message) => output.warnings.push(message),
        }

        self.message = output.warnings.last().cloned();
        output
    }

    async fn revoke_superseded(&self, previous: Option<DownloadHandle>) {
        if let Some(handle) = previous {
            tracing::debug!(filename = %handle.filename, "revoking superseded download");
            if let Err(e) = self.downloads.revoke(&handle).await {
                tracing::warn!("{}", e);
            }
        }
    }

    /// Copy a staged artifact into `dir`.
    pub async fn save(&self, handle: &DownloadHandle, dir: &Path) -> Result<PathBuf, DownloadError> {
        self.downloads.save(handle, dir).await
    }

    /// Tear down the session: abort any recording, stop every track, detach
    /// the preview and revoke outstanding downloads.
    pub async fn unmount(&mut self) {
        if self.recorder.state() != RecorderState::Idle {
            tracing::info!("unmounting while recording, discarding the recording");
            self.recorder.abort().await;
        }
        if let Some(stream) = self.stream.take() {
            stream.stop_all();
            tracing::info!(token = stream.token().value(), "capture session closed");
        }
        self.preview.detach();

        for handle in [self.video_download.take(), self.audio_download.take()]
            .into_iter()
            .flatten()
        {
            if let Err(e) = self.downloads.revoke(&handle).await {
                tracing::warn!("{}", e);
            }
        }
        self.using_fallback_audio = false;
    }

    async fn notify(&self, message: &str, icon: NotificationIcon) {
        if self.options.notify {
            let _ = self.notifier.notify(APP_NAME, message, icon).await;
        }
    }

    fn base_name(&self) -> String {
        self.options.name.clone().unwrap_or_else(|| {
            let millis = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default();
            format!("recording-{}", millis)
        })
    }

    /// Registry the artifacts are staged in
    pub fn downloads(&self) -> &R {
        &self.downloads
    }

    /// Most recent failure or warning
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn state(&self) -> RecorderState {
        self.recorder.state()
    }

    pub fn is_mounted(&self) -> bool {
        self.stream.is_some()
    }

    pub fn stream(&self) -> Option<&MediaStream> {
        self.stream.as_ref()
    }

    pub fn video_type(&self) -> &ContainerType {
        &self.video_type
    }

    pub fn audio_type(&self) -> &ContainerType {
        &self.audio_type
    }

    /// Name of the loaded lossless encoder, if any
    pub fn encoder_name(&self) -> Option<&str> {
        self.encoder.as_deref().map(|e| e.name())
    }

    /// Chunks collected so far by (full, audio)
    pub fn chunk_counts(&self) -> (usize, usize) {
        self.recorder.chunk_counts()
    }

    pub fn video_download(&self) -> Option<&DownloadHandle> {
        self.video_download.as_ref()
    }

    pub fn audio_download(&self) -> Option<&DownloadHandle> {
        self.audio_download.as_ref()
    }

    pub fn using_fallback_audio(&self) -> bool {
        self.using_fallback_audio
    }

    /// Shown next to the audio download when it holds WAV data
    pub fn caveat(&self) -> Option<&'static str> {
        (self.using_fallback_audio && self.audio_download.is_some()).then_some(FALLBACK_CAVEAT)
    }
}
