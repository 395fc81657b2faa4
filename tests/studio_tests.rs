//! Capture studio integration tests
//!
//! Devices, recorders and the decoder are faked; downloads are staged on disk
//! and the encoder is the real in-process FLAC encoder.

use std::f32::consts::PI;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedSender;

use dual_capture::application::ports::{
    AudioDecoder, CaptureConstraints, CaptureError, ChunkRecorder, ConversionError, DecodeError,
    DownloadError, DownloadRegistry, EncoderSource, MediaDevices, MediaStream, MediaTrack,
    RecorderEvent, RecorderFactory, RecorderStatus, RecordingError, TrackKind, VideoConverter,
};
use dual_capture::application::{
    CaptureStudio, EncoderBootstrap, StudioAdapters, StudioOptions, FALLBACK_CAVEAT,
    VIDEO_CONVERSION_WARNING,
};
use dual_capture::domain::media::{quantize_sample, Artifact, ContainerType, DecodedAudio};
use dual_capture::domain::recording::RecorderState;
use dual_capture::infrastructure::{
    decode_flac, BuiltinSource, NoopNotifier, NoopPreview, RelabelConverter, StagingDownloads,
};

const SAMPLE_RATE: u32 = 48_000;
const SECONDS: usize = 3;

struct FakeDevices {
    supported: Vec<&'static str>,
    failure: Option<CaptureError>,
}

impl FakeDevices {
    fn webm() -> Self {
        Self {
            supported: vec!["video/webm", "audio/webm"],
            failure: None,
        }
    }
}

#[async_trait]
impl MediaDevices for FakeDevices {
    fn is_type_supported(&self, container: &ContainerType) -> bool {
        self.supported.contains(&container.essence())
    }

    async fn get_user_media(
        &self,
        _constraints: &CaptureConstraints,
    ) -> Result<MediaStream, CaptureError> {
        if let Some(e) = &self.failure {
            return Err(e.clone());
        }
        Ok(MediaStream::new(vec![
            Arc::new(MediaTrack::new(TrackKind::Video, "cam", "/dev/video0")),
            Arc::new(MediaTrack::new(TrackKind::Audio, "mic", "default")),
        ]))
    }
}

/// Flushes one chunk per recorded second when stopped.
///
/// A crashing recorder reports its error on start and flushes nothing.
struct FakeRecorder {
    container: ContainerType,
    events: UnboundedSender<RecorderEvent>,
    status: RecorderStatus,
    crash: Option<&'static str>,
}

#[async_trait]
impl ChunkRecorder for FakeRecorder {
    async fn start(&mut self, _timeslice: Duration) -> Result<(), RecordingError> {
        if let Some(error) = self.crash {
            let _ = self.events.send(RecorderEvent::Error(error.to_string()));
        }
        self.status = RecorderStatus::Recording;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), RecordingError> {
        if self.status == RecorderStatus::Inactive {
            return Ok(());
        }
        if self.crash.is_some() {
            let _ = self.events.send(RecorderEvent::Data(Vec::new()));
            let _ = self.events.send(RecorderEvent::Stopped);
            self.status = RecorderStatus::Inactive;
            return Ok(());
        }
        for second in 0..SECONDS {
            let chunk = format!("{}#{}|", self.container.essence(), second);
            let _ = self.events.send(RecorderEvent::Data(chunk.into_bytes()));
        }
        let _ = self.events.send(RecorderEvent::Stopped);
        self.status = RecorderStatus::Inactive;
        Ok(())
    }

    fn status(&self) -> RecorderStatus {
        self.status
    }

    fn container(&self) -> &ContainerType {
        &self.container
    }
}

#[derive(Default)]
struct FakeRecorders {
    crash: Option<&'static str>,
}

impl RecorderFactory for FakeRecorders {
    fn create(
        &self,
        _stream: &MediaStream,
        container: &ContainerType,
        events: UnboundedSender<RecorderEvent>,
    ) -> Result<Box<dyn ChunkRecorder>, RecordingError> {
        Ok(Box::new(FakeRecorder {
            container: container.clone(),
            events,
            status: RecorderStatus::Inactive,
            crash: self.crash,
        }))
    }
}

/// Decodes anything into a stereo 440 Hz tone
struct ToneDecoder {
    fail: bool,
    seen: Arc<Mutex<Vec<String>>>,
}

impl ToneDecoder {
    fn new() -> Self {
        Self {
            fail: false,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl AudioDecoder for ToneDecoder {
    async fn decode(&self, artifact: &Artifact) -> Result<DecodedAudio, DecodeError> {
        self.seen
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(artifact.data()).into_owned());
        if self.fail {
            return Err(DecodeError::Failed("corrupt stream".into()));
        }
        Ok(DecodedAudio::new(SAMPLE_RATE, vec![tone(), tone()]).unwrap())
    }
}

fn tone() -> Vec<f32> {
    (0..SAMPLE_RATE as usize * SECONDS)
        .map(|i| 0.25 * (2.0 * PI * 440.0 * i as f32 / SAMPLE_RATE as f32).sin())
        .collect()
}

struct BrokenConverter;

#[async_trait]
impl VideoConverter for BrokenConverter {
    fn name(&self) -> &str {
        "broken"
    }

    async fn convert(&self, _artifact: &Artifact) -> Result<Artifact, ConversionError> {
        Err(ConversionError::Failed("muxer exploded".into()))
    }
}

type TestStudio =
    CaptureStudio<FakeDevices, FakeRecorders, ToneDecoder, StagingDownloads, NoopNotifier>;

struct Harness {
    devices: FakeDevices,
    recorders: FakeRecorders,
    decoder: ToneDecoder,
    converter: Box<dyn VideoConverter>,
    sources: Vec<Arc<dyn EncoderSource>>,
}

impl Harness {
    fn new() -> Self {
        Self {
            devices: FakeDevices::webm(),
            recorders: FakeRecorders::default(),
            decoder: ToneDecoder::new(),
            converter: Box::new(RelabelConverter),
            sources: vec![Arc::new(BuiltinSource)],
        }
    }

    fn build(self, staging: &TempDir) -> TestStudio {
        let adapters = StudioAdapters {
            devices: self.devices,
            recorders: self.recorders,
            decoder: self.decoder,
            downloads: StagingDownloads::with_root(staging.path()),
            notifier: NoopNotifier,
            converter: self.converter,
            preview: Box::new(NoopPreview),
            bootstrap: EncoderBootstrap::new(self.sources, Duration::ZERO),
        };
        let options = StudioOptions {
            name: Some("take".to_string()),
            ..StudioOptions::default()
        };
        CaptureStudio::new(adapters, options)
    }
}

fn expected_chunks(mime: &str) -> Vec<u8> {
    (0..SECONDS)
        .map(|second| format!("{}#{}|", mime, second))
        .collect::<String>()
        .into_bytes()
}

#[tokio::test]
async fn records_mp4_labeled_video_and_flac_audio() {
    let staging = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let mut studio = Harness::new().build(&staging);

    studio.mount().await.unwrap();
    assert_eq!(studio.encoder_name(), Some("flacenc"));
    assert_eq!(studio.video_type().essence(), "video/webm");
    assert_eq!(studio.audio_type().essence(), "audio/webm");

    studio.start_recording().await.unwrap();
    assert_eq!(studio.state(), RecorderState::Recording);

    let output = studio.stop_recording().await.unwrap().unwrap();
    assert_eq!(studio.state(), RecorderState::Idle);
    assert!(output.warnings.is_empty(), "{:?}", output.warnings);
    assert!(!output.using_fallback_audio);
    assert!(output.caveat().is_none());
    assert!(studio.message().is_none());

    let video = output.video.as_ref().unwrap();
    assert_eq!(video.filename, "take.mp4");
    assert!(video.container.is_mp4());
    let video_path = studio.save(video, out.path()).await.unwrap();
    assert_eq!(std::fs::read(video_path).unwrap(), expected_chunks("video/webm"));

    let audio = output.audio.as_ref().unwrap();
    assert_eq!(audio.filename, "take.flac");
    assert_eq!(audio.container, ContainerType::flac());
    let audio_path = studio.save(audio, out.path()).await.unwrap();
    let flac = std::fs::read(audio_path).unwrap();
    assert!(flac.starts_with(b"fLaC"));
    assert_eq!(flac.len(), audio.size_bytes);

    let decoded = decode_flac(&flac).unwrap();
    assert_eq!(decoded.channels, 2);
    assert_eq!(decoded.sample_rate, SAMPLE_RATE);
    assert_eq!(decoded.frame_count(), SAMPLE_RATE as usize * SECONDS);
    let expected: Vec<i16> = tone()
        .into_iter()
        .flat_map(|s| [quantize_sample(s); 2])
        .collect();
    assert_eq!(decoded.samples, expected);

    studio.unmount().await;
}

#[tokio::test]
async fn only_the_audio_recording_is_decoded() {
    let staging = TempDir::new().unwrap();
    let harness = Harness::new();
    let seen = Arc::clone(&harness.decoder.seen);
    let mut studio = harness.build(&staging);

    studio.mount().await.unwrap();
    studio.start_recording().await.unwrap();
    studio.stop_recording().await.unwrap().unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].as_bytes(), expected_chunks("audio/webm").as_slice());
}

#[tokio::test]
async fn bootstrap_failure_falls_back_to_wav() {
    let staging = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let mut harness = Harness::new();
    harness.sources = Vec::new();
    let mut studio = harness.build(&staging);

    studio.mount().await.unwrap();
    assert!(studio.encoder_name().is_none());
    assert!(studio.message().is_none());

    studio.start_recording().await.unwrap();
    let output = studio.stop_recording().await.unwrap().unwrap();

    assert!(output.using_fallback_audio);
    assert!(studio.using_fallback_audio());
    assert_eq!(output.caveat(), Some(FALLBACK_CAVEAT));
    assert_eq!(studio.caveat(), Some(FALLBACK_CAVEAT));
    assert!(output.warnings.is_empty());

    let audio = output.audio.as_ref().unwrap();
    assert_eq!(audio.filename, "take.flac");
    assert_eq!(audio.container, ContainerType::wav());

    let path = studio.save(audio, out.path()).await.unwrap();
    let reader = hound::WavReader::open(&path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, SAMPLE_RATE);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.len() as usize, SAMPLE_RATE as usize * SECONDS * 2);
    assert_eq!(
        std::fs::metadata(&path).unwrap().len() as usize,
        44 + SAMPLE_RATE as usize * SECONDS * 2 * 2
    );
}

#[tokio::test]
async fn start_without_stream_reports_and_stays_idle() {
    let staging = TempDir::new().unwrap();
    let mut studio = Harness::new().build(&staging);

    let err = studio.start_recording().await.unwrap_err();
    assert!(matches!(err, RecordingError::StreamUnavailable));
    assert_eq!(studio.message(), Some("Media stream not available"));
    assert_eq!(studio.state(), RecorderState::Idle);
}

#[tokio::test]
async fn stopping_twice_is_a_no_op() {
    let staging = TempDir::new().unwrap();
    let mut studio = Harness::new().build(&staging);

    studio.mount().await.unwrap();
    studio.start_recording().await.unwrap();
    assert!(studio.stop_recording().await.unwrap().is_some());
    assert!(studio.stop_recording().await.unwrap().is_none());
    assert_eq!(studio.state(), RecorderState::Idle);
    assert!(studio.message().is_none());
}

#[tokio::test]
async fn mp4_recording_passes_through_unchanged() {
    let staging = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let mut harness = Harness::new();
    harness.devices.supported.push("video/mp4");
    harness.converter = Box::new(BrokenConverter);
    let mut studio = harness.build(&staging);

    studio.mount().await.unwrap();
    assert!(studio.video_type().is_mp4());
    studio.start_recording().await.unwrap();
    let output = studio.stop_recording().await.unwrap().unwrap();

    // The converter is never consulted, so its failure does not surface
    assert!(output.warnings.is_empty());
    let video = output.video.as_ref().unwrap();
    let path = studio.save(video, out.path()).await.unwrap();
    assert_eq!(std::fs::read(path).unwrap(), expected_chunks("video/mp4"));
}

#[tokio::test]
async fn conversion_failure_keeps_original_video() {
    let staging = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let mut harness = Harness::new();
    harness.converter = Box::new(BrokenConverter);
    let mut studio = harness.build(&staging);

    studio.mount().await.unwrap();
    studio.start_recording().await.unwrap();
    let output = studio.stop_recording().await.unwrap().unwrap();

    assert_eq!(output.warnings, vec![VIDEO_CONVERSION_WARNING.to_string()]);
    assert_eq!(studio.message(), Some(VIDEO_CONVERSION_WARNING));

    let video = output.video.as_ref().unwrap();
    assert_eq!(video.filename, "take.mp4");
    assert_eq!(video.container.essence(), "video/webm");
    let path = studio.save(video, out.path()).await.unwrap();
    assert_eq!(std::fs::read(path).unwrap(), expected_chunks("video/webm"));

    // Audio is unaffected
    assert!(output.audio.is_some());
    assert!(!output.using_fallback_audio);
}

#[tokio::test]
async fn decode_failure_keeps_video_only() {
    let staging = TempDir::new().unwrap();
    let mut harness = Harness::new();
    harness.decoder.fail = true;
    let mut studio = harness.build(&staging);

    studio.mount().await.unwrap();
    studio.start_recording().await.unwrap();
    let output = studio.stop_recording().await.unwrap().unwrap();

    assert!(output.video.is_some());
    assert!(output.audio.is_none());
    assert!(output.caveat().is_none());
    let message = studio.message().unwrap();
    assert!(message.starts_with("Audio conversion failed"), "{}", message);
    assert_eq!(studio.state(), RecorderState::Idle);
}

#[tokio::test]
async fn crashed_recorders_report_their_last_error() {
    let staging = TempDir::new().unwrap();
    let mut harness = Harness::new();
    harness.recorders.crash = Some("Input/output error");
    let seen = Arc::clone(&harness.decoder.seen);
    let mut studio = harness.build(&staging);

    studio.mount().await.unwrap();
    studio.start_recording().await.unwrap();
    let output = studio.stop_recording().await.unwrap().unwrap();

    assert_eq!(studio.state(), RecorderState::Idle);
    assert!(output.video.is_none());
    assert!(output.audio.is_none());
    assert_eq!(
        output.warnings,
        vec![
            "Video recorder produced no data: Input/output error".to_string(),
            "Audio recorder produced no data: Input/output error".to_string(),
        ]
    );
    assert_eq!(
        studio.message(),
        Some("Audio recorder produced no data: Input/output error")
    );
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn permission_denied_is_reported() {
    let staging = TempDir::new().unwrap();
    let mut harness = Harness::new();
    harness.devices.failure = Some(CaptureError::PermissionDenied("/dev/video0".into()));
    let mut studio = harness.build(&staging);

    let err = studio.mount().await.unwrap_err();
    assert!(matches!(err, CaptureError::PermissionDenied(_)));
    assert_eq!(
        studio.message(),
        Some("Camera/microphone permission denied. Please allow access and try again.")
    );
    assert!(!studio.is_mounted());

    let err = studio.start_recording().await.unwrap_err();
    assert!(matches!(err, RecordingError::StreamUnavailable));
}

#[tokio::test]
async fn missing_device_is_reported() {
    let staging = TempDir::new().unwrap();
    let mut harness = Harness::new();
    harness.devices.failure = Some(CaptureError::NotFound("default".into()));
    let mut studio = harness.build(&staging);

    assert!(studio.mount().await.is_err());
    assert_eq!(studio.message(), Some("No camera or microphone found."));
}

#[tokio::test]
async fn new_recording_revokes_previous_downloads() {
    let staging = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let mut studio = Harness::new().build(&staging);
    studio.mount().await.unwrap();

    studio.start_recording().await.unwrap();
    let first = studio.stop_recording().await.unwrap().unwrap();
    studio.start_recording().await.unwrap();
    let second = studio.stop_recording().await.unwrap().unwrap();

    let first_video = first.video.unwrap();
    let first_audio = first.audio.unwrap();
    assert!(!first_video.location.exists());
    assert!(!first_audio.location.exists());
    assert!(matches!(
        studio.save(&first_video, out.path()).await,
        Err(DownloadError::Revoked(_))
    ));

    let second_video = second.video.unwrap();
    assert_ne!(first_video.id, second_video.id);
    assert_eq!(studio.video_download(), Some(&second_video));
    assert!(studio.save(&second_video, out.path()).await.is_ok());
}

#[tokio::test]
async fn unmount_revokes_everything() {
    let staging = TempDir::new().unwrap();
    let mut studio = Harness::new().build(&staging);
    studio.mount().await.unwrap();
    studio.start_recording().await.unwrap();
    let output = studio.stop_recording().await.unwrap().unwrap();

    let stream_tracks: Vec<_> = studio.stream().unwrap().tracks().to_vec();
    studio.unmount().await;

    assert!(!studio.is_mounted());
    assert!(studio.video_download().is_none());
    assert!(studio.audio_download().is_none());
    assert!(!output.video.unwrap().location.exists());
    assert!(!output.audio.unwrap().location.exists());
    assert!(stream_tracks.iter().all(|t| !t.is_live()));
}

#[tokio::test]
async fn unmount_while_recording_discards_it() {
    let staging = TempDir::new().unwrap();
    let mut studio = Harness::new().build(&staging);
    studio.mount().await.unwrap();
    studio.start_recording().await.unwrap();

    studio.unmount().await;
    assert_eq!(studio.state(), RecorderState::Idle);
    assert!(studio.stop_recording().await.unwrap().is_none());
    assert!(studio.video_download().is_none());
}

#[tokio::test]
async fn staging_directory_is_removed_on_close() {
    let staging = TempDir::new().unwrap();
    let root = staging.path().join("session");
    let downloads = StagingDownloads::with_root(&root);
    let artifact = Artifact::new(b"data".to_vec(), ContainerType::mp4());

    downloads.publish(&artifact, "take.mp4").await.unwrap();
    assert!(root.exists());
    downloads.close().await;
    assert!(!root.exists());
}
