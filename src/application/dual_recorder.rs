//! Dual recorder orchestration
//!
//! Two independent recorders run off one capture session: one over the whole
//! stream (video + audio) and one over a stream holding only the first audio
//! track. Each owns its buffer; a collector task appends that recorder's
//! chunks and hands the buffer back once the recorder reports `Stopped`.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;

use super::ports::{
    ChunkRecorder, MediaStream, RecorderEvent, RecorderFactory, RecorderStatus, RecordingError,
};
use crate::domain::media::ContainerType;
use crate::domain::recording::{RecorderState, RecordingBuffer, RecordingCycle};

/// Flush period of both recorders
pub const TIMESLICE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackRole {
    /// Whole stream, video container
    Full,
    /// First audio track only, audio container
    AudioOnly,
}

impl fmt::Display for TrackRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("video"),
            Self::AudioOnly => f.write_str("audio"),
        }
    }
}

/// One recorder plus the task collecting its chunks
pub struct TrackRecorder {
    role: TrackRole,
    recorder: Box<dyn ChunkRecorder>,
    collector: JoinHandle<CollectedTrack>,
    chunks: Arc<AtomicUsize>,
}

impl TrackRecorder {
    fn create(
        role: TrackRole,
        stream: &MediaStream,
        container: &ContainerType,
        factory: &dyn RecorderFactory,
    ) -> Result<Self, RecordingError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let recorder = factory.create(stream, container, tx)?;
        let chunks = Arc::new(AtomicUsize::new(0));
        let collector = tokio::spawn(collect_chunks(role, rx, Arc::clone(&chunks)));

        Ok(Self {
            role,
            recorder,
            collector,
            chunks,
        })
    }

    /// Non-empty chunks collected so far
    pub fn chunk_count(&self) -> usize {
        self.chunks.load(Ordering::SeqCst)
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.status() == RecorderStatus::Recording
    }

    async fn start(&mut self) -> Result<(), RecordingError> {
        self.recorder.start(TIMESLICE).await
    }

    /// Stop only if the recorder says it is recording
    async fn stop(&mut self) -> Result<(), RecordingError> {
        if self.is_recording() {
            self.recorder.stop().await
        } else {
            Ok(())
        }
    }

    /// Wait for the last chunk and take the buffer.
    pub async fn finish(self) -> Result<CollectedTrack, RecordingError> {
        let Self {
            role,
            recorder,
            collector,
            ..
        } = self;
        // A recorder that never started still holds the event sender
        drop(recorder);
        collector
            .await
            .map_err(|e| RecordingError::StopFailed(format!("{} collector failed: {}", role, e)))
    }
}

/// What one recorder delivered before it stopped
#[derive(Debug)]
pub struct CollectedTrack {
    pub role: TrackRole,
    pub buffer: RecordingBuffer,
    /// Most recent error the recorder reported, if any
    pub last_error: Option<String>,
}

impl CollectedTrack {
    /// Warning for a recorder that delivered nothing, with its last error
    pub fn empty_warning(&self) -> Option<String> {
        if !self.buffer.is_empty() {
            return None;
        }
        let subject = match self.role {
            TrackRole::Full => "Video recorder",
            TrackRole::AudioOnly => "Audio recorder",
        };
        Some(match &self.last_error {
            Some(error) => format!("{} produced no data: {}", subject, error),
            None => format!("{} produced no data", subject),
        })
    }
}

async fn collect_chunks(
    role: TrackRole,
    mut events: UnboundedReceiver<RecorderEvent>,
    counter: Arc<AtomicUsize>,
) -> CollectedTrack {
    let mut buffer = RecordingBuffer::new();
    let mut last_error = None;
    while let Some(event) = events.recv().await {
        match event {
            RecorderEvent::Data(chunk) => {
                let len = chunk.len();
                if buffer.push(chunk) {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tracing::trace!(%role, bytes = len, "chunk appended");
                }
            }
            RecorderEvent::Error(message) => {
                tracing::warn!(%role, "recorder error: {}", message);
                last_error = Some(message);
            }
            RecorderEvent::Stopped => break,
        }
    }
    tracing::debug!(%role, chunks = buffer.len(), bytes = buffer.total_bytes(), "recorder drained");
    CollectedTrack {
        role,
        buffer,
        last_error,
    }
}

/// Recorders handed over by a successful stop, ready for post-processing
pub struct StoppedTracks {
    pub full: TrackRecorder,
    pub audio: TrackRecorder,
}

/// Drives both recorders through one recording cycle at a time
#[derive(Default)]
pub struct DualRecorder {
    cycle: RecordingCycle,
    tracks: Option<(TrackRecorder, TrackRecorder)>,
}

impl DualRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RecorderState {
        self.cycle.state()
    }

    /// Chunks collected so far by (full, audio)
    pub fn chunk_counts(&self) -> (usize, usize) {
        self.tracks
            .as_ref()
            .map_or((0, 0), |(full, audio)| (full.chunk_count(), audio.chunk_count()))
    }

    /// Build and start both recorders. On error nothing keeps running and
    /// the state stays idle.
    pub async fn start(
        &mut self,
        stream: Option<&MediaStream>,
        video_type: &ContainerType,
        audio_type: &ContainerType,
        factory: &dyn RecorderFactory,
    ) -> Result<(), RecordingError> {
        if !self.cycle.is_idle() {
            return Err(RecordingError::StartFailed(format!(
                "recorder is {}",
                self.cycle.state()
            )));
        }
        let stream = stream.ok_or(RecordingError::StreamUnavailable)?;
        let audio_track = stream
            .first_audio_track()
            .ok_or(RecordingError::NoAudioTrack)?;
        let audio_stream = stream.derive(vec![audio_track]);

        let mut full = TrackRecorder::create(TrackRole::Full, stream, video_type, factory)?;
        let mut audio =
            TrackRecorder::create(TrackRole::AudioOnly, &audio_stream, audio_type, factory)?;

        full.start().await?;
        if let Err(e) = audio.start().await {
            if let Err(stop_err) = full.stop().await {
                tracing::warn!("could not stop video recorder after failed start: {}", stop_err);
            }
            return Err(e);
        }

        self.cycle
            .begin()
            .map_err(|e| RecordingError::StartFailed(e.to_string()))?;
        tracing::info!(
            token = stream.token().value(),
            video = %video_type,
            audio = %audio_type,
            "recording started"
        );
        self.tracks = Some((full, audio));
        Ok(())
    }

    /// Stop both recorders.
    ///
    /// Returns `Ok(None)` when nothing is recording. On error the recorders are
    /// dropped and the state is forced back to idle.
    pub async fn stop(&mut self) -> Result<Option<StoppedTracks>, RecordingError> {
        if !self.cycle.is_recording() {
            return Ok(None);
        }
        let Some((mut full, mut audio)) = self.tracks.take() else {
            self.cycle.force_idle();
            return Ok(None);
        };

        self.cycle
            .request_stop()
            .map_err(|e| RecordingError::StopFailed(e.to_string()))?;

        let full_result = full.stop().await;
        let audio_result = audio.stop().await;

        if let Err(e) = full_result.and(audio_result) {
            self.cycle.force_idle();
            return Err(e);
        }
        Ok(Some(StoppedTracks { full, audio }))
    }

    /// Post-processing is done; back to idle
    pub fn complete(&mut self) {
        if self.cycle.finish().is_err() {
            self.cycle.force_idle();
        }
    }

    /// Stop whatever is running without producing anything
    pub async fn abort(&mut self) {
        if let Some((mut full, mut audio)) = self.tracks.take() {
            let _ = full.stop().await;
            let _ = audio.stop().await;
        }
        self.cycle.force_idle();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{MediaTrack, TrackKind};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::mpsc::UnboundedSender;

    /// Emits its chunks when stopped
    struct ScriptedRecorder {
        container: ContainerType,
        chunks: Vec<Vec<u8>>,
        events: UnboundedSender<RecorderEvent>,
        status: RecorderStatus,
        fail_start: bool,
        fail_stop: bool,
    }

    #[async_trait]
    impl ChunkRecorder for ScriptedRecorder {
        async fn start(&mut self, timeslice: Duration) -> Result<(), RecordingError> {
            assert_eq!(timeslice, TIMESLICE);
            if self.fail_start {
                return Err(RecordingError::StartFailed("device busy".into()));
            }
            self.status = RecorderStatus::Recording;
            Ok(())
        }

        async fn stop(&mut self) -> Result<(), RecordingError> {
            if self.fail_stop {
                return Err(RecordingError::StopFailed("wedged".into()));
            }
            for chunk in self.chunks.drain(..) {
                let _ = self.events.send(RecorderEvent::Data(chunk));
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
    struct ScriptedFactory {
        fail_audio_start: bool,
        fail_stop: bool,
        created: Mutex<Vec<(usize, String)>>,
    }

    impl RecorderFactory for ScriptedFactory {
        fn create(
            &self,
            stream: &MediaStream,
            container: &ContainerType,
            events: UnboundedSender<RecorderEvent>,
        ) -> Result<Box<dyn ChunkRecorder>, RecordingError> {
            self.created
                .lock()
                .unwrap()
                .push((stream.tracks().len(), container.to_string()));
            let is_audio = container.is_audio();
            Ok(Box::new(ScriptedRecorder {
                container: container.clone(),
                chunks: vec![vec![1; 4], Vec::new(), vec![2; 4], vec![3; 4]],
                events,
                status: RecorderStatus::Inactive,
                fail_start: is_audio && self.fail_audio_start,
                fail_stop: self.fail_stop,
            }))
        }
    }

    fn av_stream() -> MediaStream {
        MediaStream::new(vec![
            Arc::new(MediaTrack::new(TrackKind::Video, "cam", "/dev/video0")),
            Arc::new(MediaTrack::new(TrackKind::Audio, "mic", "default")),
        ])
    }

    fn types() -> (ContainerType, ContainerType) {
        (
            ContainerType::new("video/webm"),
            ContainerType::new("audio/ogg;codecs=opus"),
        )
    }

    #[tokio::test]
    async fn start_without_stream_fails() {
        let mut recorder = DualRecorder::new();
        let (video, audio) = types();
        let err = recorder
            .start(None, &video, &audio, &ScriptedFactory::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RecordingError::StreamUnavailable));
        assert_eq!(recorder.state(), RecorderState::Idle);
    }

    #[tokio::test]
    async fn start_without_audio_track_fails() {
        let stream = MediaStream::new(vec![Arc::new(MediaTrack::new(
            TrackKind::Video,
            "cam",
            "/dev/video0",
        ))]);
        let mut recorder = DualRecorder::new();
        let (video, audio) = types();
        let err = recorder
            .start(Some(&stream), &video, &audio, &ScriptedFactory::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RecordingError::NoAudioTrack));
        assert_eq!(recorder.state(), RecorderState::Idle);
    }

    #[tokio::test]
    async fn audio_recorder_gets_single_track_stream() {
        let stream = av_stream();
        let factory = ScriptedFactory::default();
        let mut recorder = DualRecorder::new();
        let (video, audio) = types();
        recorder
            .start(Some(&stream), &video, &audio, &factory)
            .await
            .unwrap();

        let created = factory.created.lock().unwrap().clone();
        assert_eq!(
            created,
            vec![
                (2, "video/webm".to_string()),
                (1, "audio/ogg;codecs=opus".to_string())
            ]
        );
        assert_eq!(recorder.state(), RecorderState::Recording);
    }

    #[tokio::test]
    async fn stop_hands_over_buffers_without_empty_chunks() {
        let stream = av_stream();
        let mut recorder = DualRecorder::new();
        let (video, audio) = types();
        recorder
            .start(Some(&stream), &video, &audio, &ScriptedFactory::default())
            .await
            .unwrap();

        let stopped = recorder.stop().await.unwrap().expect("tracks");
        assert_eq!(recorder.state(), RecorderState::Stopping);

        let full = stopped.full.finish().await.unwrap();
        let audio = stopped.audio.finish().await.unwrap();
        assert_eq!(full.role, TrackRole::Full);
        assert_eq!(full.buffer.len(), 3);
        assert_eq!(audio.role, TrackRole::AudioOnly);
        assert_eq!(audio.buffer.total_bytes(), 12);
        assert!(full.last_error.is_none());
        assert!(full.empty_warning().is_none());

        recorder.complete();
        assert_eq!(recorder.state(), RecorderState::Idle);
    }

    #[tokio::test]
    async fn collector_keeps_the_last_recorder_error() {
        let (tx, rx) = mpsc::unbounded_channel();
        let counter = Arc::new(AtomicUsize::new(0));
        let collector = tokio::spawn(collect_chunks(TrackRole::Full, rx, Arc::clone(&counter)));

        tx.send(RecorderEvent::Error("Broken pipe".into())).unwrap();
        tx.send(RecorderEvent::Error("Input/output error".into())).unwrap();
        tx.send(RecorderEvent::Data(Vec::new())).unwrap();
        tx.send(RecorderEvent::Stopped).unwrap();

        let collected = collector.await.unwrap();
        assert!(collected.buffer.is_empty());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(collected.last_error.as_deref(), Some("Input/output error"));
        assert_eq!(
            collected.empty_warning().as_deref(),
            Some("Video recorder produced no data: Input/output error")
        );
    }

    #[test]
    fn empty_warning_without_error_names_the_recorder() {
        let collected = CollectedTrack {
            role: TrackRole::AudioOnly,
            buffer: RecordingBuffer::new(),
            last_error: None,
        };
        assert_eq!(
            collected.empty_warning().as_deref(),
            Some("Audio recorder produced no data")
        );
    }

    #[tokio::test]
    async fn stop_when_idle_is_noop() {
        let mut recorder = DualRecorder::new();
        assert!(recorder.stop().await.unwrap().is_none());
        assert!(recorder.stop().await.unwrap().is_none());
        assert_eq!(recorder.state(), RecorderState::Idle);
    }

    #[tokio::test]
    async fn failed_audio_start_stays_idle() {
        let stream = av_stream();
        let factory = ScriptedFactory {
            fail_audio_start: true,
            ..Default::default()
        };
        let mut recorder = DualRecorder::new();
        let (video, audio) = types();
        let err = recorder
            .start(Some(&stream), &video, &audio, &factory)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("device busy"));
        assert_eq!(recorder.state(), RecorderState::Idle);
    }

    #[tokio::test]
    async fn failed_stop_forces_idle() {
        let stream = av_stream();
        let factory = ScriptedFactory {
            fail_stop: true,
            ..Default::default()
        };
        let mut recorder = DualRecorder::new();
        let (video, audio) = types();
        recorder
            .start(Some(&stream), &video, &audio, &factory)
            .await
            .unwrap();

        assert!(recorder.stop().await.is_err());
        assert_eq!(recorder.state(), RecorderState::Idle);
        assert!(recorder.stop().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn second_start_while_recording_is_rejected() {
        let stream = av_stream();
        let factory = ScriptedFactory::default();
        let mut recorder = DualRecorder::new();
        let (video, audio) = types();
        recorder
            .start(Some(&stream), &video, &audio, &factory)
            .await
            .unwrap();
        assert!(recorder
            .start(Some(&stream), &video, &audio, &factory)
            .await
            .is_err());
        assert_eq!(recorder.state(), RecorderState::Recording);
    }
}
