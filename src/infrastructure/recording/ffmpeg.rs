//! FFmpeg-based chunk recorder adapter
//!
//! Each recorder runs one FFmpeg process that writes its container to stdout.
//! A pump task accumulates the bytes and flushes them as a `Data` event once
//! per timeslice.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::application::ports::{
    ChunkRecorder, MediaStream, RecorderEvent, RecorderFactory, RecorderStatus, RecordingError,
};
use crate::domain::media::ContainerType;
use crate::infrastructure::capture::formats::{input_args, muxer_for};

const READ_BUF_SIZE: usize = 64 * 1024;

/// FFmpeg's exit code after it handles SIGINT
#[cfg(unix)]
const INTERRUPTED_EXIT_CODE: i32 = 255;

/// Builds one FFmpeg recorder per stream
#[derive(Debug, Clone, Default)]
pub struct FfmpegRecorderFactory;

impl FfmpegRecorderFactory {
    pub fn new() -> Self {
        Self
    }

    /// Full FFmpeg argument list for recording `stream` as `container`
    pub fn build_ffmpeg_args(
        stream: &MediaStream,
        container: &ContainerType,
    ) -> Result<Vec<String>, RecordingError> {
        let spec =
            muxer_for(container).ok_or_else(|| RecordingError::Unsupported(container.to_string()))?;
        let video = stream.video_tracks().next().map(|t| t.source().to_string());
        let audio = stream.audio_tracks().next().map(|t| t.source().to_string());
        if video.is_none() && audio.is_none() {
            return Err(RecordingError::StreamUnavailable);
        }

        let mut args = vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
        ];
        args.extend(input_args(video.as_deref(), audio.as_deref()));
        args.extend(spec.output_args(video.is_some()));
        args.push("pipe:1".to_string());
        Ok(args)
    }
}

impl RecorderFactory for FfmpegRecorderFactory {
    fn create(
        &self,
        stream: &MediaStream,
        container: &ContainerType,
        events: UnboundedSender<RecorderEvent>,
    ) -> Result<Box<dyn ChunkRecorder>, RecordingError> {
        let args = Self::build_ffmpeg_args(stream, container)?;
        Ok(Box::new(FfmpegChunkRecorder {
            args,
            container: container.clone(),
            events: Some(events),
            child: None,
            pump: None,
        }))
    }
}

/// One FFmpeg process flushing chunks to an event channel
pub struct FfmpegChunkRecorder {
    args: Vec<String>,
    container: ContainerType,
    /// Handed to the pump task on start
    events: Option<UnboundedSender<RecorderEvent>>,
    child: Option<Child>,
    pump: Option<JoinHandle<()>>,
}

impl FfmpegChunkRecorder {
    fn spawn_ffmpeg(args: &[String]) -> Result<Child, RecordingError> {
        Command::new("ffmpeg")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RecordingError::FfmpegNotFound
                } else {
                    RecordingError::StartFailed(e.to_string())
                }
            })
    }

    /// Ask FFmpeg to finalize the container and exit
    #[cfg(unix)]
    fn interrupt(child: &mut Child) -> Result<(), RecordingError> {
        if let Some(id) = child.id() {
            signal::kill(Pid::from_raw(id as i32), Signal::SIGINT)
                .map_err(|e| RecordingError::StopFailed(format!("Signal failed: {}", e)))?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn interrupt(child: &mut Child) -> Result<(), RecordingError> {
        child
            .start_kill()
            .map_err(|e| RecordingError::StopFailed(e.to_string()))
    }
}

#[async_trait]
impl ChunkRecorder for FfmpegChunkRecorder {
    async fn start(&mut self, timeslice: Duration) -> Result<(), RecordingError> {
        if self.child.is_some() {
            return Err(RecordingError::StartFailed(
                "Recording already in progress".to_string(),
            ));
        }
        let events = self.events.take().ok_or_else(|| {
            RecordingError::StartFailed("recorder cannot be restarted".to_string())
        })?;

        let mut child = Self::spawn_ffmpeg(&self.args)?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RecordingError::StartFailed("FFmpeg stdout unavailable".to_string()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr, events.clone()));
        }

        tracing::debug!(container = %self.container, pid = ?child.id(), "ffmpeg recorder started");
        self.pump = Some(tokio::spawn(pump(stdout, timeslice, events)));
        self.child = Some(child);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), RecordingError> {
        let mut child = self
            .child
            .take()
            .ok_or_else(|| RecordingError::StopFailed("No recording in progress".to_string()))?;

        Self::interrupt(&mut child)?;
        let status = child
            .wait()
            .await
            .map_err(|e| RecordingError::StopFailed(format!("FFmpeg failed: {}", e)))?;
        tracing::debug!(container = %self.container, %status, "ffmpeg recorder exited");

        // The pump sends the final chunk and `Stopped` once stdout closes
        if let Some(pump) = self.pump.take() {
            pump.await
                .map_err(|e| RecordingError::StopFailed(e.to_string()))?;
        }

        if !exited_cleanly(&status) {
            tracing::warn!(container = %self.container, %status, "ffmpeg recorder failed");
            return Err(RecordingError::StopFailed(format!(
                "FFmpeg ({}) failed with {}",
                self.container, status
            )));
        }
        Ok(())
    }

    fn status(&self) -> RecorderStatus {
        if self.child.is_some() {
            RecorderStatus::Recording
        } else {
            RecorderStatus::Inactive
        }
    }

    fn container(&self) -> &ContainerType {
        &self.container
    }
}

/// Success, or the exit FFmpeg takes when interrupted
#[cfg(unix)]
fn exited_cleanly(status: &ExitStatus) -> bool {
    match status.code() {
        Some(code) => code == 0 || code == INTERRUPTED_EXIT_CODE,
        // Terminated by the interrupt before FFmpeg installed its handler
        None => true,
    }
}

/// The process was killed, so its exit code says nothing
#[cfg(not(unix))]
fn exited_cleanly(_status: &ExitStatus) -> bool {
    true
}

/// Read stdout until EOF, flushing once per timeslice
async fn pump(mut stdout: ChildStdout, timeslice: Duration, events: UnboundedSender<RecorderEvent>) {
    let mut pending = Vec::new();
    let mut buf = vec![0u8; READ_BUF_SIZE];
    let mut ticker = interval(timeslice);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            read = stdout.read(&mut buf) => match read {
                Ok(0) => break,
                Ok(n) => pending.extend_from_slice(&buf[..n]),
                Err(e) => {
                    let _ = events.send(RecorderEvent::Error(e.to_string()));
                    break;
                }
            },
            _ = ticker.tick() => {
                let _ = events.send(RecorderEvent::Data(std::mem::take(&mut pending)));
            }
        }
    }

    let _ = events.send(RecorderEvent::Data(pending));
    let _ = events.send(RecorderEvent::Stopped);
}

async fn forward_stderr(stderr: ChildStderr, events: UnboundedSender<RecorderEvent>) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if !line.trim().is_empty() {
            let _ = events.send(RecorderEvent::Error(line));
        }
    }
}
