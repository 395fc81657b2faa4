//! App runners for recording and probing

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration as StdDuration;

use serde_json::json;
use tokio::time::Instant;

use crate::application::ports::{ConfigStore, DownloadHandle, MediaDevices, Notifier};
use crate::application::{
    CaptureStudio, EncoderBootstrap, RecordingOutput, StudioAdapters, StudioOptions,
};
use crate::domain::config::{AppConfig, VideoConversion};
use crate::domain::media::{human_size, negotiate, AUDIO_CANDIDATES, VIDEO_CANDIDATES};
use crate::domain::recording::Duration;
use crate::infrastructure::{
    create_converter, create_notifier, create_preview, sources_from_names, FfmpegDecoder,
    FfmpegDevices, FfmpegRecorderFactory, StagingDownloads, XdgConfigStore,
};

use super::presenter::Presenter;
use super::signals::ShutdownSignal;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// How often the progress line is redrawn
const PROGRESS_INTERVAL: StdDuration = StdDuration::from_millis(100);

type CliStudio = CaptureStudio<
    FfmpegDevices,
    FfmpegRecorderFactory,
    FfmpegDecoder,
    StagingDownloads,
    Box<dyn Notifier>,
>;

/// Resolved options for one recording run
#[derive(Debug, Clone)]
pub struct RecordOptions {
    pub duration: Duration,
    pub output_dir: PathBuf,
    pub video_device: String,
    pub audio_device: String,
    pub encoder_sources: Vec<String>,
    pub encoder_settle: StdDuration,
    pub video_conversion: VideoConversion,
    pub preview: bool,
    pub json: bool,
    pub studio: StudioOptions,
}

impl RecordOptions {
    /// Build from merged config; a malformed duration is a usage error
    pub fn from_config(config: &AppConfig, json: bool) -> Result<Self, String> {
        let duration = match config.duration.as_deref() {
            Some(s) => s
                .parse::<Duration>()
                .map_err(|e| format!("Invalid duration: {}", e))?,
            None => Duration::default_duration(),
        };
        if duration.as_millis() == 0 {
            return Err("Invalid duration: must be greater than zero".to_string());
        }

        Ok(Self {
            duration,
            output_dir: config.output_dir_or_default(),
            video_device: config.video_device_or_default().to_string(),
            audio_device: config.audio_device_or_default().to_string(),
            encoder_sources: config.encoder_sources_or_default(),
            encoder_settle: StdDuration::from_millis(config.encoder_settle_ms_or_default()),
            video_conversion: config.video_conversion_or_default(),
            preview: config.preview_or_default(),
            json,
            studio: StudioOptions::from_config(config),
        })
    }
}

async fn build_studio(options: &RecordOptions) -> CliStudio {
    let devices = FfmpegDevices::probe(&options.video_device, &options.audio_device).await;
    let bootstrap = EncoderBootstrap::new(
        sources_from_names(&options.encoder_sources),
        options.encoder_settle,
    );

    let adapters = StudioAdapters {
        devices,
        recorders: FfmpegRecorderFactory::new(),
        decoder: FfmpegDecoder::new(),
        downloads: StagingDownloads::new(),
        notifier: create_notifier(options.studio.notify),
        converter: create_converter(options.video_conversion),
        preview: create_preview(options.preview),
        bootstrap,
    };
    CaptureStudio::new(adapters, options.studio.clone())
}

/// Record until the duration elapses or Ctrl+C, then save both files
pub async fn run_record(options: RecordOptions) -> ExitCode {
    let mut presenter = Presenter::new();

    let shutdown = ShutdownSignal::new();
    if let Err(e) = shutdown.setup() {
        presenter.error(&format!("Failed to setup signal handler: {}", e));
        return ExitCode::from(EXIT_ERROR);
    }

    let mut studio = build_studio(&options).await;
    let code = record_session(&mut studio, &options, &shutdown, &mut presenter).await;

    studio.unmount().await;
    studio.downloads().close().await;
    ExitCode::from(code)
}

async fn record_session(
    studio: &mut CliStudio,
    options: &RecordOptions,
    shutdown: &ShutdownSignal,
    presenter: &mut Presenter,
) -> u8 {
    presenter.start_spinner("Opening camera and microphone...");
    if studio.mount().await.is_err() {
        presenter.spinner_fail(studio.message().unwrap_or("Device access failed"));
        return EXIT_ERROR;
    }
    if studio.encoder_name().is_none() {
        presenter.update_spinner("No FLAC encoder available, audio will be WAV");
    }

    if studio.start_recording().await.is_err() {
        presenter.spinner_fail(studio.message().unwrap_or("Failed to start recording"));
        return EXIT_ERROR;
    }

    let total_ms = options.duration.as_millis();
    let started = Instant::now();
    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    loop {
        ticker.tick().await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        presenter.update_recording_progress(
            elapsed_ms.min(total_ms),
            total_ms,
            studio.chunk_counts(),
        );
        if elapsed_ms >= total_ms {
            break;
        }
        if shutdown.is_shutdown() {
            tracing::info!(elapsed_ms, "stopped early");
            break;
        }
    }

    presenter.update_spinner("Processing...");
    let output = match studio.stop_recording().await {
        Ok(Some(output)) => output,
        Ok(None) => {
            presenter.spinner_fail("Recording was not active");
            return EXIT_ERROR;
        }
        Err(_) => {
            presenter.spinner_fail(studio.message().unwrap_or("Failed to stop recording"));
            return EXIT_ERROR;
        }
    };
    presenter.spinner_success("Recording complete");

    report_output(studio, &output, options, presenter).await
}

async fn report_output(
    studio: &CliStudio,
    output: &RecordingOutput,
    options: &RecordOptions,
    presenter: &Presenter,
) -> u8 {
    for warning in &output.warnings {
        presenter.warn(warning);
    }

    let mut saved = Vec::new();
    let mut failed = false;
    for (label, handle) in [("video", &output.video), ("audio", &output.audio)] {
        let Some(handle) = handle else { continue };
        match studio.save(handle, &options.output_dir).await {
            Ok(path) => {
                presenter.saved_file(label, &path.to_string_lossy(), &human_size(handle.size_bytes));
                if label == "audio" {
                    if let Some(caveat) = output.caveat() {
                        presenter.caveat(caveat);
                    }
                }
                saved.push((label, handle, path));
            }
            Err(e) => {
                presenter.error(&e.to_string());
                failed = true;
            }
        }
    }

    if options.json {
        presenter.output(&manifest(&saved, output).to_string());
    }

    if saved.is_empty() || failed {
        EXIT_ERROR
    } else {
        EXIT_SUCCESS
    }
}

/// JSON description of the saved files
fn manifest(saved: &[(&str, &DownloadHandle, PathBuf)], output: &RecordingOutput) -> serde_json::Value {
    let mut files = serde_json::Map::new();
    for (label, handle, path) in saved {
        files.insert(
            label.to_string(),
            json!({
                "path": path.to_string_lossy(),
                "filename": handle.filename,
                "container": handle.container.as_str(),
                "size_bytes": handle.size_bytes,
            }),
        );
    }
    json!({
        "video": files.remove("video"),
        "audio": files.remove("audio"),
        "using_fallback_audio": output.using_fallback_audio,
        "caveat": output.caveat(),
        "warnings": output.warnings,
    })
}

/// Print negotiated container types and which encoder sources load
pub async fn run_probe(config: &AppConfig) -> ExitCode {
    let presenter = Presenter::new();
    let devices =
        FfmpegDevices::probe(config.video_device_or_default(), config.audio_device_or_default())
            .await;

    let video = negotiate(VIDEO_CANDIDATES, |c| devices.is_type_supported(c));
    let audio = negotiate(AUDIO_CANDIDATES, |c| devices.is_type_supported(c));
    presenter.key_value("video_type", video.as_str());
    presenter.key_value("audio_type", audio.as_str());

    let settle = StdDuration::from_millis(config.encoder_settle_ms_or_default());
    let mut any_ready = false;
    for name in config.encoder_sources_or_default() {
        let bootstrap = EncoderBootstrap::new(sources_from_names(&[name.as_str()]), settle);
        let status = match bootstrap.load().await {
            Ok(encoder) => {
                any_ready = true;
                format!("ready ({})", encoder.name())
            }
            Err(e) => format!("unavailable: {}", e),
        };
        presenter.key_value(&format!("encoder.{}", name), &status);
    }
    if !any_ready {
        presenter.warn("No lossless encoder loads; audio will be saved as WAV");
    }

    ExitCode::from(EXIT_SUCCESS)
}

/// Load and merge configuration: defaults < file < env/CLI
///
/// Environment values reach the CLI layer through clap's `env` attributes.
pub async fn load_merged_config(cli_config: AppConfig) -> AppConfig {
    let store = XdgConfigStore::new();
    let file_config = store.load_or_empty().await;

    AppConfig::defaults().merge(file_config).merge(cli_config)
}
