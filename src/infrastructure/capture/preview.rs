//! Live preview adapters

use std::process::{Child, Command, Stdio};
use std::sync::Mutex;

use crate::application::ports::{CaptureError, MediaStream, Preview, PreviewOptions};

/// Preview that shows nothing
#[derive(Debug, Default)]
pub struct NoopPreview;

impl Preview for NoopPreview {
    fn attach(&self, _stream: &MediaStream, _options: PreviewOptions) -> Result<(), CaptureError> {
        Ok(())
    }

    fn detach(&self) {}
}

/// Preview window rendered by `ffplay` reading the camera.
///
/// Many V4L2 drivers allow a single reader, so this can keep the recorder
/// from opening the camera.
#[derive(Debug, Default)]
pub struct FfplayPreview {
    child: Mutex<Option<Child>>,
}

impl FfplayPreview {
    pub fn new() -> Self {
        Self::default()
    }

    fn args(source: &str, options: PreviewOptions) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-window_title".to_string(),
            "dual-capture preview".to_string(),
        ];
        if options.muted {
            args.push("-an".to_string());
        }
        if !options.autoplay {
            args.push("-autoexit".to_string());
        }
        #[cfg(target_os = "linux")]
        args.extend(["-f".to_string(), "v4l2".to_string()]);
        args.extend(["-i".to_string(), source.to_string()]);
        args
    }
}

impl Preview for FfplayPreview {
    fn attach(&self, stream: &MediaStream, options: PreviewOptions) -> Result<(), CaptureError> {
        let Some(video) = stream.video_tracks().next() else {
            return Ok(());
        };
        self.detach();

        let child = Command::new("ffplay")
            .args(Self::args(video.source(), options))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CaptureError::Other(format!("ffplay: {}", e)))?;

        if let Ok(mut guard) = self.child.lock() {
            *guard = Some(child);
        }
        Ok(())
    }

    fn detach(&self) {
        let child = self.child.lock().ok().and_then(|mut guard| guard.take());
        if let Some(mut child) = child {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for FfplayPreview {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn muted_preview_drops_audio() {
        let args = FfplayPreview::args("/dev/video0", PreviewOptions::default());
        assert!(args.contains(&"-an".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("/dev/video0"));
    }

    #[test]
    fn detach_without_attach_is_harmless() {
        let preview = FfplayPreview::new();
        preview.detach();
        NoopPreview.detach();
    }
}
