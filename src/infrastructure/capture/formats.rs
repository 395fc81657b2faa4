//! FFmpeg muxer table and platform capture inputs

use crate::domain::media::ContainerType;

/// How FFmpeg produces one container type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuxerSpec {
    /// Value passed to `-f`
    pub format: &'static str,
    pub video_codec: Option<&'static str>,
    pub audio_codec: &'static str,
    /// Extra output options, appended before the output
    pub extra: &'static [&'static str],
}

impl MuxerSpec {
    /// Encoders this spec needs from the FFmpeg build
    pub fn encoders(&self) -> impl Iterator<Item = &'static str> {
        self.video_codec.into_iter().chain(Some(self.audio_codec))
    }

    /// Output arguments for a stream that does or does not carry video
    pub fn output_args(&self, with_video: bool) -> Vec<String> {
        let mut args = Vec::new();
        match (with_video, self.video_codec) {
            (true, Some(codec)) => {
                args.extend(["-c:v".to_string(), codec.to_string()]);
                args.extend(realtime_video_flags(codec).iter().map(|s| s.to_string()));
            }
            _ => args.push("-vn".to_string()),
        }
        args.extend(["-c:a".to_string(), self.audio_codec.to_string()]);
        args.extend(self.extra.iter().map(|s| s.to_string()));
        args.extend(["-f".to_string(), self.format.to_string()]);
        args
    }
}

fn realtime_video_flags(codec: &str) -> &'static [&'static str] {
    match codec {
        "libx264" => &["-preset", "ultrafast", "-tune", "zerolatency", "-pix_fmt", "yuv420p"],
        "libvpx-vp9" => &["-deadline", "realtime", "-cpu-used", "8", "-row-mt", "1"],
        "libvpx" => &["-deadline", "realtime", "-cpu-used", "8"],
        _ => &[],
    }
}

/// Look up how to produce `container`; `None` when no muxer is known.
pub fn muxer_for(container: &ContainerType) -> Option<MuxerSpec> {
    let codecs = container.codecs();
    let spec = match container.essence() {
        "video/mp4" => MuxerSpec {
            format: "mp4",
            video_codec: Some("libx264"),
            audio_codec: "aac",
            // Fragmented so the muxer never seeks on the pipe
            extra: &["-movflags", "frag_keyframe+empty_moov+default_base_moof"],
        },
        "video/webm" => MuxerSpec {
            format: "webm",
            video_codec: Some(if codecs.contains(&"vp8") {
                "libvpx"
            } else {
                "libvpx-vp9"
            }),
            audio_codec: "libopus",
            extra: &[],
        },
        "audio/webm" => MuxerSpec {
            format: "webm",
            video_codec: None,
            audio_codec: "libopus",
            extra: &[],
        },
        "audio/ogg" => MuxerSpec {
            format: "ogg",
            video_codec: None,
            audio_codec: "libopus",
            extra: &[],
        },
        "audio/wav" => MuxerSpec {
            format: "wav",
            video_codec: None,
            audio_codec: "pcm_s16le",
            extra: &[],
        },
        _ => return None,
    };
    Some(spec)
}

/// Parse `ffmpeg -encoders` output into encoder names.
pub fn parse_encoder_list(output: &str) -> Vec<String> {
    output
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("------"))
        .skip(1)
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
        .collect()
}

/// Input arguments capturing the given devices.
///
/// The microphone is opened through ALSA, the same host cpal enumerates, so
/// a device name accepted at lookup is valid here.
#[cfg(target_os = "linux")]
pub fn input_args(video: Option<&str>, audio: Option<&str>) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(device) = video {
        args.extend(["-f", "v4l2", "-i", device].map(String::from));
    }
    if let Some(device) = audio {
        args.extend(["-f", "alsa", "-i", device].map(String::from));
    }
    args
}

/// Input arguments capturing the given devices.
#[cfg(target_os = "macos")]
pub fn input_args(video: Option<&str>, audio: Option<&str>) -> Vec<String> {
    let audio = match audio {
        Some("default") => Some("0"),
        other => other,
    };
    let device = format!("{}:{}", video.unwrap_or("none"), audio.unwrap_or("none"));
    vec!["-f".into(), "avfoundation".into(), "-i".into(), device]
}

/// Input arguments capturing the given devices.
#[cfg(target_os = "windows")]
pub fn input_args(video: Option<&str>, audio: Option<&str>) -> Vec<String> {
    let device = match (video, audio) {
        (Some(v), Some(a)) => format!("video={}:audio={}", v, a),
        (Some(v), None) => format!("video={}", v),
        (None, Some(a)) => format!("audio={}", a),
        (None, None) => String::new(),
    };
    vec!["-f".into(), "dshow".into(), "-i".into(), device]
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub fn input_args(video: Option<&str>, audio: Option<&str>) -> Vec<String> {
    let mut args = Vec::new();
    for device in video.into_iter().chain(audio) {
        args.extend(["-i".to_string(), device.to_string()]);
    }
    args
}
