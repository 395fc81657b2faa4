//! Post-processing of finished recordings
//!
//! The full recording becomes an MP4-labeled artifact; the audio-only
//! recording becomes FLAC when an encoder is available and a WAV (still
//! offered as `.flac`) when it is not.

use std::sync::mpsc;
use std::sync::Arc;

use super::ports::{
    AudioDecoder, EncoderError, EncoderSettings, LosslessEncoder, VideoConverter,
};
use crate::domain::media::{synthesize_wav, Artifact, ContainerType, DecodedAudio};
use crate::domain::recording::RecordingBuffer;

pub const VIDEO_CONVERSION_WARNING: &str = "MP4 conversion failed, using original format";
pub const AUDIO_CONVERSION_WARNING: &str = "FLAC conversion failed, using WAV fallback";
pub const FALLBACK_CAVEAT: &str =
    "Audio was saved as uncompressed WAV data; the .flac name does not match its contents.";

/// Frames handed to the encoder per `process` call
const ENCODE_BLOCK_FRAMES: usize = 4096;

/// Result of the video flow
#[derive(Debug, Clone)]
pub struct VideoOutcome {
    pub artifact: Artifact,
    pub warning: Option<&'static str>,
}

/// Result of the audio flow
#[derive(Debug, Clone)]
pub struct AudioOutcome {
    pub artifact: Artifact,
    /// The artifact holds WAV data despite its FLAC name
    pub fallback: bool,
    pub warning: Option<&'static str>,
}

/// Everything the audio flow needs besides the buffer
pub struct AudioPipeline<'a> {
    pub decoder: &'a dyn AudioDecoder,
    pub encoder: Option<Arc<dyn LosslessEncoder>>,
    pub compression_level: u8,
}

/// Turn the full recording into an MP4-labeled artifact.
///
/// Returns `None` for an empty buffer. A conversion failure keeps the
/// original bytes and carries a warning.
pub async fn process_video(
    buffer: RecordingBuffer,
    video_type: &ContainerType,
    converter: &dyn VideoConverter,
) -> Option<VideoOutcome> {
    if buffer.is_empty() {
        tracing::warn!("video recorder produced no data");
        return None;
    }
    let original = buffer.into_artifact(video_type.clone());
    if video_type.is_mp4() {
        return Some(VideoOutcome {
            artifact: original,
            warning: None,
        });
    }

    match converter.convert(&original).await {
        Ok(artifact) => {
            tracing::debug!(converter = converter.name(), from = %video_type, "video converted");
            Some(VideoOutcome {
                artifact,
                warning: None,
            })
        }
        Err(e) => {
            tracing::warn!(converter = converter.name(), "video conversion failed: {}", e);
            Some(VideoOutcome {
                artifact: original,
                warning: Some(VIDEO_CONVERSION_WARNING),
            })
        }
    }
}

/// Turn the audio-only recording into a FLAC-named artifact.
///
/// `Ok(None)` for an empty buffer. `Err` only when the recording could not
/// be decoded at all, in which case there is nothing to offer.
pub async fn process_audio(
    buffer: RecordingBuffer,
    audio_type: &ContainerType,
    pipeline: AudioPipeline<'_>,
) -> Result<Option<AudioOutcome>, String> {
    if buffer.is_empty() {
        tracing::warn!("audio recorder produced no data");
        return Ok(None);
    }
    let recorded = buffer.into_artifact(audio_type.clone());

    let encoder = match pipeline.encoder {
        Some(encoder) if encoder.has_entry_points() => encoder,
        _ => {
            let pcm = decode(pipeline.decoder, &recorded).await?;
            tracing::debug!("no encoder available, writing WAV");
            return Ok(Some(wav_outcome(&pcm, None)));
        }
    };

    let pcm = decode(pipeline.decoder, &recorded).await?;
    let settings = EncoderSettings {
        sample_rate: pcm.sample_rate(),
        channels: pcm.channel_count(),
        bits_per_sample: 16,
        compression_level: pipeline.compression_level,
        total_samples: pcm.frame_count() as u64,
        verify: true,
    };

    let samples = pcm.interleave_i16();
    let encoded = tokio::task::spawn_blocking(move || {
        encode_interleaved(encoder.as_ref(), &settings, &samples)
    })
    .await
    .map_err(|e| EncoderError::Encode(e.to_string()))
    .and_then(|result| result);

    match encoded {
        Ok(flac) => {
            tracing::info!(bytes = flac.len(), "audio encoded as FLAC");
            Ok(Some(AudioOutcome {
                artifact: Artifact::new(flac, ContainerType::flac()),
                fallback: false,
                warning: None,
            }))
        }
        Err(e) => {
            tracing::warn!("FLAC encoding failed: {}", e);
            Ok(Some(wav_outcome(&pcm, Some(AUDIO_CONVERSION_WARNING))))
        }
    }
}

async fn decode(decoder: &dyn AudioDecoder, recorded: &Artifact) -> Result<DecodedAudio, String> {
    decoder.decode(recorded).await.map_err(|e| {
        tracing::warn!("audio decoding failed: {}", e);
        format!("Audio conversion failed: {}", e)
    })
}

fn wav_outcome(pcm: &DecodedAudio, warning: Option<&'static str>) -> AudioOutcome {
    AudioOutcome {
        artifact: Artifact::new(synthesize_wav(pcm), ContainerType::wav()),
        fallback: true,
        warning,
    }
}

/// Run one encoder session over `samples` and collect its output.
///
/// The session is dropped before returning on every path.
pub fn encode_interleaved(
    encoder: &dyn LosslessEncoder,
    settings: &EncoderSettings,
    samples: &[i16],
) -> Result<Vec<u8>, EncoderError> {
    let (tx, rx) = mpsc::channel::<Vec<u8>>();
    let on_chunk = Box::new(move |chunk: &[u8]| {
        let _ = tx.send(chunk.to_vec());
    });

    {
        let mut session = encoder.create_session(settings, on_chunk)?;
        let block = ENCODE_BLOCK_FRAMES * usize::from(settings.channels.max(1));
        for part in samples.chunks(block) {
            session.process(part)?;
        }
        session.finish()?;
    }

    let flac: Vec<u8> = rx.try_iter().flatten().collect();
    if flac.is_empty() {
        return Err(EncoderError::Encode("encoder produced no output".into()));
    }
    Ok(flac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        ChunkCallback, ConversionError, DecodeError, EncoderSession,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FixedDecoder(Option<DecodedAudio>);

    #[async_trait]
    impl AudioDecoder for FixedDecoder {
        async fn decode(&self, _artifact: &Artifact) -> Result<DecodedAudio, DecodeError> {
            self.0
                .clone()
                .ok_or_else(|| DecodeError::Failed("garbled".into()))
        }
    }

    struct FailingConverter;

    #[async_trait]
    impl VideoConverter for FailingConverter {
        fn name(&self) -> &str {
            "failing"
        }

        async fn convert(&self, _artifact: &Artifact) -> Result<Artifact, ConversionError> {
            Err(ConversionError::Failed("no muxer".into()))
        }
    }

    struct RelabelingConverter;

    #[async_trait]
    impl VideoConverter for RelabelingConverter {
        fn name(&self) -> &str {
            "relabel"
        }

        async fn convert(&self, artifact: &Artifact) -> Result<Artifact, ConversionError> {
            Ok(artifact.clone().relabel(ContainerType::mp4()))
        }
    }

    /// Emits a fake stream header on finish, then one byte per sample
    struct EchoEncoder {
        refuse: bool,
        entry_points: bool,
        released: Arc<AtomicBool>,
        processed: Arc<AtomicUsize>,
    }

    struct EchoSession {
        on_chunk: ChunkCallback,
        released: Arc<AtomicBool>,
        processed: Arc<AtomicUsize>,
    }

    impl EncoderSession for EchoSession {
        fn process(&mut self, interleaved: &[i16]) -> Result<(), EncoderError> {
            self.processed.fetch_add(interleaved.len(), Ordering::SeqCst);
            let bytes: Vec<u8> = interleaved.iter().map(|s| (*s >> 8) as u8).collect();
            (self.on_chunk)(&bytes);
            Ok(())
        }

        fn finish(&mut self) -> Result<(), EncoderError> {
            (self.on_chunk)(b"fLaC");
            Ok(())
        }
    }

    impl Drop for EchoSession {
        fn drop(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    impl EchoEncoder {
        fn new() -> Self {
            Self {
                refuse: false,
                entry_points: true,
                released: Arc::new(AtomicBool::new(false)),
                processed: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl LosslessEncoder for EchoEncoder {
        fn name(&self) -> &str {
            "echo"
        }

        fn has_entry_points(&self) -> bool {
            self.entry_points
        }

        fn create_session(
            &self,
            _settings: &EncoderSettings,
            on_chunk: ChunkCallback,
        ) -> Result<Box<dyn EncoderSession>, EncoderError> {
            if self.refuse {
                return Err(EncoderError::SessionRefused("null session".into()));
            }
            Ok(Box::new(EchoSession {
                on_chunk,
                released: Arc::clone(&self.released),
                processed: Arc::clone(&self.processed),
            }))
        }
    }

    fn pcm() -> DecodedAudio {
        DecodedAudio::new(48_000, vec![vec![0.5; 480], vec![-0.5; 480]]).unwrap()
    }

    fn buffer(chunks: &[&str]) -> RecordingBuffer {
        let mut buffer = RecordingBuffer::new();
        for chunk in chunks {
            buffer.push(chunk.as_bytes().to_vec());
        }
        buffer
    }

    #[tokio::test]
    async fn mp4_video_passes_through_untouched() {
        let outcome = process_video(
            buffer(&["abc", "def"]),
            &ContainerType::mp4(),
            &FailingConverter,
        )
        .await
        .unwrap();
        assert_eq!(outcome.artifact.data(), b"abcdef");
        assert!(outcome.warning.is_none());
    }

    #[tokio::test]
    async fn webm_video_is_relabeled() {
        let outcome = process_video(
            buffer(&["webm"]),
            &ContainerType::new("video/webm;codecs=vp9,opus"),
            &RelabelingConverter,
        )
        .await
        .unwrap();
        assert!(outcome.artifact.container().is_mp4());
        assert_eq!(outcome.artifact.data(), b"webm");
    }

    #[tokio::test]
    async fn failed_video_conversion_keeps_original() {
        let video_type = ContainerType::new("video/webm");
        let outcome = process_video(buffer(&["webm"]), &video_type, &FailingConverter)
            .await
            .unwrap();
        assert_eq!(outcome.artifact.container(), &video_type);
        assert_eq!(outcome.warning, Some(VIDEO_CONVERSION_WARNING));
    }

    #[tokio::test]
    async fn empty_buffers_produce_nothing() {
        assert!(process_video(
            RecordingBuffer::new(),
            &ContainerType::mp4(),
            &RelabelingConverter
        )
        .await
        .is_none());

        let decoder = FixedDecoder(Some(pcm()));
        let outcome = process_audio(
            RecordingBuffer::new(),
            &ContainerType::new("audio/webm"),
            AudioPipeline {
                decoder: &decoder,
                encoder: None,
                compression_level: 5,
            },
        )
        .await
        .unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn audio_without_encoder_is_wav_without_warning() {
        let decoder = FixedDecoder(Some(pcm()));
        let outcome = process_audio(
            buffer(&["opus"]),
            &ContainerType::new("audio/webm;codecs=opus"),
            AudioPipeline {
                decoder: &decoder,
                encoder: None,
                compression_level: 5,
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert!(outcome.fallback);
        assert!(outcome.warning.is_none());
        assert_eq!(&outcome.artifact.data()[..4], b"RIFF");
        assert_eq!(outcome.artifact.size_bytes(), 44 + 480 * 2 * 2);
    }

    #[tokio::test]
    async fn audio_with_encoder_is_flac() {
        let decoder = FixedDecoder(Some(pcm()));
        let encoder = Arc::new(EchoEncoder::new());
        let released = Arc::clone(&encoder.released);
        let processed = Arc::clone(&encoder.processed);
        let outcome = process_audio(
            buffer(&["opus"]),
            &ContainerType::new("audio/webm;codecs=opus"),
            AudioPipeline {
                decoder: &decoder,
                encoder: Some(encoder),
                compression_level: 5,
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert!(!outcome.fallback);
        assert_eq!(outcome.artifact.container(), &ContainerType::flac());
        assert!(outcome.artifact.data().ends_with(b"fLaC"));
        assert_eq!(processed.load(Ordering::SeqCst), 960);
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn refused_session_falls_back_with_warning() {
        let decoder = FixedDecoder(Some(pcm()));
        let mut encoder = EchoEncoder::new();
        encoder.refuse = true;
        let outcome = process_audio(
            buffer(&["opus"]),
            &ContainerType::new("audio/ogg;codecs=opus"),
            AudioPipeline {
                decoder: &decoder,
                encoder: Some(Arc::new(encoder)),
                compression_level: 5,
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert!(outcome.fallback);
        assert_eq!(outcome.warning, Some(AUDIO_CONVERSION_WARNING));
        assert_eq!(outcome.artifact.container(), &ContainerType::wav());
    }

    #[tokio::test]
    async fn encoder_without_entry_points_is_silent_fallback() {
        let decoder = FixedDecoder(Some(pcm()));
        let mut encoder = EchoEncoder::new();
        encoder.entry_points = false;
        let outcome = process_audio(
            buffer(&["opus"]),
            &ContainerType::new("audio/webm"),
            AudioPipeline {
                decoder: &decoder,
                encoder: Some(Arc::new(encoder)),
                compression_level: 5,
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert!(outcome.fallback);
        assert!(outcome.warning.is_none());
    }

    #[tokio::test]
    async fn undecodable_audio_is_an_error() {
        let decoder = FixedDecoder(None);
        let err = process_audio(
            buffer(&["junk"]),
            &ContainerType::new("audio/webm"),
            AudioPipeline {
                decoder: &decoder,
                encoder: None,
                compression_level: 5,
            },
        )
        .await
        .unwrap_err();
        assert!(err.contains("garbled"));
    }

    #[test]
    fn session_is_released_when_processing_fails() {
        struct FailingSession(Arc<AtomicBool>);

        impl EncoderSession for FailingSession {
            fn process(&mut self, _interleaved: &[i16]) -> Result<(), EncoderError> {
                Err(EncoderError::Encode("boom".into()))
            }

            fn finish(&mut self) -> Result<(), EncoderError> {
                Ok(())
            }
        }

        impl Drop for FailingSession {
            fn drop(&mut self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        struct FailingEncoder(Arc<AtomicBool>);

        impl LosslessEncoder for FailingEncoder {
            fn name(&self) -> &str {
                "failing"
            }

            fn create_session(
                &self,
                _settings: &EncoderSettings,
                _on_chunk: ChunkCallback,
            ) -> Result<Box<dyn EncoderSession>, EncoderError> {
                Ok(Box::new(FailingSession(Arc::clone(&self.0))))
            }
        }

        let released = Arc::new(AtomicBool::new(false));
        let encoder = FailingEncoder(Arc::clone(&released));
        let settings = EncoderSettings {
            sample_rate: 48_000,
            channels: 1,
            bits_per_sample: 16,
            compression_level: 5,
            total_samples: 4,
            verify: true,
        };
        assert!(encode_interleaved(&encoder, &settings, &[1, 2, 3, 4]).is_err());
        assert!(released.load(Ordering::SeqCst));
    }
}
