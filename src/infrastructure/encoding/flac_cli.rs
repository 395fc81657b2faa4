//! FLAC encoder backed by the reference `flac` command line tool

use std::io::{Read, Write};
use std::process::{Command, Stdio};

use crate::application::ports::{
    ChunkCallback, EncoderError, EncoderSession, EncoderSettings, LosslessEncoder,
};

const FLAC_BIN: &str = "flac";

/// Size of the pieces read back from the tool
const OUTPUT_CHUNK: usize = 4096;

/// Encoder that pipes raw PCM through `flac`
#[derive(Debug, Clone)]
pub struct FlacCliEncoder {
    program: String,
}

impl FlacCliEncoder {
    pub fn new() -> Self {
        Self::with_program(FLAC_BIN)
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn args(settings: &EncoderSettings) -> Vec<String> {
        let mut args = vec![
            "--silent".to_string(),
            "--force-raw-format".to_string(),
            "--endian=little".to_string(),
            "--sign=signed".to_string(),
            format!("--channels={}", settings.channels),
            format!("--bps={}", settings.bits_per_sample),
            format!("--sample-rate={}", settings.sample_rate),
            format!("-{}", settings.compression_level.min(8)),
        ];
        if settings.verify {
            args.push("--verify".to_string());
        }
        args.extend(["--stdout".to_string(), "-".to_string()]);
        args
    }
}

impl Default for FlacCliEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LosslessEncoder for FlacCliEncoder {
    fn name(&self) -> &str {
        "flac-cli"
    }

    fn create_session(
        &self,
        settings: &EncoderSettings,
        on_chunk: ChunkCallback,
    ) -> Result<Box<dyn EncoderSession>, EncoderError> {
        if settings.bits_per_sample != 16 {
            return Err(EncoderError::SessionRefused(format!(
                "{} bits per sample",
                settings.bits_per_sample
            )));
        }
        let capacity = usize::try_from(settings.total_samples)
            .unwrap_or(0)
            .saturating_mul(usize::from(settings.channels) * 2);
        Ok(Box::new(FlacCliSession {
            program: self.program.clone(),
            args: Self::args(settings),
            pcm: Vec::with_capacity(capacity),
            on_chunk,
            finished: false,
        }))
    }
}

struct FlacCliSession {
    program: String,
    args: Vec<String>,
    /// Little-endian 16-bit PCM
    pcm: Vec<u8>,
    on_chunk: ChunkCallback,
    finished: bool,
}

impl EncoderSession for FlacCliSession {
    fn process(&mut self, interleaved: &[i16]) -> Result<(), EncoderError> {
        if self.finished {
            return Err(EncoderError::Encode("session already finished".to_string()));
        }
        for sample in interleaved {
            self.pcm.extend_from_slice(&sample.to_le_bytes());
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), EncoderError> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    EncoderError::ToolNotFound(self.program.clone())
                } else {
                    EncoderError::Encode(e.to_string())
                }
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| EncoderError::Encode("flac stdin unavailable".to_string()))?;
        let pcm = std::mem::take(&mut self.pcm);
        let writer = std::thread::spawn(move || stdin.write_all(&pcm));

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| EncoderError::Encode("flac stdout unavailable".to_string()))?;
        let mut buf = vec![0u8; OUTPUT_CHUNK];
        loop {
            let n = stdout
                .read(&mut buf)
                .map_err(|e| EncoderError::Encode(e.to_string()))?;
            if n == 0 {
                break;
            }
            (self.on_chunk)(&buf[..n]);
        }

        let write_result = writer
            .join()
            .map_err(|_| EncoderError::Encode("flac input writer panicked".to_string()))?;
        let output = child
            .wait_with_output()
            .map_err(|e| EncoderError::Encode(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr.lines().last().unwrap_or("flac failed").to_string();
            return Err(if message.contains("verify") || message.contains("VERIFY") {
                EncoderError::Verify(message)
            } else {
                EncoderError::Encode(message)
            });
        }
        write_result.map_err(|e| EncoderError::Encode(format!("writing PCM: {}", e)))
    }
}
