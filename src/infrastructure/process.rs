//! Helpers for running the external media tools

use std::process::Stdio;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{program} failed: {message}")]
    Failed {
        program: &'static str,
        message: String,
    },
}

/// Run `program`, feed `input` to its stdin and collect stdout.
///
/// A non-zero exit is an error carrying the last line of stderr.
pub async fn run_piped(
    program: &'static str,
    args: &[String],
    input: Option<Vec<u8>>,
) -> Result<Vec<u8>, ToolError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| spawn_error(program, e))?;

    // Feed stdin from its own task so a full stdout pipe cannot deadlock us
    let writer = match (input, child.stdin.take()) {
        (Some(data), Some(mut stdin)) => Some(tokio::spawn(async move {
            let result = stdin.write_all(&data).await;
            drop(stdin);
            result
        })),
        _ => None,
    };

    let output = child.wait_with_output().await.map_err(|e| ToolError::Failed {
        program,
        message: e.to_string(),
    })?;

    if let Some(writer) = writer {
        match writer.await {
            Ok(Ok(())) => {}
            // The tool may stop reading early once it has what it needs
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => {
                return Err(ToolError::Failed {
                    program,
                    message: format!("writing input: {}", e),
                })
            }
            Err(e) => {
                return Err(ToolError::Failed {
                    program,
                    message: e.to_string(),
                })
            }
        }
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ToolError::Failed {
            program,
            message: stderr
                .lines()
                .last()
                .unwrap_or("exited with non-zero status")
                .to_string(),
        });
    }

    Ok(output.stdout)
}

/// Map a spawn failure, singling out a missing binary
pub fn spawn_error(program: &'static str, e: std::io::Error) -> ToolError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ToolError::NotFound(program)
    } else {
        ToolError::Failed {
            program,
            message: e.to_string(),
        }
    }
}
