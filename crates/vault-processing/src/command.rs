//! Runner for external tools (tesseract, ffmpeg).
//!
//! Every invocation is bounded by a timeout; the child process is killed when
//! the timeout elapses or the future is dropped.

use std::ffi::OsStr;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

const MAX_STDERR_CHARS: usize = 2000;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Invalid program path {program}: {reason}")]
    InvalidProgram { program: String, reason: String },

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Failed to collect output of {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Reject program paths that could be interpreted by a shell.
fn validate_program(program: &str) -> Result<(), CommandError> {
    let invalid = |reason: &str| CommandError::InvalidProgram {
        program: program.to_string(),
        reason: reason.to_string(),
    };

    if program.trim().is_empty() {
        return Err(invalid("empty"));
    }
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if program.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(invalid("contains dangerous characters"));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ExternalCommand {
    program: String,
    timeout: Duration,
}

impl ExternalCommand {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Result<Self, CommandError> {
        let program = program.into();
        validate_program(&program)?;
        Ok(Self { program, timeout })
    }

    /// Run to completion and return stdout. A non-zero exit is an error
    /// carrying the (truncated) stderr.
    #[tracing::instrument(skip(self, args), fields(program = %self.program))]
    pub async fn run<I, S>(&self, args: I) -> Result<Vec<u8>, CommandError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CommandError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| CommandError::Timeout {
                program: self.program.clone(),
                timeout: self.timeout,
            })?
            .map_err(|source| CommandError::Io {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr: String = String::from_utf8_lossy(&output.stderr)
                .trim()
                .chars()
                .take(MAX_STDERR_CHARS)
                .collect();
            return Err(CommandError::Failed {
                program: self.program.clone(),
                status: output.status,
                stderr,
            });
        }

        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_shell_metacharacters() {
        for program in ["tesseract; rm -rf /", "ffmpeg | cat", "$(whoami)", "", "  "] {
            let result = ExternalCommand::new(program, Duration::from_secs(1));
            assert!(
                matches!(result, Err(CommandError::InvalidProgram { .. })),
                "{:?} should be rejected",
                program
            );
        }
    }

    #[test]
    fn test_accepts_plain_and_absolute_paths() {
        assert!(ExternalCommand::new("tesseract", Duration::from_secs(1)).is_ok());
        assert!(ExternalCommand::new("/usr/local/bin/ffmpeg", Duration::from_secs(1)).is_ok());
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let command =
            ExternalCommand::new("mediavault-no-such-tool", Duration::from_secs(5)).unwrap();
        let result = command.run(["--version"]).await;
        assert!(matches!(result, Err(CommandError::Spawn { .. })));
    }
}
