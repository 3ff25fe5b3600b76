//! Transcoder process lifecycle
//!
//! Spawns one external transcoder per session and splits it into the three
//! handles the relay needs: the write end of its stdin, the read end of its
//! stdout, and a waiter for its exit status.

use std::io;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn, Instrument};

use crate::config::TranscoderConfig;
use crate::error::{PipeDirection, RelayError, Result};

/// Exit status of the transcoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
    /// Whether the process has exited
    pub exited: bool,
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        self.exited && self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
            exited: true,
        }
    }
}

/// A running transcoder process
#[derive(Debug)]
pub struct TranscoderProcess {
    binary: String,
    child: Child,
    stdin: ChildStdin,
    stdout: ChildStdout,
}

impl TranscoderProcess {
    /// Spawn the transcoder described by `config`.
    ///
    /// Must be called from within a Tokio runtime. The child is killed if
    /// its handles are dropped before it exits.
    pub fn start(config: &TranscoderConfig) -> Result<Self> {
        let args = config.command_args();
        let mut cmd = Command::new(&config.binary);
        cmd.args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        info!(binary = %config.binary, ?args, "Spawning transcoder");
        let mut child = cmd
            .spawn()
            .map_err(|e| spawn_error(&config.binary, &e))?;
        let pid = child.id();

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| RelayError::ProcessUnavailable {
                binary: config.binary.clone(),
                reason: "failed to capture stdin".to_string(),
            })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RelayError::ProcessUnavailable {
                binary: config.binary.clone(),
                reason: "failed to capture stdout".to_string(),
            })?;

        // Diagnostics only, the relay never depends on stderr
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(
                async move {
                    // Raw lines: ffmpeg may print bytes that are not UTF-8, and
                    // the pipe must stay open until the process closes it
                    let mut lines = BufReader::new(stderr).split(b'\n');
                    loop {
                        match lines.next_segment().await {
                            Ok(Some(line)) => {
                                let line = String::from_utf8_lossy(&line);
                                warn!(?pid, "transcoder: {}", line.trim_end());
                            }
                            Ok(None) => break,
                            Err(e) => {
                                debug!(?pid, error = %e, "transcoder stderr read failed");
                                break;
                            }
                        }
                    }
                    debug!(?pid, "transcoder stderr closed");
                }
                .instrument(tracing::Span::current()),
            );
        }

        debug!(?pid, "Transcoder started");

        Ok(Self {
            binary: config.binary.clone(),
            child,
            stdin,
            stdout,
        })
    }

    /// OS process id, if the process has not been reaped yet
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Hand out the input, output and exit handles.
    pub fn into_parts(self) -> (ProcessInput<ChildStdin>, ChildStdout, ProcessWaiter) {
        (
            ProcessInput::new(self.stdin),
            self.stdout,
            ProcessWaiter {
                binary: self.binary,
                child: self.child,
            },
        )
    }
}

fn spawn_error(binary: &str, err: &io::Error) -> RelayError {
    let reason = match err.kind() {
        io::ErrorKind::NotFound => "binary not found".to_string(),
        io::ErrorKind::PermissionDenied => "permission denied".to_string(),
        _ => err.to_string(),
    };
    RelayError::ProcessUnavailable {
        binary: binary.to_string(),
        reason,
    }
}

/// Exit-status handle of a transcoder
#[derive(Debug)]
pub struct ProcessWaiter {
    binary: String,
    child: Child,
}

impl ProcessWaiter {
    /// Wait for the process to exit.
    pub async fn wait(mut self) -> Result<ExitStatus> {
        let status = self.child.wait().await.map_err(|source| RelayError::Pipe {
            direction: PipeDirection::Exit,
            source,
        })?;
        let status = ExitStatus::from(status);
        debug!(binary = %self.binary, code = ?status.code, "Transcoder exited");
        Ok(status)
    }
}

/// Write end of the transcoder input.
///
/// Closing is idempotent: the writer is shut down and dropped on the first
/// call, later calls do nothing. Writes after close fail with `BrokenPipe`.
#[derive(Debug)]
pub struct ProcessInput<W> {
    writer: Option<W>,
}

impl<W: AsyncWrite + Unpin> ProcessInput<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(writer),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    /// Write the whole chunk and flush it.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::from(io::ErrorKind::BrokenPipe))?;
        writer.write_all(chunk).await?;
        writer.flush().await
    }

    /// Signal end-of-input to the transcoder.
    pub async fn close(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.shutdown().await {
                debug!(error = %e, "Shutdown of transcoder input failed");
            }
        }
    }
}
