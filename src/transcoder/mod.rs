//! Transcoder process module
//!
//! This module owns the external transcoder (ffmpeg) for one session:
//! - Spawning the process with piped stdin/stdout/stderr
//! - Mapping spawn failures to `ProcessUnavailable`
//! - Forwarding the process's stderr to the log
//! - Waiting for the exit status once both pipes are done

pub mod process;

pub use process::{ExitStatus, ProcessInput, ProcessWaiter, TranscoderProcess};
