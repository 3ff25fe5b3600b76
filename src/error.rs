use std::fmt;
use thiserror::Error;

/// Main error type for the relay
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Transcoder '{binary}' unavailable: {reason}")]
    ProcessUnavailable { binary: String, reason: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Transcoder {direction} pipe error: {source}")]
    Pipe {
        direction: PipeDirection,
        #[source]
        source: std::io::Error,
    },

    #[error("PCM consumer error: {0}")]
    Consumer(String),

    #[error("Session limit reached ({0} active)")]
    SessionLimit(usize),

    #[error("Server is shutting down")]
    ShuttingDown,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which end of the transcoder a pipe error happened on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeDirection {
    Input,
    Output,
    Exit,
}

impl fmt::Display for PipeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PipeDirection::Input => "input",
            PipeDirection::Output => "output",
            PipeDirection::Exit => "exit-status",
        })
    }
}

impl RelayError {
    pub fn input_pipe(source: std::io::Error) -> Self {
        RelayError::Pipe {
            direction: PipeDirection::Input,
            source,
        }
    }

    pub fn output_pipe(source: std::io::Error) -> Self {
        RelayError::Pipe {
            direction: PipeDirection::Output,
            source,
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, RelayError>;
