//! Server configuration

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};
use crate::relay::DEFAULT_CHUNK_SIZE;

/// Transcoder process configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscoderConfig {
    /// Name or path of the transcoder binary
    pub binary: String,

    /// Output sample rate in Hz
    pub sample_rate: u32,

    /// Output channel count
    pub channels: u16,

    /// Value passed to `-loglevel`
    pub log_level: String,

    /// Force the input container format (`-f`), probed when unset
    pub input_format: Option<String>,

    /// Full argument list, replaces the generated ffmpeg arguments when set
    pub args: Option<Vec<String>>,
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
            sample_rate: 16000,
            channels: 1,
            log_level: "error".to_string(),
            input_format: None,
            args: None,
        }
    }
}

impl TranscoderConfig {
    /// Arguments for reading compressed audio on stdin and writing
    /// s16le PCM on stdout.
    pub fn command_args(&self) -> Vec<String> {
        if let Some(args) = &self.args {
            return args.clone();
        }

        let mut args: Vec<String> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            self.log_level.clone(),
        ];
        if let Some(format) = &self.input_format {
            args.push("-f".into());
            args.push(format.clone());
        }
        args.extend([
            "-i".into(),
            "pipe:0".into(),
            "-f".into(),
            "s16le".into(),
            "-acodec".into(),
            "pcm_s16le".into(),
            "-ac".into(),
            self.channels.to_string(),
            "-ar".into(),
            self.sample_rate.to_string(),
            "pipe:1".into(),
        ]);
        args
    }
}

/// Relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Maximum size of one PCM chunk read from the transcoder
    pub read_chunk_size: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Transcoder configuration
    pub transcoder: TranscoderConfig,

    /// Relay configuration
    pub relay: RelayConfig,

    /// Enable CORS
    pub cors_enabled: bool,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log output format (pretty, json)
    pub log_format: String,

    /// Maximum concurrent sessions
    pub max_concurrent_sessions: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            transcoder: TranscoderConfig::default(),
            relay: RelayConfig::default(),
            cors_enabled: true,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            max_concurrent_sessions: Some(32),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Reject settings the relay cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.transcoder.binary.trim().is_empty() {
            return Err(RelayError::Config("transcoder binary is empty".into()));
        }
        if self.transcoder.sample_rate == 0 {
            return Err(RelayError::Config("sample_rate must be positive".into()));
        }
        if self.transcoder.channels == 0 {
            return Err(RelayError::Config("channels must be positive".into()));
        }
        if self.relay.read_chunk_size == 0 {
            return Err(RelayError::Config("read_chunk_size must be positive".into()));
        }
        Ok(())
    }
}
