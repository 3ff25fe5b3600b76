//! Configuration file support
//!
//! Loads server configuration from TOML files.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::{RelayConfig, ServerConfig, TranscoderConfig};

/// Configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Server settings
    pub server: ServerSettings,
    /// Transcoder settings
    pub transcoder: Option<TranscoderSettings>,
    /// Relay settings
    pub relay: Option<RelaySettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
    /// Limits settings
    pub limits: Option<LimitsSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Enable CORS
    pub cors_enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscoderSettings {
    /// Transcoder binary name or path
    pub binary: Option<String>,
    /// Output sample rate
    pub sample_rate: Option<u32>,
    /// Output channels
    pub channels: Option<u16>,
    /// ffmpeg `-loglevel`
    pub log_level: Option<String>,
    /// Forced input container format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_format: Option<String>,
    /// Replacement argument list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySettings {
    /// Maximum PCM chunk size in bytes
    pub read_chunk_size: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsSettings {
    /// Maximum concurrent sessions
    pub max_concurrent_sessions: Option<usize>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ConfigFile = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Generate default configuration file
    pub fn default_config() -> Self {
        let transcoder = TranscoderConfig::default();
        Self {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 8000,
                cors_enabled: Some(true),
            },
            transcoder: Some(TranscoderSettings {
                binary: Some(transcoder.binary),
                sample_rate: Some(transcoder.sample_rate),
                channels: Some(transcoder.channels),
                log_level: Some(transcoder.log_level),
                input_format: None,
                args: None,
            }),
            relay: Some(RelaySettings {
                read_chunk_size: Some(4096),
            }),
            logging: Some(LoggingSettings {
                level: "info".to_string(),
                format: Some("pretty".to_string()),
            }),
            limits: Some(LimitsSettings {
                max_concurrent_sessions: Some(32),
            }),
        }
    }

    /// Convert to ServerConfig
    pub fn into_server_config(self) -> ServerConfig {
        let defaults = ServerConfig::default();
        let transcoder = match self.transcoder {
            Some(t) => TranscoderConfig {
                binary: t.binary.unwrap_or(defaults.transcoder.binary),
                sample_rate: t.sample_rate.unwrap_or(defaults.transcoder.sample_rate),
                channels: t.channels.unwrap_or(defaults.transcoder.channels),
                log_level: t.log_level.unwrap_or(defaults.transcoder.log_level),
                input_format: t.input_format,
                args: t.args,
            },
            None => defaults.transcoder,
        };
        let (log_level, log_format) = match self.logging {
            Some(l) => (l.level, l.format.unwrap_or(defaults.log_format)),
            None => (defaults.log_level, defaults.log_format),
        };

        ServerConfig {
            host: self.server.host,
            port: self.server.port,
            transcoder,
            relay: RelayConfig {
                read_chunk_size: self
                    .relay
                    .and_then(|r| r.read_chunk_size)
                    .unwrap_or(defaults.relay.read_chunk_size),
            },
            cors_enabled: self.server.cors_enabled.unwrap_or(true),
            log_level,
            log_format,
            max_concurrent_sessions: match self.limits {
                Some(l) => l.max_concurrent_sessions,
                None => defaults.max_concurrent_sessions,
            },
        }
    }
}

/// Generate default configuration file at the specified path
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigFile::default_config();
    config.to_file(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default_config();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.relay.unwrap().read_chunk_size, Some(4096));
    }

    #[test]
    fn test_minimal_file_uses_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[server]\nhost = \"127.0.0.1\"\nport = 9000\n")
            .unwrap();

        let config = ConfigFile::from_file(temp_file.path())
            .unwrap()
            .into_server_config();
        assert_eq!(config.socket_addr(), "127.0.0.1:9000");
        assert_eq!(config.transcoder.binary, "ffmpeg");
        assert_eq!(config.relay.read_chunk_size, 4096);
        assert_eq!(config.max_concurrent_sessions, Some(32));
        assert!(config.cors_enabled);
    }

    #[test]
    fn test_transcoder_section() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(
                br#"
[server]
host = "0.0.0.0"
port = 8000

[transcoder]
binary = "/usr/local/bin/ffmpeg"
input_format = "webm"

[relay]
read_chunk_size = 1024

[logging]
level = "debug"
format = "json"
"#,
            )
            .unwrap();

        let config = ConfigFile::from_file(temp_file.path())
            .unwrap()
            .into_server_config();
        assert_eq!(config.transcoder.binary, "/usr/local/bin/ffmpeg");
        assert_eq!(config.transcoder.input_format.as_deref(), Some("webm"));
        assert_eq!(config.transcoder.sample_rate, 16000);
        assert_eq!(config.relay.read_chunk_size, 1024);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, "json");
    }

    #[test]
    fn test_generate_default_config() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();

        generate_default_config(&path).unwrap();

        let loaded = ConfigFile::from_file(&path).unwrap();
        assert_eq!(loaded.server.port, 8000);
        let config = loaded.into_server_config();
        assert!(config.validate().is_ok());
    }
}
