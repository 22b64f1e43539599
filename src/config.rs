// src/config.rs

//! Run configuration.
//!
//! Every section can be omitted from the TOML file; missing values fall back
//! to the defaults below, which match the reference device (a 4x3 matrix
//! listening on port 80). Command-line flags are applied on top by `main`.

use crate::pipeline::PipelineSettings;
use crate::worker::WorkerTiming;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Which delivery strategy a run uses; the two have different cadences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Http,
    WebSocket,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub matrix: MatrixConfig,
    pub stream: StreamConfig,
    pub network: NetworkConfig,
}

/// Where the device lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub host: String,
    pub port: u16,
    /// WebSocket endpoint path.
    pub ws_path: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            host: String::new(),
            port: 80,
            ws_path: crate::transport::DEFAULT_WS_PATH.to_string(),
        }
    }
}

/// LED matrix geometry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixConfig {
    pub width: usize,
    pub height: usize,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        MatrixConfig {
            width: 4,
            height: 3,
        }
    }
}

impl MatrixConfig {
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

/// Generation cadence and queue behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub http_interval_ms: u64,
    pub ws_interval_ms: u64,
    pub push_timeout_ms: u64,
    pub pop_timeout_ms: u64,
    pub stop_timeout_ms: u64,
    pub queue_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            http_interval_ms: 80,
            ws_interval_ms: 50,
            push_timeout_ms: 100,
            pop_timeout_ms: 200,
            stop_timeout_ms: 1000,
            queue_capacity: crate::queue::DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Per-operation network timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub http_timeout_ms: u64,
    pub ws_connect_timeout_ms: u64,
    pub ws_read_timeout_ms: u64,
    pub reconnect_backoff_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            http_timeout_ms: 5000,
            ws_connect_timeout_ms: 5000,
            ws_read_timeout_ms: 5000,
            reconnect_backoff_ms: 1000,
        }
    }
}

impl NetworkConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn ws_connect_timeout(&self) -> Duration {
        Duration::from_millis(self.ws_connect_timeout_ms)
    }

    pub fn ws_read_timeout(&self) -> Duration {
        Duration::from_millis(self.ws_read_timeout_ms)
    }
}

impl Config {
    /// Loads `path`, or returns defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.matrix.width == 0 || self.matrix.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "matrix must be at least 1x1, got {}x{}",
                self.matrix.width, self.matrix.height
            )));
        }
        if self.stream.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue_capacity must be non-zero".into()));
        }
        let timeouts = [
            ("stream.push_timeout_ms", self.stream.push_timeout_ms),
            ("stream.pop_timeout_ms", self.stream.pop_timeout_ms),
            ("stream.stop_timeout_ms", self.stream.stop_timeout_ms),
            ("network.http_timeout_ms", self.network.http_timeout_ms),
            ("network.ws_connect_timeout_ms", self.network.ws_connect_timeout_ms),
            ("network.ws_read_timeout_ms", self.network.ws_read_timeout_ms),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, ms)| *ms == 0) {
            return Err(ConfigError::Invalid(format!("{name} must be non-zero")));
        }
        Ok(())
    }

    /// Frame interval for the given transport.
    pub fn interval(&self, kind: TransportKind) -> Duration {
        Duration::from_millis(match kind {
            TransportKind::Http => self.stream.http_interval_ms,
            TransportKind::WebSocket => self.stream.ws_interval_ms,
        })
    }

    pub fn pipeline_settings(&self, kind: TransportKind) -> PipelineSettings {
        PipelineSettings {
            interval: self.interval(kind),
            push_timeout: Duration::from_millis(self.stream.push_timeout_ms),
            stop_timeout: Duration::from_millis(self.stream.stop_timeout_ms),
            queue_capacity: self.stream.queue_capacity,
            worker: WorkerTiming {
                poll: Duration::from_millis(self.stream.pop_timeout_ms),
                reconnect_backoff: Duration::from_millis(self.network.reconnect_backoff_ms),
            },
        }
    }
}
