use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// One mebibyte; value sizes are configured in MiB and written in bytes.
pub const MIB: i64 = 1_048_576;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("worker {index} would get a negative value size ({size_mib} MiB)")]
    NegativeSize { index: u32, size_mib: i64 },
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// How connections to the target store are secured.
///
/// `TlsNoVerify` encrypts the stream but accepts any server certificate. It
/// exists for test and staging endpoints with self-signed certificates and is
/// never the default.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransportSecurity {
    #[default]
    Plain,
    TlsNoVerify,
}

impl TransportSecurity {
    pub fn is_tls(self) -> bool {
        matches!(self, TransportSecurity::TlsNoVerify)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub security: TransportSecurity,
}

impl EndpointConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub endpoint: EndpointConfig,
    /// Number of workers per phase; keys are `key_1..=key_{workers}`.
    pub workers: u32,
    pub initial_size_mib: i64,
    /// Added to the value size of each successive worker. May be negative.
    pub delta_mib: i64,
    /// How long each slow-read connection is held after sending its command.
    pub idle_secs: u64,
    #[serde(default)]
    pub skip_flush: bool,
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_ms: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_heartbeat_ms() -> u64 {
    100
}

fn default_connect_timeout_secs() -> u64 {
    5
}

impl RunConfig {
    pub fn new(endpoint: EndpointConfig, workers: u32) -> Self {
        Self {
            endpoint,
            workers,
            initial_size_mib: 1,
            delta_mib: 0,
            idle_secs: 0,
            skip_flush: false,
            heartbeat_ms: default_heartbeat_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }

    pub fn from_yaml_str(data: &str) -> Result<Self, ConfigurationError> {
        let config: RunConfig = serde_yaml::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let data = fs::read_to_string(path)?;
        Self::from_yaml_str(&data)
    }

    /// Rejects settings that would make the run meaningless or ill-formed.
    ///
    /// Sizes change linearly with the worker index, so only the first and last
    /// worker need checking for a negative size.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.endpoint.host.trim().is_empty() {
            return Err(ConfigurationError::Missing("endpoint.host"));
        }
        if self.endpoint.port == 0 {
            return Err(ConfigurationError::Invalid {
                field: "endpoint.port",
                reason: "port must be non-zero".to_string(),
            });
        }
        if self.workers == 0 {
            return Err(ConfigurationError::Invalid {
                field: "workers",
                reason: "at least one worker is required".to_string(),
            });
        }
        if self.heartbeat_ms == 0 {
            return Err(ConfigurationError::Invalid {
                field: "heartbeat_ms",
                reason: "heartbeat interval must be non-zero".to_string(),
            });
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigurationError::Invalid {
                field: "connect_timeout_secs",
                reason: "connect timeout must be non-zero".to_string(),
            });
        }
        for index in [1, self.workers] {
            let size_mib = self.value_size_mib(index);
            if size_mib < 0 {
                return Err(ConfigurationError::NegativeSize { index, size_mib });
            }
        }
        Ok(())
    }

    /// Value size in MiB for the 1-based worker `index`.
    pub fn value_size_mib(&self, index: u32) -> i64 {
        self.initial_size_mib
            .saturating_add((i64::from(index) - 1).saturating_mul(self.delta_mib))
    }

    /// Value size in bytes for the 1-based worker `index`.
    pub fn value_size_bytes(&self, index: u32) -> i64 {
        self.value_size_mib(index).saturating_mul(MIB)
    }

    pub fn idle(&self) -> Duration {
        Duration::from_secs(self.idle_secs)
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Key written and later read by the 1-based worker `index`.
pub fn key_for(index: u32) -> String {
    format!("key_{}", index)
}

/// Parses the `"true"` / `"false"` flags accepted on the command line.
pub fn parse_flag(field: &'static str, raw: &str) -> Result<bool, ConfigurationError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(ConfigurationError::Invalid {
            field,
            reason: format!("expected \"true\" or \"false\", got {:?}", other),
        }),
    }
}
