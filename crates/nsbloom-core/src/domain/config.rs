//! Server configuration with validation.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use nsbloom_filters::FilterConfig;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Directory holding one `<namespace>.bf` file per namespace
    pub bloom_dir: Option<PathBuf>,
    /// HTTP listener
    pub http: HttpConfig,
    /// Word list inserted into the default namespace at startup
    pub bootstrap: Option<PathBuf>,
    /// Synthetic load at startup
    pub stress: StressConfig,
    /// Sizing of every filter created by this server
    pub filter: FilterConfig,
    /// Request validation limits
    pub limits: LimitsConfig,
    /// Seconds between background flushes of dirty filters (0 disables)
    pub flush_interval_secs: u64,
    /// Detach from the terminal at startup
    pub daemon: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bloom_dir: None,
            http: HttpConfig::default(),
            bootstrap: None,
            stress: StressConfig::default(),
            filter: FilterConfig::default(),
            limits: LimitsConfig::default(),
            flush_interval_secs: 5,
            daemon: false,
        }
    }
}

impl ServerConfig {
    /// Config serving `bloom_dir` with all other settings at their defaults
    pub fn for_dir(bloom_dir: impl Into<PathBuf>) -> Self {
        Self {
            bloom_dir: Some(bloom_dir.into()),
            ..Self::default()
        }
    }

    /// Load a JSON config file; absent fields keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let dir = self.bloom_dir()?;
        if !dir.is_dir() {
            return Err(ConfigError::NotADirectory(dir.to_path_buf()));
        }

        if self.limits.max_key_bytes == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_key_bytes cannot be 0".into(),
            ));
        }

        if self.limits.max_namespace_bytes == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_namespace_bytes cannot be 0".into(),
            ));
        }

        if self.http.max_body_bytes == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_body_bytes cannot be 0".into(),
            ));
        }

        self.filter.validate()?;
        Ok(())
    }

    /// The configured bloom directory
    pub fn bloom_dir(&self) -> Result<&Path, ConfigError> {
        self.bloom_dir.as_deref().ok_or(ConfigError::MissingBloomDir)
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }

    /// Background flush period, `None` when disabled
    pub fn flush_interval(&self) -> Option<Duration> {
        (self.flush_interval_secs > 0).then(|| Duration::from_secs(self.flush_interval_secs))
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 9003)
    pub port: u16,
    /// Largest accepted request body
    pub max_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 9003,
            max_body_bytes: 4096,
        }
    }
}

/// Startup stress mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    pub enabled: bool,
    /// Number of generated keys inserted into the default namespace
    pub keys: u64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            keys: 100_000_000,
        }
    }
}

/// Request validation limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Longest accepted key
    pub max_key_bytes: usize,
    /// Longest accepted namespace
    pub max_namespace_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_key_bytes: 256,
            max_namespace_bytes: 200,
        }
    }
}
