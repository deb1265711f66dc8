//! Command line flags and configuration assembly
//!
//! Precedence, lowest first: built-in defaults, `--config` JSON file,
//! `NSBLOOM_*` environment variables, command line flags.

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use nsbloom_core::ServerConfig;
use tracing::warn;

/// Namespaced bloom filter membership server
#[derive(Parser, Debug, Default)]
#[command(name = "nsbloomd", version)]
#[command(about = "Serve namespaced bloom filter membership over HTTP")]
pub struct Args {
    /// Directory holding one <namespace>.bf file per namespace
    #[arg(short = 'f', long = "folder", value_name = "DIR")]
    pub folder: Option<PathBuf>,

    /// HTTP port [default: 9003]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Word list inserted into the default namespace at startup
    #[arg(short, long, value_name = "FILE")]
    pub bootstrap: Option<PathBuf>,

    /// Stress mode: insert generated keys into the default namespace at startup
    #[arg(short = 't', long = "test")]
    pub test: bool,

    /// Number of keys inserted in stress mode
    #[arg(long, value_name = "N")]
    pub stress_keys: Option<u64>,

    /// Detach and run in the background
    #[arg(short, long)]
    pub daemon: bool,

    /// Bind address [default: 0.0.0.0]
    #[arg(long)]
    pub host: Option<IpAddr>,

    /// Elements per filter stage
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Target false positive rate of a filter's first stage
    #[arg(long)]
    pub error_rate: Option<f64>,

    /// Seconds between background flushes (0 disables)
    #[arg(long, value_name = "SECS")]
    pub flush_interval: Option<u64>,

    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Build the server configuration from every source
    pub fn server_config(&self, env: impl Fn(&str) -> Option<String>) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_json_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ServerConfig::default(),
        };

        apply_env(&mut config, env);
        self.apply_flags(&mut config);
        Ok(config)
    }

    fn apply_flags(&self, config: &mut ServerConfig) {
        if let Some(folder) = &self.folder {
            config.bloom_dir = Some(folder.clone());
        }
        if let Some(port) = self.port {
            config.http.port = port;
        }
        if let Some(host) = self.host {
            config.http.host = host;
        }
        if let Some(bootstrap) = &self.bootstrap {
            config.bootstrap = Some(bootstrap.clone());
        }
        if self.test {
            config.stress.enabled = true;
        }
        if let Some(keys) = self.stress_keys {
            config.stress.keys = keys;
        }
        if self.daemon {
            config.daemon = true;
        }
        if let Some(capacity) = self.capacity {
            config.filter.capacity = capacity;
        }
        if let Some(error_rate) = self.error_rate {
            config.filter.error_rate = error_rate;
        }
        if let Some(secs) = self.flush_interval {
            config.flush_interval_secs = secs;
        }
    }
}

/// Override the port and bloom directory from the environment
fn apply_env(config: &mut ServerConfig, env: impl Fn(&str) -> Option<String>) {
    if let Some(port) = env("NSBLOOM_PORT") {
        match port.parse() {
            Ok(p) => config.http.port = p,
            Err(_) => warn!(value = %port, "Ignoring invalid NSBLOOM_PORT"),
        }
    }
    if let Some(dir) = env("NSBLOOM_BLOOM_DIR") {
        config.bloom_dir = Some(PathBuf::from(dir));
    }
}
