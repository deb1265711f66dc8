//! nsbloomd: namespaced bloom filter membership server
//!
//! ```text
//! nsbloomd --folder=<blooms_dir>      # -f, required
//!          [--port=<port>]            # -p, default 9003
//!          [--bootstrap=<file>]       # -b, word list for the default namespace
//!          [--test]                   # -t, stress mode
//!          [--daemon]                 # -d, run in the background
//! ```
//!
//! POST `key=foo[&ns=bar]` adds a key, GET `?key=foo[&ns=bar]` queries it,
//! GET `?metrics=1` returns usage counters.

mod cli;

use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use clap::Parser;
use nsbloom_core::BloomServer;
use nsbloom_telemetry::{init_logging, TelemetryConfig};
use tokio::signal;
use tracing::{error, info};

use cli::Args;

/// Set in the environment of the re-spawned background process
const DAEMON_CHILD_ENV: &str = "NSBLOOMD_DAEMON_CHILD";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&TelemetryConfig::from_env()).context("Failed to initialize logging")?;

    let config = args.server_config(|name| std::env::var(name).ok())?;
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(e).context("Invalid configuration (see --help; --folder is required)");
    }

    if config.daemon && std::env::var_os(DAEMON_CHILD_ENV).is_none() {
        let pid = spawn_daemon()?;
        println!("nsbloomd started as daemon with PID {pid}");
        return Ok(());
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.http.port,
        bloom_dir = ?config.bloom_dir,
        "Starting nsbloomd"
    );

    // Bootstrap reads every filter file (and may run stress mode)
    let server: BloomServer = tokio::task::spawn_blocking(move || BloomServer::new(config))
        .await
        .context("Bootstrap task failed")?
        .context("Failed to start server")?;

    server
        .run(shutdown_signal())
        .await
        .context("Server failed")?;

    Ok(())
}

/// Re-run this executable in the background with the same arguments
fn spawn_daemon() -> Result<u32> {
    let exe = std::env::current_exe().context("Failed to locate current executable")?;
    let child = Command::new(exe)
        .args(std::env::args_os().skip(1))
        .env(DAEMON_CHILD_ENV, "1")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("Failed to spawn daemon process")?;
    Ok(child.id())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
