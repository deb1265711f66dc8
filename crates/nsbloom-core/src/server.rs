//! Server lifecycle: lock, bootstrap, serve, flush, release.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use nsbloom_filters::{MembershipFilter, PersistentFilter};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::adapters::http::build_router;
use crate::adapters::lock::DirectoryLock;
use crate::domain::ServerConfig;
use crate::error::ServerError;
use crate::service::{NamespaceRegistry, ServerContext};

/// A bootstrapped membership server, ready to accept connections
#[derive(Debug)]
pub struct BloomServer<F = PersistentFilter> {
    context: Arc<ServerContext<F>>,
    lock: DirectoryLock,
}

impl<F: MembershipFilter + 'static> BloomServer<F> {
    /// Validate `config`, lock the bloom directory and load it.
    ///
    /// Blocking: stress mode and large word lists can take a while.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;
        let lock = DirectoryLock::acquire(config.bloom_dir()?)?;
        let context = ServerContext::bootstrap(config)?;

        Ok(Self {
            context: Arc::new(context),
            lock,
        })
    }

    pub fn context(&self) -> &Arc<ServerContext<F>> {
        &self.context
    }

    /// The axum router for this server
    pub fn router(&self) -> Router {
        build_router(Arc::clone(&self.context))
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<(), ServerError> {
        let addr = self.context.config().http_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        self.run_with_listener(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves, then
    /// flush every filter and release the directory lock
    pub async fn run_with_listener(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let local_addr: Option<SocketAddr> = listener.local_addr().ok();
        info!(
            addr = ?local_addr,
            bloom_dir = ?self.context.config().bloom_dir,
            namespaces = self.context.registry().len(),
            "Membership server listening"
        );

        let (stop_tx, stop_rx) = oneshot::channel();
        let flusher = self
            .context
            .config()
            .flush_interval()
            .map(|period| spawn_flush_task(Arc::clone(self.context.registry()), period, stop_rx));

        let served = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(ServerError::Serve);

        info!("Shutting down membership server");
        let _ = stop_tx.send(());
        if let Some(flusher) = flusher {
            if let Err(e) = flusher.await {
                warn!(error = %e, "Flush task ended abnormally");
            }
        }

        let registry = Arc::clone(self.context.registry());
        let failures = tokio::task::spawn_blocking(move || registry.close())
            .await
            .map_err(|e| ServerError::Task(e.to_string()))?;
        if failures > 0 {
            error!(failures, "Some filters could not be flushed at shutdown");
        }

        drop(self.lock);
        info!("Membership server stopped");
        served
    }
}

/// Periodically persist dirty filters until `stop` fires
fn spawn_flush_task<F: MembershipFilter + 'static>(
    registry: Arc<NamespaceRegistry<F>>,
    period: Duration,
    mut stop: oneshot::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = &mut stop => break,
                _ = ticker.tick() => {
                    let registry = Arc::clone(&registry);
                    if let Err(e) = tokio::task::spawn_blocking(move || registry.flush_all()).await {
                        error!(error = %e, "Flush task panicked");
                    }
                }
            }
        }
    })
}
