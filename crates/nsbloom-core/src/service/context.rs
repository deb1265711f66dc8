//! Shared server state, built once at startup

use std::sync::Arc;

use nsbloom_filters::MembershipFilter;

use super::bootstrap::BootstrapLoader;
use super::registry::NamespaceRegistry;
use super::router::RequestRouter;
use crate::domain::{InsertionIds, Metrics, ServerConfig};
use crate::error::BootstrapError;

/// Everything a request needs, shared by `Arc` with the transport and
/// background tasks
#[derive(Debug)]
pub struct ServerContext<F> {
    config: ServerConfig,
    registry: Arc<NamespaceRegistry<F>>,
    metrics: Arc<Metrics>,
    ids: Arc<InsertionIds>,
    router: RequestRouter<F>,
}

impl<F: MembershipFilter> ServerContext<F> {
    /// Load the bloom directory and wire the router to it
    pub fn bootstrap(config: ServerConfig) -> Result<Self, BootstrapError> {
        let metrics = Arc::new(Metrics::new());
        let ids = Arc::new(InsertionIds::new());

        let registry = Arc::new(BootstrapLoader::new(&config, Arc::clone(&metrics), &ids).load()?);
        let router = RequestRouter::new(
            Arc::clone(&registry),
            Arc::clone(&metrics),
            Arc::clone(&ids),
            config.limits.clone(),
        );

        Ok(Self {
            config,
            registry,
            metrics,
            ids,
            router,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<NamespaceRegistry<F>> {
        &self.registry
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn ids(&self) -> &InsertionIds {
        &self.ids
    }

    pub fn router(&self) -> &RequestRouter<F> {
        &self.router
    }
}
