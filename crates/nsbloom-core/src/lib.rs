//! # nsbloom core
//!
//! Namespaced membership server: clients add keys and query membership over
//! HTTP, and each namespace is backed by its own scaling bloom filter file.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): namespaces, metrics, ids, configuration
//! - **Service Layer** (`service/`):
//!   - `NamespaceRegistry`: namespace → filter handle, lazily created
//!   - `BootstrapLoader`: loads the bloom directory at startup
//!   - `RequestRouter`: turns a request into an add, a check or a metrics read
//! - **Adapters Layer** (`adapters/`): axum transport, directory lock
//! - `BloomServer`: lifecycle (lock, bootstrap, serve, final flush)
//!
//! The core is generic over [`nsbloom_filters::MembershipFilter`]; the server
//! binary uses [`nsbloom_filters::PersistentFilter`].
//!
//! ## Invariants
//!
//! - A namespace maps to exactly one file, `<bloom_dir>/<namespace>.bf`
//! - A key is added at most once per namespace and receives exactly one id
//! - `queries == hits + misses` at every quiescent point
//!
//! ## Usage Example
//!
//! ```no_run
//! use nsbloom_core::{BloomServer, ServerConfig};
//!
//! # async fn run() -> Result<(), nsbloom_core::ServerError> {
//! let server: BloomServer = BloomServer::new(ServerConfig::for_dir("/var/lib/nsbloom"))?;
//! server.run(async { let _ = tokio::signal::ctrl_c().await; }).await
//! # }
//! ```

pub mod adapters;
pub mod domain;
pub mod error;
pub mod server;
pub mod service;

pub use adapters::{build_router, DirectoryLock};
pub use domain::{
    HttpConfig, InsertionIds, LimitsConfig, Metrics, MetricsSnapshot, Namespace, ServerConfig,
    StressConfig,
};
pub use error::{
    BootstrapError, ConfigError, LockError, NamespaceError, RegistryError, ServerError,
};
pub use server::BloomServer;
pub use service::{
    BootstrapLoader, FilterHandle, Insertion, NamespaceRegistry, Reply, RequestParams,
    RequestRouter, ServerContext,
};
