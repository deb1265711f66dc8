//! Service Layer - Registry, bootstrap and routing
//!
//! - `NamespaceRegistry`: namespace → `FilterHandle`, lazy creation
//! - `BootstrapLoader`: populates the registry from the bloom directory
//! - `RequestRouter`: request parameters → registry operation → `Reply`
//! - `ServerContext`: the above, wired together once at startup

pub mod bootstrap;
pub mod context;
pub mod handle;
pub mod registry;
pub mod router;

pub use bootstrap::{load_word_list, run_stress, BootstrapLoader, WordListStats};
pub use context::ServerContext;
pub use handle::{FilterHandle, Insertion};
pub use registry::NamespaceRegistry;
pub use router::{Reply, RequestParams, RequestRouter};
