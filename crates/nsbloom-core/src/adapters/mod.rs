//! Adapters Layer - HTTP transport and filesystem locking

pub mod http;
pub mod lock;

pub use http::build_router;
pub use lock::{DirectoryLock, LockError};
