//! Adapters Layer - Port implementations backed by the filesystem

pub mod file_store;

pub use file_store::{PersistentFilter, FILE_MAGIC, FORMAT_VERSION};
