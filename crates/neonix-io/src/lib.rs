//! File-backed entry point for neonix.
//!
//! [`NixIo`] opens a container file in a [`FileMode`](neonix_store::FileMode)
//! and owns one [`Session`](neonix_sync::Session) for as long as the file is
//! open. Every public sync operation goes through it:
//!
//! - `write_all(graph)` / `write(graph, object, parent)`
//! - `read_all()` / `read(path, defer, graph)`
//! - `materialize(path, graph)`
//! - `close()`

pub mod config;
pub mod error;
pub mod nixio;

pub use config::IoConfig;
pub use error::{IoError, IoResult};
pub use nixio::NixIo;

pub use neonix_store::FileMode;
pub use neonix_sync::{NixPath, SyncConfig, WriteStats};
