//! Synchronization between neonix domain graphs and container stores.
//!
//! A [`Session`] maps every entity of a [`Graph`](neonix_types::Graph) onto
//! store elements and back, remembering which element holds which object and
//! what each object looked like when last synced.
//!
//! # Key Types
//!
//! - [`Session`] -- write/read/materialize entry points and per-store state
//! - [`SyncConfig`] -- cascade, change detection and lazy-loading knobs
//! - [`NixPath`] -- name-based address of a stored object
//! - [`IdentityMap`] -- object ↔ element bindings, keyed by graph
//! - [`LazyRegistry`] -- objects read with placeholder payloads
//! - [`WriteStats`] -- what one write pass created, updated or skipped
//!
//! # Mapping
//!
//! | Entity | Store element |
//! |---|---|
//! | block | block + top-level section |
//! | segment | group |
//! | channel group | source under the block, one source per channel |
//! | unit | source under its channel group |
//! | analog / irregular signal | one data array per channel, `name.N` |
//! | event / epoch / spike train | multi-tag with `name.times` positions |
//!
//! # Design Rules
//!
//! 1. Store names come from one resolution pass per container, so equal or
//!    missing domain names never collide.
//! 2. An object whose digest is unchanged since it was last synced is not
//!    rewritten.
//! 3. Cross-references are written as back-references after both ends are
//!    bound; a dangling end is an error, never a silent skip.
//! 4. A placeholder payload is never written over stored data.

pub mod config;
pub mod error;
pub mod identity;
pub mod lazy;
pub mod metadata;
pub mod multiplex;
pub mod names;
pub mod path;
mod reader;
pub mod session;
mod writer;
pub mod xref;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use identity::{Binding, IdentityMap, ObjectKey};
pub use lazy::LazyRegistry;
pub use names::NameResolver;
pub use path::{locate, resolve, NixPath, Resolved};
pub use session::Session;
pub use writer::WriteStats;
