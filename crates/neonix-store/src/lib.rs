//! Hierarchical container store for neonix.
//!
//! The store holds a tree of typed elements addressed by name inside their
//! parent. It knows nothing about recordings: blocks, groups, sources, data
//! arrays, multi-tags and metadata sections are its whole vocabulary.
//!
//! # Element Kinds
//!
//! - Block -- top-level typed container
//! - Group -- grouping inside a block; owns data arrays and multi-tags
//! - Source -- relationship node inside a block or another source
//! - DataArray -- flat typed array with unit and dimension descriptors
//! - MultiTag -- indexed tag pointing at position/extent arrays and features
//! - Section -- metadata section holding properties
//!
//! # Storage Backends
//!
//! All backends implement the [`ContainerStore`] trait:
//!
//! - [`InMemoryContainerStore`] -- tree held in memory, with a mutation
//!   counter for write accounting
//! - [`ContainerFile`] -- an in-memory store loaded from and persisted to a
//!   single file, opened in a [`FileMode`]
//!
//! # Design Rules
//!
//! 1. Sibling names are unique per element kind inside one parent.
//! 2. Back-references (`sources`) and tag links only ever point at live
//!    elements; removing an element scrubs every link to it.
//! 3. Structural mutations are serialized by the caller (single writer).
//! 4. All I/O errors are propagated, never silently ignored.

pub mod element;
pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use element::{
    ArrayData, Dimension, ElementId, ElementKind, Feature, Header, LinkType, Property,
    PropertyValue,
};
pub use error::{StoreError, StoreResult};
pub use file::{ContainerFile, FileMode, StoreConfig};
pub use memory::InMemoryContainerStore;
pub use traits::ContainerStore;
