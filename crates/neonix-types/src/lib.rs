//! Domain graph types for neonix.
//!
//! This crate defines the in-memory recording model that the synchronization
//! engine maps onto a container store. Every other neonix crate depends on
//! `neonix-types`.
//!
//! # Key Types
//!
//! - [`Graph`]: arena owning every entity of one domain graph
//! - [`RecordingBlock`], [`Segment`], [`ChannelGroup`], [`Signal`], [`Event`],
//!   [`Epoch`], [`SpikeTrain`], [`Unit`]: the fixed entity kinds
//! - [`ObjectRef`] / [`ObjectKind`]: type-erased handle to any entity
//! - [`Quantity`] / [`QuantityArray`]: values carrying a unit string
//! - [`Samples`]: N-d numeric payload, possibly a shape-only placeholder
//! - [`AnnotationValue`]: typed free-form annotation values
//! - [`Digest`]: content fingerprint of one entity

pub mod annotation;
pub mod digest;
pub mod entity;
pub mod error;
pub mod graph;
pub mod ids;
pub mod kind;
pub mod quantity;
pub mod samples;

pub use annotation::{AnnotationValue, Annotations, Scalar};
pub use digest::Digest;
pub use entity::{
    ChannelGroup, Common, Epoch, Event, RecordingBlock, Segment, Signal, SpikeTrain, TimeBasis,
    Unit, Waveforms,
};
pub use error::TypeError;
pub use graph::Graph;
pub use ids::{
    BlockId, ChannelGroupId, EpochId, EventId, GraphId, ObjectRef, SegmentId, SignalId,
    SpikeTrainId, UnitId,
};
pub use kind::{ContainerLabel, ObjectKind};
pub use quantity::{Quantity, QuantityArray};
pub use samples::Samples;
