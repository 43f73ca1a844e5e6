use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::kind::ObjectKind;

/// Unique identity of one [`Graph`](crate::Graph).
///
/// Arena indices are only meaningful inside the graph that issued them, so
/// any cache keyed by domain object identity keys on `(GraphId, ObjectRef)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphId(Uuid);

impl GraphId {
    /// Generate a fresh graph identity.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for GraphId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0.simple().to_string();
        write!(f, "GraphId({})", &s[s.len() - 8..])
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(usize);

        impl $name {
            /// Wrap a raw arena index.
            pub const fn new(index: usize) -> Self {
                Self(index)
            }

            /// The raw arena index.
            pub const fn index(self) -> usize {
                self.0
            }
        }
    };
}

arena_id!(
    /// Index of a [`RecordingBlock`](crate::RecordingBlock) in its graph.
    BlockId
);
arena_id!(
    /// Index of a [`Segment`](crate::Segment) in its graph.
    SegmentId
);
arena_id!(
    /// Index of a [`ChannelGroup`](crate::ChannelGroup) in its graph.
    ChannelGroupId
);
arena_id!(
    /// Index of a [`Signal`](crate::Signal) in its graph.
    SignalId
);
arena_id!(
    /// Index of an [`Event`](crate::Event) in its graph.
    EventId
);
arena_id!(
    /// Index of an [`Epoch`](crate::Epoch) in its graph.
    EpochId
);
arena_id!(
    /// Index of a [`SpikeTrain`](crate::SpikeTrain) in its graph.
    SpikeTrainId
);
arena_id!(
    /// Index of a [`Unit`](crate::Unit) in its graph.
    UnitId
);

/// Type-erased handle to any entity of a graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectRef {
    pub kind: ObjectKind,
    pub index: usize,
}

impl ObjectRef {
    pub const fn new(kind: ObjectKind, index: usize) -> Self {
        Self { kind, index }
    }

    pub fn as_block(self) -> Option<BlockId> {
        (self.kind == ObjectKind::Block).then_some(BlockId(self.index))
    }

    pub fn as_segment(self) -> Option<SegmentId> {
        (self.kind == ObjectKind::Segment).then_some(SegmentId(self.index))
    }

    pub fn as_channel_group(self) -> Option<ChannelGroupId> {
        (self.kind == ObjectKind::ChannelGroup).then_some(ChannelGroupId(self.index))
    }

    pub fn as_signal(self) -> Option<SignalId> {
        self.kind.is_signal().then_some(SignalId(self.index))
    }

    pub fn as_event(self) -> Option<EventId> {
        (self.kind == ObjectKind::Event).then_some(EventId(self.index))
    }

    pub fn as_epoch(self) -> Option<EpochId> {
        (self.kind == ObjectKind::Epoch).then_some(EpochId(self.index))
    }

    pub fn as_spike_train(self) -> Option<SpikeTrainId> {
        (self.kind == ObjectKind::SpikeTrain).then_some(SpikeTrainId(self.index))
    }

    pub fn as_unit(self) -> Option<UnitId> {
        (self.kind == ObjectKind::Unit).then_some(UnitId(self.index))
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind.class_name(), self.index)
    }
}

macro_rules! into_object_ref {
    ($id:ident => $kind:ident) => {
        impl From<$id> for ObjectRef {
            fn from(id: $id) -> Self {
                ObjectRef::new(ObjectKind::$kind, id.0)
            }
        }
    };
}

into_object_ref!(BlockId => Block);
into_object_ref!(SegmentId => Segment);
into_object_ref!(ChannelGroupId => ChannelGroup);
into_object_ref!(EventId => Event);
into_object_ref!(EpochId => Epoch);
into_object_ref!(SpikeTrainId => SpikeTrain);
into_object_ref!(UnitId => Unit);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_ids_are_unique() {
        assert_ne!(GraphId::new(), GraphId::new());
    }

    #[test]
    fn object_ref_downcasts_by_kind() {
        let r: ObjectRef = SegmentId::new(3).into();
        assert_eq!(r.as_segment(), Some(SegmentId::new(3)));
        assert_eq!(r.as_block(), None);

        let sig = ObjectRef::new(ObjectKind::IrregularlySampledSignal, 1);
        assert_eq!(sig.as_signal(), Some(SignalId::new(1)));
    }

    #[test]
    fn object_ref_display() {
        let r: ObjectRef = UnitId::new(0).into();
        assert_eq!(r.to_string(), "Unit#0");
    }
}
