//! Arena owning one domain graph.
//!
//! [`Graph`] stores every entity in a per-kind vector and hands out typed
//! indices. The `add_*` methods maintain owning lists and back-references;
//! `link_*` methods maintain the non-tree cross-references.
//!
//! # Invariants
//!
//! - Every owning list entry refers to an entity whose back-reference points
//!   at the owner.
//! - A signal appears in exactly one of its segment's signal lists, chosen by
//!   its time basis.

use serde::{Deserialize, Serialize};

use crate::entity::{
    ChannelGroup, Common, Epoch, Event, RecordingBlock, Segment, Signal, SpikeTrain, Unit,
};
use crate::ids::{
    BlockId, ChannelGroupId, EpochId, EventId, GraphId, ObjectRef, SegmentId, SignalId,
    SpikeTrainId, UnitId,
};
use crate::kind::ObjectKind;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Graph {
    id: GraphId,
    blocks: Vec<RecordingBlock>,
    segments: Vec<Segment>,
    channel_groups: Vec<ChannelGroup>,
    signals: Vec<Signal>,
    events: Vec<Event>,
    epochs: Vec<Epoch>,
    spike_trains: Vec<SpikeTrain>,
    units: Vec<Unit>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    /// Root blocks in insertion order.
    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        (0..self.blocks.len()).map(BlockId::new)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    // ---------------------------------------------------------------
    // Construction
    // ---------------------------------------------------------------

    pub fn add_block(&mut self, block: RecordingBlock) -> BlockId {
        self.blocks.push(block);
        BlockId::new(self.blocks.len() - 1)
    }

    pub fn add_segment(&mut self, block: BlockId, mut segment: Segment) -> SegmentId {
        let id = SegmentId::new(self.segments.len());
        segment.block = Some(block);
        self.segments.push(segment);
        self.blocks[block.index()].segments.push(id);
        id
    }

    pub fn add_channel_group(&mut self, block: BlockId, mut group: ChannelGroup) -> ChannelGroupId {
        let id = ChannelGroupId::new(self.channel_groups.len());
        group.block = Some(block);
        self.channel_groups.push(group);
        self.blocks[block.index()].channel_groups.push(id);
        id
    }

    pub fn add_signal(&mut self, segment: SegmentId, mut signal: Signal) -> SignalId {
        let id = SignalId::new(self.signals.len());
        signal.segment = Some(segment);
        let seg = &mut self.segments[segment.index()];
        if signal.is_regular() {
            seg.analog_signals.push(id);
        } else {
            seg.irregular_signals.push(id);
        }
        self.signals.push(signal);
        id
    }

    pub fn add_event(&mut self, segment: SegmentId, mut event: Event) -> EventId {
        let id = EventId::new(self.events.len());
        event.segment = Some(segment);
        self.events.push(event);
        self.segments[segment.index()].events.push(id);
        id
    }

    pub fn add_epoch(&mut self, segment: SegmentId, mut epoch: Epoch) -> EpochId {
        let id = EpochId::new(self.epochs.len());
        epoch.segment = Some(segment);
        self.epochs.push(epoch);
        self.segments[segment.index()].epochs.push(id);
        id
    }

    pub fn add_spike_train(&mut self, segment: SegmentId, mut train: SpikeTrain) -> SpikeTrainId {
        let id = SpikeTrainId::new(self.spike_trains.len());
        train.segment = Some(segment);
        self.spike_trains.push(train);
        self.segments[segment.index()].spike_trains.push(id);
        id
    }

    pub fn add_unit(&mut self, group: ChannelGroupId, mut unit: Unit) -> UnitId {
        let id = UnitId::new(self.units.len());
        unit.channel_group = Some(group);
        self.units.push(unit);
        self.channel_groups[group.index()].units.push(id);
        id
    }

    /// Record that `group` covers `signal`. Linking twice is a no-op.
    pub fn link_signal(&mut self, group: ChannelGroupId, signal: SignalId) {
        let g = &mut self.channel_groups[group.index()];
        if !g.signals.contains(&signal) {
            g.signals.push(signal);
        }
        self.signals[signal.index()].channel_group = Some(group);
    }

    /// Record that `unit` fired `train`. Linking twice is a no-op.
    pub fn link_spike_train(&mut self, unit: UnitId, train: SpikeTrainId) {
        let u = &mut self.units[unit.index()];
        if !u.spike_trains.contains(&train) {
            u.spike_trains.push(train);
        }
        self.spike_trains[train.index()].unit = Some(unit);
    }

    // ---------------------------------------------------------------
    // Access
    // ---------------------------------------------------------------

    pub fn block(&self, id: BlockId) -> &RecordingBlock {
        &self.blocks[id.index()]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut RecordingBlock {
        &mut self.blocks[id.index()]
    }

    pub fn segment(&self, id: SegmentId) -> &Segment {
        &self.segments[id.index()]
    }

    pub fn segment_mut(&mut self, id: SegmentId) -> &mut Segment {
        &mut self.segments[id.index()]
    }

    pub fn channel_group(&self, id: ChannelGroupId) -> &ChannelGroup {
        &self.channel_groups[id.index()]
    }

    pub fn channel_group_mut(&mut self, id: ChannelGroupId) -> &mut ChannelGroup {
        &mut self.channel_groups[id.index()]
    }

    pub fn signal(&self, id: SignalId) -> &Signal {
        &self.signals[id.index()]
    }

    pub fn signal_mut(&mut self, id: SignalId) -> &mut Signal {
        &mut self.signals[id.index()]
    }

    pub fn event(&self, id: EventId) -> &Event {
        &self.events[id.index()]
    }

    pub fn event_mut(&mut self, id: EventId) -> &mut Event {
        &mut self.events[id.index()]
    }

    pub fn epoch(&self, id: EpochId) -> &Epoch {
        &self.epochs[id.index()]
    }

    pub fn epoch_mut(&mut self, id: EpochId) -> &mut Epoch {
        &mut self.epochs[id.index()]
    }

    pub fn spike_train(&self, id: SpikeTrainId) -> &SpikeTrain {
        &self.spike_trains[id.index()]
    }

    pub fn spike_train_mut(&mut self, id: SpikeTrainId) -> &mut SpikeTrain {
        &mut self.spike_trains[id.index()]
    }

    pub fn unit(&self, id: UnitId) -> &Unit {
        &self.units[id.index()]
    }

    pub fn unit_mut(&mut self, id: UnitId) -> &mut Unit {
        &mut self.units[id.index()]
    }

    // ---------------------------------------------------------------
    // Type-erased access
    // ---------------------------------------------------------------

    /// Handle for a signal; the kind follows its time basis.
    pub fn signal_ref(&self, id: SignalId) -> ObjectRef {
        let kind = if self.signal(id).is_regular() {
            ObjectKind::AnalogSignal
        } else {
            ObjectKind::IrregularlySampledSignal
        };
        ObjectRef::new(kind, id.index())
    }

    /// Returns `true` if `obj` indexes an entity of this graph.
    pub fn contains(&self, obj: ObjectRef) -> bool {
        let len = match obj.kind {
            ObjectKind::Block => self.blocks.len(),
            ObjectKind::Segment => self.segments.len(),
            ObjectKind::ChannelGroup => self.channel_groups.len(),
            ObjectKind::AnalogSignal | ObjectKind::IrregularlySampledSignal => {
                return obj.index < self.signals.len() && self.signal_ref(SignalId::new(obj.index)) == obj;
            }
            ObjectKind::Event => self.events.len(),
            ObjectKind::Epoch => self.epochs.len(),
            ObjectKind::SpikeTrain => self.spike_trains.len(),
            ObjectKind::Unit => self.units.len(),
        };
        obj.index < len
    }

    pub fn common(&self, obj: ObjectRef) -> &Common {
        let i = obj.index;
        match obj.kind {
            ObjectKind::Block => &self.blocks[i].common,
            ObjectKind::Segment => &self.segments[i].common,
            ObjectKind::ChannelGroup => &self.channel_groups[i].common,
            ObjectKind::AnalogSignal | ObjectKind::IrregularlySampledSignal => {
                &self.signals[i].common
            }
            ObjectKind::Event => &self.events[i].common,
            ObjectKind::Epoch => &self.epochs[i].common,
            ObjectKind::SpikeTrain => &self.spike_trains[i].common,
            ObjectKind::Unit => &self.units[i].common,
        }
    }

    pub fn common_mut(&mut self, obj: ObjectRef) -> &mut Common {
        let i = obj.index;
        match obj.kind {
            ObjectKind::Block => &mut self.blocks[i].common,
            ObjectKind::Segment => &mut self.segments[i].common,
            ObjectKind::ChannelGroup => &mut self.channel_groups[i].common,
            ObjectKind::AnalogSignal | ObjectKind::IrregularlySampledSignal => {
                &mut self.signals[i].common
            }
            ObjectKind::Event => &mut self.events[i].common,
            ObjectKind::Epoch => &mut self.epochs[i].common,
            ObjectKind::SpikeTrain => &mut self.spike_trains[i].common,
            ObjectKind::Unit => &mut self.units[i].common,
        }
    }

    /// The object's name, or `""` if none is assigned.
    pub fn name(&self, obj: ObjectRef) -> &str {
        self.common(obj).name_or_empty()
    }

    /// The owning object, following back-references. `None` for blocks and
    /// for objects not yet attached to a parent.
    pub fn parent(&self, obj: ObjectRef) -> Option<ObjectRef> {
        let i = obj.index;
        match obj.kind {
            ObjectKind::Block => None,
            ObjectKind::Segment => self.segments[i].block.map(Into::into),
            ObjectKind::ChannelGroup => self.channel_groups[i].block.map(Into::into),
            ObjectKind::AnalogSignal | ObjectKind::IrregularlySampledSignal => {
                self.signals[i].segment.map(Into::into)
            }
            ObjectKind::Event => self.events[i].segment.map(Into::into),
            ObjectKind::Epoch => self.epochs[i].segment.map(Into::into),
            ObjectKind::SpikeTrain => self.spike_trains[i].segment.map(Into::into),
            ObjectKind::Unit => self.units[i].channel_group.map(Into::into),
        }
    }

    /// Owned children of `obj` of one declared child kind, in order.
    pub fn children(&self, obj: ObjectRef, kind: ObjectKind) -> Vec<ObjectRef> {
        let i = obj.index;
        let refs = |indices: Vec<usize>| -> Vec<ObjectRef> {
            indices.into_iter().map(|ix| ObjectRef::new(kind, ix)).collect()
        };
        match (obj.kind, kind) {
            (ObjectKind::Block, ObjectKind::Segment) => {
                refs(self.blocks[i].segments.iter().map(|s| s.index()).collect())
            }
            (ObjectKind::Block, ObjectKind::ChannelGroup) => {
                refs(self.blocks[i].channel_groups.iter().map(|g| g.index()).collect())
            }
            (ObjectKind::Segment, ObjectKind::AnalogSignal) => {
                refs(self.segments[i].analog_signals.iter().map(|s| s.index()).collect())
            }
            (ObjectKind::Segment, ObjectKind::IrregularlySampledSignal) => {
                refs(self.segments[i].irregular_signals.iter().map(|s| s.index()).collect())
            }
            (ObjectKind::Segment, ObjectKind::Event) => {
                refs(self.segments[i].events.iter().map(|e| e.index()).collect())
            }
            (ObjectKind::Segment, ObjectKind::Epoch) => {
                refs(self.segments[i].epochs.iter().map(|e| e.index()).collect())
            }
            (ObjectKind::Segment, ObjectKind::SpikeTrain) => {
                refs(self.segments[i].spike_trains.iter().map(|s| s.index()).collect())
            }
            (ObjectKind::ChannelGroup, ObjectKind::Unit) => {
                refs(self.channel_groups[i].units.iter().map(|u| u.index()).collect())
            }
            _ => Vec::new(),
        }
    }
}
