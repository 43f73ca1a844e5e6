//! Store → graph reconstruction.
//!
//! Elements are read parent first. Every object read is bound in the
//! session's identity map and its digest recorded, so writing an unmodified
//! graph back touches nothing. With `defer`, signal samples, spike times and
//! waveforms come back as placeholders and their paths are registered for
//! later materialization.

use neonix_store::{ArrayData, ContainerStore, Dimension, ElementId, ElementKind, Header, LinkType};
use neonix_types::{
    BlockId, ChannelGroup, ChannelGroupId, Common, ContainerLabel, Epoch, Event, Graph, ObjectKind,
    ObjectRef, Quantity, QuantityArray, RecordingBlock, Samples, Segment, SegmentId, Signal,
    SignalId, SpikeTrain, SpikeTrainId, Unit, UnitId, Waveforms,
};
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};
use crate::identity::Binding;
use crate::metadata::{self, Properties};
use crate::multiplex;
use crate::path::{self, NixPath};
use crate::session::Session;
use crate::xref;

/// A freshly decoded tag object.
enum Tag {
    Event(Event),
    Epoch(Epoch),
    SpikeTrain(SpikeTrain),
}

pub(crate) struct Reader<'a, S: ContainerStore + ?Sized> {
    store: &'a S,
    session: &'a mut Session,
    graph: &'a mut Graph,
    defer: bool,
    cascade: bool,
}

impl<'a, S: ContainerStore + ?Sized> Reader<'a, S> {
    pub(crate) fn new(store: &'a S, session: &'a mut Session, graph: &'a mut Graph, defer: bool) -> Self {
        let cascade = session.config.cascade;
        Self {
            store,
            session,
            graph,
            defer,
            cascade,
        }
    }

    /// Read every block at the store root.
    pub(crate) fn read_blocks(&mut self) -> SyncResult<Vec<BlockId>> {
        let mut out = Vec::new();
        for el in self.typed_children(None, ElementKind::Block, ObjectKind::Block.type_name())? {
            out.push(self.read_block(el)?);
        }
        Ok(out)
    }

    /// Read the object at `path`, reading missing ancestors shallowly.
    pub(crate) fn read_path(&mut self, path: &NixPath) -> SyncResult<ObjectRef> {
        let kind = path.object_kind().ok_or_else(|| SyncError::InvalidPath {
            path: path.to_string(),
            reason: "recording channels are not domain objects".into(),
        })?;
        let resolved = path::resolve(self.store, path)?;
        let Some(parent_path) = path.parent() else {
            return self.read_block(resolved.element).map(Into::into);
        };
        let parent = self.ensure_object(&parent_path)?;
        let container = resolved.container.ok_or_else(|| SyncError::NotFound {
            path: parent_path.to_string(),
        })?;
        let wrong_parent = || SyncError::InvalidPath {
            path: path.to_string(),
            reason: format!("a {kind} cannot live under a {}", parent.kind),
        };

        match kind {
            ObjectKind::Block => unreachable!("blocks have root paths"),
            ObjectKind::Segment => {
                let block = parent.as_block().ok_or_else(wrong_parent)?;
                self.read_segment(block, resolved.element, &parent_path).map(Into::into)
            }
            ObjectKind::ChannelGroup => {
                let block = parent.as_block().ok_or_else(wrong_parent)?;
                self.read_channel_group(block, resolved.element, container).map(Into::into)
            }
            ObjectKind::AnalogSignal | ObjectKind::IrregularlySampledSignal => {
                let segment = parent.as_segment().ok_or_else(wrong_parent)?;
                let id = self.read_signal(segment, path.name(), &resolved.channels, kind, &parent_path)?;
                Ok(self.graph.signal_ref(id))
            }
            ObjectKind::Event | ObjectKind::Epoch | ObjectKind::SpikeTrain => {
                let segment = parent.as_segment().ok_or_else(wrong_parent)?;
                self.read_tag(segment, resolved.element, kind, &parent_path)
            }
            ObjectKind::Unit => {
                let group = parent.as_channel_group().ok_or_else(wrong_parent)?;
                let block = self.store.header(container)?.parent.ok_or_else(wrong_parent)?;
                self.read_unit(group, resolved.element, block).map(Into::into)
            }
        }
    }

    /// Reload the payload of an object read with placeholders, in place.
    pub(crate) fn reload(&mut self, obj: ObjectRef, path: &NixPath) -> SyncResult<()> {
        let resolved = path::resolve(self.store, path)?;
        match obj.kind {
            ObjectKind::AnalogSignal | ObjectKind::IrregularlySampledSignal => {
                let mut fresh = self.decode_signal(path.name(), &resolved.channels, obj.kind)?;
                let signal = self.graph.signal_mut(SignalId::new(obj.index));
                fresh.segment = signal.segment;
                fresh.channel_group = signal.channel_group;
                *signal = fresh;
                self.bind(obj, Binding::Multiple(resolved.channels));
            }
            ObjectKind::SpikeTrain => {
                let Tag::SpikeTrain(mut fresh) = self.decode_tag(resolved.element, obj.kind)? else {
                    unreachable!("decode_tag follows the requested kind")
                };
                let train = self.graph.spike_train_mut(SpikeTrainId::new(obj.index));
                fresh.segment = train.segment;
                fresh.unit = train.unit;
                *train = fresh;
                self.bind(obj, Binding::Single(resolved.element));
            }
            other => {
                return Err(SyncError::InvalidPath {
                    path: path.to_string(),
                    reason: format!("a {other} has no deferred payload"),
                })
            }
        }
        debug!(path = %path, "materialized payload");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Per kind
    // -----------------------------------------------------------------------

    fn read_block(&mut self, el: ElementId) -> SyncResult<BlockId> {
        let header = self.store.header(el)?;
        let props = Properties::load(self.store, header.metadata)?;
        let block = RecordingBlock {
            common: common_from(&header, &props, ObjectKind::Block),
            rec_datetime: header.created_at.and_then(metadata::from_seconds),
            file_datetime: props.datetime(metadata::FILE_DATETIME),
            ..Default::default()
        };
        let id = self.graph.add_block(block);
        self.bind(id.into(), Binding::Single(el));

        if self.cascade {
            let path = NixPath::root(&header.name);
            let segments = self.typed_children(Some(el), ElementKind::Group, ObjectKind::Segment.type_name())?;
            for seg in segments {
                self.read_segment(id, seg, &path)?;
            }
            let groups =
                self.typed_children(Some(el), ElementKind::Source, ObjectKind::ChannelGroup.type_name())?;
            for grp in groups {
                self.read_channel_group(id, grp, el)?;
            }
        }
        info!(block = %header.name, "read block");
        Ok(id)
    }

    fn read_segment(&mut self, block: BlockId, el: ElementId, block_path: &NixPath) -> SyncResult<SegmentId> {
        let header = self.store.header(el)?;
        let props = Properties::load(self.store, header.metadata)?;
        let segment = Segment {
            common: common_from(&header, &props, ObjectKind::Segment),
            rec_datetime: header.created_at.and_then(metadata::from_seconds),
            file_datetime: props.datetime(metadata::FILE_DATETIME),
            ..Default::default()
        };
        let id = self.graph.add_segment(block, segment);
        self.bind(id.into(), Binding::Single(el));

        if self.cascade {
            let path = block_path.child(ContainerLabel::Segments, &header.name)?;
            for kind in ObjectKind::Segment.child_kinds() {
                if kind.is_signal() {
                    for prefix in multiplex::signal_prefixes(self.store, el, kind.type_name())? {
                        let arrays = multiplex::channel_arrays(self.store, el, &prefix, kind.type_name())?;
                        if arrays.is_empty() {
                            debug!(signal = %prefix, "no channel 0, skipping");
                            continue;
                        }
                        self.read_signal(id, &prefix, &arrays, *kind, &path)?;
                    }
                } else {
                    for tag in self.typed_children(Some(el), ElementKind::MultiTag, kind.type_name())? {
                        self.read_tag(id, tag, *kind, &path)?;
                    }
                }
            }
        }
        Ok(id)
    }

    fn read_signal(
        &mut self,
        segment: SegmentId,
        prefix: &str,
        arrays: &[ElementId],
        kind: ObjectKind,
        segment_path: &NixPath,
    ) -> SyncResult<SignalId> {
        let signal = self.decode_signal(prefix, arrays, kind)?;
        let deferred = signal.samples.is_placeholder();
        let id = self.graph.add_signal(segment, signal);
        let obj = self.graph.signal_ref(id);
        self.bind(obj, Binding::Multiple(arrays.to_vec()));
        if deferred {
            if let Some(label) = kind.label() {
                let path = segment_path.child(label, prefix)?;
                self.session.lazy.register(path, self.graph.id(), obj);
            }
        }
        Ok(id)
    }

    fn read_tag(
        &mut self,
        segment: SegmentId,
        el: ElementId,
        kind: ObjectKind,
        segment_path: &NixPath,
    ) -> SyncResult<ObjectRef> {
        let obj: ObjectRef = match self.decode_tag(el, kind)? {
            Tag::Event(event) => self.graph.add_event(segment, event).into(),
            Tag::Epoch(epoch) => self.graph.add_epoch(segment, epoch).into(),
            Tag::SpikeTrain(train) => {
                let deferred = train.times_deferred
                    || train.waveforms.as_ref().is_some_and(|w| w.samples.is_placeholder());
                let obj: ObjectRef = self.graph.add_spike_train(segment, train).into();
                if deferred {
                    let name = self.store.header(el)?.name;
                    let path = segment_path.child(ContainerLabel::SpikeTrains, name)?;
                    self.session.lazy.register(path, self.graph.id(), obj);
                }
                obj
            }
        };
        self.bind(obj, Binding::Single(el));
        Ok(obj)
    }

    fn read_channel_group(
        &mut self,
        block: BlockId,
        el: ElementId,
        block_el: ElementId,
    ) -> SyncResult<ChannelGroupId> {
        let header = self.store.header(el)?;
        let props = Properties::load(self.store, header.metadata)?;
        let group = ChannelGroup {
            common: common_from(&header, &props, ObjectKind::ChannelGroup),
            channel_indexes: props.ints(metadata::CHANNEL_INDEXES),
            channel_names: props.strs(metadata::CHANNEL_NAMES),
            coordinates: coordinates(&props),
            ..Default::default()
        };
        let id = self.graph.add_channel_group(block, group);
        self.bind(id.into(), Binding::Single(el));

        if self.cascade {
            let units = self.typed_children(Some(el), ElementKind::Source, ObjectKind::Unit.type_name())?;
            for unit in units {
                self.read_unit(id, unit, block_el)?;
            }
        }
        let order = props.strs(metadata::SIGNAL_ORDER);
        let attached = xref::attach_group_signals(
            self.store,
            &self.session.identity,
            self.graph,
            block_el,
            id,
            el,
            &order,
        )?;
        debug!(group = %header.name, signals = attached, "read channel group");
        Ok(id)
    }

    fn read_unit(&mut self, group: ChannelGroupId, el: ElementId, block_el: ElementId) -> SyncResult<UnitId> {
        let header = self.store.header(el)?;
        let props = Properties::load(self.store, header.metadata)?;
        let unit = Unit {
            common: common_from(&header, &props, ObjectKind::Unit),
            ..Default::default()
        };
        let id = self.graph.add_unit(group, unit);
        self.bind(id.into(), Binding::Single(el));
        let order = props.strs(metadata::SPIKE_TRAIN_ORDER);
        xref::attach_unit_spike_trains(
            self.store,
            &self.session.identity,
            self.graph,
            block_el,
            id,
            el,
            &order,
        )?;
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Decoding
    // -----------------------------------------------------------------------

    fn decode_signal(&self, prefix: &str, arrays: &[ElementId], kind: ObjectKind) -> SyncResult<Signal> {
        let payload = multiplex::read_signal(
            self.store,
            prefix,
            arrays,
            self.defer,
            self.session.config.verify_signal_groups,
        )?;
        let props = Properties::load(self.store, payload.section)?;
        let description = match arrays.first() {
            Some(first) => self.store.header(*first)?.definition,
            None => None,
        };
        let time_basis = multiplex::time_basis(&payload.time_dimension, props.quantity(metadata::T_START))
            .ok_or_else(|| SyncError::InconsistentSignalGroup {
                prefix: prefix.to_string(),
                reason: "time axis is a set dimension".into(),
            })?;
        Ok(Signal {
            common: Common {
                name: props.str(metadata::NAME),
                description,
                file_origin: props.str(metadata::FILE_ORIGIN),
                annotations: props.annotations(kind),
            },
            samples: payload.samples,
            units: payload.units,
            time_basis,
            segment: None,
            channel_group: None,
        })
    }

    fn decode_tag(&self, el: ElementId, kind: ObjectKind) -> SyncResult<Tag> {
        let header = self.store.header(el)?;
        let props = Properties::load(self.store, header.metadata)?;
        let common = common_from(&header, &props, kind);
        let positions = self.store.positions(el)?;

        match kind {
            ObjectKind::Event => {
                let (times, labels) = self.times(positions)?;
                Ok(Tag::Event(Event {
                    common,
                    times,
                    labels,
                    segment: None,
                }))
            }
            ObjectKind::Epoch => {
                let (times, labels) = self.times(positions)?;
                let durations = match self.store.extents(el)? {
                    Some(array) => self.quantities(array)?,
                    None => QuantityArray::new(Vec::new(), times.units.clone()),
                };
                Ok(Tag::Epoch(Epoch {
                    common,
                    times,
                    durations,
                    labels,
                    segment: None,
                }))
            }
            ObjectKind::SpikeTrain => {
                let (times, declared_len) = match positions {
                    Some(array) if self.defer => {
                        let len = self.store.shape(array)?.first().copied().unwrap_or(0);
                        let units = self.store.unit(array)?.unwrap_or_else(|| "s".to_string());
                        (QuantityArray::new(Vec::new(), units), len)
                    }
                    _ => {
                        let (times, _) = self.times(positions)?;
                        let len = times.len();
                        (times, len)
                    }
                };
                let default_units = times.units.clone();
                Ok(Tag::SpikeTrain(SpikeTrain {
                    common,
                    t_start: props
                        .quantity(metadata::T_START)
                        .unwrap_or_else(|| Quantity::new(0.0, default_units.clone())),
                    t_stop: props
                        .quantity(metadata::T_STOP)
                        .unwrap_or_else(|| Quantity::new(0.0, default_units)),
                    waveforms: self.waveforms(el, &props)?,
                    times_deferred: self.defer && positions.is_some(),
                    declared_len,
                    times,
                    segment: None,
                    unit: None,
                }))
            }
            other => Err(SyncError::Malformed {
                element: header.name,
                reason: format!("a {other} is not stored as a tag"),
            }),
        }
    }

    fn times(&self, positions: Option<ElementId>) -> SyncResult<(QuantityArray, Vec<String>)> {
        let Some(array) = positions else {
            return Ok((QuantityArray::new(Vec::new(), "s"), Vec::new()));
        };
        let labels = match self.store.dimensions(array)?.into_iter().next() {
            Some(Dimension::Set { labels }) => labels,
            _ => Vec::new(),
        };
        Ok((self.quantities(array)?, labels))
    }

    fn quantities(&self, array: ElementId) -> SyncResult<QuantityArray> {
        let units = self.store.unit(array)?.unwrap_or_else(|| "s".to_string());
        Ok(QuantityArray::new(self.floats(array)?, units))
    }

    fn waveforms(&self, tag: ElementId, props: &Properties) -> SyncResult<Option<Waveforms>> {
        let Some(feature) = self
            .store
            .features(tag)?
            .into_iter()
            .find(|f| f.link_type == LinkType::Indexed)
        else {
            return Ok(None);
        };
        let array = feature.data;
        let shape = self.store.shape(array)?;
        let units = self.store.unit(array)?.unwrap_or_else(|| "dimensionless".to_string());
        let sampling_period = match self.store.dimensions(array)?.get(2) {
            Some(Dimension::Sampled { interval, unit, .. }) => Some(Quantity::new(
                *interval,
                unit.clone().unwrap_or_else(|| "s".to_string()),
            )),
            _ => None,
        };
        let samples = if self.defer {
            Samples::placeholder(shape)
        } else {
            Samples::new(shape, self.floats(array)?)?
        };
        Ok(Some(Waveforms {
            samples,
            units,
            sampling_period,
            left_sweep: props.quantity(metadata::LEFT_SWEEP),
        }))
    }

    fn floats(&self, array: ElementId) -> SyncResult<Vec<f64>> {
        match self.store.data(array)? {
            ArrayData::Float(v) => Ok(v),
            ArrayData::Int(v) => Ok(v.into_iter().map(|i| i as f64).collect()),
            ArrayData::Text(_) => Err(SyncError::Malformed {
                element: self.store.header(array)?.name,
                reason: "expected numeric data, found text".into(),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// The object a path's element was read into, reading it shallowly if
    /// this graph has not seen it yet.
    fn ensure_object(&mut self, path: &NixPath) -> SyncResult<ObjectRef> {
        let resolved = path::resolve(self.store, path)?;
        if let Some(obj) = self.session.identity.object_of(self.graph.id(), resolved.element) {
            if self.graph.contains(obj) {
                return Ok(obj);
            }
        }
        let cascade = std::mem::replace(&mut self.cascade, false);
        let out = self.read_path(path);
        self.cascade = cascade;
        out
    }

    fn bind(&mut self, obj: ObjectRef, binding: Binding) {
        let key = (self.graph.id(), obj);
        self.session.hashes.insert(key, neonix_hash::digest(self.graph, obj));
        self.session.identity.bind(key, binding);
    }

    fn typed_children(
        &self,
        parent: Option<ElementId>,
        kind: ElementKind,
        type_name: &str,
    ) -> SyncResult<Vec<ElementId>> {
        let mut out = Vec::new();
        for id in self.store.list(parent, kind)? {
            if self.store.header(id)?.type_name == type_name {
                out.push(id);
            }
        }
        Ok(out)
    }
}

fn common_from(header: &Header, props: &Properties, kind: ObjectKind) -> Common {
    Common {
        name: props.str(metadata::NAME),
        description: header.definition.clone(),
        file_origin: props.str(metadata::FILE_ORIGIN),
        annotations: props.annotations(kind),
    }
}

/// Per-channel coordinates from the flat list and its widths.
fn coordinates(props: &Properties) -> Vec<Vec<Quantity>> {
    let Some((values, unit)) = props.floats(metadata::COORDINATES) else {
        return Vec::new();
    };
    let unit = unit.unwrap_or_else(|| "dimensionless".to_string());
    let mut values = values.into_iter();
    props
        .ints(metadata::COORDINATE_WIDTHS)
        .into_iter()
        .map(|width| {
            values
                .by_ref()
                .take(width.max(0) as usize)
                .map(|v| Quantity::new(v, unit.clone()))
                .collect()
        })
        .collect()
}
