//! Graph → store synchronization.
//!
//! Every object goes through one decision:
//!
//! - no element under its resolved name: create it and write every field
//! - element present, bound to this object, digest unchanged: rebind only
//! - otherwise: overwrite the fields in place
//!
//! Parents are written before children. Within a block, segments and their
//! contents come first, then channel groups with their units, so that
//! cross-reference targets are bound by the time links are reconciled.

use chrono::NaiveDateTime;
use neonix_store::{
    ArrayData, ContainerStore, Dimension, ElementId, ElementKind, LinkType, Property,
};
use neonix_types::{
    BlockId, ChannelGroupId, Common, ContainerLabel, Digest, EpochId, EventId, Graph, ObjectKind,
    ObjectRef, Quantity, SegmentId, SignalId, SpikeTrainId, TimeBasis, UnitId,
};
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};
use crate::identity::Binding;
use crate::metadata::{self, PropertySet};
use crate::multiplex;
use crate::names::{self, NameResolver};
use crate::path::RECORDING_CHANNEL_TYPE;
use crate::session::Session;
use crate::xref;

/// Counters for one write pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteStats {
    /// Objects with no element under their resolved name.
    pub created: usize,
    /// Objects whose element was rewritten in place.
    pub updated: usize,
    /// Objects skipped because their digest and binding matched.
    pub unchanged: usize,
    /// Cross-reference links added.
    pub linked: usize,
    /// Cross-reference links removed.
    pub unlinked: usize,
}

/// What a write does to one object's element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Plan {
    Create,
    Overwrite,
    Unchanged,
}

/// Payload array suffixes of tag objects.
const TIMES: &str = "times";
const DURATIONS: &str = "durations";
const WAVEFORMS: &str = "waveforms";

pub(crate) struct Writer<'a, S: ContainerStore + ?Sized> {
    store: &'a mut S,
    session: &'a mut Session,
    graph: &'a Graph,
    pub(crate) stats: WriteStats,
}

impl<'a, S: ContainerStore + ?Sized> Writer<'a, S> {
    pub(crate) fn new(store: &'a mut S, session: &'a mut Session, graph: &'a Graph) -> Self {
        Self {
            store,
            session,
            graph,
            stats: WriteStats::default(),
        }
    }

    /// Write one object (and, with cascade, its subtree) under `parent`.
    pub(crate) fn write_object(
        &mut self,
        obj: ObjectRef,
        parent: Option<ElementId>,
    ) -> SyncResult<ElementId> {
        let name = names::resolved_name(self.graph, obj);
        if obj.kind == ObjectKind::Block {
            return self.write_block(BlockId::new(obj.index), &name);
        }
        let parent = parent.ok_or_else(|| SyncError::InvalidPath {
            path: name.clone(),
            reason: format!("a {} needs a parent container", obj.kind),
        })?;
        match obj.kind {
            ObjectKind::Segment => self.write_segment(SegmentId::new(obj.index), &name, parent),
            ObjectKind::ChannelGroup => {
                self.write_channel_group(ChannelGroupId::new(obj.index), &name, parent)
            }
            ObjectKind::AnalogSignal | ObjectKind::IrregularlySampledSignal => self
                .write_signal(SignalId::new(obj.index), &name, parent)
                .map(|arrays| arrays.first().copied().unwrap_or(parent)),
            ObjectKind::Event | ObjectKind::Epoch | ObjectKind::SpikeTrain => {
                self.write_tag(obj, &name, parent)
            }
            ObjectKind::Unit => {
                let block = self.store.header(parent)?.parent.ok_or_else(|| {
                    SyncError::InvalidPath {
                        path: name.clone(),
                        reason: "channel group source has no block".into(),
                    }
                })?;
                self.write_unit(UnitId::new(obj.index), &name, parent, block)
            }
            ObjectKind::Block => unreachable!("blocks handled above"),
        }
    }

    // -----------------------------------------------------------------------
    // Per kind
    // -----------------------------------------------------------------------

    pub(crate) fn write_block(&mut self, id: BlockId, name: &str) -> SyncResult<ElementId> {
        let graph = self.graph;
        let obj: ObjectRef = id.into();
        let block = graph.block(id);
        let type_name = ObjectKind::Block.type_name();
        let before = self.stats;

        let found = self.find(None, ElementKind::Block, name, type_name)?;
        let (digest, plan) = self.plan(obj, found.as_slice());
        let el = self.element(found, None, ElementKind::Block, name, type_name)?;
        if plan != Plan::Unchanged {
            self.write_common(el, &block.common, block.rec_datetime.as_ref())?;
            let mut props = base_props(&block.common);
            props.datetime(metadata::FILE_DATETIME, block.file_datetime.as_ref());
            props.annotations(ObjectKind::Block, &block.common.annotations, name);
            self.attach_section(el, None, None, name, type_name, props.finish())?;
        }
        self.commit(obj, name, digest, Binding::Single(el), plan);

        if self.session.config.cascade {
            let segments = names::pass_of(graph, obj, ObjectKind::Segment);
            let seg_names = names::resolve_pass(graph, &segments, &NameResolver::new());
            for (seg, seg_name) in segments.iter().zip(&seg_names) {
                self.write_segment(SegmentId::new(seg.index), seg_name, el)?;
            }
            let groups = names::pass_of(graph, obj, ObjectKind::ChannelGroup);
            let group_names = names::resolve_pass(graph, &groups, &NameResolver::new());
            for (grp, grp_name) in groups.iter().zip(&group_names) {
                self.write_channel_group(ChannelGroupId::new(grp.index), grp_name, el)?;
            }
        }

        let delta = self.stats;
        info!(
            block = %name,
            created = delta.created - before.created,
            updated = delta.updated - before.updated,
            unchanged = delta.unchanged - before.unchanged,
            "wrote block"
        );
        Ok(el)
    }

    /// Segment group plus, with cascade, its signals and tags.
    fn write_segment(&mut self, id: SegmentId, name: &str, block_el: ElementId) -> SyncResult<ElementId> {
        let graph = self.graph;
        let obj: ObjectRef = id.into();
        let segment = graph.segment(id);
        let type_name = ObjectKind::Segment.type_name();

        let found = self.find(Some(block_el), ElementKind::Group, name, type_name)?;
        let (digest, plan) = self.plan(obj, found.as_slice());
        let el = self.element(found, Some(block_el), ElementKind::Group, name, type_name)?;
        if plan != Plan::Unchanged {
            self.write_common(el, &segment.common, segment.rec_datetime.as_ref())?;
            let mut props = base_props(&segment.common);
            props.datetime(metadata::FILE_DATETIME, segment.file_datetime.as_ref());
            props.annotations(ObjectKind::Segment, &segment.common.annotations, name);
            self.attach_section(
                el,
                Some(block_el),
                Some(ContainerLabel::Segments),
                name,
                type_name,
                props.finish(),
            )?;
        }
        self.commit(obj, name, digest, Binding::Single(el), plan);

        if self.session.config.cascade {
            let signals = names::pass_of(graph, obj, ObjectKind::AnalogSignal);
            let signal_names = names::resolve_pass(graph, &signals, &NameResolver::new());
            for (sig, sig_name) in signals.iter().zip(&signal_names) {
                self.write_signal(SignalId::new(sig.index), sig_name, el)?;
            }
            let tags = names::pass_of(graph, obj, ObjectKind::Event);
            let tag_names = names::resolve_pass(graph, &tags, &NameResolver::new());
            for (tag, tag_name) in tags.iter().zip(&tag_names) {
                self.write_tag(*tag, tag_name, el)?;
            }
        }
        Ok(el)
    }

    /// One data array per channel. Returns the arrays in channel order.
    ///
    /// Placeholder samples leave stored channel data untouched; a signal
    /// with no channels has no representation and is rejected.
    fn write_signal(&mut self, id: SignalId, name: &str, group_el: ElementId) -> SyncResult<Vec<ElementId>> {
        let graph = self.graph;
        let obj = graph.signal_ref(id);
        let signal = graph.signal(id);
        let type_name = obj.kind.type_name();
        if !signal.samples.is_placeholder() && signal.channel_count() == 0 {
            return Err(SyncError::Unrepresentable {
                kind: obj.kind,
                name: name.to_string(),
                reason: "a signal needs at least one channel".into(),
            });
        }

        let found = multiplex::channel_arrays(&*self.store, group_el, name, type_name)?;
        let (digest, plan) = self.plan(obj, &found);
        if plan == Plan::Unchanged {
            self.commit(obj, name, digest, Binding::Multiple(found.clone()), plan);
            return Ok(found);
        }

        // A same-named signal of the other sampling kind is stale.
        let other_type = if obj.kind == ObjectKind::AnalogSignal {
            ObjectKind::IrregularlySampledSignal.type_name()
        } else {
            ObjectKind::AnalogSignal.type_name()
        };
        for stale in multiplex::channel_arrays(&*self.store, group_el, name, other_type)? {
            self.store.remove(stale)?;
        }

        let label = obj.kind.label();
        let parent_section = self.parent_section(group_el)?;
        let section = metadata::ensure_section(&mut *self.store, Some(parent_section), label, name, type_name)?;
        let mut props = base_props(&signal.common);
        if let TimeBasis::Regular { t_start, .. } = &signal.time_basis {
            props.quantity(metadata::T_START, t_start);
        }
        props.annotations(obj.kind, &signal.common.annotations, name);
        metadata::sync_properties(&mut *self.store, section, props.finish())?;

        let arrays = multiplex::write_signal(&mut *self.store, group_el, name, type_name, signal, section)?;
        for array in &arrays {
            self.write_common(*array, &signal.common, None)?;
        }
        self.commit(obj, name, digest, Binding::Multiple(arrays.clone()), plan);
        Ok(arrays)
    }

    /// Events, epochs and spike trains: a multi-tag over a `times` array,
    /// with `durations` or `waveforms` alongside where the kind has them.
    fn write_tag(&mut self, obj: ObjectRef, name: &str, group_el: ElementId) -> SyncResult<ElementId> {
        let graph = self.graph;
        let type_name = obj.kind.type_name();

        let found = self.find(Some(group_el), ElementKind::MultiTag, name, type_name)?;
        let (digest, plan) = self.plan(obj, found.as_slice());
        let el = self.element(found, Some(group_el), ElementKind::MultiTag, name, type_name)?;
        if plan == Plan::Unchanged {
            self.commit(obj, name, digest, Binding::Single(el), plan);
            return Ok(el);
        }

        let common = graph.common(obj);
        self.write_common(el, common, None)?;
        let mut props = base_props(common);

        match obj.kind {
            ObjectKind::Event => {
                let event = graph.event(EventId::new(obj.index));
                self.drop_payload(group_el, name, DURATIONS)?;
                self.drop_payload(group_el, name, WAVEFORMS)?;
                let times = self.write_times(group_el, name, type_name, &event.times.values, &event.times.units, &event.labels)?;
                self.store.set_positions(el, times)?;
                self.store.set_extents(el, None)?;
            }
            ObjectKind::Epoch => {
                let epoch = graph.epoch(EpochId::new(obj.index));
                self.drop_payload(group_el, name, WAVEFORMS)?;
                let times = self.write_times(group_el, name, type_name, &epoch.times.values, &epoch.times.units, &epoch.labels)?;
                self.store.set_positions(el, times)?;
                let durations = self.replace_payload(
                    group_el,
                    name,
                    DURATIONS,
                    type_name,
                    ArrayData::Float(epoch.durations.values.clone()),
                    &[epoch.durations.len()],
                    Some(epoch.durations.units.as_str()),
                    vec![Dimension::Set { labels: Vec::new() }],
                )?;
                self.store.set_extents(el, Some(durations))?;
            }
            ObjectKind::SpikeTrain => {
                let train = graph.spike_train(SpikeTrainId::new(obj.index));
                self.drop_payload(group_el, name, DURATIONS)?;
                if train.times_deferred {
                    debug!(tag = %name, "times not loaded, keeping stored spike times");
                } else {
                    let times = self.write_times(group_el, name, type_name, &train.times.values, &train.times.units, &[])?;
                    self.store.set_positions(el, times)?;
                }
                props.quantity(metadata::T_START, &train.t_start);
                props.quantity(metadata::T_STOP, &train.t_stop);
                match &train.waveforms {
                    Some(w) if w.samples.is_placeholder() => {
                        debug!(tag = %name, "waveforms not loaded, keeping stored waveforms");
                        props.opt_quantity(metadata::LEFT_SWEEP, w.left_sweep.as_ref());
                    }
                    Some(w) => {
                        props.opt_quantity(metadata::LEFT_SWEEP, w.left_sweep.as_ref());
                        let time_dim = match &w.sampling_period {
                            Some(sp) => Dimension::Sampled {
                                interval: sp.magnitude,
                                offset: 0.0,
                                unit: Some(sp.units.clone()),
                                label: Some("time".to_string()),
                            },
                            None => Dimension::Set { labels: Vec::new() },
                        };
                        let array = self.replace_payload(
                            group_el,
                            name,
                            WAVEFORMS,
                            type_name,
                            ArrayData::Float(w.samples.values().to_vec()),
                            w.samples.shape(),
                            Some(w.units.as_str()),
                            vec![
                                Dimension::Set { labels: Vec::new() },
                                Dimension::Set { labels: Vec::new() },
                                time_dim,
                            ],
                        )?;
                        self.store.add_feature(el, array, LinkType::Indexed)?;
                    }
                    None => self.drop_payload(group_el, name, WAVEFORMS)?,
                }
            }
            other => unreachable!("{other} is not stored as a tag"),
        }

        props.annotations(obj.kind, &common.annotations, name);
        let section = self.attach_section(
            el,
            Some(group_el),
            obj.kind.label(),
            name,
            type_name,
            props.finish(),
        )?;
        if let Some(waveforms) = self.store.lookup(Some(group_el), ElementKind::DataArray, &payload_name(name, WAVEFORMS))? {
            if self.store.header(waveforms)?.metadata != Some(section) {
                self.store.set_metadata(waveforms, Some(section))?;
            }
        }
        self.commit(obj, name, digest, Binding::Single(el), plan);
        Ok(el)
    }

    /// Source element with per-channel recording-channel sources. Units are
    /// written before the group's signal links are reconciled.
    fn write_channel_group(
        &mut self,
        id: ChannelGroupId,
        name: &str,
        block_el: ElementId,
    ) -> SyncResult<ElementId> {
        let graph = self.graph;
        let obj: ObjectRef = id.into();
        let group = graph.channel_group(id);
        let type_name = ObjectKind::ChannelGroup.type_name();

        let found = self.find(Some(block_el), ElementKind::Source, name, type_name)?;
        let (digest, plan) = self.plan(obj, found.as_slice());
        let el = self.element(found, Some(block_el), ElementKind::Source, name, type_name)?;
        let channel_names: Vec<String> = group
            .channel_indexes
            .iter()
            .map(|idx| names::channel_source_name(name, *idx))
            .collect();

        let links = if plan != Plan::Unchanged || self.session.config.relink_unchanged {
            let targets: Vec<ObjectRef> = group.signals.iter().map(|s| graph.signal_ref(*s)).collect();
            Some(self.link_targets(&targets)?)
        } else {
            None
        };

        if plan != Plan::Unchanged {
            self.write_common(el, &group.common, None)?;
            let mut props = base_props(&group.common);
            props
                .ints(metadata::CHANNEL_INDEXES, &group.channel_indexes)
                .strs(metadata::CHANNEL_NAMES, &group.channel_names);
            if !group.coordinates.is_empty() {
                let (values, unit, widths) = flatten_coordinates(&group.coordinates)?;
                props
                    .floats(metadata::COORDINATES, &values, unit.as_deref())
                    .ints(metadata::COORDINATE_WIDTHS, &widths);
            }
            if let Some((_, order)) = &links {
                props.strs(metadata::SIGNAL_ORDER, order);
            }
            props.annotations(ObjectKind::ChannelGroup, &group.common.annotations, name);
            self.attach_section(
                el,
                Some(block_el),
                Some(ContainerLabel::RecordingChannelGroups),
                name,
                type_name,
                props.finish(),
            )?;
            self.sync_channel_sources(el, &channel_names, &group.channel_names)?;
        } else if let Some((_, order)) = &links {
            self.sync_order(el, metadata::SIGNAL_ORDER, order)?;
        }
        self.commit(obj, name, digest, Binding::Single(el), plan);

        if self.session.config.cascade {
            let units = names::pass_of(graph, obj, ObjectKind::Unit);
            let unit_names =
                names::resolve_pass(graph, &units, &NameResolver::with_reserved(channel_names));
            for (unit, unit_name) in units.iter().zip(&unit_names) {
                self.write_unit(UnitId::new(unit.index), unit_name, el, block_el)?;
            }
        }

        if let Some((desired, _)) = links {
            let changes =
                xref::reconcile_links(&mut *self.store, block_el, el, ElementKind::DataArray, &desired)?;
            self.stats.linked += changes.linked;
            self.stats.unlinked += changes.unlinked;
        }
        Ok(el)
    }

    /// Unit source under its channel group, linked to its spike train tags.
    fn write_unit(
        &mut self,
        id: UnitId,
        name: &str,
        group_el: ElementId,
        block_el: ElementId,
    ) -> SyncResult<ElementId> {
        let graph = self.graph;
        let obj: ObjectRef = id.into();
        let unit = graph.unit(id);
        let type_name = ObjectKind::Unit.type_name();

        let found = self.find(Some(group_el), ElementKind::Source, name, type_name)?;
        let (digest, plan) = self.plan(obj, found.as_slice());
        let el = self.element(found, Some(group_el), ElementKind::Source, name, type_name)?;
        let links = if plan != Plan::Unchanged || self.session.config.relink_unchanged {
            let targets: Vec<ObjectRef> = unit.spike_trains.iter().map(|t| (*t).into()).collect();
            Some(self.link_targets(&targets)?)
        } else {
            None
        };

        if plan != Plan::Unchanged {
            self.write_common(el, &unit.common, None)?;
            let mut props = base_props(&unit.common);
            if let Some((_, order)) = &links {
                props.strs(metadata::SPIKE_TRAIN_ORDER, order);
            }
            props.annotations(ObjectKind::Unit, &unit.common.annotations, name);
            self.attach_section(
                el,
                Some(group_el),
                Some(ContainerLabel::Units),
                name,
                type_name,
                props.finish(),
            )?;
        } else if let Some((_, order)) = &links {
            self.sync_order(el, metadata::SPIKE_TRAIN_ORDER, order)?;
        }
        self.commit(obj, name, digest, Binding::Single(el), plan);

        if let Some((desired, _)) = links {
            let changes =
                xref::reconcile_links(&mut *self.store, block_el, el, ElementKind::MultiTag, &desired)?;
            self.stats.linked += changes.linked;
            self.stats.unlinked += changes.unlinked;
        }
        Ok(el)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Look up an element by name, replacing one of a different type.
    fn find(
        &mut self,
        parent: Option<ElementId>,
        kind: ElementKind,
        name: &str,
        type_name: &str,
    ) -> SyncResult<Option<ElementId>> {
        match self.store.lookup(parent, kind, name)? {
            Some(id) => {
                let existing = self.store.header(id)?.type_name;
                if existing == type_name {
                    Ok(Some(id))
                } else {
                    debug!(name = %name, old = %existing, new = %type_name, "replacing element of another type");
                    self.store.remove(id)?;
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    fn element(
        &mut self,
        found: Option<ElementId>,
        parent: Option<ElementId>,
        kind: ElementKind,
        name: &str,
        type_name: &str,
    ) -> SyncResult<ElementId> {
        match found {
            Some(id) => Ok(id),
            None => Ok(self.store.create(parent, kind, name, type_name)?),
        }
    }

    /// Decide how to write `obj` given the elements found under its name.
    ///
    /// Unchanged requires `skip_unchanged`, a binding to exactly `found`,
    /// and a recorded digest equal to the current one.
    fn plan(&self, obj: ObjectRef, found: &[ElementId]) -> (Digest, Plan) {
        let digest = neonix_hash::digest(self.graph, obj);
        if found.is_empty() {
            return (digest, Plan::Create);
        }
        let key = (self.graph.id(), obj);
        let same_elements = self
            .session
            .identity
            .binding(&key)
            .is_some_and(|b| b.elements() == found);
        let same_digest = self.session.hashes.get(&key) == Some(&digest);
        if self.session.config.skip_unchanged && same_elements && same_digest {
            (digest, Plan::Unchanged)
        } else {
            (digest, Plan::Overwrite)
        }
    }

    /// Count the plan and record binding plus digest.
    fn commit(&mut self, obj: ObjectRef, name: &str, digest: Digest, binding: Binding, plan: Plan) {
        let key = (self.graph.id(), obj);
        match plan {
            Plan::Create => self.stats.created += 1,
            Plan::Overwrite => self.stats.updated += 1,
            Plan::Unchanged => self.stats.unchanged += 1,
        }
        if plan != Plan::Unchanged {
            self.session.hashes.insert(key, digest);
        }
        self.session.identity.bind(key, binding);
        debug!(object = %name, kind = ?obj.kind, plan = ?plan, digest = %digest.short_hex(), "synced object");
    }

    fn write_common(
        &mut self,
        el: ElementId,
        common: &Common,
        rec_datetime: Option<&NaiveDateTime>,
    ) -> SyncResult<()> {
        let header = self.store.header(el)?;
        if header.definition.as_deref() != common.description.as_deref() {
            self.store.set_definition(el, common.description.as_deref())?;
        }
        if let Some(dt) = rec_datetime {
            let seconds = metadata::to_seconds(dt);
            if header.created_at != Some(seconds) {
                self.store.set_created_at(el, seconds)?;
            }
        }
        Ok(())
    }

    /// Section of an already written container element.
    fn parent_section(&mut self, parent: ElementId) -> SyncResult<ElementId> {
        let header = self.store.header(parent)?;
        if let Some(section) = header.metadata {
            return Ok(section);
        }
        let section = metadata::ensure_section(
            &mut *self.store,
            None,
            None,
            &header.id.to_string(),
            &header.type_name,
        )?;
        self.store.set_metadata(parent, Some(section))?;
        Ok(section)
    }

    /// Ensure `el` has a section under its parent's and make its properties
    /// exactly `props`.
    fn attach_section(
        &mut self,
        el: ElementId,
        parent: Option<ElementId>,
        label: Option<ContainerLabel>,
        name: &str,
        type_name: &str,
        props: Vec<Property>,
    ) -> SyncResult<ElementId> {
        let parent_section = match parent {
            Some(p) => Some(self.parent_section(p)?),
            None => None,
        };
        let section = metadata::ensure_section(&mut *self.store, parent_section, label, name, type_name)?;
        if self.store.header(el)?.metadata != Some(section) {
            self.store.set_metadata(el, Some(section))?;
        }
        metadata::sync_properties(&mut *self.store, section, props)?;
        Ok(section)
    }

    fn write_times(
        &mut self,
        group_el: ElementId,
        name: &str,
        type_name: &str,
        values: &[f64],
        units: &str,
        labels: &[String],
    ) -> SyncResult<ElementId> {
        self.replace_payload(
            group_el,
            name,
            TIMES,
            type_name,
            ArrayData::Float(values.to_vec()),
            &[values.len()],
            Some(units),
            vec![Dimension::Set {
                labels: labels.to_vec(),
            }],
        )
    }

    #[allow(clippy::too_many_arguments)]
    /// Replace the `suffix` payload array of the object called `name`.
    fn replace_payload(
        &mut self,
        group_el: ElementId,
        name: &str,
        suffix: &str,
        type_name: &str,
        data: ArrayData,
        shape: &[usize],
        unit: Option<&str>,
        dimensions: Vec<Dimension>,
    ) -> SyncResult<ElementId> {
        self.drop_payload(group_el, name, suffix)?;
        let id = self.store.create(
            Some(group_el),
            ElementKind::DataArray,
            &payload_name(name, suffix),
            &format!("{type_name}.{suffix}"),
        )?;
        self.store.set_data(id, data, shape)?;
        self.store.set_unit(id, unit)?;
        for dim in dimensions {
            self.store.append_dimension(id, dim)?;
        }
        Ok(id)
    }

    fn drop_payload(&mut self, group_el: ElementId, name: &str, suffix: &str) -> SyncResult<()> {
        if let Some(old) =
            self.store
                .lookup(Some(group_el), ElementKind::DataArray, &payload_name(name, suffix))?
        {
            self.store.remove(old)?;
        }
        Ok(())
    }

    /// Bound elements of every link target, plus each target's primary
    /// element id in target order.
    fn link_targets(&self, targets: &[ObjectRef]) -> SyncResult<(Vec<ElementId>, Vec<String>)> {
        let mut desired = Vec::new();
        let mut order = Vec::with_capacity(targets.len());
        for target in targets {
            let binding = self.session.identity.store_element_of(self.graph, *target)?;
            desired.extend_from_slice(binding.elements());
            order.extend(binding.primary().map(|el| el.to_string()));
        }
        Ok((desired, order))
    }

    /// Refresh the link order recorded in an unchanged object's section.
    fn sync_order(&mut self, el: ElementId, name: &str, order: &[String]) -> SyncResult<()> {
        let Some(section) = self.store.header(el)?.metadata else {
            return Ok(());
        };
        let mut set = PropertySet::new();
        set.strs(name, order);
        let existing = self.store.properties(section)?;
        for prop in set.finish() {
            if !existing.contains(&prop) {
                self.store.set_property(section, prop)?;
            }
        }
        Ok(())
    }

    /// Make the recording-channel sources under a group exactly `wanted`.
    fn sync_channel_sources(
        &mut self,
        group_el: ElementId,
        wanted: &[String],
        labels: &[String],
    ) -> SyncResult<()> {
        for existing in self.store.list(Some(group_el), ElementKind::Source)? {
            let header = self.store.header(existing)?;
            if header.type_name == RECORDING_CHANNEL_TYPE && !wanted.contains(&header.name) {
                self.store.remove(existing)?;
            }
        }
        for (i, name) in wanted.iter().enumerate() {
            let (id, _) = self.store.lookup_or_create(
                Some(group_el),
                ElementKind::Source,
                name,
                RECORDING_CHANNEL_TYPE,
            )?;
            let label = labels.get(i).map(String::as_str);
            if self.store.header(id)?.definition.as_deref() != label {
                self.store.set_definition(id, label)?;
            }
        }
        Ok(())
    }
}

pub(crate) fn payload_name(name: &str, suffix: &str) -> String {
    format!("{name}.{suffix}")
}

fn base_props(common: &Common) -> PropertySet {
    let mut props = PropertySet::new();
    props
        .opt_str(metadata::NAME, common.name.as_deref())
        .opt_str(metadata::FILE_ORIGIN, common.file_origin.as_deref());
    props
}

/// Coordinates as one flat list in the first coordinate's unit, plus the
/// width of every channel's coordinate.
fn flatten_coordinates(coords: &[Vec<Quantity>]) -> SyncResult<(Vec<f64>, Option<String>, Vec<i64>)> {
    let unit = coords.iter().flatten().next().map(|q| q.units.clone());
    let mut values = Vec::new();
    for q in coords.iter().flatten() {
        values.push(match &unit {
            Some(u) => q.rescale(u)?.magnitude,
            None => q.magnitude,
        });
    }
    let widths = coords.iter().map(|c| c.len() as i64).collect();
    Ok((values, unit, widths))
}
