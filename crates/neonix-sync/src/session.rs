//! Session facade: one identity map, digest table and lazy registry shared by
//! every write and read against one store.

use std::collections::HashMap;

use neonix_store::{ContainerStore, ElementKind};
use neonix_types::{BlockId, Digest, Graph, GraphId, ObjectKind, ObjectRef};
use tracing::{debug, info};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::identity::{IdentityMap, ObjectKey};
use crate::lazy::LazyRegistry;
use crate::names::{self, NameResolver};
use crate::path::{self, NixPath};
use crate::reader::Reader;
use crate::writer::{WriteStats, Writer};

/// Synchronization state for one store.
///
/// Dropping the session forgets every binding; a fresh session sees every
/// stored object as unbound and overwrites it on first write.
#[derive(Debug, Default)]
pub struct Session {
    pub(crate) config: SyncConfig,
    pub(crate) identity: IdentityMap,
    pub(crate) hashes: HashMap<ObjectKey, Digest>,
    pub(crate) lazy: LazyRegistry,
}

impl Session {
    /// A session with no bindings, digests or pending payloads.
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Options every write and read of this session runs with.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Bindings between domain objects and store elements.
    pub fn identity(&self) -> &IdentityMap {
        &self.identity
    }

    /// Placeholders awaiting [`Session::materialize`], per graph.
    pub fn lazy(&self) -> &LazyRegistry {
        &self.lazy
    }

    /// Digest recorded the last time `obj` was written or read.
    pub fn recorded_digest(&self, graph: GraphId, obj: ObjectRef) -> Option<Digest> {
        self.hashes.get(&(graph, obj)).copied()
    }

    /// Paths read with placeholder payloads and not yet materialized, in
    /// any graph.
    pub fn pending(&self) -> Vec<NixPath> {
        self.lazy.pending()
    }

    /// Paths `graph` still holds placeholders for.
    pub fn pending_in(&self, graph: GraphId) -> Vec<NixPath> {
        self.lazy.pending_in(graph)
    }

    /// Store path of `obj`, computed from resolved names.
    pub fn locate(&self, graph: &Graph, obj: ObjectRef) -> NixPath {
        path::locate(graph, obj)
    }

    /// Drop every binding, digest and pending entry of one graph.
    pub fn forget_graph(&mut self, graph: GraphId) {
        self.identity.unbind_graph(graph);
        self.hashes.retain(|(g, _), _| *g != graph);
        self.lazy.forget_graph(graph);
    }

    // -----------------------------------------------------------------------
    // Write
    // -----------------------------------------------------------------------

    /// Write every block of `graph`, in order.
    pub fn write_all<S: ContainerStore + ?Sized>(
        &mut self,
        store: &mut S,
        graph: &Graph,
    ) -> SyncResult<WriteStats> {
        let blocks: Vec<ObjectRef> = graph.block_ids().map(Into::into).collect();
        let block_names = names::resolve_pass(graph, &blocks, &NameResolver::new());
        let mut writer = Writer::new(store, self, graph);
        for (block, name) in blocks.iter().zip(&block_names) {
            writer.write_block(BlockId::new(block.index), name)?;
        }
        let stats = writer.stats;
        info!(
            blocks = blocks.len(),
            created = stats.created,
            updated = stats.updated,
            unchanged = stats.unchanged,
            linked = stats.linked,
            unlinked = stats.unlinked,
            "wrote graph"
        );
        Ok(stats)
    }

    /// Write one object (and its subtree when cascading) and return its
    /// path.
    ///
    /// `parent` addresses the container to write under; by default it is
    /// the location of the object's parent in `graph`. Blocks ignore it.
    pub fn write<S: ContainerStore + ?Sized>(
        &mut self,
        store: &mut S,
        graph: &Graph,
        obj: ObjectRef,
        parent: Option<&NixPath>,
    ) -> SyncResult<(NixPath, WriteStats)> {
        if !graph.contains(obj) {
            return Err(SyncError::NotFound {
                path: obj.to_string(),
            });
        }
        let name = names::resolved_name(graph, obj);
        let (parent_el, path) = match obj.kind.label() {
            None => (None, NixPath::root(&name)),
            Some(label) => {
                let graph_parent = graph.parent(obj).ok_or_else(|| SyncError::InvalidPath {
                    path: name.clone(),
                    reason: format!("this {} has no parent", obj.kind),
                })?;
                let parent_path = match parent {
                    Some(p) => p.clone(),
                    None => path::locate(graph, graph_parent),
                };
                if parent_path.object_kind() != Some(graph_parent.kind) {
                    return Err(SyncError::InvalidPath {
                        path: parent_path.to_string(),
                        reason: format!("a {} must be written under a {}", obj.kind, graph_parent.kind),
                    });
                }
                let resolved = path::resolve(&*store, &parent_path)?;
                let path = parent_path.child(label, &name)?;
                (Some(resolved.element), path)
            }
        };

        let mut writer = Writer::new(store, self, graph);
        writer.write_object(obj, parent_el)?;
        let stats = writer.stats;
        debug!(path = %path, created = stats.created, updated = stats.updated, "wrote object");
        Ok((path, stats))
    }

    // -----------------------------------------------------------------------
    // Read
    // -----------------------------------------------------------------------

    /// Read every block of the store into a new graph. Payloads are deferred
    /// if the configuration says so.
    pub fn read_all<S: ContainerStore + ?Sized>(&mut self, store: &S) -> SyncResult<Graph> {
        let defer = self.config.defer_payload;
        self.read_all_with(store, defer)
    }

    pub fn read_all_with<S: ContainerStore + ?Sized>(
        &mut self,
        store: &S,
        defer: bool,
    ) -> SyncResult<Graph> {
        let mut graph = Graph::new();
        let blocks = Reader::new(store, self, &mut graph, defer).read_blocks()?;
        info!(
            blocks = blocks.len(),
            pending = self.lazy.len(),
            "read graph"
        );
        Ok(graph)
    }

    /// Read the object at `path` into `graph`.
    ///
    /// Ancestors already bound in this graph are reused; missing ones are
    /// read without their other children.
    pub fn read<S: ContainerStore + ?Sized>(
        &mut self,
        store: &S,
        path: &NixPath,
        defer: bool,
        graph: &mut Graph,
    ) -> SyncResult<ObjectRef> {
        Reader::new(store, self, graph, defer).read_path(path)
    }

    /// Load the deferred payload at `path`.
    ///
    /// An object registered for `graph` is filled in place and its handle
    /// returned; any other path is read in full as a new object.
    pub fn materialize<S: ContainerStore + ?Sized>(
        &mut self,
        store: &S,
        path: &NixPath,
        graph: &mut Graph,
    ) -> SyncResult<ObjectRef> {
        let owner = graph.id();
        match self.lazy.take(owner, path) {
            Some(obj) if graph.contains(obj) => {
                let result = Reader::new(store, self, graph, false).reload(obj, path);
                if let Err(e) = result {
                    self.lazy.register(path.clone(), owner, obj);
                    return Err(e);
                }
                Ok(obj)
            }
            _ => self.read(store, path, false, graph),
        }
    }

    /// Names of the blocks at the store root.
    pub fn block_names<S: ContainerStore + ?Sized>(&self, store: &S) -> SyncResult<Vec<String>> {
        let mut out = Vec::new();
        for id in store.list(None, ElementKind::Block)? {
            let header = store.header(id)?;
            if header.type_name == ObjectKind::Block.type_name() {
                out.push(header.name);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use neonix_store::InMemoryContainerStore;
    use neonix_types::{
        AnnotationValue, Annotations, ChannelGroup, ChannelGroupId, Epoch, Event,
        Quantity, QuantityArray, RecordingBlock, Samples, Segment, SegmentId, Signal, SignalId,
        SpikeTrain, SpikeTrainId, TimeBasis, Unit, UnitId, Waveforms,
    };

    struct Fixture {
        graph: Graph,
        segment: SegmentId,
        lfp: SignalId,
        irregular: SignalId,
        train: SpikeTrainId,
        group: ChannelGroupId,
        unit: UnitId,
    }

    const OBJECTS: usize = 9;

    fn fixture() -> Fixture {
        let mut graph = Graph::new();
        let when = NaiveDate::from_ymd_opt(2015, 4, 2)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let mut block = RecordingBlock::new()
            .with_name("session1")
            .with_description("two trials")
            .annotate("experimenter", "ada")
            .annotate("rig", 3i64);
        block.rec_datetime = Some(when);
        let block = graph.add_block(block);

        let segment = graph.add_segment(block, Segment::new().with_name("trial1"));
        let lfp = graph.add_signal(
            segment,
            Signal::regular(
                Samples::from_rows(&[
                    vec![1.0, 2.0, 3.0],
                    vec![4.0, 5.0, 6.0],
                    vec![7.0, 8.0, 9.0],
                    vec![10.0, 11.0, 12.0],
                ])
                .unwrap(),
                "mV",
                Quantity::new(1.0, "ms"),
                Quantity::seconds(0.5),
            )
            .with_name("lfp")
            .annotate("filtered", true),
        );
        let irregular = graph.add_signal(
            segment,
            Signal::irregular(
                Samples::from_rows(&[vec![0.5], vec![0.25]]).unwrap(),
                "uV",
                QuantityArray::new(vec![0.1, 0.7], "s"),
            ),
        );
        graph.add_event(
            segment,
            Event::new(
                QuantityArray::new(vec![0.1, 0.5], "s"),
                vec!["on".into(), "off".into()],
            )
            .with_name("stim"),
        );
        graph.add_epoch(
            segment,
            Epoch::new(
                QuantityArray::new(vec![0.0], "s"),
                QuantityArray::new(vec![1.0], "s"),
                vec!["go".into()],
            )
            .with_name("trial"),
        );
        let train = graph.add_spike_train(
            segment,
            SpikeTrain::new(QuantityArray::new(vec![0.1, 0.2, 0.3], "s"), 1.0)
                .with_name("st")
                .with_waveforms(Waveforms {
                    samples: Samples::new(vec![3, 1, 2], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
                        .unwrap(),
                    units: "uV".into(),
                    sampling_period: Some(Quantity::new(0.1, "ms")),
                    left_sweep: Some(Quantity::new(0.2, "ms")),
                }),
        );

        let mut group = ChannelGroup::new()
            .with_name("tetrode")
            .with_channels(vec![0, 1, 2], vec!["a".into(), "b".into(), "c".into()]);
        group.coordinates = (0..3)
            .map(|i| vec![Quantity::new(i as f64, "um"), Quantity::new(0.0, "um")])
            .collect();
        let group = graph.add_channel_group(block, group);
        let unit = graph.add_unit(group, Unit::new().with_name("u1"));
        graph.link_signal(group, lfp);
        graph.link_spike_train(unit, train);

        Fixture {
            graph,
            segment,
            lfp,
            irregular,
            train,
            group,
            unit,
        }
    }

    fn written() -> (Fixture, InMemoryContainerStore, Session) {
        let f = fixture();
        let mut store = InMemoryContainerStore::new();
        let mut session = Session::new(SyncConfig::default());
        session.write_all(&mut store, &f.graph).unwrap();
        (f, store, session)
    }

    fn path(s: &str) -> NixPath {
        s.parse().unwrap()
    }

    // -----------------------------------------------------------------------
    // Round trip
    // -----------------------------------------------------------------------

    #[test]
    fn first_write_creates_every_object() {
        let f = fixture();
        let mut store = InMemoryContainerStore::new();
        let mut session = Session::new(SyncConfig::default());
        let stats = session.write_all(&mut store, &f.graph).unwrap();
        assert_eq!(stats.created, OBJECTS);
        assert_eq!(stats.updated, 0);
        // three lfp channels plus one spike train tag
        assert_eq!(stats.linked, 4);
        assert_eq!(session.block_names(&store).unwrap(), vec!["session1"]);
    }

    #[test]
    fn round_trip_preserves_attributes_and_payloads() {
        let (f, store, _) = written();
        let mut session = Session::new(SyncConfig::default());
        let g = session.read_all(&store).unwrap();

        let block = g.block(BlockId::new(0));
        assert_eq!(block.common.name.as_deref(), Some("session1"));
        assert_eq!(block.common.description.as_deref(), Some("two trials"));
        assert_eq!(block.rec_datetime, f.graph.block(BlockId::new(0)).rec_datetime);
        assert_eq!(
            block.common.annotations.get("experimenter"),
            Some(&AnnotationValue::Str("ada".into()))
        );
        assert_eq!(block.common.annotations.get("rig"), Some(&AnnotationValue::Int(3)));

        let seg = g.segment(block.segments[0]);
        assert_eq!(seg.analog_signals.len(), 1);
        assert_eq!(seg.irregular_signals.len(), 1);

        let lfp = g.signal(seg.analog_signals[0]);
        assert_eq!(lfp.samples, f.graph.signal(f.lfp).samples);
        assert_eq!(lfp.units, "mV");
        assert_eq!(lfp.time_basis, f.graph.signal(f.lfp).time_basis);
        assert_eq!(lfp.common.annotations.get("filtered"), Some(&AnnotationValue::Bool(true)));

        let irregular = g.signal(seg.irregular_signals[0]);
        assert_eq!(irregular.common.name, None);
        assert_eq!(irregular.time_basis, f.graph.signal(f.irregular).time_basis);

        let event = g.event(seg.events[0]);
        assert_eq!(event.labels, vec!["on", "off"]);
        assert_eq!(event.times.values, vec![0.1, 0.5]);

        let epoch = g.epoch(seg.epochs[0]);
        assert_eq!(epoch.durations.values, vec![1.0]);
        assert_eq!(epoch.labels, vec!["go"]);

        let train = g.spike_train(seg.spike_trains[0]);
        let original = f.graph.spike_train(f.train);
        assert_eq!(train.times, original.times);
        assert_eq!(train.t_stop, original.t_stop);
        assert_eq!(train.waveforms, original.waveforms);
    }

    #[test]
    fn round_trip_restores_cross_references() {
        let (f, store, _) = written();
        let mut session = Session::new(SyncConfig::default());
        let g = session.read_all(&store).unwrap();

        let group = g.channel_group(g.block(BlockId::new(0)).channel_groups[0]);
        let original = f.graph.channel_group(f.group);
        assert_eq!(group.channel_indexes, original.channel_indexes);
        assert_eq!(group.channel_names, original.channel_names);
        assert_eq!(group.coordinates, original.coordinates);
        assert_eq!(group.signals.len(), 1);
        assert_eq!(g.signal(group.signals[0]).common.name.as_deref(), Some("lfp"));

        let unit = g.unit(group.units[0]);
        assert_eq!(unit.common.name, f.graph.unit(f.unit).common.name);
        assert_eq!(unit.spike_trains.len(), 1);
        assert_eq!(g.spike_train(unit.spike_trains[0]).unit, Some(group.units[0]));
    }

    // -----------------------------------------------------------------------
    // Incremental writes
    // -----------------------------------------------------------------------

    #[test]
    fn second_write_of_unchanged_graph_mutates_nothing() {
        let (f, mut store, mut session) = written();
        store.reset_mutation_count();
        let stats = session.write_all(&mut store, &f.graph).unwrap();
        assert_eq!(stats.unchanged, OBJECTS);
        assert_eq!(stats.created + stats.updated + stats.linked + stats.unlinked, 0);
        assert_eq!(store.mutation_count(), 0);
    }

    #[test]
    fn writing_a_read_graph_back_mutates_nothing() {
        let (_, mut store, _) = written();
        let mut session = Session::new(SyncConfig::default());
        let g = session.read_all(&store).unwrap();
        store.reset_mutation_count();
        let stats = session.write_all(&mut store, &g).unwrap();
        assert_eq!(stats.unchanged, OBJECTS);
        assert_eq!(store.mutation_count(), 0);
    }

    #[test]
    fn fresh_session_overwrites_existing_elements() {
        let (f, mut store, _) = written();
        let mut session = Session::new(SyncConfig::default());
        let stats = session.write_all(&mut store, &f.graph).unwrap();
        assert_eq!(stats.updated, OBJECTS);
        assert_eq!(stats.created, 0);
    }

    #[test]
    fn changed_signal_is_overwritten_alone() {
        let (mut f, mut store, mut session) = written();
        f.graph.signal_mut(f.lfp).samples =
            Samples::from_rows(&[vec![0.0, 0.0, 0.0], vec![1.0, 1.0, 1.0]]).unwrap();
        let stats = session.write_all(&mut store, &f.graph).unwrap();
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.unchanged, OBJECTS - 1);

        let mut reader = Session::new(SyncConfig::default());
        let g = reader.read_all(&store).unwrap();
        let seg = g.segment(SegmentId::new(0));
        assert_eq!(g.signal(seg.analog_signals[0]).samples.rows(), 2);
    }

    #[test]
    fn changed_event_payload_replaces_old_arrays() {
        let (f, mut store, mut session) = written();
        let mut graph = f.graph.clone();
        let event = graph.segment(f.segment).events[0];
        graph.event_mut(event).times = QuantityArray::new(vec![0.2, 0.4, 0.6], "s");
        graph.event_mut(event).labels = vec!["x".into(), "y".into(), "z".into()];
        session.write_all(&mut store, &graph).unwrap();

        let mut reader = Session::new(SyncConfig::default());
        let g = reader.read_all(&store).unwrap();
        let back = g.event(g.segment(SegmentId::new(0)).events[0]);
        assert_eq!(back.times.values, vec![0.2, 0.4, 0.6]);
        assert_eq!(back.labels, vec!["x", "y", "z"]);
    }

    #[test]
    fn always_write_rewrites_every_object() {
        let (f, mut store, _) = written();
        let mut session = Session::new(SyncConfig::always_write());
        session.write_all(&mut store, &f.graph).unwrap();
        let stats = session.write_all(&mut store, &f.graph).unwrap();
        assert_eq!(stats.updated, OBJECTS);
        assert_eq!(stats.unchanged, 0);
    }

    #[test]
    fn dropping_a_signal_from_a_group_unlinks_its_channels() {
        let (mut f, mut store, mut session) = written();
        f.graph.channel_group_mut(f.group).signals.clear();
        f.graph.signal_mut(f.lfp).channel_group = None;
        let stats = session.write_all(&mut store, &f.graph).unwrap();
        assert_eq!(stats.unlinked, 3);

        let mut reader = Session::new(SyncConfig::default());
        let g = reader.read_all(&store).unwrap();
        assert!(g.channel_group(ChannelGroupId::new(0)).signals.is_empty());
    }

    #[test]
    fn unsupported_annotations_are_dropped() {
        let mut f = fixture();
        let block = BlockId::new(0);
        let annotations = &mut f.graph.block_mut(block).common.annotations;
        annotations.insert("nested".into(), AnnotationValue::Nested(Annotations::new()));
        annotations.insert("gain".into(), AnnotationValue::Quantity(Quantity::new(2.0, "mV")));
        annotations.insert("neo_name".into(), AnnotationValue::Str("shadow".into()));

        let mut store = InMemoryContainerStore::new();
        Session::new(SyncConfig::default()).write_all(&mut store, &f.graph).unwrap();
        let g = Session::new(SyncConfig::default()).read_all(&store).unwrap();
        let back = &g.block(block).common;
        assert!(!back.annotations.contains_key("nested"));
        assert!(!back.annotations.contains_key("gain"));
        assert!(!back.annotations.contains_key("neo_name"));
        assert_eq!(back.name.as_deref(), Some("session1"));
        assert!(back.annotations.contains_key("experimenter"));
    }

    #[test]
    fn colliding_names_get_suffixes_in_the_store() {
        let mut graph = Graph::new();
        let block = graph.add_block(RecordingBlock::new().with_name("b"));
        graph.add_segment(block, Segment::new().with_name("trial"));
        graph.add_segment(block, Segment::new().with_name("trial"));
        graph.add_segment(block, Segment::new());

        let mut store = InMemoryContainerStore::new();
        Session::new(SyncConfig::default()).write_all(&mut store, &graph).unwrap();
        for p in ["/b/segments/trial", "/b/segments/trial-1", "/b/segments/neo.Segment"] {
            assert!(path::resolve(&store, &path(p)).is_ok(), "{p}");
        }

        let g = Session::new(SyncConfig::default()).read_all(&store).unwrap();
        let names: Vec<Option<String>> = g
            .block(BlockId::new(0))
            .segments
            .iter()
            .map(|s| g.segment(*s).common.name.clone())
            .collect();
        assert_eq!(names, vec![Some("trial".into()), Some("trial".into()), None]);
    }

    #[test]
    fn channel_sources_follow_group_channels() {
        let (mut f, mut store, mut session) = written();
        let group = path::resolve(&store, &path("/session1/recordingchannelgroups/tetrode"))
            .unwrap()
            .element;
        let channels = |store: &InMemoryContainerStore| -> Vec<String> {
            store
                .list(Some(group), ElementKind::Source)
                .unwrap()
                .into_iter()
                .map(|id| store.header(id).unwrap())
                .filter(|h| h.type_name == path::RECORDING_CHANNEL_TYPE)
                .map(|h| h.name)
                .collect()
        };
        assert_eq!(channels(&store).len(), 3);
        assert!(path::resolve(
            &store,
            &path("/session1/recordingchannelgroups/tetrode/recordingchannels/tetrode.RecordingChannel1")
        )
        .is_ok());

        f.graph.channel_group_mut(f.group).channel_indexes = vec![0, 2];
        f.graph.channel_group_mut(f.group).channel_names = vec!["a".into(), "c".into()];
        f.graph.channel_group_mut(f.group).coordinates.truncate(2);
        session.write_all(&mut store, &f.graph).unwrap();
        assert_eq!(
            channels(&store),
            vec!["tetrode.RecordingChannel0", "tetrode.RecordingChannel2"]
        );
    }

    // -----------------------------------------------------------------------
    // Single-object write and read
    // -----------------------------------------------------------------------

    #[test]
    fn writing_a_group_before_its_signals_fails() {
        let f = fixture();
        let mut store = InMemoryContainerStore::new();
        let mut session = Session::new(SyncConfig {
            cascade: false,
            ..Default::default()
        });
        session.write(&mut store, &f.graph, BlockId::new(0).into(), None).unwrap();
        let err = session
            .write(&mut store, &f.graph, f.group.into(), None)
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::UnboundReference { kind: ObjectKind::AnalogSignal, .. }
        ));
    }

    #[test]
    fn single_write_returns_the_object_path() {
        let f = fixture();
        let mut store = InMemoryContainerStore::new();
        let mut session = Session::new(SyncConfig::default());
        session.write(&mut store, &f.graph, BlockId::new(0).into(), None).unwrap();
        let (p, stats) = session
            .write(&mut store, &f.graph, f.graph.signal_ref(f.lfp), None)
            .unwrap();
        assert_eq!(p.to_string(), "/session1/segments/trial1/analogsignals/lfp");
        assert_eq!(stats.unchanged, 1);
    }

    #[test]
    fn write_under_a_parent_of_the_wrong_kind_is_rejected() {
        let (f, mut store, mut session) = written();
        let err = session
            .write(
                &mut store,
                &f.graph,
                f.graph.signal_ref(f.lfp),
                Some(&path("/session1/recordingchannelgroups/tetrode")),
            )
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidPath { .. }));
    }

    #[test]
    fn reading_one_path_brings_in_its_ancestors_only() {
        let (_, store, _) = written();
        let mut session = Session::new(SyncConfig::default());
        let mut g = Graph::new();
        let obj = session
            .read(&store, &path("/session1/segments/trial1/events/stim"), false, &mut g)
            .unwrap();
        assert_eq!(obj.kind, ObjectKind::Event);
        assert_eq!(g.block_count(), 1);
        let block = g.block(BlockId::new(0));
        assert!(block.channel_groups.is_empty());
        let seg = g.segment(block.segments[0]);
        assert_eq!(seg.events.len(), 1);
        assert!(seg.analog_signals.is_empty());
    }

    #[test]
    fn reading_reuses_bound_ancestors() {
        let (_, store, _) = written();
        let mut session = Session::new(SyncConfig::default());
        let mut g = Graph::new();
        session
            .read(&store, &path("/session1/segments/trial1/events/stim"), false, &mut g)
            .unwrap();
        session
            .read(&store, &path("/session1/segments/trial1/epochs/trial"), false, &mut g)
            .unwrap();
        assert_eq!(g.block_count(), 1);
        let seg = g.segment(g.block(BlockId::new(0)).segments[0]);
        assert_eq!(seg.events.len(), 1);
        assert_eq!(seg.epochs.len(), 1);
    }

    #[test]
    fn recording_channel_paths_are_not_readable() {
        let (_, store, _) = written();
        let mut session = Session::new(SyncConfig::default());
        let err = session
            .read(
                &store,
                &path("/session1/recordingchannelgroups/tetrode/recordingchannels/tetrode.RecordingChannel0"),
                false,
                &mut Graph::new(),
            )
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidPath { .. }));
    }

    #[test]
    fn missing_path_is_not_found() {
        let (_, store, _) = written();
        let mut session = Session::new(SyncConfig::default());
        let err = session
            .read(&store, &path("/session1/segments/nope"), false, &mut Graph::new())
            .unwrap_err();
        assert!(matches!(err, SyncError::NotFound { .. }));
    }

    #[test]
    fn inconsistent_channel_units_fail_the_read() {
        let (_, mut store, _) = written();
        let lfp = path::resolve(&store, &path("/session1/segments/trial1/analogsignals/lfp")).unwrap();
        store.set_unit(lfp.channels[1], Some("V")).unwrap();
        let err = Session::new(SyncConfig::default()).read_all(&store).unwrap_err();
        assert!(matches!(err, SyncError::InconsistentSignalGroup { .. }));

        let lenient = SyncConfig {
            verify_signal_groups: false,
            ..Default::default()
        };
        assert!(Session::new(lenient).read_all(&store).is_ok());
    }

    // -----------------------------------------------------------------------
    // Names, shapes and link order
    // -----------------------------------------------------------------------

    fn one_channel_signal(name: &str) -> Signal {
        Signal::regular(
            Samples::from_rows(&[vec![1.0], vec![2.0]]).unwrap(),
            "mV",
            Quantity::new(1.0, "ms"),
            Quantity::seconds(0.0),
        )
        .with_name(name)
    }

    fn spike_train(name: &str, at: f64) -> SpikeTrain {
        SpikeTrain::new(QuantityArray::new(vec![at], "s"), 1.0).with_name(name)
    }

    /// A group and a unit whose links run against segment order.
    fn reordered() -> (Graph, ChannelGroupId, UnitId) {
        let mut graph = Graph::new();
        let block = graph.add_block(RecordingBlock::new().with_name("b"));
        let segment = graph.add_segment(block, Segment::new().with_name("s"));
        let a = graph.add_signal(segment, one_channel_signal("a"));
        let z = graph.add_signal(segment, one_channel_signal("z"));
        let early = graph.add_spike_train(segment, spike_train("early", 0.1));
        let late = graph.add_spike_train(segment, spike_train("late", 0.9));
        let group = graph.add_channel_group(block, ChannelGroup::new().with_name("g"));
        let unit = graph.add_unit(group, Unit::new().with_name("u"));
        graph.link_signal(group, z);
        graph.link_signal(group, a);
        graph.link_spike_train(unit, late);
        graph.link_spike_train(unit, early);
        (graph, group, unit)
    }

    fn signal_names(g: &Graph, group: ChannelGroupId) -> Vec<String> {
        g.channel_group(group)
            .signals
            .iter()
            .filter_map(|s| g.signal(*s).common.name.clone())
            .collect()
    }

    fn train_names(g: &Graph, unit: UnitId) -> Vec<String> {
        g.unit(unit)
            .spike_trains
            .iter()
            .filter_map(|t| g.spike_train(*t).common.name.clone())
            .collect()
    }

    #[test]
    fn slashes_in_names_stay_one_path_step() {
        let mut graph = Graph::new();
        let block = graph.add_block(RecordingBlock::new().with_name("rec/2015"));
        let segment = graph.add_segment(block, Segment::new().with_name("trial/1"));
        let mut store = InMemoryContainerStore::new();
        let mut session = Session::new(SyncConfig::default());
        session.write_all(&mut store, &graph).unwrap();

        let seg_path = session.locate(&graph, segment.into());
        assert_eq!(seg_path.to_string(), "/rec_2015/segments/trial_1");
        assert_eq!(seg_path.to_string().parse::<NixPath>().unwrap(), seg_path);
        assert!(path::resolve(&store, &seg_path).is_ok());

        let back = Session::new(SyncConfig::default()).read_all(&store).unwrap();
        assert_eq!(back.block(BlockId::new(0)).common.name.as_deref(), Some("rec/2015"));
        assert_eq!(back.segment(SegmentId::new(0)).common.name.as_deref(), Some("trial/1"));
    }

    #[test]
    fn zero_channel_signal_is_rejected() {
        let mut graph = Graph::new();
        let block = graph.add_block(RecordingBlock::new().with_name("b"));
        let segment = graph.add_segment(block, Segment::new().with_name("s"));
        let empty = graph.add_signal(
            segment,
            Signal::regular(
                Samples::new(vec![5, 0], Vec::new()).unwrap(),
                "mV",
                Quantity::new(1.0, "ms"),
                Quantity::seconds(0.0),
            )
            .with_name("empty"),
        );
        let mut store = InMemoryContainerStore::new();
        let mut session = Session::new(SyncConfig::default());

        let err = session.write_all(&mut store, &graph).unwrap_err();
        assert!(matches!(
            err,
            SyncError::Unrepresentable { kind: ObjectKind::AnalogSignal, ref name, .. } if name == "empty"
        ));
        assert!(session.identity().binding(&(graph.id(), graph.signal_ref(empty))).is_none());
    }

    #[test]
    fn link_order_survives_a_round_trip() {
        let (graph, group, unit) = reordered();
        let mut store = InMemoryContainerStore::new();
        let mut session = Session::new(SyncConfig::default());
        session.write_all(&mut store, &graph).unwrap();

        let back = Session::new(SyncConfig::default()).read_all(&store).unwrap();
        assert_eq!(signal_names(&back, group), vec!["z", "a"]);
        assert_eq!(train_names(&back, unit), vec!["late", "early"]);

        store.reset_mutation_count();
        session.write_all(&mut store, &graph).unwrap();
        assert_eq!(store.mutation_count(), 0);
    }

    #[test]
    fn reordering_links_of_an_unchanged_group_is_written() {
        let (mut graph, group, unit) = reordered();
        let mut store = InMemoryContainerStore::new();
        let mut session = Session::new(SyncConfig::default());
        session.write_all(&mut store, &graph).unwrap();

        graph.channel_group_mut(group).signals.reverse();
        graph.unit_mut(unit).spike_trains.reverse();
        let stats = session.write_all(&mut store, &graph).unwrap();
        assert_eq!(stats.linked + stats.unlinked, 0);

        let back = Session::new(SyncConfig::default()).read_all(&store).unwrap();
        assert_eq!(signal_names(&back, group), vec!["a", "z"]);
        assert_eq!(train_names(&back, unit), vec!["early", "late"]);
    }

    // -----------------------------------------------------------------------
    // Deferred payloads
    // -----------------------------------------------------------------------

    #[test]
    fn lazy_read_registers_placeholders() {
        let (_, store, _) = written();
        let mut session = Session::new(SyncConfig::lazy());
        let g = session.read_all(&store).unwrap();

        let seg = g.segment(SegmentId::new(0));
        let lfp = g.signal(seg.analog_signals[0]);
        assert!(lfp.samples.is_placeholder());
        assert_eq!(lfp.samples.shape(), &[4, 3]);
        let train = g.spike_train(seg.spike_trains[0]);
        assert!(train.times_deferred);
        assert_eq!(train.len(), 3);

        let pending: Vec<String> = session.pending().iter().map(ToString::to_string).collect();
        assert_eq!(
            pending,
            vec![
                "/session1/segments/trial1/analogsignals/lfp",
                "/session1/segments/trial1/irregularlysampledsignals/neo.IrregularlySampledSignal",
                "/session1/segments/trial1/spiketrains/st",
            ]
        );
    }

    #[test]
    fn materialize_fills_the_registered_object_in_place() {
        let (f, mut store, _) = written();
        let mut session = Session::new(SyncConfig::lazy());
        let mut g = session.read_all(&store).unwrap();
        let lfp_path = path("/session1/segments/trial1/analogsignals/lfp");
        let before = g.signal_ref(g.segment(SegmentId::new(0)).analog_signals[0]);

        let obj = session.materialize(&store, &lfp_path, &mut g).unwrap();
        assert_eq!(obj, before);
        let lfp = g.signal(SignalId::new(obj.index));
        assert_eq!(lfp.samples, f.graph.signal(f.lfp).samples);
        assert_eq!(lfp.channel_group, Some(ChannelGroupId::new(0)));
        assert!(!session.lazy().is_pending(g.id(), &lfp_path));

        let st_path = path("/session1/segments/trial1/spiketrains/st");
        let obj = session.materialize(&store, &st_path, &mut g).unwrap();
        let train = g.spike_train(SpikeTrainId::new(obj.index));
        assert!(!train.times_deferred);
        assert_eq!(train.times.values, vec![0.1, 0.2, 0.3]);
        assert_eq!(train.unit, Some(UnitId::new(0)));

        store.reset_mutation_count();
        session.write_all(&mut store, &g).unwrap();
        assert_eq!(store.mutation_count(), 0);
    }

    #[test]
    fn two_graphs_materialize_the_same_path_in_place() {
        let (f, store, _) = written();
        let mut session = Session::new(SyncConfig::lazy());
        let mut first = session.read_all(&store).unwrap();
        let mut second = session.read_all(&store).unwrap();
        let lfp_path = path("/session1/segments/trial1/analogsignals/lfp");
        assert!(session.lazy().is_pending(first.id(), &lfp_path));
        assert!(session.lazy().is_pending(second.id(), &lfp_path));

        let in_first = first.signal_ref(first.segment(SegmentId::new(0)).analog_signals[0]);
        assert_eq!(session.materialize(&store, &lfp_path, &mut first).unwrap(), in_first);
        assert!(session.lazy().is_pending(second.id(), &lfp_path));

        let in_second = second.signal_ref(second.segment(SegmentId::new(0)).analog_signals[0]);
        assert_eq!(session.materialize(&store, &lfp_path, &mut second).unwrap(), in_second);
        assert_eq!(second.segment(SegmentId::new(0)).analog_signals.len(), 1);
        assert_eq!(
            second.signal(SignalId::new(in_second.index)).samples,
            f.graph.signal(f.lfp).samples
        );
        assert_eq!(session.pending_in(first.id()), session.pending_in(second.id()));
        assert!(!session.pending().contains(&lfp_path));
    }

    #[test]
    fn materialize_of_an_unregistered_path_reads_it() {
        let (f, store, _) = written();
        let mut session = Session::new(SyncConfig::default());
        let mut g = Graph::new();
        let obj = session
            .materialize(&store, &path("/session1/segments/trial1/analogsignals/lfp"), &mut g)
            .unwrap();
        assert_eq!(g.signal(SignalId::new(obj.index)).samples, f.graph.signal(f.lfp).samples);
    }

    #[test]
    fn writing_deferred_objects_keeps_stored_payloads() {
        let (f, mut store, _) = written();
        let mut session = Session::new(SyncConfig::lazy());
        let mut g = session.read_all(&store).unwrap();
        let seg = SegmentId::new(0);
        let lfp = g.segment(seg).analog_signals[0];
        let train = g.segment(seg).spike_trains[0];
        g.signal_mut(lfp).common.description = Some("edited".into());
        g.spike_train_mut(train).common.description = Some("edited".into());
        let stats = session.write_all(&mut store, &g).unwrap();
        assert_eq!(stats.updated, 2);

        let back = Session::new(SyncConfig::default()).read_all(&store).unwrap();
        let seg = back.segment(seg);
        let lfp = back.signal(seg.analog_signals[0]);
        assert_eq!(lfp.common.description.as_deref(), Some("edited"));
        assert_eq!(lfp.samples, f.graph.signal(f.lfp).samples);
        let train = back.spike_train(seg.spike_trains[0]);
        assert_eq!(train.times.values, vec![0.1, 0.2, 0.3]);
        assert_eq!(train.waveforms, f.graph.spike_train(f.train).waveforms);
    }

    #[test]
    fn forget_graph_unbinds_everything() {
        let (f, mut store, mut session) = written();
        session.forget_graph(f.graph.id());
        assert!(session.identity().is_empty());
        assert_eq!(session.recorded_digest(f.graph.id(), BlockId::new(0).into()), None);
        let stats = session.write_all(&mut store, &f.graph).unwrap();
        assert_eq!(stats.updated, OBJECTS);
    }

    #[test]
    fn regular_start_keeps_its_own_unit() {
        let (f, store, _) = written();
        let g = Session::new(SyncConfig::default()).read_all(&store).unwrap();
        let lfp = g.signal(g.segment(SegmentId::new(0)).analog_signals[0]);
        match (&lfp.time_basis, &f.graph.signal(f.lfp).time_basis) {
            (
                TimeBasis::Regular { t_start, sampling_period },
                TimeBasis::Regular { t_start: t0, .. },
            ) => {
                assert_eq!(t_start, t0);
                assert_eq!(t_start.units, "s");
                assert_eq!(sampling_period.units, "ms");
            }
            other => panic!("unexpected time bases {other:?}"),
        }
    }
}
