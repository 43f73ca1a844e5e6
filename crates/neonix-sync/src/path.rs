//! Slash-delimited addresses of store elements.
//!
//! A path is the block name followed by `(label, name)` steps:
//! `/blk/segments/seg/analogsignals/sig`. Paths are built from names alone,
//! so any element can be located without walking from the file root and
//! without numeric ids.

use std::fmt;
use std::str::FromStr;

use neonix_store::{ContainerStore, ElementId, ElementKind};
use neonix_types::{ContainerLabel, Graph, ObjectKind, ObjectRef};

use crate::error::{SyncError, SyncResult};
use crate::multiplex;
use crate::names;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NixPath {
    block: String,
    steps: Vec<(ContainerLabel, String)>,
}

impl NixPath {
    pub fn root(block: impl Into<String>) -> Self {
        Self {
            block: block.into(),
            steps: Vec::new(),
        }
    }

    /// Extend by one step. Fails if `label` cannot follow the current last
    /// label.
    pub fn child(&self, label: ContainerLabel, name: impl Into<String>) -> SyncResult<Self> {
        let name = name.into();
        if !label.valid_under(self.last_label()) {
            return Err(SyncError::InvalidPath {
                path: format!("{self}/{label}/{name}"),
                reason: format!("{label} cannot follow {}", self.describe_tail()),
            });
        }
        let mut steps = self.steps.clone();
        steps.push((label, name));
        Ok(Self {
            block: self.block.clone(),
            steps,
        })
    }

    pub fn block_name(&self) -> &str {
        &self.block
    }

    pub fn steps(&self) -> &[(ContainerLabel, String)] {
        &self.steps
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last_label(&self) -> Option<ContainerLabel> {
        self.steps.last().map(|(l, _)| *l)
    }

    /// Name of the addressed element.
    pub fn name(&self) -> &str {
        self.steps.last().map_or(&self.block, |(_, n)| n)
    }

    /// Domain kind addressed, `None` for derived elements such as recording
    /// channels.
    pub fn object_kind(&self) -> Option<ObjectKind> {
        match self.last_label() {
            None => Some(ObjectKind::Block),
            Some(label) => label.object_kind(),
        }
    }

    /// Drop the last step. `None` for a root path.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            block: self.block.clone(),
            steps: self.steps[..self.steps.len() - 1].to_vec(),
        })
    }

    /// Every prefix from the root down to and including `self`.
    pub fn ancestry(&self) -> Vec<Self> {
        (0..=self.steps.len())
            .map(|n| Self {
                block: self.block.clone(),
                steps: self.steps[..n].to_vec(),
            })
            .collect()
    }

    /// Components as split on `/`; a root path has two (`""` and the block
    /// name).
    pub fn components(&self) -> Vec<&str> {
        let mut out = vec!["", self.block.as_str()];
        for (label, name) in &self.steps {
            out.push(label.as_str());
            out.push(name.as_str());
        }
        out
    }

    fn describe_tail(&self) -> String {
        match self.last_label() {
            None => "a block".to_string(),
            Some(l) => l.to_string(),
        }
    }
}

impl fmt::Display for NixPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.block)?;
        for (label, name) in &self.steps {
            write!(f, "/{label}/{name}")?;
        }
        Ok(())
    }
}

impl FromStr for NixPath {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| SyncError::InvalidPath {
            path: s.to_string(),
            reason: reason.to_string(),
        };
        let rest = s.strip_prefix('/').ok_or_else(|| invalid("must start with '/'"))?;
        let parts: Vec<&str> = rest.split('/').collect();
        let (block, steps) = parts
            .split_first()
            .ok_or_else(|| invalid("missing block name"))?;
        if block.is_empty() {
            return Err(invalid("missing block name"));
        }
        if steps.len() % 2 != 0 {
            return Err(invalid("expected label/name pairs after the block"));
        }
        let mut path = NixPath::root(*block);
        for pair in steps.chunks(2) {
            let label: ContainerLabel = pair[0]
                .parse()
                .map_err(|_| invalid(&format!("unknown label {:?}", pair[0])))?;
            if pair[1].is_empty() {
                return Err(invalid("empty name"));
            }
            path = path.child(label, pair[1]).map_err(|e| match e {
                SyncError::InvalidPath { reason, .. } => invalid(&reason),
                other => other,
            })?;
        }
        Ok(path)
    }
}

/// Path of `obj` in a store written from `graph`, using resolved names.
pub fn locate(graph: &Graph, obj: ObjectRef) -> NixPath {
    let mut chain = vec![obj];
    let mut cursor = obj;
    while let Some(parent) = graph.parent(cursor) {
        chain.push(parent);
        cursor = parent;
    }
    chain.reverse();

    let mut iter = chain.into_iter();
    let root = iter.next().unwrap_or(obj);
    let mut path = NixPath::root(names::resolved_name(graph, root));
    for step in iter {
        if let Some(label) = step.kind.label() {
            path.steps.push((label, names::resolved_name(graph, step)));
        }
    }
    path
}

/// Store element(s) a path resolves to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
    /// Primary element; for signals, the first channel array.
    pub element: ElementId,
    /// Channel arrays of a signal in channel order; empty otherwise.
    pub channels: Vec<ElementId>,
    /// Element of the owning container, `None` for blocks.
    pub container: Option<ElementId>,
}

impl Resolved {
    fn single(element: ElementId, container: Option<ElementId>) -> Self {
        Self {
            element,
            channels: Vec::new(),
            container,
        }
    }
}

/// Walk `path` through the store, checking element kinds and types at every
/// step.
pub fn resolve<S: ContainerStore + ?Sized>(store: &S, path: &NixPath) -> SyncResult<Resolved> {
    let not_found = |upto: &NixPath| SyncError::NotFound {
        path: upto.to_string(),
    };

    let mut walked = NixPath::root(path.block_name());
    let block = store
        .lookup(None, ElementKind::Block, path.block_name())?
        .filter(|id| has_type(store, *id, ObjectKind::Block.type_name()))
        .ok_or_else(|| not_found(&walked))?;
    let mut current = Resolved::single(block, None);

    for (label, name) in path.steps() {
        walked.steps.push((*label, name.clone()));
        let parent = current.element;
        current = match label {
            ContainerLabel::AnalogSignals | ContainerLabel::IrregularlySampledSignals => {
                let kind = label.object_kind().unwrap_or(ObjectKind::AnalogSignal);
                let channels = multiplex::channel_arrays(store, parent, name, kind.type_name())?;
                let first = *channels.first().ok_or_else(|| not_found(&walked))?;
                Resolved {
                    element: first,
                    channels,
                    container: Some(parent),
                }
            }
            _ => {
                let (kind, type_name) = step_target(*label);
                let id = store
                    .lookup(Some(parent), kind, name)?
                    .filter(|id| has_type(store, *id, type_name))
                    .ok_or_else(|| not_found(&walked))?;
                Resolved::single(id, Some(parent))
            }
        };
    }
    Ok(current)
}

/// Store kind and type string stored under a non-signal label.
pub(crate) fn step_target(label: ContainerLabel) -> (ElementKind, &'static str) {
    match label {
        ContainerLabel::Segments => (ElementKind::Group, ObjectKind::Segment.type_name()),
        ContainerLabel::RecordingChannelGroups => {
            (ElementKind::Source, ObjectKind::ChannelGroup.type_name())
        }
        ContainerLabel::Units => (ElementKind::Source, ObjectKind::Unit.type_name()),
        ContainerLabel::RecordingChannels => (ElementKind::Source, RECORDING_CHANNEL_TYPE),
        ContainerLabel::Events => (ElementKind::MultiTag, ObjectKind::Event.type_name()),
        ContainerLabel::Epochs => (ElementKind::MultiTag, ObjectKind::Epoch.type_name()),
        ContainerLabel::SpikeTrains => (ElementKind::MultiTag, ObjectKind::SpikeTrain.type_name()),
        ContainerLabel::AnalogSignals => {
            (ElementKind::DataArray, ObjectKind::AnalogSignal.type_name())
        }
        ContainerLabel::IrregularlySampledSignals => (
            ElementKind::DataArray,
            ObjectKind::IrregularlySampledSignal.type_name(),
        ),
    }
}

/// Type string of the per-channel sources under a channel group.
pub const RECORDING_CHANNEL_TYPE: &str = "neo.recordingchannel";

fn has_type<S: ContainerStore + ?Sized>(store: &S, id: ElementId, type_name: &str) -> bool {
    store
        .header(id)
        .map(|h| h.type_name == type_name)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use neonix_store::InMemoryContainerStore;
    use neonix_types::{ChannelGroup, RecordingBlock, Segment, Unit};

    // -----------------------------------------------------------------------
    // Parsing and rendering
    // -----------------------------------------------------------------------

    #[test]
    fn render_and_parse() {
        let p = NixPath::root("blk")
            .child(ContainerLabel::Segments, "seg")
            .unwrap()
            .child(ContainerLabel::AnalogSignals, "sig")
            .unwrap();
        let s = p.to_string();
        assert_eq!(s, "/blk/segments/seg/analogsignals/sig");
        assert_eq!(s.parse::<NixPath>().unwrap(), p);
        assert_eq!(p.name(), "sig");
        assert_eq!(p.object_kind(), Some(ObjectKind::AnalogSignal));
    }

    #[test]
    fn root_has_two_components() {
        let p: NixPath = "/blk".parse().unwrap();
        assert!(p.is_root());
        assert_eq!(p.components(), vec!["", "blk"]);
        assert_eq!(p.parent(), None);
        assert_eq!(p.object_kind(), Some(ObjectKind::Block));
    }

    #[test]
    fn parent_drops_last_pair() {
        let p: NixPath = "/b/recordingchannelgroups/g/units/u".parse().unwrap();
        assert_eq!(p.parent().unwrap().to_string(), "/b/recordingchannelgroups/g");
        assert_eq!(p.ancestry().len(), 3);
    }

    #[test]
    fn labels_checked_against_parent() {
        assert!("/b/units/u".parse::<NixPath>().is_err());
        assert!("/b/segments/s/units/u".parse::<NixPath>().is_err());
        assert!("/b/recordingchannelgroups/g/recordingchannels/c"
            .parse::<NixPath>()
            .is_ok());
    }

    #[test]
    fn malformed_paths_rejected() {
        for bad in ["", "blk", "/", "/b/segments", "/b/bogus/x", "/b/segments/"] {
            assert!(
                matches!(bad.parse::<NixPath>(), Err(SyncError::InvalidPath { .. })),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn recording_channels_have_no_object_kind() {
        let p: NixPath = "/b/recordingchannelgroups/g/recordingchannels/c".parse().unwrap();
        assert_eq!(p.object_kind(), None);
    }

    // -----------------------------------------------------------------------
    // Locate
    // -----------------------------------------------------------------------

    #[test]
    fn locate_uses_resolved_names() {
        let mut g = Graph::new();
        let b = g.add_block(RecordingBlock::new().with_name("blk"));
        g.add_segment(b, Segment::new().with_name("s"));
        let s2 = g.add_segment(b, Segment::new().with_name("s"));
        let grp = g.add_channel_group(b, ChannelGroup::new());
        let u = g.add_unit(grp, Unit::new().with_name("u"));
        assert_eq!(locate(&g, s2.into()).to_string(), "/blk/segments/s-1");
        assert_eq!(
            locate(&g, u.into()).to_string(),
            "/blk/recordingchannelgroups/neo.RecordingChannelGroup/units/u"
        );
        assert_eq!(locate(&g, b.into()).to_string(), "/blk");
    }

    #[test]
    fn located_paths_parse_back_with_slashes_in_names() {
        let mut g = Graph::new();
        let b = g.add_block(RecordingBlock::new().with_name("rec/2015"));
        let s = g.add_segment(b, Segment::new().with_name("trial/1"));
        let p = locate(&g, s.into());
        assert_eq!(p.to_string(), "/rec_2015/segments/trial_1");
        assert_eq!(p.to_string().parse::<NixPath>().unwrap(), p);
    }

    // -----------------------------------------------------------------------
    // Resolve
    // -----------------------------------------------------------------------

    #[test]
    fn resolve_walks_the_store() {
        let mut store = InMemoryContainerStore::new();
        let blk = store.create(None, ElementKind::Block, "blk", "neo.block").unwrap();
        let seg = store
            .create(Some(blk), ElementKind::Group, "seg", "neo.segment")
            .unwrap();
        let a0 = store
            .create(Some(seg), ElementKind::DataArray, "sig.0", "neo.analogsignal")
            .unwrap();
        let a1 = store
            .create(Some(seg), ElementKind::DataArray, "sig.1", "neo.analogsignal")
            .unwrap();

        let r = resolve(&store, &"/blk/segments/seg".parse().unwrap()).unwrap();
        assert_eq!(r.element, seg);
        assert_eq!(r.container, Some(blk));

        let r = resolve(&store, &"/blk/segments/seg/analogsignals/sig".parse().unwrap()).unwrap();
        assert_eq!(r.element, a0);
        assert_eq!(r.channels, vec![a0, a1]);
    }

    #[test]
    fn resolve_missing_step_is_not_found() {
        let mut store = InMemoryContainerStore::new();
        store.create(None, ElementKind::Block, "blk", "neo.block").unwrap();
        let err = resolve(&store, &"/blk/segments/nope/events/e".parse().unwrap()).unwrap_err();
        match err {
            SyncError::NotFound { path } => assert_eq!(path, "/blk/segments/nope"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn resolve_checks_type() {
        let mut store = InMemoryContainerStore::new();
        let blk = store.create(None, ElementKind::Block, "blk", "neo.block").unwrap();
        let seg = store
            .create(Some(blk), ElementKind::Group, "seg", "neo.segment")
            .unwrap();
        store
            .create(Some(seg), ElementKind::MultiTag, "t", "neo.epoch")
            .unwrap();
        assert!(resolve(&store, &"/blk/segments/seg/epochs/t".parse().unwrap()).is_ok());
        assert!(matches!(
            resolve(&store, &"/blk/segments/seg/events/t".parse().unwrap()),
            Err(SyncError::NotFound { .. })
        ));
    }
}
