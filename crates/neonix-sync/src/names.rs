//! Deterministic sibling-name resolution.
//!
//! Store names must be unique among siblings, domain names need not be. Every
//! container's children are resolved in one pass before any store access:
//!
//! - An unnamed (or empty-named) object gets the base `neo.<ClassName>`;
//!   a named one keeps its name with every `/` replaced by `_`.
//! - The first holder of a base keeps it.
//! - Later holders get `base-1`, `base-2`, ... skipping any candidate that is
//!   already final, reserved, or the original name of another object in the
//!   pass.
//!
//! Children that land in the same store container are one pass: a segment's
//! analog and irregular signals (channel arrays of one group), and its events,
//! epochs and spike trains (multi-tags of one group).

use std::borrow::Cow;
use std::collections::HashSet;

use neonix_types::{ChannelGroupId, Graph, ObjectKind, ObjectRef};

/// Resolves one pass of sibling names, avoiding a reserved set.
#[derive(Clone, Debug, Default)]
pub struct NameResolver {
    reserved: HashSet<String>,
}

impl NameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A resolver that never hands out any of `names`.
    pub fn with_reserved<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            reserved: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Resolve `(name, kind)` requests in order.
    pub fn resolve<'a, I>(&self, requests: I) -> Vec<String>
    where
        I: IntoIterator<Item = (Option<&'a str>, ObjectKind)>,
    {
        let requests: Vec<(Option<Cow<'a, str>>, ObjectKind)> = requests
            .into_iter()
            .map(|(name, kind)| (name.filter(|n| !n.is_empty()).map(path_safe), kind))
            .collect();
        let originals: HashSet<&str> = requests.iter().filter_map(|(n, _)| n.as_deref()).collect();

        let mut taken: HashSet<String> = HashSet::with_capacity(requests.len());
        let mut out = Vec::with_capacity(requests.len());
        for (name, kind) in &requests {
            let base = match name {
                Some(n) => n.to_string(),
                None => default_name(*kind),
            };
            let resolved = if !taken.contains(&base) && !self.reserved.contains(&base) {
                base
            } else {
                (1..)
                    .map(|k| format!("{base}-{k}"))
                    .find(|c| {
                        !taken.contains(c)
                            && !self.reserved.contains(c)
                            && !originals.contains(c.as_str())
                    })
                    .unwrap_or(base)
            };
            taken.insert(resolved.clone());
            out.push(resolved);
        }
        out
    }
}

/// Replacement for `/`, which would split a path step.
pub const SEPARATOR_REPLACEMENT: char = '_';

/// `name` with every `/` replaced, so it forms exactly one path step.
pub fn path_safe(name: &str) -> Cow<'_, str> {
    if name.contains('/') {
        Cow::Owned(name.replace('/', &SEPARATOR_REPLACEMENT.to_string()))
    } else {
        Cow::Borrowed(name)
    }
}

/// Synthetic name for an unnamed object of `kind`.
pub fn default_name(kind: ObjectKind) -> String {
    format!("neo.{}", kind.class_name())
}

/// Fill every slot of a single-kind list with its resolved name.
pub fn resolve_names(names: &mut [Option<String>], kind: ObjectKind) {
    let resolved = NameResolver::new().resolve(names.iter().map(|n| (n.as_deref(), kind)));
    for (slot, name) in names.iter_mut().zip(resolved) {
        *slot = Some(name);
    }
}

/// The pass an object belongs to: itself and every sibling sharing its store
/// container, in write order.
pub fn sibling_pass(graph: &Graph, obj: ObjectRef) -> Vec<ObjectRef> {
    match graph.parent(obj) {
        None if obj.kind == ObjectKind::Block => graph.block_ids().map(Into::into).collect(),
        None => vec![obj],
        Some(parent) => pass_of(graph, parent, obj.kind),
    }
}

/// The pass under `parent` containing children of `kind`.
pub fn pass_of(graph: &Graph, parent: ObjectRef, kind: ObjectKind) -> Vec<ObjectRef> {
    let kinds = if kind.is_signal() {
        vec![ObjectKind::AnalogSignal, ObjectKind::IrregularlySampledSignal]
    } else if kind.is_tag() {
        vec![ObjectKind::Event, ObjectKind::Epoch, ObjectKind::SpikeTrain]
    } else {
        vec![kind]
    };
    kinds
        .iter()
        .flat_map(|k| graph.children(parent, *k))
        .collect()
}

/// Resolve the names of one pass.
pub fn resolve_pass(graph: &Graph, pass: &[ObjectRef], reserved: &NameResolver) -> Vec<String> {
    reserved.resolve(pass.iter().map(|o| (graph.common(*o).name.as_deref(), o.kind)))
}

/// The store name `obj` receives.
pub fn resolved_name(graph: &Graph, obj: ObjectRef) -> String {
    let pass = sibling_pass(graph, obj);
    let resolver = match (obj.kind, graph.parent(obj).and_then(|p| p.as_channel_group())) {
        (ObjectKind::Unit, Some(group)) => {
            NameResolver::with_reserved(channel_source_names(graph, group))
        }
        _ => NameResolver::new(),
    };
    let names = resolve_pass(graph, &pass, &resolver);
    pass.iter()
        .position(|o| *o == obj)
        .and_then(|i| names.into_iter().nth(i))
        .unwrap_or_else(|| default_name(obj.kind))
}

/// Names of the per-channel sources nested under a channel group.
pub fn channel_source_names(graph: &Graph, group: ChannelGroupId) -> Vec<String> {
    let prefix = resolved_name(graph, group.into());
    graph
        .channel_group(group)
        .channel_indexes
        .iter()
        .map(|idx| channel_source_name(&prefix, *idx))
        .collect()
}

pub fn channel_source_name(group_name: &str, index: i64) -> String {
    format!("{group_name}.RecordingChannel{index}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use neonix_types::{
        ChannelGroup, Event, Quantity, QuantityArray, RecordingBlock, Samples, Segment, Signal,
        Unit,
    };
    use proptest::prelude::*;

    fn names(input: &[&str], kind: ObjectKind) -> Vec<String> {
        let mut slots: Vec<Option<String>> = input
            .iter()
            .map(|s| if s.is_empty() { None } else { Some(s.to_string()) })
            .collect();
        resolve_names(&mut slots, kind);
        slots.into_iter().map(|s| s.unwrap_or_default()).collect()
    }

    // -----------------------------------------------------------------------
    // Resolver
    // -----------------------------------------------------------------------

    #[test]
    fn mixed_named_and_unnamed_segments() {
        assert_eq!(
            names(&["", "a", "a", ""], ObjectKind::Segment),
            vec!["neo.Segment", "a", "a-1", "neo.Segment-1"]
        );
    }

    #[test]
    fn empty_string_counts_as_unnamed() {
        let out = NameResolver::new().resolve([(Some(""), ObjectKind::Unit)]);
        assert_eq!(out, vec!["neo.Unit"]);
    }

    #[test]
    fn suffix_skips_other_original_names() {
        assert_eq!(
            names(&["a", "a", "a-1"], ObjectKind::Event),
            vec!["a", "a-2", "a-1"]
        );
    }

    #[test]
    fn reserved_names_are_avoided() {
        let resolver = NameResolver::with_reserved(["g.RecordingChannel0"]);
        let out = resolver.resolve([
            (Some("g.RecordingChannel0"), ObjectKind::Unit),
            (None, ObjectKind::Unit),
        ]);
        assert_eq!(out, vec!["g.RecordingChannel0-1", "neo.Unit"]);
    }

    #[test]
    fn slashes_never_reach_store_names() {
        assert_eq!(
            names(&["trial/1", "a/b", "a_b"], ObjectKind::Segment),
            vec!["trial_1", "a_b", "a_b-1"]
        );
        assert_eq!(path_safe("plain"), Cow::Borrowed("plain"));
    }

    #[test]
    fn mixed_kinds_get_their_own_base() {
        let out = NameResolver::new().resolve([
            (None, ObjectKind::AnalogSignal),
            (None, ObjectKind::IrregularlySampledSignal),
            (None, ObjectKind::AnalogSignal),
        ]);
        assert_eq!(
            out,
            vec![
                "neo.AnalogSignal",
                "neo.IrregularlySampledSignal",
                "neo.AnalogSignal-1"
            ]
        );
    }

    // -----------------------------------------------------------------------
    // Passes over a graph
    // -----------------------------------------------------------------------

    fn sample_graph() -> (Graph, ObjectRef, ObjectRef, ObjectRef) {
        let mut g = Graph::new();
        let b = g.add_block(RecordingBlock::new().with_name("blk"));
        let s = g.add_segment(b, Segment::new());
        let samples = Samples::from_columns(&[vec![1.0, 2.0]]).unwrap();
        let analog = g.add_signal(
            s,
            Signal::regular(samples.clone(), "mV", Quantity::new(1.0, "ms"), Quantity::new(0.0, "ms"))
                .with_name("x"),
        );
        let irregular = g.add_signal(
            s,
            Signal::irregular(samples, "mV", QuantityArray::new(vec![0.0, 1.0], "s")).with_name("x"),
        );
        let ev = g.add_event(s, Event::new(QuantityArray::new(vec![1.0], "s"), vec!["a".into()]));
        let (analog, irregular) = (g.signal_ref(analog), g.signal_ref(irregular));
        (g, analog, irregular, ev.into())
    }

    #[test]
    fn analog_and_irregular_signals_share_a_pass() {
        let (g, analog, irregular, _) = sample_graph();
        assert_eq!(resolved_name(&g, analog), "x");
        assert_eq!(resolved_name(&g, irregular), "x-1");
    }

    #[test]
    fn tags_resolve_independently_of_signals() {
        let (g, _, _, ev) = sample_graph();
        assert_eq!(resolved_name(&g, ev), "neo.Event");
    }

    #[test]
    fn unit_names_avoid_channel_sources() {
        let mut g = Graph::new();
        let b = g.add_block(RecordingBlock::new());
        let grp = g.add_channel_group(
            b,
            ChannelGroup::new()
                .with_name("g")
                .with_channels(vec![0, 1], vec!["c0".into(), "c1".into()]),
        );
        let u = g.add_unit(grp, Unit::new().with_name("g.RecordingChannel1"));
        assert_eq!(
            channel_source_names(&g, grp),
            vec!["g.RecordingChannel0", "g.RecordingChannel1"]
        );
        assert_eq!(resolved_name(&g, u.into()), "g.RecordingChannel1-1");
    }

    #[test]
    fn blocks_resolve_across_the_graph() {
        let mut g = Graph::new();
        let a = g.add_block(RecordingBlock::new());
        let b = g.add_block(RecordingBlock::new());
        assert_eq!(resolved_name(&g, a.into()), "neo.Block");
        assert_eq!(resolved_name(&g, b.into()), "neo.Block-1");
    }

    proptest! {
        #[test]
        fn resolved_names_are_distinct(raw in proptest::collection::vec(
            proptest::option::of("[ab]{0,2}(-[12])?"), 0..12)
        ) {
            let resolver = NameResolver::with_reserved(["a", "neo.Epoch-1"]);
            let out = resolver.resolve(raw.iter().map(|n| (n.as_deref(), ObjectKind::Epoch)));
            let unique: HashSet<&String> = out.iter().collect();
            prop_assert_eq!(unique.len(), out.len());
            prop_assert!(!out.iter().any(|n| n == "a" || n == "neo.Epoch-1"));
        }

        #[test]
        fn resolution_is_deterministic(raw in proptest::collection::vec(
            proptest::option::of("[xy]{1,2}"), 0..10)
        ) {
            let first = NameResolver::new().resolve(raw.iter().map(|n| (n.as_deref(), ObjectKind::Unit)));
            let second = NameResolver::new().resolve(raw.iter().map(|n| (n.as_deref(), ObjectKind::Unit)));
            prop_assert_eq!(first, second);
        }

        #[test]
        fn unique_names_are_kept(raw in proptest::collection::btree_set("[a-z]{1,4}", 0..8)) {
            let list: Vec<String> = raw.into_iter().collect();
            let out = NameResolver::new().resolve(list.iter().map(|n| (Some(n.as_str()), ObjectKind::Unit)));
            prop_assert_eq!(out, list);
        }
    }
}
