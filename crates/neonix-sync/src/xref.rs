//! Non-tree relations carried by store back-references.
//!
//! A channel group's signals and a unit's spike trains live under segments,
//! so the store records the relation the other way round: each channel
//! array (or spike-train tag) lists the group's (unit's) source among its
//! `sources`. Writing makes that set exact; reading scans the block for
//! elements naming the source and maps them back through the identity map.

use neonix_store::{ContainerStore, ElementId, ElementKind};
use neonix_types::{ChannelGroupId, Graph, ObjectKind, SignalId, SpikeTrainId, UnitId};
use tracing::debug;

use crate::error::SyncResult;
use crate::identity::{Binding, IdentityMap, ObjectKey};

/// Link changes made while reconciling one source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinkChanges {
    pub linked: usize,
    pub unlinked: usize,
}

impl LinkChanges {
    pub fn is_empty(&self) -> bool {
        self.linked == 0 && self.unlinked == 0
    }
}

/// Elements of `kind` under `block` whose back-references include `source`.
pub fn linked_elements<S: ContainerStore + ?Sized>(
    store: &S,
    block: ElementId,
    source: ElementId,
    kind: ElementKind,
) -> SyncResult<Vec<ElementId>> {
    let mut out = Vec::new();
    for id in store.descendants(block, kind)? {
        if store.sources(id)?.contains(&source) {
            out.push(id);
        }
    }
    Ok(out)
}

/// Make the elements of `kind` under `block` that reference `source` exactly
/// `desired`: link the missing ones, unlink the stale ones.
pub fn reconcile_links<S: ContainerStore + ?Sized>(
    store: &mut S,
    block: ElementId,
    source: ElementId,
    kind: ElementKind,
    desired: &[ElementId],
) -> SyncResult<LinkChanges> {
    let current = linked_elements(store, block, source, kind)?;
    let mut changes = LinkChanges::default();
    for id in desired {
        if store.link_source(*id, source)? {
            changes.linked += 1;
        }
    }
    for id in current.iter().filter(|id| !desired.contains(id)) {
        if store.unlink_source(*id, source)? {
            changes.unlinked += 1;
        }
    }
    Ok(changes)
}

/// Attach to `group` every signal of `graph` whose channel arrays name
/// `source`. Arrays not read into this graph are skipped.
///
/// `order` lists the signals' primary element ids as written; signals are
/// attached in that order, unlisted ones last in store order.
pub fn attach_group_signals<S: ContainerStore + ?Sized>(
    store: &S,
    identity: &IdentityMap,
    graph: &mut Graph,
    block: ElementId,
    group: ChannelGroupId,
    source: ElementId,
    order: &[String],
) -> SyncResult<usize> {
    let mut attached: Vec<SignalId> = Vec::new();
    for array in linked_elements(store, block, source, ElementKind::DataArray)? {
        match identity.object_of(graph.id(), array) {
            Some(obj) if obj.kind.is_signal() => {
                let id = SignalId::new(obj.index);
                if !attached.contains(&id) {
                    attached.push(id);
                }
            }
            _ => debug!(array = %array, "skipping back-reference to an element outside this graph"),
        }
    }
    let gid = graph.id();
    attached.sort_by_key(|id| order_rank(identity, (gid, graph.signal_ref(*id)), order));
    for id in &attached {
        graph.link_signal(group, *id);
    }
    Ok(attached.len())
}

/// Attach to `unit` every spike train of `graph` whose tag names `source`,
/// following `order` as [`attach_group_signals`] does.
pub fn attach_unit_spike_trains<S: ContainerStore + ?Sized>(
    store: &S,
    identity: &IdentityMap,
    graph: &mut Graph,
    block: ElementId,
    unit: UnitId,
    source: ElementId,
    order: &[String],
) -> SyncResult<usize> {
    let mut attached: Vec<SpikeTrainId> = Vec::new();
    for tag in linked_elements(store, block, source, ElementKind::MultiTag)? {
        match identity.object_of(graph.id(), tag) {
            Some(obj) if obj.kind == ObjectKind::SpikeTrain => {
                let id = SpikeTrainId::new(obj.index);
                if !attached.contains(&id) {
                    attached.push(id);
                }
            }
            _ => debug!(tag = %tag, "skipping back-reference to an element outside this graph"),
        }
    }
    let gid = graph.id();
    attached.sort_by_key(|id| order_rank(identity, (gid, (*id).into()), order));
    for id in &attached {
        graph.link_spike_train(unit, *id);
    }
    Ok(attached.len())
}

fn order_rank(identity: &IdentityMap, key: ObjectKey, order: &[String]) -> usize {
    identity
        .binding(&key)
        .and_then(Binding::primary)
        .and_then(|el| {
            let el = el.to_string();
            order.iter().position(|o| *o == el)
        })
        .unwrap_or(order.len())
}
