//! Registry of objects read with placeholder payloads.
//!
//! Entries are keyed by store path *and* the graph that holds the
//! placeholder, so two graphs reading the same path lazily each get their
//! own entry.

use std::collections::BTreeMap;

use neonix_types::{GraphId, ObjectRef};

use crate::path::NixPath;

/// Objects awaiting materialization, keyed by (store path, owning graph).
#[derive(Clone, Debug, Default)]
pub struct LazyRegistry {
    entries: BTreeMap<(NixPath, GraphId), ObjectRef>,
}

impl LazyRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `obj` in `graph` holds a placeholder for `path`.
    ///
    /// Re-registering the same path for the same graph replaces the entry.
    pub fn register(&mut self, path: NixPath, graph: GraphId, obj: ObjectRef) {
        self.entries.insert((path, graph), obj);
    }

    /// Remove and return the entry for `path` in `graph`.
    pub fn take(&mut self, graph: GraphId, path: &NixPath) -> Option<ObjectRef> {
        self.entries.remove(&(path.clone(), graph))
    }

    /// The placeholder object `graph` holds for `path`, if any.
    pub fn get(&self, graph: GraphId, path: &NixPath) -> Option<ObjectRef> {
        self.entries.get(&(path.clone(), graph)).copied()
    }

    pub fn is_pending(&self, graph: GraphId, path: &NixPath) -> bool {
        self.entries.contains_key(&(path.clone(), graph))
    }

    /// Registered paths in order, each listed once whatever the number of
    /// graphs waiting on it.
    pub fn pending(&self) -> Vec<NixPath> {
        let mut out: Vec<NixPath> = Vec::new();
        for (path, _) in self.entries.keys() {
            if out.last() != Some(path) {
                out.push(path.clone());
            }
        }
        out
    }

    /// Registered paths of one graph, in order.
    pub fn pending_in(&self, graph: GraphId) -> Vec<NixPath> {
        self.entries
            .keys()
            .filter(|(_, g)| *g == graph)
            .map(|(p, _)| p.clone())
            .collect()
    }

    /// Number of entries across all graphs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no graph holds a placeholder.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry owned by `graph`.
    pub fn forget_graph(&mut self, graph: GraphId) {
        self.entries.retain(|(_, g), _| *g != graph);
    }
}
