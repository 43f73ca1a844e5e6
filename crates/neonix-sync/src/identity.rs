//! Bidirectional association between domain objects and store elements.

use std::collections::HashMap;

use neonix_store::ElementId;
use neonix_types::{Graph, GraphId, ObjectRef};
use tracing::debug;

use crate::error::{SyncError, SyncResult};

/// Identity of one domain object: its graph plus its arena handle.
pub type ObjectKey = (GraphId, ObjectRef);

/// Store element(s) backing one domain object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Binding {
    Single(ElementId),
    /// One array per channel of a signal, in channel order.
    Multiple(Vec<ElementId>),
}

impl Binding {
    /// Every backing element, primary first.
    pub fn elements(&self) -> &[ElementId] {
        match self {
            Self::Single(id) => std::slice::from_ref(id),
            Self::Multiple(ids) => ids,
        }
    }

    /// The element that carries the object's header and metadata link.
    pub fn primary(&self) -> Option<ElementId> {
        self.elements().first().copied()
    }
}

/// Session-scoped identity map.
///
/// The forward direction answers "which elements hold this object", the
/// inverse "which object of graph G did this element produce". Rebinding a
/// key replaces its previous elements in both directions.
#[derive(Clone, Debug, Default)]
pub struct IdentityMap {
    forward: HashMap<ObjectKey, Binding>,
    inverse: HashMap<(GraphId, ElementId), ObjectRef>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bound objects across all graphs.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Bind `key` to `binding`, dropping inverse entries of its previous
    /// elements. Rebinding to the same elements is a no-op.
    pub fn bind(&mut self, key: ObjectKey, binding: Binding) {
        if let Some(old) = self.forward.get(&key) {
            if *old == binding {
                return;
            }
            for el in old.elements() {
                if self.inverse.get(&(key.0, *el)) == Some(&key.1) {
                    self.inverse.remove(&(key.0, *el));
                }
            }
        }
        for el in binding.elements() {
            self.inverse.insert((key.0, *el), key.1);
        }
        self.forward.insert(key, binding);
    }

    /// Elements backing `key`, if it has been written or read.
    pub fn binding(&self, key: &ObjectKey) -> Option<&Binding> {
        self.forward.get(key)
    }

    /// Binding of an object that must already have been written.
    pub fn store_element_of(&self, graph: &Graph, obj: ObjectRef) -> SyncResult<&Binding> {
        self.forward
            .get(&(graph.id(), obj))
            .ok_or_else(|| SyncError::UnboundReference {
                kind: obj.kind,
                name: graph.name(obj).to_string(),
            })
    }

    /// The object of `graph` an element was read into or written from.
    pub fn object_of(&self, graph: GraphId, element: ElementId) -> Option<ObjectRef> {
        self.inverse.get(&(graph, element)).copied()
    }

    /// Forget one object in both directions and return what it was bound to.
    pub fn unbind(&mut self, key: &ObjectKey) -> Option<Binding> {
        let old = self.forward.remove(key)?;
        for el in old.elements() {
            self.inverse.remove(&(key.0, *el));
        }
        Some(old)
    }

    /// Forget every binding of one graph.
    pub fn unbind_graph(&mut self, graph: GraphId) {
        let before = self.forward.len();
        self.forward.retain(|(g, _), _| *g != graph);
        self.inverse.retain(|(g, _), _| *g != graph);
        debug!(graph = %graph, dropped = before - self.forward.len(), "unbound graph");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neonix_types::{ObjectKind, RecordingBlock, Segment};

    #[test]
    fn bind_and_lookup_both_ways() {
        let mut g = Graph::new();
        let b = g.add_block(RecordingBlock::new().with_name("b"));
        let el = ElementId::new();
        let mut map = IdentityMap::new();
        map.bind((g.id(), b.into()), Binding::Single(el));

        assert_eq!(map.store_element_of(&g, b.into()).unwrap().primary(), Some(el));
        assert_eq!(map.object_of(g.id(), el), Some(b.into()));
        assert_eq!(map.object_of(GraphId::new(), el), None);
    }

    #[test]
    fn unbound_reference_names_the_object() {
        let mut g = Graph::new();
        let b = g.add_block(RecordingBlock::new());
        let s = g.add_segment(b, Segment::new().with_name("seg"));
        let map = IdentityMap::new();
        match map.store_element_of(&g, s.into()).unwrap_err() {
            SyncError::UnboundReference { kind, name } => {
                assert_eq!(kind, ObjectKind::Segment);
                assert_eq!(name, "seg");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rebind_replaces_inverse_entries() {
        let g = GraphId::new();
        let obj = ObjectRef::new(ObjectKind::AnalogSignal, 0);
        let (a, b, c) = (ElementId::new(), ElementId::new(), ElementId::new());
        let mut map = IdentityMap::new();
        map.bind((g, obj), Binding::Multiple(vec![a, b]));
        map.bind((g, obj), Binding::Multiple(vec![a, c]));
        assert_eq!(map.object_of(g, a), Some(obj));
        assert_eq!(map.object_of(g, b), None);
        assert_eq!(map.object_of(g, c), Some(obj));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn one_element_in_two_graphs() {
        let (g1, g2) = (GraphId::new(), GraphId::new());
        let el = ElementId::new();
        let obj1 = ObjectRef::new(ObjectKind::Unit, 0);
        let obj2 = ObjectRef::new(ObjectKind::Unit, 3);
        let mut map = IdentityMap::new();
        map.bind((g1, obj1), Binding::Single(el));
        map.bind((g2, obj2), Binding::Single(el));
        assert_eq!(map.object_of(g1, el), Some(obj1));
        assert_eq!(map.object_of(g2, el), Some(obj2));

        map.unbind_graph(g1);
        assert_eq!(map.object_of(g1, el), None);
        assert_eq!(map.object_of(g2, el), Some(obj2));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn unbind_single_key() {
        let g = GraphId::new();
        let obj = ObjectRef::new(ObjectKind::Event, 1);
        let el = ElementId::new();
        let mut map = IdentityMap::new();
        map.bind((g, obj), Binding::Single(el));
        assert_eq!(map.unbind(&(g, obj)), Some(Binding::Single(el)));
        assert!(map.is_empty());
        assert_eq!(map.object_of(g, el), None);
    }
}
