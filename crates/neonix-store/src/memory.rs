use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::element::{
    ArrayData, Dimension, ElementId, ElementKind, Feature, Header, LinkType, Property,
};
use crate::error::{StoreError, StoreResult};
use crate::traits::ContainerStore;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct ArrayBody {
    data: ArrayData,
    shape: Vec<usize>,
    unit: Option<String>,
    dimensions: Vec<Dimension>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct TagBody {
    positions: Option<ElementId>,
    extents: Option<ElementId>,
    features: Vec<Feature>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Node {
    header: Header,
    children: Vec<ElementId>,
    /// Back-references (data arrays and multi-tags only).
    sources: Vec<ElementId>,
    properties: Vec<Property>,
    array: Option<ArrayBody>,
    tag: Option<TagBody>,
}

/// In-memory container store.
///
/// Elements live in a `HashMap` keyed by id, each node keeping an ordered
/// child list. Every effective mutation bumps a counter so callers can
/// verify that an operation wrote nothing.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct InMemoryContainerStore {
    nodes: HashMap<ElementId, Node>,
    roots: Vec<ElementId>,
    #[serde(skip)]
    mutations: u64,
    #[serde(skip)]
    read_only: bool,
}

impl InMemoryContainerStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of elements currently stored.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of mutating operations that changed the store so far.
    pub fn mutation_count(&self) -> u64 {
        self.mutations
    }

    pub fn reset_mutation_count(&mut self) {
        self.mutations = 0;
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn node(&self, id: ElementId) -> StoreResult<&Node> {
        self.nodes.get(&id).ok_or(StoreError::UnknownElement(id))
    }

    /// Mutable access for a write: checks the read-only flag and counts the
    /// mutation.
    fn node_mut(&mut self, id: ElementId) -> StoreResult<&mut Node> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        let node = self.nodes.get_mut(&id).ok_or(StoreError::UnknownElement(id))?;
        self.mutations += 1;
        Ok(node)
    }

    fn expect_kind(&self, id: ElementId, expected: ElementKind) -> StoreResult<&Node> {
        let node = self.node(id)?;
        if node.header.kind != expected {
            return Err(StoreError::WrongKind {
                id,
                expected,
                actual: node.header.kind,
            });
        }
        Ok(node)
    }

    fn expect_kind_mut(&mut self, id: ElementId, expected: ElementKind) -> StoreResult<&mut Node> {
        self.expect_kind(id, expected)?;
        self.node_mut(id)
    }

    fn array_body(&self, id: ElementId) -> StoreResult<&ArrayBody> {
        let node = self.expect_kind(id, ElementKind::DataArray)?;
        node.array
            .as_ref()
            .ok_or_else(|| StoreError::InvalidData(format!("{id} has no array body")))
    }

    fn array_body_mut(&mut self, id: ElementId) -> StoreResult<&mut ArrayBody> {
        let node = self.expect_kind_mut(id, ElementKind::DataArray)?;
        Ok(node.array.get_or_insert_with(ArrayBody::default))
    }

    fn tag_body(&self, id: ElementId) -> StoreResult<&TagBody> {
        let node = self.expect_kind(id, ElementKind::MultiTag)?;
        node.tag
            .as_ref()
            .ok_or_else(|| StoreError::InvalidData(format!("{id} has no tag body")))
    }

    fn tag_body_mut(&mut self, id: ElementId) -> StoreResult<&mut TagBody> {
        let node = self.expect_kind_mut(id, ElementKind::MultiTag)?;
        Ok(node.tag.get_or_insert_with(TagBody::default))
    }

    fn children_of(&self, parent: Option<ElementId>) -> StoreResult<&[ElementId]> {
        match parent {
            None => Ok(&self.roots),
            Some(id) => Ok(&self.node(id)?.children),
        }
    }

    fn back_ref_holder(&self, id: ElementId) -> StoreResult<()> {
        let kind = self.node(id)?.header.kind;
        if matches!(kind, ElementKind::DataArray | ElementKind::MultiTag) {
            Ok(())
        } else {
            Err(StoreError::WrongKind {
                id,
                expected: ElementKind::DataArray,
                actual: kind,
            })
        }
    }

    fn collect_subtree(&self, id: ElementId, out: &mut Vec<ElementId>) {
        out.push(id);
        if let Some(node) = self.nodes.get(&id) {
            for child in &node.children {
                self.collect_subtree(*child, out);
            }
        }
    }
}

fn check_shape(data: &ArrayData, shape: &[usize]) -> StoreResult<()> {
    let expected: usize = shape.iter().product();
    if data.len() != expected {
        return Err(StoreError::InvalidData(format!(
            "shape {shape:?} needs {expected} values, got {}",
            data.len()
        )));
    }
    Ok(())
}

impl ContainerStore for InMemoryContainerStore {
    fn create(
        &mut self,
        parent: Option<ElementId>,
        kind: ElementKind,
        name: &str,
        type_name: &str,
    ) -> StoreResult<ElementId> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        let parent_kind = match parent {
            Some(p) => Some(self.node(p)?.header.kind),
            None => None,
        };
        if !kind.allowed_under(parent_kind) {
            return Err(StoreError::InvalidParent {
                parent: parent_kind.map_or_else(|| "file root".to_string(), |k| k.to_string()),
                child: kind,
            });
        }
        if self.lookup(parent, kind, name)?.is_some() {
            return Err(StoreError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }

        let id = ElementId::new();
        let node = Node {
            header: Header {
                id,
                kind,
                name: name.to_string(),
                type_name: type_name.to_string(),
                definition: None,
                created_at: None,
                metadata: None,
                parent,
            },
            children: Vec::new(),
            sources: Vec::new(),
            properties: Vec::new(),
            array: (kind == ElementKind::DataArray).then(ArrayBody::default),
            tag: (kind == ElementKind::MultiTag).then(TagBody::default),
        };
        match parent {
            None => self.roots.push(id),
            Some(p) => self.node_mut(p)?.children.push(id),
        }
        self.nodes.insert(id, node);
        if parent.is_none() {
            self.mutations += 1;
        }
        Ok(id)
    }

    fn lookup(
        &self,
        parent: Option<ElementId>,
        kind: ElementKind,
        name: &str,
    ) -> StoreResult<Option<ElementId>> {
        Ok(self
            .children_of(parent)?
            .iter()
            .copied()
            .find(|id| {
                self.nodes
                    .get(id)
                    .is_some_and(|n| n.header.kind == kind && n.header.name == name)
            }))
    }

    fn list(&self, parent: Option<ElementId>, kind: ElementKind) -> StoreResult<Vec<ElementId>> {
        Ok(self
            .children_of(parent)?
            .iter()
            .copied()
            .filter(|id| self.nodes.get(id).is_some_and(|n| n.header.kind == kind))
            .collect())
    }

    fn remove(&mut self, id: ElementId) -> StoreResult<()> {
        let parent = self.node(id)?.header.parent;
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        let mut doomed = Vec::new();
        self.collect_subtree(id, &mut doomed);

        match parent {
            None => self.roots.retain(|c| *c != id),
            Some(p) => self.node_mut(p)?.children.retain(|c| *c != id),
        }
        for gone in &doomed {
            self.nodes.remove(gone);
        }

        // Scrub links into the removed subtree.
        for node in self.nodes.values_mut() {
            node.sources.retain(|s| !doomed.contains(s));
            if node.header.metadata.is_some_and(|m| doomed.contains(&m)) {
                node.header.metadata = None;
            }
            if let Some(tag) = node.tag.as_mut() {
                if tag.positions.is_some_and(|p| doomed.contains(&p)) {
                    tag.positions = None;
                }
                if tag.extents.is_some_and(|e| doomed.contains(&e)) {
                    tag.extents = None;
                }
                tag.features.retain(|f| !doomed.contains(&f.data));
            }
        }
        self.mutations += 1;
        Ok(())
    }

    fn header(&self, id: ElementId) -> StoreResult<Header> {
        Ok(self.node(id)?.header.clone())
    }

    fn set_definition(&mut self, id: ElementId, definition: Option<&str>) -> StoreResult<()> {
        self.node_mut(id)?.header.definition = definition.map(str::to_string);
        Ok(())
    }

    fn set_created_at(&mut self, id: ElementId, seconds: i64) -> StoreResult<()> {
        self.node_mut(id)?.header.created_at = Some(seconds);
        Ok(())
    }

    fn set_metadata(&mut self, id: ElementId, section: Option<ElementId>) -> StoreResult<()> {
        if let Some(s) = section {
            self.expect_kind(s, ElementKind::Section)?;
        }
        self.node_mut(id)?.header.metadata = section;
        Ok(())
    }

    fn set_property(&mut self, section: ElementId, property: Property) -> StoreResult<()> {
        let node = self.expect_kind_mut(section, ElementKind::Section)?;
        match node.properties.iter_mut().find(|p| p.name == property.name) {
            Some(existing) => *existing = property,
            None => node.properties.push(property),
        }
        Ok(())
    }

    fn remove_property(&mut self, section: ElementId, name: &str) -> StoreResult<bool> {
        let present = self
            .expect_kind(section, ElementKind::Section)?
            .properties
            .iter()
            .any(|p| p.name == name);
        if !present {
            return Ok(false);
        }
        self.node_mut(section)?.properties.retain(|p| p.name != name);
        Ok(true)
    }

    fn properties(&self, section: ElementId) -> StoreResult<Vec<Property>> {
        Ok(self.expect_kind(section, ElementKind::Section)?.properties.clone())
    }

    fn append_data(
        &mut self,
        array: ElementId,
        data: ArrayData,
        shape: &[usize],
    ) -> StoreResult<()> {
        check_shape(&data, shape)?;
        let body = self.array_body(array)?;
        let fresh = body.data.is_empty();
        if !fresh {
            if body.shape.get(1..) != shape.get(1..) {
                return Err(StoreError::InvalidData(format!(
                    "cannot append shape {shape:?} to {:?}",
                    body.shape
                )));
            }
            if body.data.type_name() != data.type_name() {
                return Err(StoreError::InvalidData(format!(
                    "cannot append {} values to a {} array",
                    data.type_name(),
                    body.data.type_name()
                )));
            }
        }
        let body = self.array_body_mut(array)?;
        if fresh {
            body.data = data;
            body.shape = shape.to_vec();
        } else {
            let added = shape.first().copied().unwrap_or(0);
            body.data.extend(data);
            if let Some(first) = body.shape.first_mut() {
                *first += added;
            }
        }
        Ok(())
    }

    fn set_data(&mut self, array: ElementId, data: ArrayData, shape: &[usize]) -> StoreResult<()> {
        check_shape(&data, shape)?;
        let body = self.array_body_mut(array)?;
        body.data = data;
        body.shape = shape.to_vec();
        Ok(())
    }

    fn data(&self, array: ElementId) -> StoreResult<ArrayData> {
        Ok(self.array_body(array)?.data.clone())
    }

    fn shape(&self, array: ElementId) -> StoreResult<Vec<usize>> {
        Ok(self.array_body(array)?.shape.clone())
    }

    fn set_unit(&mut self, array: ElementId, unit: Option<&str>) -> StoreResult<()> {
        self.array_body_mut(array)?.unit = unit.map(str::to_string);
        Ok(())
    }

    fn unit(&self, array: ElementId) -> StoreResult<Option<String>> {
        Ok(self.array_body(array)?.unit.clone())
    }

    fn append_dimension(&mut self, array: ElementId, dimension: Dimension) -> StoreResult<()> {
        self.array_body_mut(array)?.dimensions.push(dimension);
        Ok(())
    }

    fn clear_dimensions(&mut self, array: ElementId) -> StoreResult<()> {
        self.array_body_mut(array)?.dimensions.clear();
        Ok(())
    }

    fn dimensions(&self, array: ElementId) -> StoreResult<Vec<Dimension>> {
        Ok(self.array_body(array)?.dimensions.clone())
    }

    fn link_source(&mut self, element: ElementId, source: ElementId) -> StoreResult<bool> {
        self.back_ref_holder(element)?;
        self.expect_kind(source, ElementKind::Source)?;
        if self.node(element)?.sources.contains(&source) {
            return Ok(false);
        }
        self.node_mut(element)?.sources.push(source);
        Ok(true)
    }

    fn unlink_source(&mut self, element: ElementId, source: ElementId) -> StoreResult<bool> {
        self.back_ref_holder(element)?;
        if !self.node(element)?.sources.contains(&source) {
            return Ok(false);
        }
        self.node_mut(element)?.sources.retain(|s| *s != source);
        Ok(true)
    }

    fn sources(&self, element: ElementId) -> StoreResult<Vec<ElementId>> {
        self.back_ref_holder(element)?;
        Ok(self.node(element)?.sources.clone())
    }

    fn set_positions(&mut self, tag: ElementId, array: ElementId) -> StoreResult<()> {
        self.expect_kind(array, ElementKind::DataArray)?;
        self.tag_body_mut(tag)?.positions = Some(array);
        Ok(())
    }

    fn positions(&self, tag: ElementId) -> StoreResult<Option<ElementId>> {
        Ok(self.tag_body(tag)?.positions)
    }

    fn set_extents(&mut self, tag: ElementId, array: Option<ElementId>) -> StoreResult<()> {
        if let Some(a) = array {
            self.expect_kind(a, ElementKind::DataArray)?;
        }
        self.tag_body_mut(tag)?.extents = array;
        Ok(())
    }

    fn extents(&self, tag: ElementId) -> StoreResult<Option<ElementId>> {
        Ok(self.tag_body(tag)?.extents)
    }

    fn add_feature(
        &mut self,
        tag: ElementId,
        array: ElementId,
        link_type: LinkType,
    ) -> StoreResult<bool> {
        self.expect_kind(array, ElementKind::DataArray)?;
        if self.tag_body(tag)?.features.iter().any(|f| f.data == array) {
            return Ok(false);
        }
        self.tag_body_mut(tag)?.features.push(Feature {
            data: array,
            link_type,
        });
        Ok(true)
    }

    fn remove_feature(&mut self, tag: ElementId, array: ElementId) -> StoreResult<bool> {
        if !self.tag_body(tag)?.features.iter().any(|f| f.data == array) {
            return Ok(false);
        }
        self.tag_body_mut(tag)?.features.retain(|f| f.data != array);
        Ok(true)
    }

    fn features(&self, tag: ElementId) -> StoreResult<Vec<Feature>> {
        Ok(self.tag_body(tag)?.features.clone())
    }
}

impl std::fmt::Debug for InMemoryContainerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContainerStore")
            .field("element_count", &self.nodes.len())
            .field("mutations", &self.mutations)
            .field("read_only", &self.read_only)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::PropertyValue;

    fn block_with_group(store: &mut InMemoryContainerStore) -> (ElementId, ElementId) {
        let block = store
            .create(None, ElementKind::Block, "blk", "neo.block")
            .unwrap();
        let group = store
            .create(Some(block), ElementKind::Group, "seg", "neo.segment")
            .unwrap();
        (block, group)
    }

    // -----------------------------------------------------------------------
    // Structure
    // -----------------------------------------------------------------------

    #[test]
    fn create_and_lookup() {
        let mut store = InMemoryContainerStore::new();
        let (block, group) = block_with_group(&mut store);
        assert_eq!(store.lookup(None, ElementKind::Block, "blk").unwrap(), Some(block));
        assert_eq!(
            store.lookup(Some(block), ElementKind::Group, "seg").unwrap(),
            Some(group)
        );
        assert_eq!(store.lookup(Some(block), ElementKind::Source, "seg").unwrap(), None);
        let header = store.header(group).unwrap();
        assert_eq!(header.name, "seg");
        assert_eq!(header.type_name, "neo.segment");
        assert_eq!(header.parent, Some(block));
        assert_eq!(header.created_at, None);
    }

    #[test]
    fn duplicate_names_rejected_per_kind() {
        let mut store = InMemoryContainerStore::new();
        let (block, _) = block_with_group(&mut store);
        let err = store
            .create(Some(block), ElementKind::Group, "seg", "neo.segment")
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName { .. }));
        // Same name, different kind is fine.
        assert!(store
            .create(Some(block), ElementKind::Source, "seg", "neo.unit")
            .is_ok());
    }

    #[test]
    fn invalid_parent_rejected() {
        let mut store = InMemoryContainerStore::new();
        let (block, _) = block_with_group(&mut store);
        let err = store
            .create(Some(block), ElementKind::DataArray, "x", "t")
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidParent { .. }));
        let err = store.create(None, ElementKind::Group, "x", "t").unwrap_err();
        assert!(matches!(err, StoreError::InvalidParent { .. }));
    }

    #[test]
    fn list_preserves_creation_order() {
        let mut store = InMemoryContainerStore::new();
        let (block, group) = block_with_group(&mut store);
        let names = ["c", "a", "b"];
        for n in names {
            store
                .create(Some(group), ElementKind::DataArray, n, "t")
                .unwrap();
        }
        let listed: Vec<String> = store
            .list(Some(group), ElementKind::DataArray)
            .unwrap()
            .into_iter()
            .map(|id| store.header(id).unwrap().name)
            .collect();
        assert_eq!(listed, names);
        assert!(store.list(Some(block), ElementKind::Source).unwrap().is_empty());
    }

    #[test]
    fn descendants_walk_all_groups() {
        let mut store = InMemoryContainerStore::new();
        let (block, g1) = block_with_group(&mut store);
        let g2 = store
            .create(Some(block), ElementKind::Group, "seg2", "neo.segment")
            .unwrap();
        let a1 = store.create(Some(g1), ElementKind::DataArray, "x", "t").unwrap();
        let a2 = store.create(Some(g2), ElementKind::DataArray, "x", "t").unwrap();
        store.create(Some(g2), ElementKind::MultiTag, "m", "t").unwrap();
        assert_eq!(
            store.descendants(block, ElementKind::DataArray).unwrap(),
            vec![a1, a2]
        );
        assert_eq!(store.descendants(block, ElementKind::MultiTag).unwrap().len(), 1);
    }

    #[test]
    fn remove_scrubs_links() {
        let mut store = InMemoryContainerStore::new();
        let (block, group) = block_with_group(&mut store);
        let src = store.create(Some(block), ElementKind::Source, "src", "t").unwrap();
        let arr = store.create(Some(group), ElementKind::DataArray, "a", "t").unwrap();
        let feat = store.create(Some(group), ElementKind::DataArray, "f", "t").unwrap();
        let tag = store.create(Some(group), ElementKind::MultiTag, "m", "t").unwrap();
        let section = store.create(None, ElementKind::Section, "s", "t").unwrap();
        store.link_source(arr, src).unwrap();
        store.set_positions(tag, arr).unwrap();
        store.add_feature(tag, feat, LinkType::Indexed).unwrap();
        store.set_metadata(arr, Some(section)).unwrap();

        store.remove(src).unwrap();
        assert!(store.sources(arr).unwrap().is_empty());

        store.remove(feat).unwrap();
        assert!(store.features(tag).unwrap().is_empty());

        store.remove(section).unwrap();
        assert_eq!(store.header(arr).unwrap().metadata, None);

        store.remove(arr).unwrap();
        assert_eq!(store.positions(tag).unwrap(), None);
        assert!(matches!(store.header(arr), Err(StoreError::UnknownElement(_))));
    }

    #[test]
    fn remove_takes_subtree() {
        let mut store = InMemoryContainerStore::new();
        let (block, group) = block_with_group(&mut store);
        store.create(Some(group), ElementKind::DataArray, "a", "t").unwrap();
        store.remove(block).unwrap();
        assert!(store.is_empty());
    }

    // -----------------------------------------------------------------------
    // Payloads
    // -----------------------------------------------------------------------

    #[test]
    fn append_extends_first_axis() {
        let mut store = InMemoryContainerStore::new();
        let (_, group) = block_with_group(&mut store);
        let arr = store.create(Some(group), ElementKind::DataArray, "a", "t").unwrap();
        store
            .append_data(arr, ArrayData::Float(vec![1.0, 2.0, 3.0, 4.0]), &[2, 2])
            .unwrap();
        store
            .append_data(arr, ArrayData::Float(vec![5.0, 6.0]), &[1, 2])
            .unwrap();
        assert_eq!(store.shape(arr).unwrap(), vec![3, 2]);
        assert_eq!(store.data(arr).unwrap().len(), 6);

        let err = store
            .append_data(arr, ArrayData::Float(vec![1.0, 2.0, 3.0]), &[1, 3])
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));
        let err = store
            .append_data(arr, ArrayData::Int(vec![1, 2]), &[1, 2])
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));
    }

    #[test]
    fn set_data_replaces_and_checks_shape() {
        let mut store = InMemoryContainerStore::new();
        let (_, group) = block_with_group(&mut store);
        let arr = store.create(Some(group), ElementKind::DataArray, "a", "t").unwrap();
        store.set_data(arr, ArrayData::Int(vec![1, 2, 3]), &[3]).unwrap();
        store
            .set_data(arr, ArrayData::Text(vec!["x".into()]), &[1])
            .unwrap();
        assert_eq!(store.data(arr).unwrap(), ArrayData::Text(vec!["x".into()]));
        assert!(store.set_data(arr, ArrayData::Int(vec![1]), &[2]).is_err());
    }

    #[test]
    fn properties_replace_by_name() {
        let mut store = InMemoryContainerStore::new();
        let section = store.create(None, ElementKind::Section, "s", "t").unwrap();
        store
            .set_property(section, Property::single("a", PropertyValue::Int(1)))
            .unwrap();
        store
            .set_property(section, Property::single("a", PropertyValue::Int(2)))
            .unwrap();
        let props = store.properties(section).unwrap();
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].first(), Some(&PropertyValue::Int(2)));
        assert!(store.remove_property(section, "a").unwrap());
        assert!(!store.remove_property(section, "a").unwrap());
    }

    #[test]
    fn array_ops_reject_wrong_kind() {
        let mut store = InMemoryContainerStore::new();
        let (block, _) = block_with_group(&mut store);
        let err = store.data(block).unwrap_err();
        assert!(matches!(err, StoreError::WrongKind { .. }));
        let err = store.sources(block).unwrap_err();
        assert!(matches!(err, StoreError::WrongKind { .. }));
    }

    // -----------------------------------------------------------------------
    // Mutation accounting
    // -----------------------------------------------------------------------

    #[test]
    fn reads_do_not_count() {
        let mut store = InMemoryContainerStore::new();
        let (block, group) = block_with_group(&mut store);
        let before = store.mutation_count();
        store.lookup(Some(block), ElementKind::Group, "seg").unwrap();
        store.header(group).unwrap();
        store.list(Some(block), ElementKind::Group).unwrap();
        assert_eq!(store.mutation_count(), before);
    }

    #[test]
    fn redundant_links_do_not_count() {
        let mut store = InMemoryContainerStore::new();
        let (block, group) = block_with_group(&mut store);
        let src = store.create(Some(block), ElementKind::Source, "src", "t").unwrap();
        let arr = store.create(Some(group), ElementKind::DataArray, "a", "t").unwrap();
        assert!(store.link_source(arr, src).unwrap());
        let before = store.mutation_count();
        assert!(!store.link_source(arr, src).unwrap());
        assert!(!store.unlink_source(arr, ElementId::new()).unwrap());
        assert_eq!(store.mutation_count(), before);
    }

    #[test]
    fn read_only_rejects_writes() {
        let mut store = InMemoryContainerStore::new();
        let (block, _) = block_with_group(&mut store);
        store.set_read_only(true);
        assert!(matches!(
            store.create(Some(block), ElementKind::Group, "x", "t"),
            Err(StoreError::ReadOnly)
        ));
        assert!(matches!(
            store.set_definition(block, Some("d")),
            Err(StoreError::ReadOnly)
        ));
        assert!(matches!(store.remove(block), Err(StoreError::ReadOnly)));
        assert!(store.lookup(None, ElementKind::Block, "blk").unwrap().is_some());
    }

    #[test]
    fn debug_format() {
        let store = InMemoryContainerStore::new();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryContainerStore"));
        assert!(debug.contains("element_count"));
    }
}
