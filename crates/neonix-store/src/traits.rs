use crate::element::{
    ArrayData, Dimension, ElementId, ElementKind, Feature, Header, LinkType, Property,
};
use crate::error::StoreResult;

/// Hierarchical container store.
///
/// All implementations must satisfy these invariants:
/// - Sibling names are unique per element kind within one parent; `create`
///   fails with `DuplicateName` rather than shadowing.
/// - `list` returns children in creation order.
/// - Removing an element removes its subtree and scrubs every back-reference,
///   metadata link, position/extent link and feature pointing into it.
/// - Single writer: mutations take `&mut self` and are never concurrent.
///
/// A parent of `None` addresses the file root (blocks and top-level
/// sections).
pub trait ContainerStore {
    // ---------------------------------------------------------------
    // Structure
    // ---------------------------------------------------------------

    /// Create a new element named `name` under `parent`.
    fn create(
        &mut self,
        parent: Option<ElementId>,
        kind: ElementKind,
        name: &str,
        type_name: &str,
    ) -> StoreResult<ElementId>;

    /// Find a child by kind and name. `Ok(None)` if absent.
    fn lookup(
        &self,
        parent: Option<ElementId>,
        kind: ElementKind,
        name: &str,
    ) -> StoreResult<Option<ElementId>>;

    /// Children of one kind, in creation order.
    fn list(&self, parent: Option<ElementId>, kind: ElementKind) -> StoreResult<Vec<ElementId>>;

    /// Remove an element and its subtree.
    fn remove(&mut self, id: ElementId) -> StoreResult<()>;

    fn header(&self, id: ElementId) -> StoreResult<Header>;

    // ---------------------------------------------------------------
    // Header fields
    // ---------------------------------------------------------------

    fn set_definition(&mut self, id: ElementId, definition: Option<&str>) -> StoreResult<()>;

    fn set_created_at(&mut self, id: ElementId, seconds: i64) -> StoreResult<()>;

    /// Point an element at a metadata section (or detach it).
    fn set_metadata(&mut self, id: ElementId, section: Option<ElementId>) -> StoreResult<()>;

    // ---------------------------------------------------------------
    // Sections
    // ---------------------------------------------------------------

    /// Insert or replace a property by name.
    fn set_property(&mut self, section: ElementId, property: Property) -> StoreResult<()>;

    /// Remove a property. Returns `true` if it existed.
    fn remove_property(&mut self, section: ElementId, name: &str) -> StoreResult<bool>;

    fn properties(&self, section: ElementId) -> StoreResult<Vec<Property>>;

    // ---------------------------------------------------------------
    // Data arrays
    // ---------------------------------------------------------------

    /// Append values along the first axis. `shape` is the shape of the
    /// appended block; its trailing axes must match the existing data.
    fn append_data(&mut self, array: ElementId, data: ArrayData, shape: &[usize])
        -> StoreResult<()>;

    /// Replace the whole payload.
    fn set_data(&mut self, array: ElementId, data: ArrayData, shape: &[usize]) -> StoreResult<()>;

    fn data(&self, array: ElementId) -> StoreResult<ArrayData>;

    fn shape(&self, array: ElementId) -> StoreResult<Vec<usize>>;

    fn set_unit(&mut self, array: ElementId, unit: Option<&str>) -> StoreResult<()>;

    fn unit(&self, array: ElementId) -> StoreResult<Option<String>>;

    fn append_dimension(&mut self, array: ElementId, dimension: Dimension) -> StoreResult<()>;

    fn clear_dimensions(&mut self, array: ElementId) -> StoreResult<()>;

    fn dimensions(&self, array: ElementId) -> StoreResult<Vec<Dimension>>;

    // ---------------------------------------------------------------
    // Back-references
    // ---------------------------------------------------------------

    /// Add `source` to the back-reference list of a data array or
    /// multi-tag. Returns `false` (and changes nothing) if already present.
    fn link_source(&mut self, element: ElementId, source: ElementId) -> StoreResult<bool>;

    /// Returns `false` (and changes nothing) if the link was absent.
    fn unlink_source(&mut self, element: ElementId, source: ElementId) -> StoreResult<bool>;

    fn sources(&self, element: ElementId) -> StoreResult<Vec<ElementId>>;

    // ---------------------------------------------------------------
    // Multi-tags
    // ---------------------------------------------------------------

    fn set_positions(&mut self, tag: ElementId, array: ElementId) -> StoreResult<()>;

    fn positions(&self, tag: ElementId) -> StoreResult<Option<ElementId>>;

    fn set_extents(&mut self, tag: ElementId, array: Option<ElementId>) -> StoreResult<()>;

    fn extents(&self, tag: ElementId) -> StoreResult<Option<ElementId>>;

    /// Attach a feature. Returns `false` if `array` is already a feature.
    fn add_feature(&mut self, tag: ElementId, array: ElementId, link_type: LinkType)
        -> StoreResult<bool>;

    /// Detach a feature. Returns `false` if it was not attached.
    fn remove_feature(&mut self, tag: ElementId, array: ElementId) -> StoreResult<bool>;

    fn features(&self, tag: ElementId) -> StoreResult<Vec<Feature>>;

    // ---------------------------------------------------------------
    // Provided
    // ---------------------------------------------------------------

    /// All elements of `kind` anywhere below `root`, depth-first in
    /// creation order.
    fn descendants(&self, root: ElementId, kind: ElementKind) -> StoreResult<Vec<ElementId>> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let parent_kind = self.header(id)?.kind;
            let mut next = Vec::new();
            for child_kind in parent_kind.child_kinds() {
                for child in self.list(Some(id), *child_kind)? {
                    if *child_kind == kind {
                        out.push(child);
                    }
                    next.push(child);
                }
            }
            stack.extend(next.into_iter().rev());
        }
        Ok(out)
    }

    /// Look up a child, creating it if absent. Returns the id and whether it
    /// was created.
    fn lookup_or_create(
        &mut self,
        parent: Option<ElementId>,
        kind: ElementKind,
        name: &str,
        type_name: &str,
    ) -> StoreResult<(ElementId, bool)> {
        match self.lookup(parent, kind, name)? {
            Some(id) => Ok((id, false)),
            None => Ok((self.create(parent, kind, name, type_name)?, true)),
        }
    }
}
