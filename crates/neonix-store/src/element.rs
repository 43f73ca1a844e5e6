use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a store element.
///
/// Ids never appear in paths; they exist so back-references and metadata
/// links survive renames of unrelated siblings.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(Uuid);

impl ElementId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn short(&self) -> String {
        let s = self.0.simple().to_string();
        s[s.len() - 8..].to_string()
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementId({})", self.short())
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The primitive element vocabulary of the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementKind {
    Block,
    Group,
    Source,
    DataArray,
    MultiTag,
    Section,
}

impl ElementKind {
    /// Whether `self` may be created directly under a parent of kind
    /// `parent` (`None` is the file root).
    pub fn allowed_under(self, parent: Option<ElementKind>) -> bool {
        matches!(
            (parent, self),
            (None, Self::Block)
                | (None, Self::Section)
                | (Some(Self::Block), Self::Group)
                | (Some(Self::Block), Self::Source)
                | (Some(Self::Source), Self::Source)
                | (Some(Self::Group), Self::DataArray)
                | (Some(Self::Group), Self::MultiTag)
                | (Some(Self::Section), Self::Section)
        )
    }

    /// Kinds that can appear as direct children of `self`.
    pub fn child_kinds(self) -> &'static [ElementKind] {
        match self {
            Self::Block => &[Self::Group, Self::Source],
            Self::Source => &[Self::Source],
            Self::Group => &[Self::DataArray, Self::MultiTag],
            Self::Section => &[Self::Section],
            Self::DataArray | Self::MultiTag => &[],
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block => write!(f, "block"),
            Self::Group => write!(f, "group"),
            Self::Source => write!(f, "source"),
            Self::DataArray => write!(f, "data array"),
            Self::MultiTag => write!(f, "multi-tag"),
            Self::Section => write!(f, "section"),
        }
    }
}

/// Fields every element carries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub id: ElementId,
    pub kind: ElementKind,
    pub name: String,
    pub type_name: String,
    pub definition: Option<String>,
    /// Creation timestamp in whole seconds since the epoch, if set.
    pub created_at: Option<i64>,
    pub metadata: Option<ElementId>,
    pub parent: Option<ElementId>,
}

/// Typed array payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ArrayData {
    Float(Vec<f64>),
    Int(Vec<i64>),
    Text(Vec<String>),
}

impl ArrayData {
    pub fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Float(_) => "float",
            Self::Int(_) => "int",
            Self::Text(_) => "text",
        }
    }

    pub fn as_floats(&self) -> Option<&[f64]> {
        match self {
            Self::Float(v) => Some(v),
            _ => None,
        }
    }

    /// Append `other` if both hold the same element type.
    pub(crate) fn extend(&mut self, other: ArrayData) -> bool {
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => a.extend(b),
            (Self::Int(a), Self::Int(b)) => a.extend(b),
            (Self::Text(a), Self::Text(b)) => a.extend(b),
            _ => return false,
        }
        true
    }
}

impl Default for ArrayData {
    fn default() -> Self {
        Self::Float(Vec::new())
    }
}

/// Describes one axis of a data array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Dimension {
    /// Regular sampling: position `i` is `offset + i * interval`.
    Sampled {
        interval: f64,
        offset: f64,
        unit: Option<String>,
        label: Option<String>,
    },
    /// Explicit, monotonic tick positions.
    Range {
        ticks: Vec<f64>,
        unit: Option<String>,
        label: Option<String>,
    },
    /// Categorical axis, optionally labelled.
    Set { labels: Vec<String> },
}

/// A single property value inside a section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// A named, possibly multi-valued, property of a metadata section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub values: Vec<PropertyValue>,
    pub unit: Option<String>,
    /// Free-form tag describing how the values are to be interpreted.
    pub definition: Option<String>,
}

impl Property {
    pub fn new(name: impl Into<String>, values: Vec<PropertyValue>) -> Self {
        Self {
            name: name.into(),
            values,
            unit: None,
            definition: None,
        }
    }

    pub fn single(name: impl Into<String>, value: PropertyValue) -> Self {
        Self::new(name, vec![value])
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    pub fn first(&self) -> Option<&PropertyValue> {
        self.values.first()
    }
}

/// How a multi-tag feature array relates to the tag's positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkType {
    Tagged,
    Untagged,
    /// The feature's first axis is indexed by position number.
    Indexed,
}

/// A secondary data array attached to a multi-tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub data: ElementId,
    pub link_type: LinkType,
}
