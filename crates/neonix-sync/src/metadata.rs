//! Metadata sections: layout and property encoding.
//!
//! Sections mirror the domain path. A block's section is a top-level section
//! named after the block; every other object's section lives under its
//! parent's section, inside a label section (`segments`, `events`, ...)
//! named after the container label.
//!
//! Properties hold what the element header cannot: kind scalars under fixed
//! names, and one property per annotation. Annotation arrays and timestamps
//! are tagged through the property definition.

use chrono::{DateTime, NaiveDateTime};
use neonix_store::{ContainerStore, ElementId, ElementKind, Property, PropertyValue};
use neonix_types::{AnnotationValue, Annotations, ContainerLabel, ObjectKind, Quantity, Scalar};
use tracing::warn;

use crate::error::SyncResult;

/// Type of the intermediate sections named after container labels.
pub const LABEL_SECTION_TYPE: &str = "neo.container";

pub const NAME: &str = "neo_name";
pub const FILE_ORIGIN: &str = "file_origin";
pub const FILE_DATETIME: &str = "file_datetime";
pub const T_START: &str = "t_start";
pub const T_STOP: &str = "t_stop";
pub const LEFT_SWEEP: &str = "left_sweep";
pub const CHANNEL_INDEXES: &str = "channel_indexes";
pub const CHANNEL_NAMES: &str = "channel_names";
pub const COORDINATES: &str = "coordinates";
pub const COORDINATE_WIDTHS: &str = "coordinate_widths";
/// Element ids of a group's signals (a unit's spike trains) in domain order.
pub const SIGNAL_ORDER: &str = "signal_order";
pub const SPIKE_TRAIN_ORDER: &str = "spike_train_order";

const ARRAY_DEFINITION: &str = "array";
const DATETIME_DEFINITION: &str = "datetime";

/// Type string of the section attached to an element of `type_name`.
pub fn section_type(type_name: &str) -> String {
    format!("{type_name}.metadata")
}

/// Property names a kind uses for its own scalars. Annotations with these
/// keys cannot be stored.
pub fn reserved_properties(kind: ObjectKind) -> &'static [&'static str] {
    match kind {
        ObjectKind::Block | ObjectKind::Segment => &[NAME, FILE_ORIGIN, FILE_DATETIME],
        ObjectKind::ChannelGroup => &[
            NAME,
            FILE_ORIGIN,
            CHANNEL_INDEXES,
            CHANNEL_NAMES,
            COORDINATES,
            COORDINATE_WIDTHS,
            SIGNAL_ORDER,
        ],
        ObjectKind::AnalogSignal => &[NAME, FILE_ORIGIN, T_START],
        ObjectKind::SpikeTrain => &[NAME, FILE_ORIGIN, T_START, T_STOP, LEFT_SWEEP],
        ObjectKind::Unit => &[NAME, FILE_ORIGIN, SPIKE_TRAIN_ORDER],
        _ => &[NAME, FILE_ORIGIN],
    }
}

/// Find or create the section of an object.
///
/// `parent_section` is `None` for blocks (top-level section).
pub fn ensure_section<S: ContainerStore + ?Sized>(
    store: &mut S,
    parent_section: Option<ElementId>,
    label: Option<ContainerLabel>,
    name: &str,
    type_name: &str,
) -> SyncResult<ElementId> {
    let holder = match (parent_section, label) {
        (Some(parent), Some(label)) => Some(
            store
                .lookup_or_create(Some(parent), ElementKind::Section, label.as_str(), LABEL_SECTION_TYPE)?
                .0,
        ),
        (parent, _) => parent,
    };
    Ok(store
        .lookup_or_create(holder, ElementKind::Section, name, &section_type(type_name))?
        .0)
}

/// Make the section's properties exactly `desired`, touching only those that
/// differ.
pub fn sync_properties<S: ContainerStore + ?Sized>(
    store: &mut S,
    section: ElementId,
    desired: Vec<Property>,
) -> SyncResult<()> {
    let existing = store.properties(section)?;
    for stale in existing
        .iter()
        .filter(|p| !desired.iter().any(|d| d.name == p.name))
    {
        store.remove_property(section, &stale.name)?;
    }
    for prop in desired {
        if !existing.contains(&prop) {
            store.set_property(section, prop)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Accumulates the properties of one section.
#[derive(Debug, Default)]
pub struct PropertySet {
    props: Vec<Property>,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opt_str(&mut self, name: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value {
            self.props
                .push(Property::single(name, PropertyValue::Str(v.to_string())));
        }
        self
    }

    pub fn datetime(&mut self, name: &str, value: Option<&NaiveDateTime>) -> &mut Self {
        if let Some(dt) = value {
            self.props
                .push(Property::single(name, PropertyValue::Int(to_seconds(dt))));
        }
        self
    }

    pub fn quantity(&mut self, name: &str, q: &Quantity) -> &mut Self {
        self.props.push(
            Property::single(name, PropertyValue::Float(q.magnitude)).with_unit(q.units.clone()),
        );
        self
    }

    pub fn opt_quantity(&mut self, name: &str, q: Option<&Quantity>) -> &mut Self {
        if let Some(q) = q {
            self.quantity(name, q);
        }
        self
    }

    pub fn ints(&mut self, name: &str, values: &[i64]) -> &mut Self {
        self.props.push(Property::new(
            name,
            values.iter().map(|v| PropertyValue::Int(*v)).collect(),
        ));
        self
    }

    pub fn strs(&mut self, name: &str, values: &[String]) -> &mut Self {
        self.props.push(Property::new(
            name,
            values.iter().map(|v| PropertyValue::Str(v.clone())).collect(),
        ));
        self
    }

    pub fn floats(&mut self, name: &str, values: &[f64], unit: Option<&str>) -> &mut Self {
        let mut prop = Property::new(
            name,
            values.iter().map(|v| PropertyValue::Float(*v)).collect(),
        );
        prop.unit = unit.map(str::to_string);
        self.props.push(prop);
        self
    }

    /// Append one property per storable annotation. Unsupported values and
    /// keys colliding with the kind's scalars are dropped with a warning.
    pub fn annotations(&mut self, kind: ObjectKind, annotations: &Annotations, owner: &str) -> &mut Self {
        let reserved = reserved_properties(kind);
        for (key, value) in annotations {
            if let Some(reason) = value.unsupported_reason() {
                warn!(object = %owner, key = %key, reason, "dropping annotation");
                continue;
            }
            if reserved.contains(&key.as_str()) {
                warn!(object = %owner, key = %key, "dropping annotation shadowing a reserved property");
                continue;
            }
            if let Some(prop) = annotation_property(key, value) {
                self.props.push(prop);
            }
        }
        self
    }

    pub fn finish(self) -> Vec<Property> {
        self.props
    }
}

fn annotation_property(key: &str, value: &AnnotationValue) -> Option<Property> {
    let prop = match value {
        AnnotationValue::Str(s) => Property::single(key, PropertyValue::Str(s.clone())),
        AnnotationValue::Int(i) => Property::single(key, PropertyValue::Int(*i)),
        AnnotationValue::Float(f) => Property::single(key, PropertyValue::Float(*f)),
        AnnotationValue::Bool(b) => Property::single(key, PropertyValue::Bool(*b)),
        AnnotationValue::Timestamp(dt) => {
            Property::single(key, PropertyValue::Int(to_seconds(dt))).with_definition(DATETIME_DEFINITION)
        }
        AnnotationValue::Array(items) => {
            Property::new(key, items.iter().map(scalar_value).collect()).with_definition(ARRAY_DEFINITION)
        }
        AnnotationValue::Nested(_) | AnnotationValue::Quantity(_) => return None,
    };
    Some(prop)
}

fn scalar_value(s: &Scalar) -> PropertyValue {
    match s {
        Scalar::Str(v) => PropertyValue::Str(v.clone()),
        Scalar::Int(v) => PropertyValue::Int(*v),
        Scalar::Float(v) => PropertyValue::Float(*v),
        Scalar::Bool(v) => PropertyValue::Bool(*v),
    }
}

fn value_scalar(v: &PropertyValue) -> Scalar {
    match v {
        PropertyValue::Str(s) => Scalar::Str(s.clone()),
        PropertyValue::Int(i) => Scalar::Int(*i),
        PropertyValue::Float(f) => Scalar::Float(*f),
        PropertyValue::Bool(b) => Scalar::Bool(*b),
    }
}

pub fn to_seconds(dt: &NaiveDateTime) -> i64 {
    dt.and_utc().timestamp()
}

pub fn from_seconds(seconds: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(seconds, 0).map(|d| d.naive_utc())
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Read-side view over the properties of one section.
#[derive(Debug, Default)]
pub struct Properties {
    props: Vec<Property>,
}

impl Properties {
    pub fn load<S: ContainerStore + ?Sized>(store: &S, section: Option<ElementId>) -> SyncResult<Self> {
        Ok(Self {
            props: match section {
                Some(s) => store.properties(s)?,
                None => Vec::new(),
            },
        })
    }

    fn get(&self, name: &str) -> Option<&Property> {
        self.props.iter().find(|p| p.name == name)
    }

    pub fn str(&self, name: &str) -> Option<String> {
        match self.get(name)?.first()? {
            PropertyValue::Str(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn datetime(&self, name: &str) -> Option<NaiveDateTime> {
        match self.get(name)?.first()? {
            PropertyValue::Int(s) => from_seconds(*s),
            _ => None,
        }
    }

    pub fn quantity(&self, name: &str) -> Option<Quantity> {
        let prop = self.get(name)?;
        let magnitude = match prop.first()? {
            PropertyValue::Float(f) => *f,
            PropertyValue::Int(i) => *i as f64,
            _ => return None,
        };
        Some(Quantity::new(
            magnitude,
            prop.unit.clone().unwrap_or_else(|| "dimensionless".to_string()),
        ))
    }

    pub fn ints(&self, name: &str) -> Vec<i64> {
        self.get(name)
            .map(|p| {
                p.values
                    .iter()
                    .filter_map(|v| match v {
                        PropertyValue::Int(i) => Some(*i),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn strs(&self, name: &str) -> Vec<String> {
        self.get(name)
            .map(|p| {
                p.values
                    .iter()
                    .filter_map(|v| match v {
                        PropertyValue::Str(s) => Some(s.clone()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Float values and their unit.
    pub fn floats(&self, name: &str) -> Option<(Vec<f64>, Option<String>)> {
        let p = self.get(name)?;
        let values = p
            .values
            .iter()
            .filter_map(|v| match v {
                PropertyValue::Float(f) => Some(*f),
                _ => None,
            })
            .collect();
        Some((values, p.unit.clone()))
    }

    /// Every property that is not one of the kind's scalars.
    pub fn annotations(&self, kind: ObjectKind) -> Annotations {
        let reserved = reserved_properties(kind);
        self.props
            .iter()
            .filter(|p| !reserved.contains(&p.name.as_str()))
            .filter_map(|p| Some((p.name.clone(), annotation_value(p)?)))
            .collect()
    }
}

fn annotation_value(p: &Property) -> Option<AnnotationValue> {
    match p.definition.as_deref() {
        Some(DATETIME_DEFINITION) => match p.first()? {
            PropertyValue::Int(s) => from_seconds(*s).map(AnnotationValue::Timestamp),
            _ => None,
        },
        Some(ARRAY_DEFINITION) => Some(AnnotationValue::Array(
            p.values.iter().map(value_scalar).collect(),
        )),
        _ if p.values.len() != 1 => Some(AnnotationValue::Array(
            p.values.iter().map(value_scalar).collect(),
        )),
        _ => Some(match p.first()? {
            PropertyValue::Str(s) => AnnotationValue::Str(s.clone()),
            PropertyValue::Int(i) => AnnotationValue::Int(*i),
            PropertyValue::Float(f) => AnnotationValue::Float(*f),
            PropertyValue::Bool(b) => AnnotationValue::Bool(*b),
        }),
    }
}
