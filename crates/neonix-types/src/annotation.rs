//! Free-form annotations attached to every entity.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::quantity::Quantity;

/// Annotation map; keys are kept sorted.
pub type Annotations = BTreeMap<String, AnnotationValue>;

/// A scalar annotation element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn same_type(&self, other: &Scalar) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// A typed annotation value.
///
/// `Nested` and `Quantity` exist so callers can express them, but the store
/// cannot represent either; writers drop them with a warning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AnnotationValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Timestamp(NaiveDateTime),
    Array(Vec<Scalar>),
    Nested(Annotations),
    Quantity(Quantity),
}

impl AnnotationValue {
    /// Why this value cannot be stored, or `None` if it can.
    pub fn unsupported_reason(&self) -> Option<&'static str> {
        match self {
            Self::Nested(_) => Some("nested annotation containers are not supported"),
            Self::Quantity(_) => Some("unit-bearing annotation values are not supported"),
            Self::Array(items) => match items.split_first() {
                Some((first, rest)) if rest.iter().any(|i| !i.same_type(first)) => {
                    Some("annotation arrays must be homogeneous")
                }
                _ => None,
            },
            _ => None,
        }
    }

    pub fn is_storable(&self) -> bool {
        self.unsupported_reason().is_none()
    }
}

impl From<&str> for AnnotationValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for AnnotationValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<i64> for AnnotationValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for AnnotationValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for AnnotationValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<NaiveDateTime> for AnnotationValue {
    fn from(v: NaiveDateTime) -> Self {
        Self::Timestamp(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_are_storable() {
        assert!(AnnotationValue::from("x").is_storable());
        assert!(AnnotationValue::from(3i64).is_storable());
        assert!(AnnotationValue::from(true).is_storable());
        assert!(AnnotationValue::Array(vec![Scalar::Int(1), Scalar::Int(2)]).is_storable());
        assert!(AnnotationValue::Array(vec![]).is_storable());
    }

    #[test]
    fn nested_and_quantities_are_rejected() {
        assert!(!AnnotationValue::Nested(Annotations::new()).is_storable());
        assert!(!AnnotationValue::Quantity(Quantity::seconds(1.0)).is_storable());
    }

    #[test]
    fn mixed_arrays_are_rejected() {
        let v = AnnotationValue::Array(vec![Scalar::Int(1), Scalar::Str("a".into())]);
        assert_eq!(
            v.unsupported_reason(),
            Some("annotation arrays must be homogeneous")
        );
    }
}
