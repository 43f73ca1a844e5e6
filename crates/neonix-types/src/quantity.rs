//! Minimal unit-bearing values.
//!
//! Only the unit families a recording needs are known: time, frequency,
//! potential, current and length. Rescaling converts within one family.

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Dimension {
    Time,
    Frequency,
    Potential,
    Current,
    Length,
    Dimensionless,
}

/// Unit symbol, dimension, factor to the dimension's base unit.
const UNITS: &[(&str, Dimension, f64)] = &[
    ("s", Dimension::Time, 1.0),
    ("sec", Dimension::Time, 1.0),
    ("ms", Dimension::Time, 1e-3),
    ("us", Dimension::Time, 1e-6),
    ("ns", Dimension::Time, 1e-9),
    ("min", Dimension::Time, 60.0),
    ("h", Dimension::Time, 3600.0),
    ("Hz", Dimension::Frequency, 1.0),
    ("kHz", Dimension::Frequency, 1e3),
    ("V", Dimension::Potential, 1.0),
    ("mV", Dimension::Potential, 1e-3),
    ("uV", Dimension::Potential, 1e-6),
    ("A", Dimension::Current, 1.0),
    ("mA", Dimension::Current, 1e-3),
    ("uA", Dimension::Current, 1e-6),
    ("nA", Dimension::Current, 1e-9),
    ("pA", Dimension::Current, 1e-12),
    ("m", Dimension::Length, 1.0),
    ("mm", Dimension::Length, 1e-3),
    ("um", Dimension::Length, 1e-6),
    ("dimensionless", Dimension::Dimensionless, 1.0),
];

fn lookup(units: &str) -> Result<(Dimension, f64), TypeError> {
    UNITS
        .iter()
        .find(|(symbol, _, _)| *symbol == units)
        .map(|(_, dim, factor)| (*dim, *factor))
        .ok_or_else(|| TypeError::UnknownUnit(units.to_string()))
}

/// Multiplier converting a magnitude in `from` to a magnitude in `to`.
pub fn conversion_factor(from: &str, to: &str) -> Result<f64, TypeError> {
    if from == to {
        return Ok(1.0);
    }
    let (from_dim, from_factor) = lookup(from)?;
    let (to_dim, to_factor) = lookup(to)?;
    if from_dim != to_dim {
        return Err(TypeError::IncompatibleUnits {
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    Ok(from_factor / to_factor)
}

/// Returns `true` if `units` is a known unit string.
pub fn is_known_unit(units: &str) -> bool {
    lookup(units).is_ok()
}

/// A scalar with a unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub magnitude: f64,
    pub units: String,
}

impl Quantity {
    pub fn new(magnitude: f64, units: impl Into<String>) -> Self {
        Self {
            magnitude,
            units: units.into(),
        }
    }

    pub fn seconds(magnitude: f64) -> Self {
        Self::new(magnitude, "s")
    }

    pub fn rescale(&self, units: &str) -> Result<Quantity, TypeError> {
        let factor = conversion_factor(&self.units, units)?;
        Ok(Quantity::new(self.magnitude * factor, units))
    }
}

/// An array of magnitudes sharing one unit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QuantityArray {
    pub values: Vec<f64>,
    pub units: String,
}

impl QuantityArray {
    pub fn new(values: Vec<f64>, units: impl Into<String>) -> Self {
        Self {
            values,
            units: units.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn rescale(&self, units: &str) -> Result<QuantityArray, TypeError> {
        let factor = conversion_factor(&self.units, units)?;
        Ok(QuantityArray::new(
            self.values.iter().map(|v| v * factor).collect(),
            units,
        ))
    }
}
