use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Row-major N-d `f64` buffer.
///
/// A placeholder keeps the declared shape but holds no values; it stands in
/// for payloads that were not loaded.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Samples {
    shape: Vec<usize>,
    values: Vec<f64>,
    placeholder: bool,
}

impl Samples {
    pub fn new(shape: Vec<usize>, values: Vec<f64>) -> Result<Self, TypeError> {
        let expected = shape.iter().product::<usize>();
        if values.len() != expected {
            return Err(TypeError::ShapeMismatch {
                shape,
                expected,
                actual: values.len(),
            });
        }
        Ok(Self {
            shape,
            values,
            placeholder: false,
        })
    }

    /// Build a 2-D buffer from rows of equal length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, TypeError> {
        let cols = rows.first().map_or(0, Vec::len);
        let values: Vec<f64> = rows.iter().flatten().copied().collect();
        Self::new(vec![rows.len(), cols], values)
    }

    /// Build a 2-D buffer whose columns are the given vectors.
    pub fn from_columns(columns: &[Vec<f64>]) -> Result<Self, TypeError> {
        let rows = columns.first().map_or(0, Vec::len);
        if let Some(bad) = columns.iter().find(|c| c.len() != rows) {
            return Err(TypeError::ShapeMismatch {
                shape: vec![rows, columns.len()],
                expected: rows,
                actual: bad.len(),
            });
        }
        let mut values = Vec::with_capacity(rows * columns.len());
        for r in 0..rows {
            values.extend(columns.iter().map(|c| c[r]));
        }
        Self::new(vec![rows, columns.len()], values)
    }

    pub fn placeholder(shape: Vec<usize>) -> Self {
        Self {
            shape,
            values: Vec::new(),
            placeholder: true,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    /// Number of elements implied by the shape.
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    pub fn cols(&self) -> usize {
        self.shape.get(1).copied().unwrap_or(1)
    }

    /// Copy of column `c` of a 2-D buffer. Empty for placeholders.
    pub fn column(&self, c: usize) -> Vec<f64> {
        if self.placeholder {
            return Vec::new();
        }
        let cols = self.cols();
        self.values.iter().skip(c).step_by(cols.max(1)).copied().collect()
    }

    pub fn get(&self, index: &[usize]) -> Option<f64> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut flat = 0;
        for (i, (&ix, &dim)) in index.iter().zip(&self.shape).enumerate() {
            if ix >= dim {
                return None;
            }
            flat = if i == 0 { ix } else { flat * dim + ix };
        }
        self.values.get(flat).copied()
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }
}
