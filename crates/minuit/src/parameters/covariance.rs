//! Covariance matrix in external parameter space.

use minuit_math::SymMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{MinuitError, MinuitResult};

/// Covariance of the variable parameters, in user (external) units.
///
/// Rows are ordered like the variable parameters, i.e. by internal index.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserCovariance {
    nrow: usize,
    data: Vec<f64>,
}

impl UserCovariance {
    /// Creates a zero covariance with `nrow` rows.
    #[must_use]
    pub fn new(nrow: usize) -> Self {
        Self {
            nrow,
            data: vec![0.0; nrow * (nrow + 1) / 2],
        }
    }

    /// Creates a covariance from packed lower-triangle data.
    pub fn from_packed(data: Vec<f64>, nrow: usize) -> MinuitResult<Self> {
        if data.len() != nrow * (nrow + 1) / 2 {
            return Err(MinuitError::invalid_covariance(format!(
                "{} elements do not form a packed {nrow}x{nrow} matrix",
                data.len()
            )));
        }
        Ok(Self { nrow, data })
    }

    /// Creates a covariance from a full row-major square matrix.
    pub fn from_rows(rows: &[Vec<f64>]) -> MinuitResult<Self> {
        let n = rows.len();
        let mut cov = Self::new(n);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(MinuitError::invalid_covariance(format!(
                    "row {i} has {} columns, expected {n}",
                    row.len()
                )));
            }
            for j in 0..=i {
                cov.set(i, j, row[j]);
            }
        }
        Ok(cov)
    }

    /// Number of rows.
    pub fn nrow(&self) -> usize {
        self.nrow
    }

    /// Number of stored elements.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Packed lower-triangle storage.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    fn index(row: usize, col: usize) -> usize {
        if row > col {
            col + row * (row + 1) / 2
        } else {
            row + col * (col + 1) / 2
        }
    }

    /// Element `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics when an index is out of bounds.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(row < self.nrow && col < self.nrow, "covariance index out of bounds");
        self.data[Self::index(row, col)]
    }

    /// Sets element `(row, col)` and its mirror.
    ///
    /// # Panics
    ///
    /// Panics when an index is out of bounds.
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        assert!(row < self.nrow && col < self.nrow, "covariance index out of bounds");
        self.data[Self::index(row, col)] = value;
    }

    /// Multiplies every element by `f`.
    pub fn scale(&mut self, f: f64) {
        for x in &mut self.data {
            *x *= f;
        }
    }

    /// Correlation coefficient of rows `i` and `j`.
    pub fn correlation(&self, i: usize, j: usize) -> f64 {
        let denom = (self.get(i, i) * self.get(j, j)).sqrt();
        if denom > 0.0 {
            self.get(i, j) / denom
        } else {
            0.0
        }
    }

    /// The covariance as a symmetric matrix.
    #[must_use]
    pub fn to_sym_matrix(&self) -> SymMatrix {
        let mut m = SymMatrix::new(self.nrow);
        for i in 0..self.nrow {
            for j in 0..=i {
                m.set(i, j, self.get(i, j));
            }
        }
        m
    }

    /// Wraps a symmetric matrix.
    #[must_use]
    pub fn from_sym_matrix(m: &SymMatrix) -> Self {
        Self {
            nrow: m.size(),
            data: m.data().to_vec(),
        }
    }
}
