//! Packed symmetric matrix.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, MulAssign, Sub, SubAssign};

use log::trace;
use nalgebra::{DMatrix, DVector, SymmetricEigen};

use crate::error::{MathError, MathResult};

/// Symmetric `n×n` matrix storing only the lower triangle.
///
/// Element `(i, j)` and `(j, i)` share one storage slot, so every setter keeps
/// the matrix symmetric.
#[derive(Debug, Clone, PartialEq)]
pub struct SymMatrix {
    size: usize,
    data: Vec<f64>,
}

impl SymMatrix {
    /// Creates a zero matrix of dimension `size`.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            size,
            data: vec![0.0; size * (size + 1) / 2],
        }
    }

    /// Creates the identity matrix.
    #[must_use]
    pub fn identity(size: usize) -> Self {
        let mut m = Self::new(size);
        for i in 0..size {
            m.set(i, i, 1.0);
        }
        m
    }

    /// Creates a diagonal matrix.
    #[must_use]
    pub fn from_diagonal(diag: &[f64]) -> Self {
        let mut m = Self::new(diag.len());
        for (i, &d) in diag.iter().enumerate() {
            m.set(i, i, d);
        }
        m
    }

    /// Builds a matrix from packed lower-triangle data (row-major).
    pub fn from_packed(size: usize, data: Vec<f64>) -> MathResult<Self> {
        let expected = size * (size + 1) / 2;
        if data.len() != expected {
            return Err(MathError::dimension_mismatch(expected, data.len()));
        }
        Ok(Self { size, data })
    }

    /// Builds a matrix from the lower triangle of a dense square matrix.
    pub fn from_dmatrix(m: &DMatrix<f64>) -> MathResult<Self> {
        if m.nrows() != m.ncols() {
            return Err(MathError::dimension_mismatch(m.nrows(), m.ncols()));
        }
        let mut s = Self::new(m.nrows());
        for i in 0..m.nrows() {
            for j in 0..=i {
                s.set(i, j, m[(i, j)]);
            }
        }
        Ok(s)
    }

    /// Outer product `v·vᵀ`.
    #[must_use]
    pub fn outer_product(v: &DVector<f64>) -> Self {
        let mut m = Self::new(v.len());
        for i in 0..v.len() {
            for j in 0..=i {
                m.set(i, j, v[i] * v[j]);
            }
        }
        m
    }

    /// Matrix dimension.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Packed lower-triangle storage.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    fn index(row: usize, col: usize) -> usize {
        if row >= col {
            col + row * (row + 1) / 2
        } else {
            row + col * (col + 1) / 2
        }
    }

    /// Element `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics when an index is outside the matrix.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(row < self.size && col < self.size, "index out of bounds");
        self.data[Self::index(row, col)]
    }

    /// Element `(row, col)`, or an error when out of bounds.
    pub fn try_get(&self, row: usize, col: usize) -> MathResult<f64> {
        if row >= self.size || col >= self.size {
            return Err(MathError::IndexOutOfBounds {
                row,
                col,
                size: self.size,
            });
        }
        Ok(self.data[Self::index(row, col)])
    }

    /// Sets element `(row, col)` and its mirror.
    ///
    /// # Panics
    ///
    /// Panics when an index is outside the matrix.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        assert!(row < self.size && col < self.size, "index out of bounds");
        self.data[Self::index(row, col)] = value;
    }

    /// The diagonal as a vector.
    #[must_use]
    pub fn diagonal(&self) -> DVector<f64> {
        DVector::from_fn(self.size, |i, _| self.get(i, i))
    }

    /// Matrix-vector product.
    pub fn mul_vec(&self, v: &DVector<f64>) -> MathResult<DVector<f64>> {
        if v.len() != self.size {
            return Err(MathError::dimension_mismatch(self.size, v.len()));
        }
        Ok(DVector::from_fn(self.size, |i, _| {
            (0..self.size).map(|j| self.get(i, j) * v[j]).sum()
        }))
    }

    /// Sum of the absolute values of the stored elements.
    pub fn abs_sum(&self) -> f64 {
        self.data.iter().map(|x| x.abs()).sum()
    }

    /// Expands into a dense nalgebra matrix.
    #[must_use]
    pub fn to_dmatrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.size, self.size, |i, j| self.get(i, j))
    }

    /// Eigenvalues in ascending order.
    #[must_use]
    pub fn eigenvalues(&self) -> DVector<f64> {
        if self.size == 0 {
            return DVector::zeros(0);
        }
        let eigen = SymmetricEigen::new(self.to_dmatrix());
        let mut values: Vec<f64> = eigen.eigenvalues.iter().copied().collect();
        values.sort_by(f64::total_cmp);
        DVector::from_vec(values)
    }

    /// Inverse of the matrix.
    ///
    /// Uses in-place Gauss-Jordan elimination on the matrix scaled to unit
    /// diagonal. Fails with [`MathError::SingularMatrix`] when a diagonal
    /// element is not positive or a pivot vanishes.
    pub fn invert(&self) -> MathResult<Self> {
        let n = self.size;
        let mut a = self.clone();
        if n == 0 {
            return Ok(a);
        }
        if n == 1 {
            let tmp = a.data[0];
            if tmp <= 0.0 {
                return Err(MathError::SingularMatrix);
            }
            a.data[0] = 1.0 / tmp;
            return Ok(a);
        }

        let mut s = vec![0.0; n];
        let mut q = vec![0.0; n];
        let mut pp = vec![0.0; n];

        for i in 0..n {
            let si = a.get(i, i);
            if si <= 0.0 {
                trace!("invert: non-positive diagonal {si} at {i}");
                return Err(MathError::SingularMatrix);
            }
            s[i] = 1.0 / si.sqrt();
        }
        for i in 0..n {
            for j in 0..=i {
                let v = a.get(i, j) * s[i] * s[j];
                a.set(i, j, v);
            }
        }

        for k in 0..n {
            let akk = a.get(k, k);
            if akk == 0.0 {
                return Err(MathError::SingularMatrix);
            }
            q[k] = 1.0 / akk;
            pp[k] = 1.0;
            a.set(k, k, 0.0);
            for j in 0..k {
                pp[j] = a.get(j, k);
                q[j] = a.get(j, k) * q[k];
                a.set(j, k, 0.0);
            }
            for j in k + 1..n {
                pp[j] = a.get(k, j);
                q[j] = -a.get(k, j) * q[k];
                a.set(k, j, 0.0);
            }
            for j in 0..n {
                for l in j..n {
                    let v = a.get(j, l) + pp[j] * q[l];
                    a.set(j, l, v);
                }
            }
        }

        for j in 0..n {
            for k in 0..=j {
                let v = a.get(k, j) * s[k] * s[j];
                a.set(k, j, v);
            }
        }
        if a.data.iter().any(|x| !x.is_finite()) {
            return Err(MathError::SingularMatrix);
        }
        Ok(a)
    }

    fn check_same_size(&self, other: &Self) {
        assert_eq!(self.size, other.size, "matrix dimensions differ");
    }
}

impl AddAssign<&SymMatrix> for SymMatrix {
    fn add_assign(&mut self, rhs: &SymMatrix) {
        self.check_same_size(rhs);
        for (a, b) in self.data.iter_mut().zip(&rhs.data) {
            *a += b;
        }
    }
}

impl SubAssign<&SymMatrix> for SymMatrix {
    fn sub_assign(&mut self, rhs: &SymMatrix) {
        self.check_same_size(rhs);
        for (a, b) in self.data.iter_mut().zip(&rhs.data) {
            *a -= b;
        }
    }
}

impl MulAssign<f64> for SymMatrix {
    fn mul_assign(&mut self, rhs: f64) {
        for a in &mut self.data {
            *a *= rhs;
        }
    }
}

impl Add<&SymMatrix> for &SymMatrix {
    type Output = SymMatrix;

    fn add(self, rhs: &SymMatrix) -> SymMatrix {
        let mut out = self.clone();
        out += rhs;
        out
    }
}

impl Sub<&SymMatrix> for &SymMatrix {
    type Output = SymMatrix;

    fn sub(self, rhs: &SymMatrix) -> SymMatrix {
        let mut out = self.clone();
        out -= rhs;
        out
    }
}

impl Mul<f64> for &SymMatrix {
    type Output = SymMatrix;

    fn mul(self, rhs: f64) -> SymMatrix {
        let mut out = self.clone();
        out *= rhs;
        out
    }
}

impl Mul<f64> for SymMatrix {
    type Output = SymMatrix;

    fn mul(mut self, rhs: f64) -> SymMatrix {
        self *= rhs;
        self
    }
}

impl fmt::Display for SymMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.size {
            for j in 0..self.size {
                write!(f, "{:>14.6e}", self.get(i, j))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> SymMatrix {
        let mut m = SymMatrix::new(3);
        m.set(0, 0, 4.0);
        m.set(1, 1, 3.0);
        m.set(2, 2, 2.0);
        m.set(1, 0, 1.0);
        m.set(2, 0, 0.5);
        m.set(2, 1, -0.3);
        m
    }

    #[test]
    fn test_symmetric_storage() {
        let m = sample();
        assert_eq!(m.data().len(), 6);
        assert_relative_eq!(m.get(0, 1), 1.0);
        assert_relative_eq!(m.get(1, 0), 1.0);
        assert_relative_eq!(m.get(1, 2), -0.3);
    }

    #[test]
    fn test_invert() {
        let m = sample();
        let inv = m.invert().unwrap();
        let prod = m.to_dmatrix() * inv.to_dmatrix();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(prod[(i, j)], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_invert_1x1() {
        let m = SymMatrix::from_diagonal(&[4.0]);
        assert_relative_eq!(m.invert().unwrap().get(0, 0), 0.25);
        assert_eq!(
            SymMatrix::from_diagonal(&[0.0]).invert(),
            Err(MathError::SingularMatrix)
        );
    }

    #[test]
    fn test_invert_singular() {
        let v = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let m = SymMatrix::outer_product(&v);
        assert!(m.invert().is_err());
        let neg = SymMatrix::from_diagonal(&[1.0, -1.0]);
        assert_eq!(neg.invert(), Err(MathError::SingularMatrix));
    }

    #[test]
    fn test_eigenvalues_ascending() {
        let m = SymMatrix::from_diagonal(&[3.0, 1.0, 2.0]);
        let ev = m.eigenvalues();
        assert_relative_eq!(ev[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(ev[1], 2.0, epsilon = 1e-12);
        assert_relative_eq!(ev[2], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_arithmetic() {
        let m = sample();
        let twice = &m + &m;
        assert_relative_eq!(twice.get(2, 0), 1.0);
        let zero = &twice - &(&m * 2.0);
        assert_relative_eq!(zero.abs_sum(), 0.0);
        let v = DVector::from_vec(vec![1.0, 0.0, 0.0]);
        let mv = m.mul_vec(&v).unwrap();
        assert_relative_eq!(mv[1], 1.0);
        assert_relative_eq!(mv[2], 0.5);
        assert!(m.mul_vec(&DVector::zeros(2)).is_err());
    }

    #[test]
    fn test_from_packed_checks_length() {
        assert!(SymMatrix::from_packed(2, vec![1.0, 0.0, 1.0]).is_ok());
        assert!(SymMatrix::from_packed(2, vec![1.0, 0.0]).is_err());
        assert!(SymMatrix::new(2).try_get(2, 0).is_err());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn test_inverse_of_diagonally_dominant_matrix(
                diag in prop::array::uniform4(4.0..10.0_f64),
                off in prop::array::uniform6(-1.0..1.0_f64),
            ) {
                let m = SymMatrix::from_packed(
                    4,
                    vec![diag[0], off[0], diag[1], off[1], off[2], diag[2], off[3], off[4], off[5], diag[3]],
                )
                .unwrap();
                let inv = m.invert().unwrap();
                let product = m.to_dmatrix() * inv.to_dmatrix();
                for i in 0..4 {
                    for j in 0..4 {
                        let expected = if i == j { 1.0 } else { 0.0 };
                        prop_assert!((product[(i, j)] - expected).abs() < 1e-10);
                    }
                }
            }
        }
    }
}
