//! Linear algebra utilities.
//!
//! Only what the minimizer needs: a packed symmetric matrix plus a handful of
//! vector products on `nalgebra::DVector`.

mod sym_matrix;

pub use sym_matrix::SymMatrix;

use nalgebra::DVector;

use crate::error::{MathError, MathResult};

/// Inner product of two vectors.
pub fn inner_product(a: &DVector<f64>, b: &DVector<f64>) -> MathResult<f64> {
    if a.len() != b.len() {
        return Err(MathError::dimension_mismatch(a.len(), b.len()));
    }
    Ok(a.dot(b))
}

/// Quadratic form `vᵀ·M·v`.
pub fn similarity(v: &DVector<f64>, m: &SymMatrix) -> MathResult<f64> {
    let mv = m.mul_vec(v)?;
    inner_product(v, &mv)
}

/// Outer product `v·vᵀ` as a symmetric matrix.
pub fn outer_product(v: &DVector<f64>) -> SymMatrix {
    SymMatrix::outer_product(v)
}

/// Sum of absolute values of the vector elements.
pub fn abs_sum(v: &DVector<f64>) -> f64 {
    v.iter().map(|x| x.abs()).sum()
}
