//! Removing one parameter from a covariance or error matrix.
//!
//! The row is removed from the inverse (the Hessian) and the result inverted
//! back. This equals the covariance conditional on the removed parameter.

use log::warn;
use minuit_math::SymMatrix;

use super::covariance::UserCovariance;
use crate::minimum::MinimumError;

/// Covariance with row and column `n` eliminated.
pub fn squeeze_covariance(cov: &UserCovariance, n: usize) -> UserCovariance {
    debug_assert!(n < cov.nrow());
    let hess = match cov.to_sym_matrix().invert() {
        Ok(h) => h,
        Err(_) => {
            warn!("covariance inversion failed; returning diagonal matrix");
            let mut result = UserCovariance::new(cov.nrow() - 1);
            for (j, i) in (0..cov.nrow()).filter(|&i| i != n).enumerate() {
                result.set(j, j, cov.get(i, i));
            }
            return result;
        }
    };
    let squeezed = squeeze_matrix(&hess, n);
    match squeezed.invert() {
        Ok(inv) => UserCovariance::from_sym_matrix(&inv),
        Err(_) => {
            warn!("covariance back-inversion failed; returning diagonal matrix");
            let mut result = UserCovariance::new(squeezed.size());
            for i in 0..squeezed.size() {
                result.set(i, i, 1.0 / squeezed.get(i, i));
            }
            result
        }
    }
}

/// Error matrix with parameter `n` eliminated.
pub fn squeeze_error(err: &MinimumError, n: usize) -> MinimumError {
    let hess = err.hessian();
    let squeezed = squeeze_matrix(&hess, n);
    match squeezed.invert() {
        Ok(inv) => MinimumError::new(inv, err.dcovar()),
        Err(_) => {
            warn!("error matrix inversion failed; returning diagonal matrix");
            let diag: Vec<f64> = (0..squeezed.size())
                .map(|i| 1.0 / squeezed.get(i, i))
                .collect();
            MinimumError::invert_failed(SymMatrix::from_diagonal(&diag))
        }
    }
}

/// Drops row and column `n` of a symmetric matrix.
pub fn squeeze_matrix(m: &SymMatrix, n: usize) -> SymMatrix {
    debug_assert!(n < m.size());
    let keep: Vec<usize> = (0..m.size()).filter(|&i| i != n).collect();
    let mut out = SymMatrix::new(keep.len());
    for (a, &i) in keep.iter().enumerate() {
        for (b, &k) in keep.iter().enumerate().take(a + 1) {
            out.set(a, b, m.get(i, k));
        }
    }
    out
}
