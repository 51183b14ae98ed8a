//! Positive-definiteness repair of error matrices.

use log::{debug, warn};
use minuit_math::{MachinePrecision, SymMatrix};

use crate::minimum::{MinimumError, MinimumState};

/// Forces an error matrix positive definite.
///
/// The matrix is scaled to unit diagonal and its eigenvalues inspected. If
/// the smallest is below `max(1e-6, eps2)` times the largest, the diagonal
/// is inflated by `0.001·pmax − pmin` (relative) and the result flagged as
/// made positive definite. A diagonal below `eps2` is first shifted up and
/// the shifted matrix is returned. Otherwise the input is returned unchanged.
pub fn make_pos_def(error: &MinimumError, prec: &MachinePrecision) -> MinimumError {
    let mut err = error.inv_hessian().clone();
    let n = err.size();

    if n == 1 {
        if err.get(0, 0) < prec.eps() {
            err.set(0, 0, 1.0);
            warn!("1x1 error matrix not positive; reset to identity");
            return MinimumError::made_pos_def(err);
        }
        return error.clone();
    }

    let epspdf = 1.0e-6_f64.max(prec.eps2());
    let mut dgmin = err.get(0, 0);
    for i in 0..n {
        if err.get(i, i) < prec.eps2() {
            warn!("negative or zero diagonal element {i} in covariance matrix");
        }
        dgmin = dgmin.min(err.get(i, i));
    }

    let mut dg = 0.0;
    if dgmin < prec.eps2() {
        dg = 1.0 + epspdf - dgmin;
        warn!("added {dg} to diagonal of error matrix");
    }

    let mut scaled = SymMatrix::new(n);
    let mut s = vec![0.0; n];
    for i in 0..n {
        err.set(i, i, err.get(i, i) + dg);
        if err.get(i, i) < 0.0 {
            err.set(i, i, 1.0);
        }
        s[i] = 1.0 / err.get(i, i).sqrt();
        for j in 0..=i {
            scaled.set(i, j, err.get(i, j) * s[i] * s[j]);
        }
    }

    let eigen = scaled.eigenvalues();
    let pmin = eigen[0];
    let pmax = eigen[n - 1].abs().max(1.0);
    if pmin > epspdf * pmax {
        if dg > 0.0 {
            return MinimumError::made_pos_def(err);
        }
        return error.clone();
    }

    let padd = 0.001 * pmax - pmin;
    debug!("eigenvalues of scaled error matrix: {:?}", eigen.as_slice());
    for i in 0..n {
        err.set(i, i, err.get(i, i) * (1.0 + padd));
    }
    warn!("matrix forced pos-def by adding {padd} to diagonal");
    MinimumError::made_pos_def(err)
}

/// [`make_pos_def`] applied to the error matrix of a state.
pub fn make_pos_def_state(state: &MinimumState, prec: &MachinePrecision) -> MinimumState {
    MinimumState::new(
        state.parameters().clone(),
        make_pos_def(state.error(), prec),
        state.gradient().clone(),
        state.edm(),
        state.nfcn(),
    )
}
