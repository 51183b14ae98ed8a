use log::{debug, warn};
use minuit_math::{DVector, MachinePrecision, SymMatrix};

use crate::builder::estimate_edm;
use crate::fcn::Fcn;
use crate::gradient::GradientCalculator;
use crate::line_search::line_search;
use crate::minimum::{FunctionGradient, MinimumError, MinimumParameters, MinimumState};

/// Returns true if any second derivative estimate is not positive.
pub fn has_negative_g2(grad: &FunctionGradient) -> bool {
    grad.g2().iter().any(|g2| *g2 <= 0.0)
}

/// Moves a state out of a region of negative curvature.
///
/// For the first component with `g2 <= 0`, runs a line search downhill
/// along that coordinate and recomputes the gradient; repeats up to `2n`
/// times. The result carries a fresh diagonal error matrix built from the
/// final second derivatives.
pub fn negative_g2_line_search(
    fcn: &Fcn<'_>,
    st: &MinimumState,
    gc: &dyn GradientCalculator,
    prec: &MachinePrecision,
) -> MinimumState {
    if !has_negative_g2(st.gradient()) {
        return st.clone();
    }

    let n = st.size();
    let mut dgrad = st.gradient().clone();
    let mut pa = st.parameters().clone();

    for _ in 0..=2 * n {
        let Some(i) = dgrad.g2().iter().position(|g2| *g2 <= 0.0) else {
            break;
        };
        debug!("negative g2 = {:e} for internal parameter {i}", dgrad.g2()[i]);

        let grad = dgrad.grad()[i];
        let mut step = DVector::zeros(n);
        step[i] = dgrad.gstep()[i] * grad;
        if grad.abs() > prec.eps2() {
            step[i] *= -1.0 / grad.abs();
        }
        let gdel = step[i] * grad;

        let pp = line_search(fcn, &pa, &step, gdel, prec);
        pa = MinimumParameters::new(pa.vec() + step * pp.x, pp.y);
        dgrad = gc.gradient_with_previous(&pa, &dgrad);
    }

    if has_negative_g2(&dgrad) {
        warn!("negative second derivative persists after line search");
    }

    let diag: Vec<f64> = dgrad
        .g2()
        .iter()
        .map(|g2| if g2.abs() > prec.eps2() { 1.0 / g2 } else { 1.0 })
        .collect();
    let err = MinimumError::new(SymMatrix::from_diagonal(&diag), 1.0);
    let edm = estimate_edm(&dgrad, &err);
    MinimumState::new(pa, err, dgrad, edm, fcn.num_calls())
}
