//! Full second-derivative matrix by finite differences.

use log::{debug, info, warn};
use minuit_math::{DVector, MachinePrecision, SymMatrix};
use thiserror::Error;

use crate::builder::estimate_edm;
use crate::config::default_max_fcn;
use crate::fcn::{Fcn, ObjectiveFunction};
use crate::gradient::{
    GradientCalculator, HessianGradientCalculator, InitialGradientCalculator,
    NumericalGradientCalculator,
};
use crate::minimum::{FunctionGradient, FunctionMinimum, MinimumError, MinimumParameters, MinimumState};
use crate::parameters::UserParameterState;
use crate::posdef::make_pos_def;
use crate::strategy::Strategy;

/// Reasons the Hessian could not be computed.
#[derive(Error, Debug, Clone, PartialEq)]
enum HesseFailure {
    #[error("second derivative is zero for internal parameter {0}")]
    ZeroSecondDerivative(usize),

    #[error("call limit of {0} exhausted")]
    CallLimit(usize),

    #[error("matrix inversion failed")]
    Singular,
}

/// Computes the Hessian at a point and from it the covariance.
///
/// Diagonal elements use an iterated central difference whose step aims at
/// a fixed function change; off-diagonal elements reuse the diagonal steps.
/// A failure yields a diagonal matrix of inverse second derivatives flagged
/// as [`is_hesse_failed`](MinimumError::is_hesse_failed).
///
/// # Example
///
/// ```rust
/// use minuit::hesse::Hesse;
/// use minuit::parameters::UserParameterState;
/// use minuit::strategy::Strategy;
///
/// let f = |x: &[f64]| x[0] * x[0] + x[1] * x[1] + x[0] * x[1];
/// let state = UserParameterState::from_values(&[0.0, 0.0], &[0.1, 0.1]).unwrap();
/// let result = Hesse::new(Strategy::medium()).calculate(&f, &state, 0);
///
/// assert!(result.has_covariance());
/// assert!((result.covariance().get(0, 0) - 4.0 / 3.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Hesse {
    strategy: Strategy,
    error_def: f64,
}

impl Default for Hesse {
    fn default() -> Self {
        Self::new(Strategy::medium())
    }
}

impl Hesse {
    /// Creates the calculator; the error definition defaults to 1.
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            error_def: 1.0,
        }
    }

    /// Sets the error definition used by [`calculate`](Self::calculate).
    #[must_use]
    pub fn with_error_def(mut self, error_def: f64) -> Self {
        self.error_def = error_def;
        self
    }

    /// The strategy.
    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Computes the covariance of `function` at the parameters of `state`.
    ///
    /// `max_calls == 0` selects `200 + 100n + 5n²`.
    pub fn calculate(
        &self,
        function: &dyn ObjectiveFunction,
        state: &UserParameterState,
        max_calls: usize,
    ) -> UserParameterState {
        let trafo = state.transformation();
        let n = state.variable_parameters();
        let fcn = Fcn::new(function, self.error_def, trafo.clone());

        let x = state.int_parameters();
        let amin = fcn.value(&x);
        let par = MinimumParameters::new(x, amin);
        let (error, gradient) = match self.covariance_start(state, amin, n) {
            Some(start) => start,
            None => (
                MinimumError::not_available(n),
                NumericalGradientCalculator::new(&fcn, self.strategy).gradient(&par),
            ),
        };
        let start = MinimumState::new(par, error, gradient, state.edm(), state.nfcn() + fcn.num_calls());

        let result = self.state(&fcn, &start, max_calls);
        UserParameterState::from_minimum_state(&result, self.error_def, trafo)
    }

    /// Starting error matrix and steps taken from the covariance of `state`.
    ///
    /// The second derivatives start at `1/V_ii` and the steps at the size
    /// that gives the targeted function change for that curvature, so no
    /// gradient evaluation is needed. `None` without a usable covariance.
    fn covariance_start(
        &self,
        state: &UserParameterState,
        amin: f64,
        n: usize,
    ) -> Option<(MinimumError, FunctionGradient)> {
        if !state.has_covariance() || state.int_covariance().nrow() != n {
            return None;
        }
        let v = state.int_covariance().to_sym_matrix();
        if (0..n).any(|i| v.get(i, i) <= 0.0) {
            return None;
        }
        let aimsag = state.precision().eps2().sqrt() * (amin.abs() + self.error_def);
        let g2 = DVector::from_fn(n, |i, _| 1.0 / v.get(i, i));
        let gstep = DVector::from_fn(n, |i, _| (2.0 * aimsag * v.get(i, i)).sqrt());
        debug!("Hesse steps from supplied covariance: {:?}", gstep.as_slice());
        Some((MinimumError::new(v, 1.0), FunctionGradient::new(DVector::zeros(n), g2, gstep)))
    }

    /// Appends a Hesse state to `min`, replacing its error estimate.
    pub fn update(&self, function: &dyn ObjectiveFunction, min: &mut FunctionMinimum, max_calls: usize) {
        let fcn = Fcn::new(function, min.error_def(), min.seed().trafo().clone());
        let st = self.state(&fcn, min.state(), max_calls);
        min.add(st);
    }

    /// Hesse state at the point of `st`.
    ///
    /// The call count of the result is `st.nfcn()` plus the calls made here.
    pub fn state(&self, fcn: &Fcn<'_>, st: &MinimumState, max_calls: usize) -> MinimumState {
        let n = st.size();
        if n == 0 {
            return st.clone();
        }
        let max_calls = if max_calls == 0 {
            default_max_fcn(n)
        } else {
            max_calls
        };
        let prec = *fcn.precision();
        let calls_before = fcn.num_calls();

        let mut g2 = st.gradient().g2().clone();
        let mut gst = st.gradient().gstep().clone();
        if st.gradient().is_analytical() || !st.gradient().is_valid() {
            let initial = InitialGradientCalculator::new(fcn).gradient(st.parameters());
            g2 = initial.g2().clone();
            gst = initial.gstep().clone();
        }
        let start = FunctionGradient::new(st.gradient().grad().clone(), g2, gst);

        match self.compute(fcn, st, start, max_calls, calls_before, &prec) {
            Ok(state) => state,
            Err((failure, g2)) => {
                warn!("Hesse failed ({failure}), returning diagonal matrix");
                let diag: Vec<f64> = g2
                    .iter()
                    .map(|g2| {
                        let tmp = if *g2 < prec.eps2() { 1.0 } else { 1.0 / g2 };
                        if tmp < prec.eps2() {
                            1.0
                        } else {
                            tmp
                        }
                    })
                    .collect();
                MinimumState::new(
                    st.parameters().clone(),
                    MinimumError::hesse_failed(SymMatrix::from_diagonal(&diag)),
                    st.gradient().clone(),
                    st.edm(),
                    st.nfcn() + fcn.num_calls() - calls_before,
                )
            }
        }
    }

    /// On failure, returns the reason and the second derivatives so far.
    #[allow(clippy::too_many_lines)]
    fn compute(
        &self,
        fcn: &Fcn<'_>,
        st: &MinimumState,
        start: FunctionGradient,
        max_calls: usize,
        calls_before: usize,
        prec: &MachinePrecision,
    ) -> Result<MinimumState, (HesseFailure, DVector<f64>)> {
        let trafo = fcn.trafo();
        let n = st.size();
        let amin = fcn.value(st.vec());
        let aimsag = prec.eps2().sqrt() * (amin.abs() + fcn.error_def());

        let mut grd = start.grad().clone();
        let mut g2 = start.g2().clone();
        let mut gst = start.gstep().clone();
        let mut dirin = gst.clone();
        let mut yy = DVector::zeros(n);
        let mut vhmat = SymMatrix::new(n);
        let mut x = st.vec().clone();

        for i in 0..n {
            let limited = trafo.parameters()[trafo.ext_of_int(i)].has_limits();
            let xtf = x[i];
            let dmin = 8.0 * prec.eps2() * (xtf.abs() + prec.eps2());
            let mut d = gst[i].abs().max(dmin);

            for _ in 0..self.strategy.hessian_ncycles() {
                let mut sag = 0.0;
                let mut fs1 = 0.0;
                let mut fs2 = 0.0;
                let mut found = false;
                for _ in 0..5 {
                    x[i] = xtf + d;
                    fs1 = fcn.value(&x);
                    x[i] = xtf - d;
                    fs2 = fcn.value(&x);
                    x[i] = xtf;
                    sag = 0.5 * (fs1 + fs2 - 2.0 * amin);
                    if sag > prec.eps2() {
                        found = true;
                        break;
                    }
                    if limited {
                        if d > 0.5 {
                            return Err((HesseFailure::ZeroSecondDerivative(i), g2));
                        }
                        d = (d * 10.0).min(0.51);
                    } else {
                        d *= 10.0;
                    }
                }
                if !found {
                    return Err((HesseFailure::ZeroSecondDerivative(i), g2));
                }

                let g2bfor = g2[i];
                g2[i] = 2.0 * sag / (d * d);
                grd[i] = (fs1 - fs2) / (2.0 * d);
                gst[i] = d;
                dirin[i] = d;
                yy[i] = fs1;
                let dlast = d;
                d = (2.0 * aimsag / g2[i].abs()).sqrt();
                if limited {
                    d = d.min(0.5);
                }
                if d < dmin {
                    d = dmin;
                }

                if ((d - dlast) / d).abs() < self.strategy.hessian_step_tolerance() {
                    break;
                }
                if ((g2[i] - g2bfor) / g2[i]).abs() < self.strategy.hessian_g2_tolerance() {
                    break;
                }
                d = d.min(10.0 * dlast).max(0.1 * dlast);
            }

            vhmat.set(i, i, g2[i]);
            if fcn.num_calls() - calls_before > max_calls {
                return Err((HesseFailure::CallLimit(max_calls), g2));
            }
        }
        debug!("Hesse diagonal: {:?}", g2.as_slice());

        let analytical = st.gradient().is_analytical();
        if analytical {
            grd = st.gradient().grad().clone();
        } else if !self.strategy.is_low() {
            let hgc = HessianGradientCalculator::new(fcn, self.strategy);
            let refined = hgc.gradient_with_previous(
                st.parameters(),
                &FunctionGradient::new(grd.clone(), g2.clone(), gst.clone()),
            );
            grd = refined.grad().clone();
        }

        for i in 0..n {
            x[i] += dirin[i];
            for j in (i + 1)..n {
                x[j] += dirin[j];
                let fs1 = fcn.value(&x);
                let elem = (fs1 + amin - yy[i] - yy[j]) / (dirin[i] * dirin[j]);
                vhmat.set(i, j, elem);
                x[j] -= dirin[j];
            }
            x[i] -= dirin[i];
        }

        let tested = make_pos_def(&MinimumError::new(vhmat, 1.0), prec);
        let Ok(inverse) = tested.inv_hessian().invert() else {
            return Err((HesseFailure::Singular, g2));
        };

        let gradient = if analytical {
            FunctionGradient::analytical_with_g2(grd, g2, gst)
        } else {
            FunctionGradient::new(grd, g2, gst)
        };
        let nfcn = st.nfcn() + fcn.num_calls() - calls_before;
        if tested.is_made_pos_def() {
            info!("Hesse matrix was not positive definite and has been forced");
            return Ok(MinimumState::new(
                st.parameters().clone(),
                MinimumError::made_pos_def(inverse),
                gradient,
                st.edm(),
                nfcn,
            ));
        }

        let error = MinimumError::new(inverse, 0.0);
        let edm = estimate_edm(&gradient, &error);
        Ok(MinimumState::new(st.parameters().clone(), error, gradient, edm, nfcn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{MinimumBuilder, SimplexBuilder};
    use crate::parameters::{UserCovariance, UserParameters};
    use crate::seed::{SeedGenerator, SimplexSeedGenerator};
    use approx::assert_abs_diff_eq;

    fn correlated(x: &[f64]) -> f64 {
        x[0] * x[0] + x[1] * x[1] + x[0] * x[1]
    }

    #[test]
    fn test_covariance_of_correlated_quadratic() {
        let state = UserParameterState::from_values(&[0.0, 0.0], &[0.1, 0.1]).unwrap();
        let result = Hesse::new(Strategy::medium()).calculate(&correlated, &state, 0);

        assert!(result.has_covariance());
        let cov = result.covariance();
        assert_abs_diff_eq!(cov.get(0, 0), 4.0 / 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(cov.get(0, 1), -2.0 / 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(cov.get(1, 1), 4.0 / 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(result.error(0_usize).unwrap(), (4.0_f64 / 3.0).sqrt(), epsilon = 1e-6);
        assert!(result.nfcn() > 0);
    }

    #[test]
    fn test_supplied_covariance_sets_starting_steps() {
        let start = UserParameterState::from_values(&[0.2, -0.4], &[0.1, 0.1]).unwrap();
        let hesse = Hesse::new(Strategy::low());
        let plain = hesse.calculate(&correlated, &start, 0);

        // exact covariance: no gradient pass, one cycle per diagonal element
        let exact = UserCovariance::from_rows(&[vec![4.0 / 3.0, -2.0 / 3.0], vec![-2.0 / 3.0, 4.0 / 3.0]]).unwrap();
        let seeded = UserParameterState::with_covariance(start.parameters().clone(), exact).unwrap();
        let with_cov = hesse.calculate(&correlated, &seeded, 0);
        assert!(with_cov.nfcn() < plain.nfcn());
        assert_abs_diff_eq!(with_cov.covariance().get(0, 0), 4.0 / 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(with_cov.covariance().get(0, 1), -2.0 / 3.0, epsilon = 1e-6);

        // a poor covariance changes the steps but not the answer
        let poor = UserCovariance::from_rows(&[vec![100.0, 5.0], vec![5.0, 0.001]]).unwrap();
        let seeded = UserParameterState::with_covariance(start.parameters().clone(), poor).unwrap();
        let with_poor = hesse.calculate(&correlated, &seeded, 0);
        assert!(with_poor.nfcn() > with_cov.nfcn());
        for (i, j) in [(0, 0), (0, 1), (1, 1)] {
            assert_abs_diff_eq!(with_poor.covariance().get(i, j), plain.covariance().get(i, j), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_error_def_scales_covariance() {
        let state = UserParameterState::from_values(&[0.0, 0.0], &[0.1, 0.1]).unwrap();
        let result = Hesse::new(Strategy::medium())
            .with_error_def(0.5)
            .calculate(&correlated, &state, 0);
        assert_abs_diff_eq!(result.covariance().get(0, 0), 2.0 / 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_flat_direction_fails_with_diagonal() {
        let f = |x: &[f64]| x[0] * x[0];
        let state = UserParameterState::from_values(&[0.0, 0.0], &[0.1, 0.1]).unwrap();
        let hesse = Hesse::new(Strategy::medium());
        let fcn = Fcn::new(&f, 1.0, state.transformation().clone());
        let x = state.int_parameters();
        let par = MinimumParameters::new(x.clone(), fcn.value(&x));
        let grad = NumericalGradientCalculator::new(&fcn, Strategy::medium()).gradient(&par);
        let st = MinimumState::new(par, MinimumError::not_available(2), grad, 0.0, fcn.num_calls());

        let out = hesse.state(&fcn, &st, 0);
        assert!(out.error().is_hesse_failed());
        assert!(!out.error().is_valid());
        assert_eq!(out.nfcn(), fcn.num_calls());
        assert_abs_diff_eq!(out.error().inv_hessian().get(0, 1), 0.0);

        let user = hesse.calculate(&f, &state, 0);
        assert!(!user.has_covariance());
    }

    #[test]
    fn test_limited_parameter() {
        let mut params = UserParameters::new();
        params.add_limited("a", 0.5, 0.1, -2.0, 2.0).unwrap();
        let state = UserParameterState::new(params);
        let f = |x: &[f64]| (x[0] - 0.5).powi(2) / 0.04;
        let result = Hesse::new(Strategy::high()).calculate(&f, &state, 0);
        assert_abs_diff_eq!(result.covariance().get(0, 0), 0.04, epsilon = 1e-6);
        // averaged over the nonlinear transform
        assert_abs_diff_eq!(result.error("a").unwrap(), 0.2, epsilon = 1e-3);
    }

    #[test]
    fn test_update_adds_covariance_to_simplex_minimum() {
        let f = |x: &[f64]| (x[0] - 1.0).powi(2) + 2.0 * (x[1] - 2.0).powi(2);
        let state = UserParameterState::from_values(&[0.0, 0.0], &[0.5, 0.5]).unwrap();
        let strategy = Strategy::medium();
        let fcn = Fcn::new(&f, 1.0, state.transformation().clone());
        let gc = NumericalGradientCalculator::new(&fcn, strategy);
        let seed = SimplexSeedGenerator.generate(&fcn, &gc, &state, &strategy);
        let mut min = SimplexBuilder::new().minimum(&fcn, &gc, seed, &strategy, 1000, 1e-6);
        assert!(!min.has_covariance());

        Hesse::new(strategy).update(&f, &mut min, 0);
        assert!(min.has_covariance());
        assert!(min.has_accurate_covar());
        assert_abs_diff_eq!(min.user_covariance().get(0, 0), 1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(min.user_covariance().get(1, 1), 0.5, epsilon = 1e-4);
        assert!(min.nfcn() > fcn.num_calls());
    }
}
