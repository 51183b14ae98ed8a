//! Variable-metric (quasi-Newton) minimization.

use log::{debug, warn};
use minuit_math::{DVector, SymMatrix};

use super::MinimumBuilder;
use crate::fcn::Fcn;
use crate::gradient::GradientCalculator;
use crate::hesse::Hesse;
use crate::line_search::line_search;
use crate::minimum::{
    FunctionGradient, FunctionMinimum, MinimumError, MinimumParameters, MinimumSeed, MinimumState,
};
use crate::posdef::make_pos_def_state;
use crate::strategy::Strategy;

// =============================================================================
// EDM AND ERROR UPDATE
// =============================================================================

fn mul(m: &SymMatrix, v: &DVector<f64>) -> DVector<f64> {
    let n = v.len();
    DVector::from_fn(n, |i, _| (0..n).map(|j| m.get(i, j) * v[j]).sum())
}

fn quadratic_form(v: &DVector<f64>, m: &SymMatrix) -> f64 {
    v.dot(&mul(m, v))
}

/// Estimated distance to minimum, `gᵀ·V·g / 2`.
///
/// A negative value means the error matrix is not positive definite.
pub fn estimate_edm(gradient: &FunctionGradient, error: &MinimumError) -> f64 {
    if error.inv_hessian().size() == 1 {
        let g = gradient.grad()[0];
        return 0.5 * g * g * error.inv_hessian().get(0, 0);
    }
    0.5 * quadratic_form(gradient.grad(), error.inv_hessian())
}

/// Davidon rank-two update of the inverse Hessian after a step from
/// `s0` to `p1` where the gradient `g1` was measured.
///
/// The returned `dcovar` is the mean of the previous value and the relative
/// size of this update. A step without curvature information leaves the
/// matrix unchanged.
pub fn davidon_update(s0: &MinimumState, p1: &MinimumParameters, g1: &FunctionGradient) -> MinimumError {
    let v0 = s0.error().inv_hessian();
    let dx = p1.vec() - s0.vec();
    let dg = g1.grad() - s0.gradient().grad();

    let delgam = dx.dot(&dg);
    let gvg = quadratic_form(&dg, v0);

    if delgam == 0.0 || gvg <= 0.0 {
        warn!("Davidon update skipped: delgam = {delgam:e}, gvg = {gvg:e}");
        return s0.error().clone();
    }
    if delgam < 0.0 {
        warn!("Davidon update: delgam = {delgam:e} < 0");
    }

    let vg = mul(v0, &dg);
    let mut vupd = SymMatrix::outer_product(&dx) * (1.0 / delgam);
    vupd -= &(SymMatrix::outer_product(&vg) * (1.0 / gvg));

    if delgam > gvg {
        let flnu = &dx / delgam - &vg / gvg;
        vupd += &(SymMatrix::outer_product(&flnu) * gvg);
    }

    let sum_upd = vupd.abs_sum();
    vupd += v0;
    let dcov = 0.5 * (s0.error().dcovar() + sum_upd / vupd.abs_sum());

    MinimumError::new(vupd, dcov)
}

// =============================================================================
// BUILDER
// =============================================================================

/// Quasi-Newton minimizer (Migrad).
///
/// Each iteration takes the Newton step `-V·g`, line-searches along it,
/// recomputes the gradient and updates `V` with [`davidon_update`]. A
/// non-descent direction or a negative EDM triggers one positive-definite
/// repair; a second failure ends the minimization.
#[derive(Debug, Clone, Copy, Default)]
pub struct VariableMetricBuilder;

impl VariableMetricBuilder {
    /// Creates the builder.
    pub fn new() -> Self {
        Self
    }

    fn iterate(
        fcn: &Fcn<'_>,
        gc: &dyn GradientCalculator,
        seed: MinimumSeed,
        max_fcn: usize,
        edmval: f64,
    ) -> FunctionMinimum {
        let edmval = edmval * 0.0001;
        let up = fcn.error_def();

        if seed.parameters().vec().is_empty() {
            return FunctionMinimum::from_seed(seed, up);
        }

        let prec = *seed.precision();
        let mut edm = seed.state().edm();
        if edm < 0.0 {
            warn!("initial matrix not positive definite");
            return FunctionMinimum::from_seed(seed, up);
        }

        let mut result = vec![seed.state().clone()];
        edm *= 1.0 + 3.0 * seed.error().dcovar();

        loop {
            let mut s0 = result[result.len() - 1].clone();
            let mut step = -mul(s0.error().inv_hessian(), s0.gradient().grad());
            let mut gdel = step.dot(s0.gradient().grad());

            if gdel > 0.0 {
                warn!("matrix not positive definite, gdel = {gdel:e}");
                s0 = make_pos_def_state(&s0, &prec);
                step = -mul(s0.error().inv_hessian(), s0.gradient().grad());
                gdel = step.dot(s0.gradient().grad());
                if gdel > 0.0 {
                    warn!("gdel = {gdel:e} still positive after repair");
                    result.push(s0);
                    return FunctionMinimum::new(seed, result, up);
                }
            }

            let pp = line_search(fcn, s0.parameters(), &step, gdel, &prec);
            if (pp.y - s0.fval()).abs() < prec.eps() {
                warn!("no improvement in line search");
                break;
            }

            let p = MinimumParameters::new(s0.vec() + &step * pp.x, pp.y);
            let g = gc.gradient_with_previous(&p, s0.gradient());

            edm = estimate_edm(&g, s0.error());
            if edm < 0.0 {
                warn!("matrix not positive definite, edm = {edm:e}");
                s0 = make_pos_def_state(&s0, &prec);
                edm = estimate_edm(&g, s0.error());
                if edm < 0.0 {
                    warn!("edm = {edm:e} still negative after repair");
                    result.push(s0);
                    return FunctionMinimum::new(seed, result, up);
                }
            }

            let e = davidon_update(&s0, &p, &g);
            let dcovar = e.dcovar();
            result.push(MinimumState::new(p, e, g, edm, fcn.num_calls()));
            debug!(
                "iteration {}: fval = {:.10e}, edm = {edm:e}, nfcn = {}",
                result.len() - 1,
                pp.y,
                fcn.num_calls()
            );

            edm *= 1.0 + 3.0 * dcovar;
            if !(edm > edmval && fcn.num_calls() < max_fcn) {
                break;
            }
        }

        if fcn.num_calls() >= max_fcn {
            warn!("call limit exceeded ({max_fcn} calls)");
            return FunctionMinimum::with_call_limit(seed, result, up);
        }

        if edm > edmval {
            let fval = result[result.len() - 1].fval();
            if edm < (prec.eps2() * fval).abs() {
                warn!("machine accuracy limits further improvement");
                return FunctionMinimum::new(seed, result, up);
            }
            if edm < 10.0 * edmval {
                return FunctionMinimum::new(seed, result, up);
            }
            warn!("no convergence: edm = {edm:e}, requested {edmval:e}");
            return FunctionMinimum::with_above_max_edm(seed, result, up);
        }

        FunctionMinimum::new(seed, result, up)
    }
}

impl MinimumBuilder for VariableMetricBuilder {
    fn minimum(
        &self,
        fcn: &Fcn<'_>,
        gc: &dyn GradientCalculator,
        seed: MinimumSeed,
        strategy: &Strategy,
        max_fcn: usize,
        edmval: f64,
    ) -> FunctionMinimum {
        let mut min = Self::iterate(fcn, gc, seed, max_fcn, edmval);

        let refine = strategy.is_high() || (strategy.is_medium() && min.error().dcovar() > 0.05);
        if refine && min.state().size() > 0 {
            debug!("recomputing the error matrix, dcovar = {}", min.error().dcovar());
            let st = Hesse::new(*strategy).state(fcn, min.state(), 0);
            min.add(st);
        }

        if !min.is_valid() {
            warn!("function minimum is not valid");
        }
        min
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gradient::NumericalGradientCalculator;
    use crate::parameters::UserParameterState;
    use crate::seed::{MigradSeedGenerator, SeedGenerator};
    use approx::assert_relative_eq;

    #[test]
    fn test_edm_estimate() {
        let g = FunctionGradient::analytical(DVector::from_vec(vec![2.0, 1.0]));
        let e = MinimumError::new(SymMatrix::from_diagonal(&[0.5, 2.0]), 0.0);
        assert_relative_eq!(estimate_edm(&g, &e), 0.5 * (4.0 * 0.5 + 2.0));

        let g1 = FunctionGradient::analytical(DVector::from_vec(vec![3.0]));
        let e1 = MinimumError::new(SymMatrix::from_diagonal(&[-1.0]), 0.0);
        assert!(estimate_edm(&g1, &e1) < 0.0);
    }

    #[test]
    fn test_davidon_recovers_quadratic_curvature() {
        // f = x², true inverse Hessian 0.5
        let grad = |x: f64| FunctionGradient::analytical(DVector::from_vec(vec![2.0 * x]));
        let p0 = MinimumParameters::new(DVector::from_vec(vec![1.0]), 1.0);
        let s0 = MinimumState::new(
            p0,
            MinimumError::new(SymMatrix::identity(1), 0.0),
            grad(1.0),
            1.0,
            0,
        );
        let p1 = MinimumParameters::new(DVector::from_vec(vec![0.5]), 0.25);
        let e = davidon_update(&s0, &p1, &grad(0.5));
        assert_relative_eq!(e.inv_hessian().get(0, 0), 0.5, epsilon = 1e-12);
        // |ΔV| / |V| = 0.5 / 0.5, averaged with the previous 0
        assert_relative_eq!(e.dcovar(), 0.5, epsilon = 1e-12);

        let again = MinimumState::new(p1, e, grad(0.5), 0.0, 0);
        let p2 = MinimumParameters::new(DVector::from_vec(vec![0.0]), 0.0);
        let e2 = davidon_update(&again, &p2, &grad(0.0));
        assert_relative_eq!(e2.inv_hessian().get(0, 0), 0.5, epsilon = 1e-12);
        assert_relative_eq!(e2.dcovar(), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_davidon_skips_degenerate_step() {
        let g = FunctionGradient::analytical(DVector::from_vec(vec![1.0, 1.0]));
        let p = MinimumParameters::new(DVector::from_vec(vec![1.0, 1.0]), 1.0);
        let err = MinimumError::new(SymMatrix::identity(2), 0.3);
        let s0 = MinimumState::new(p.clone(), err.clone(), g.clone(), 1.0, 0);
        assert_eq!(davidon_update(&s0, &p, &g), err);
    }

    fn run(f: &dyn Fn(&[f64]) -> f64, x0: &[f64], strategy: Strategy) -> FunctionMinimum {
        let errors = vec![0.1; x0.len()];
        let state = UserParameterState::from_values(x0, &errors).unwrap();
        let fcn = Fcn::new(&f, 1.0, state.transformation().clone());
        let gc = NumericalGradientCalculator::new(&fcn, strategy);
        let seed = MigradSeedGenerator::default().generate(&fcn, &gc, &state, &strategy);
        VariableMetricBuilder::new().minimum(&fcn, &gc, seed, &strategy, 1000, 0.1)
    }

    #[test]
    fn test_quadratic_converges() {
        let f = |x: &[f64]| (x[0] - 1.0).powi(2) + 10.0 * (x[1] + 2.0).powi(2);
        let min = run(&f, &[0.0, 0.0], Strategy::medium());
        assert!(min.is_valid());
        let x = min.user_state().values();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-3);
        assert_relative_eq!(x[1], -2.0, epsilon = 1e-3);
        assert!(min.edm() < 1e-3);
    }

    #[test]
    fn test_high_strategy_appends_hesse() {
        let f = |x: &[f64]| x[0] * x[0] + x[0] * x[1] + x[1] * x[1];
        let min = run(&f, &[1.0, 1.0], Strategy::high());
        assert!(min.is_valid());
        let cov = min.user_covariance();
        // V = 2·H⁻¹ with H = [[2, 1], [1, 2]]
        assert_relative_eq!(cov.get(0, 0), 4.0 / 3.0, epsilon = 1e-3);
        assert_relative_eq!(cov.get(0, 1), -2.0 / 3.0, epsilon = 1e-3);
    }

    #[test]
    fn test_call_limit_is_flagged() {
        let f = |x: &[f64]| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2);
        let state = UserParameterState::from_values(&[-1.2, 1.0], &[0.1, 0.1]).unwrap();
        let strategy = Strategy::medium();
        let fcn = Fcn::new(&f, 1.0, state.transformation().clone());
        let gc = NumericalGradientCalculator::new(&fcn, strategy);
        let seed = MigradSeedGenerator::default().generate(&fcn, &gc, &state, &strategy);
        let min = VariableMetricBuilder::new().minimum(&fcn, &gc, seed, &strategy, 30, 0.1);
        assert!(min.has_reached_call_limit());
        assert!(!min.is_valid());
    }
}
