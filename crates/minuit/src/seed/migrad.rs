use log::{debug, warn};
use minuit_math::SymMatrix;

use super::negative_g2::{has_negative_g2, negative_g2_line_search};
use super::SeedGenerator;
use crate::builder::estimate_edm;
use crate::config::GradientCheck;
use crate::fcn::Fcn;
use crate::gradient::{
    GradientCalculator, HessianGradientCalculator, InitialGradientCalculator,
    NumericalGradientCalculator,
};
use crate::hesse::Hesse;
use crate::minimum::{FunctionGradient, MinimumError, MinimumParameters, MinimumSeed, MinimumState};
use crate::parameters::UserParameterState;
use crate::strategy::Strategy;

/// Seed for the variable-metric minimizer.
///
/// Evaluates the function and gradient at the start point and builds the
/// starting error matrix: the user covariance when one is supplied,
/// otherwise a diagonal of inverse second derivatives. Negative curvature
/// triggers a line search, and high strategy computes a full Hessian.
#[derive(Debug, Clone, Copy, Default)]
pub struct MigradSeedGenerator {
    gradient_check: GradientCheck,
}

impl MigradSeedGenerator {
    /// Creates the generator with the given analytical gradient policy.
    pub fn new(gradient_check: GradientCheck) -> Self {
        Self { gradient_check }
    }

    /// Compares an analytical gradient with a refined numerical one.
    ///
    /// Returns true if any component differs by more than the numerical
    /// uncertainty.
    fn gradient_disagrees(
        fcn: &Fcn<'_>,
        pa: &MinimumParameters,
        analytical: &FunctionGradient,
        initial: &FunctionGradient,
    ) -> bool {
        let hgc = HessianGradientCalculator::new(fcn, Strategy::high());
        let (numerical, delta) = hgc.delta_gradient(pa, initial);
        let mut disagrees = false;
        for i in 0..analytical.grad().len() {
            let provided = analytical.grad()[i];
            let computed = numerical.grad()[i];
            if (computed - provided).abs() > delta[i] {
                let ext = fcn.trafo().ext_of_int(i);
                warn!(
                    "analytical derivative of parameter {ext} is {provided:e}, numerical estimate {computed:e} +/- {:e}",
                    delta[i]
                );
                disagrees = true;
            }
        }
        disagrees
    }
}

impl SeedGenerator for MigradSeedGenerator {
    fn generate(
        &self,
        fcn: &Fcn<'_>,
        gc: &dyn GradientCalculator,
        state: &UserParameterState,
        strategy: &Strategy,
    ) -> MinimumSeed {
        let prec = *state.precision();
        let n = state.variable_parameters();

        let x = state.int_parameters();
        let fcnmin = fcn.value(&x);
        let pa = MinimumParameters::new(x, fcnmin);

        let dgrad = if gc.is_analytical() {
            let initial = InitialGradientCalculator::new(fcn).gradient(&pa);
            let grad = gc.gradient(&pa);
            let analytical = FunctionGradient::analytical_with_g2(
                grad.grad().clone(),
                initial.g2().clone(),
                initial.gstep().clone(),
            );
            let rejected = self.gradient_check != GradientCheck::Off
                && Self::gradient_disagrees(fcn, &pa, &analytical, &initial)
                && self.gradient_check == GradientCheck::Reject;
            if rejected {
                warn!("analytical gradient rejected, using numerical derivatives");
                NumericalGradientCalculator::new(fcn, *strategy).gradient(&pa)
            } else {
                analytical
            }
        } else {
            gc.gradient(&pa)
        };

        let error = if state.has_covariance() && state.int_covariance().nrow() == n {
            MinimumError::new(state.int_covariance().to_sym_matrix(), 0.0)
        } else {
            let diag: Vec<f64> = dgrad
                .g2()
                .iter()
                .map(|g2| if g2.abs() > prec.eps2() { 1.0 / g2 } else { 1.0 })
                .collect();
            MinimumError::new(SymMatrix::from_diagonal(&diag), 1.0)
        };

        let edm = estimate_edm(&dgrad, &error);
        let negative_g2 = has_negative_g2(&dgrad);
        let analytical = dgrad.is_analytical();
        let mut st = MinimumState::new(pa, error, dgrad, edm, fcn.num_calls());
        debug!("migrad seed: fval = {fcnmin:.10e}, edm = {edm:e}");

        if negative_g2 {
            debug!("seed has negative second derivatives, searching for positive curvature");
            st = if analytical {
                // curvature from differences, first derivatives from the function
                let ngc = NumericalGradientCalculator::new(fcn, *strategy);
                let searched = negative_g2_line_search(fcn, &st, &ngc, &prec);
                let grad = FunctionGradient::analytical_with_g2(
                    gc.gradient(searched.parameters()).grad().clone(),
                    searched.gradient().g2().clone(),
                    searched.gradient().gstep().clone(),
                );
                let edm = estimate_edm(&grad, searched.error());
                MinimumState::new(
                    searched.parameters().clone(),
                    searched.error().clone(),
                    grad,
                    edm,
                    fcn.num_calls(),
                )
            } else {
                negative_g2_line_search(fcn, &st, gc, &prec)
            };
        }

        if strategy.is_high() && !state.has_covariance() && n > 0 {
            debug!("computing the full Hessian for the seed");
            st = Hesse::new(*strategy).state(fcn, &st, 0);
        }

        MinimumSeed::new(st, state.transformation().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fcn::FunctionWithGradient;
    use crate::gradient::AnalyticalGradientCalculator;
    use crate::parameters::{UserCovariance, UserParameters};
    use approx::assert_abs_diff_eq;

    fn quadratic(x: &[f64]) -> f64 {
        (x[0] - 1.0).powi(2) + 4.0 * (x[1] + 1.0).powi(2)
    }

    #[test]
    fn test_numerical_seed() {
        let state = UserParameterState::from_values(&[0.0, 0.0], &[0.1, 0.1]).unwrap();
        let fcn = Fcn::new(&quadratic, 1.0, state.transformation().clone());
        let strategy = Strategy::medium();
        let gc = NumericalGradientCalculator::new(&fcn, strategy);
        let seed = MigradSeedGenerator::default().generate(&fcn, &gc, &state, &strategy);

        assert!(seed.is_valid());
        assert_abs_diff_eq!(seed.fval(), 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(seed.gradient().grad()[0], -2.0, epsilon = 1e-4);
        assert_abs_diff_eq!(seed.gradient().grad()[1], 8.0, epsilon = 1e-3);
        assert_abs_diff_eq!(seed.error().inv_hessian().get(0, 0), 0.5, epsilon = 1e-3);
        assert_abs_diff_eq!(seed.error().inv_hessian().get(1, 1), 0.125, epsilon = 1e-3);
        assert_abs_diff_eq!(seed.error().dcovar(), 1.0);
        // edm = g·V·g / 2 = (4·0.5 + 64·0.125) / 2
        assert_abs_diff_eq!(seed.state().edm(), 5.0, epsilon = 1e-2);
        assert_eq!(seed.nfcn(), fcn.num_calls());
    }

    #[test]
    fn test_user_covariance_is_used() {
        let params = UserParameters::from_values(&[0.0, 0.0], &[0.1, 0.1]).unwrap();
        let cov = UserCovariance::from_rows(&[vec![2.0, 0.5], vec![0.5, 1.0]]).unwrap();
        let state = UserParameterState::with_covariance(params, cov).unwrap();
        let fcn = Fcn::new(&quadratic, 1.0, state.transformation().clone());
        let strategy = Strategy::high();
        let gc = NumericalGradientCalculator::new(&fcn, strategy);
        let seed = MigradSeedGenerator::default().generate(&fcn, &gc, &state, &strategy);

        let v = seed.error().inv_hessian();
        assert_abs_diff_eq!(v.get(0, 0), 1.0);
        assert_abs_diff_eq!(v.get(0, 1), 0.25);
        assert_abs_diff_eq!(v.get(1, 1), 0.5);
        assert_abs_diff_eq!(seed.error().dcovar(), 0.0);
    }

    #[test]
    fn test_high_strategy_computes_hessian() {
        let state = UserParameterState::from_values(&[0.0, 0.0], &[0.1, 0.1]).unwrap();
        let fcn = Fcn::new(&quadratic, 1.0, state.transformation().clone());
        let strategy = Strategy::high();
        let gc = NumericalGradientCalculator::new(&fcn, strategy);
        let seed = MigradSeedGenerator::default().generate(&fcn, &gc, &state, &strategy);
        assert!(seed.error().is_accurate());
        assert_abs_diff_eq!(seed.error().inv_hessian().get(0, 0), 0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(seed.error().inv_hessian().get(1, 1), 0.125, epsilon = 1e-4);
    }

    #[test]
    fn test_wrong_analytical_gradient_is_rejected() {
        let f = FunctionWithGradient::new(quadratic, |i: usize, x: &[f64]| {
            // wrong sign on the second component
            if i == 0 { 2.0 * (x[0] - 1.0) } else { -8.0 * (x[1] + 1.0) }
        });
        let state = UserParameterState::from_values(&[0.0, 0.0], &[0.1, 0.1]).unwrap();
        let fcn = Fcn::new(&f, 1.0, state.transformation().clone());
        let strategy = Strategy::medium();
        let gc = AnalyticalGradientCalculator::new(&fcn);

        let warned = MigradSeedGenerator::new(GradientCheck::Warn).generate(&fcn, &gc, &state, &strategy);
        assert!(warned.gradient().is_analytical());
        assert_abs_diff_eq!(warned.gradient().grad()[1], -8.0, epsilon = 1e-12);

        let rejected =
            MigradSeedGenerator::new(GradientCheck::Reject).generate(&fcn, &gc, &state, &strategy);
        assert!(!rejected.gradient().is_analytical());
        assert_abs_diff_eq!(rejected.gradient().grad()[1], 8.0, epsilon = 1e-3);
    }

    #[test]
    fn test_correct_analytical_gradient_is_kept() {
        let f = FunctionWithGradient::new(quadratic, |i: usize, x: &[f64]| {
            if i == 0 { 2.0 * (x[0] - 1.0) } else { 8.0 * (x[1] + 1.0) }
        });
        let state = UserParameterState::from_values(&[0.0, 0.0], &[0.1, 0.1]).unwrap();
        let fcn = Fcn::new(&f, 1.0, state.transformation().clone());
        let strategy = Strategy::medium();
        let gc = AnalyticalGradientCalculator::new(&fcn);
        let seed = MigradSeedGenerator::new(GradientCheck::Reject).generate(&fcn, &gc, &state, &strategy);
        assert!(seed.gradient().is_analytical());
        assert_abs_diff_eq!(seed.gradient().grad()[1], 8.0, epsilon = 1e-12);
    }
}
