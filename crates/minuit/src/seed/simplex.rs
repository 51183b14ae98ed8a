use minuit_math::SymMatrix;

use super::SeedGenerator;
use crate::builder::estimate_edm;
use crate::fcn::Fcn;
use crate::gradient::{GradientCalculator, InitialGradientCalculator};
use crate::minimum::{MinimumError, MinimumParameters, MinimumSeed, MinimumState};
use crate::parameters::UserParameterState;
use crate::strategy::Strategy;

/// Seed for the simplex and scan minimizers.
///
/// Costs a single function call: the gradient is the error-based bootstrap
/// estimate, which supplies the initial simplex steps.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplexSeedGenerator;

impl SeedGenerator for SimplexSeedGenerator {
    fn generate(
        &self,
        fcn: &Fcn<'_>,
        _gc: &dyn GradientCalculator,
        state: &UserParameterState,
        _strategy: &Strategy,
    ) -> MinimumSeed {
        let prec = state.precision();
        let x = state.int_parameters();
        let fcnmin = fcn.value(&x);
        let pa = MinimumParameters::new(x, fcnmin);
        let dgrad = InitialGradientCalculator::new(fcn).gradient(&pa);

        let diag: Vec<f64> = dgrad
            .g2()
            .iter()
            .map(|g2| if g2.abs() > prec.eps2() { 1.0 / g2 } else { 1.0 })
            .collect();
        let error = MinimumError::new(SymMatrix::from_diagonal(&diag), 1.0);
        let edm = estimate_edm(&dgrad, &error);
        let st = MinimumState::new(pa, error, dgrad, edm, fcn.num_calls());
        MinimumSeed::new(st, state.transformation().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gradient::NumericalGradientCalculator;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_call_with_error_based_curvature() {
        let state = UserParameterState::from_values(&[1.0, 2.0], &[0.5, 0.1]).unwrap();
        let f = |x: &[f64]| x[0] * x[0] + x[1] * x[1];
        let fcn = Fcn::new(&f, 1.0, state.transformation().clone());
        let strategy = Strategy::medium();
        let gc = NumericalGradientCalculator::new(&fcn, strategy);
        let seed = SimplexSeedGenerator.generate(&fcn, &gc, &state, &strategy);

        assert_eq!(fcn.num_calls(), 1);
        assert_relative_eq!(seed.fval(), 5.0);
        // g2 = 2·up / error²
        assert_relative_eq!(seed.gradient().g2()[0], 8.0, epsilon = 1e-12);
        assert_relative_eq!(seed.gradient().g2()[1], 200.0, epsilon = 1e-9);
        assert_relative_eq!(seed.error().inv_hessian().get(1, 1), 0.005, epsilon = 1e-12);
    }
}
