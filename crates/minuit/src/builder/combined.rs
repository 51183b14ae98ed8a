//! Migrad with a Simplex fallback.

use log::{info, warn};

use super::{MinimumBuilder, SimplexBuilder, VariableMetricBuilder};
use crate::config::GradientCheck;
use crate::fcn::Fcn;
use crate::gradient::GradientCalculator;
use crate::minimum::{FunctionMinimum, MinimumSeed};
use crate::seed::{MigradSeedGenerator, SeedGenerator};
use crate::strategy::Strategy;

/// Runs Migrad; if that fails, runs Simplex at high strategy and then
/// Migrad again from the Simplex result.
///
/// Returns the second Migrad result when valid, otherwise the Simplex one.
#[derive(Debug, Clone, Copy, Default)]
pub struct CombinedBuilder;

impl CombinedBuilder {
    /// Creates the builder.
    pub fn new() -> Self {
        Self
    }
}

impl MinimumBuilder for CombinedBuilder {
    fn minimum(
        &self,
        fcn: &Fcn<'_>,
        gc: &dyn GradientCalculator,
        seed: MinimumSeed,
        strategy: &Strategy,
        max_fcn: usize,
        edmval: f64,
    ) -> FunctionMinimum {
        let migrad = VariableMetricBuilder::new();
        let min = migrad.minimum(fcn, gc, seed.clone(), strategy, max_fcn, edmval);
        if min.is_valid() {
            return min;
        }

        info!("Migrad failed, trying Simplex first");
        let high = Strategy::high();
        let min1 = SimplexBuilder::new().minimum(fcn, gc, seed, &high, max_fcn, edmval);
        if !min1.is_valid() {
            warn!("both Migrad and Simplex failed");
            return min1;
        }

        let seed1 = MigradSeedGenerator::new(GradientCheck::Off).generate(fcn, gc, min1.user_state(), &high);
        let min2 = migrad.minimum(fcn, gc, seed1, &high, max_fcn, edmval);
        if !min2.is_valid() {
            warn!("Migrad failed again after Simplex; returning the Simplex minimum");
            return min1;
        }
        min2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gradient::NumericalGradientCalculator;
    use crate::parameters::UserParameterState;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_valid_migrad_is_returned_directly() {
        let state = UserParameterState::from_values(&[0.0, 0.0], &[0.1, 0.1]).unwrap();
        let f = |x: &[f64]| (x[0] - 1.0).powi(2) + (x[1] - 2.0).powi(2);
        let strategy = Strategy::medium();
        let fcn = Fcn::new(&f, 1.0, state.transformation().clone());
        let gc = NumericalGradientCalculator::new(&fcn, strategy);
        let seed = MigradSeedGenerator::default().generate(&fcn, &gc, &state, &strategy);
        let min = CombinedBuilder::new().minimum(&fcn, &gc, seed, &strategy, 1000, 0.1);
        assert!(min.is_valid());
        assert!(min.has_covariance());
        assert_abs_diff_eq!(min.user_state().value(1_usize).unwrap(), 2.0, epsilon = 1e-3);
    }

    #[test]
    fn test_kinked_function_reaches_minimum_region() {
        // no curvature away from the kink
        let state = UserParameterState::from_values(&[3.0], &[1.0]).unwrap();
        let f = |x: &[f64]| (x[0] - 1.0).abs();
        let strategy = Strategy::medium();
        let fcn = Fcn::new(&f, 1.0, state.transformation().clone());
        let gc = NumericalGradientCalculator::new(&fcn, strategy);
        let seed = MigradSeedGenerator::default().generate(&fcn, &gc, &state, &strategy);
        let min = CombinedBuilder::new().minimum(&fcn, &gc, seed, &strategy, 2000, 0.1);
        assert!(min.fval() < 0.5);
    }
}
