//! Minimization by successive parameter scans.

use log::warn;

use super::MinimumBuilder;
use crate::fcn::Fcn;
use crate::gradient::GradientCalculator;
use crate::minimum::{FunctionMinimum, MinimumParameters, MinimumSeed, MinimumState};
use crate::parameter_scan::{ParameterScan, DEFAULT_SCAN_STEPS};
use crate::parameters::UserParameterState;
use crate::strategy::Strategy;

/// Scans each variable parameter once over `value ± 2·error`, keeping the
/// best point found.
///
/// Crude but robust; useful to locate a starting region for Migrad. The
/// resulting state carries the seed errors as step sizes and EDM 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanBuilder;

impl ScanBuilder {
    /// Creates the builder.
    pub fn new() -> Self {
        Self
    }
}

impl MinimumBuilder for ScanBuilder {
    fn minimum(
        &self,
        fcn: &Fcn<'_>,
        _gc: &dyn GradientCalculator,
        seed: MinimumSeed,
        _strategy: &Strategy,
        _max_fcn: usize,
        _edmval: f64,
    ) -> FunctionMinimum {
        let up = fcn.error_def();
        let trafo = seed.trafo();
        let mut x = seed.parameters().vec().clone();
        let start = UserParameterState::from_minimum_state(seed.state(), up, trafo);
        let mut scan = ParameterScan::with_fval(fcn, start.parameters().clone(), seed.fval());
        let mut amin = scan.fval();

        let n = trafo.variable_parameters();
        let mut dirin = x.clone();
        for i in 0..n {
            let ext = trafo.ext_of_int(i);
            if let Err(err) = scan.scan(ext, DEFAULT_SCAN_STEPS, 0.0, 0.0) {
                warn!("scan of parameter {ext} failed: {err}");
            }
            if scan.fval() < amin {
                amin = scan.fval();
                if let Ok(value) = scan.parameters().value(ext) {
                    x[i] = trafo.ext2int(ext, value);
                }
            }
            dirin[i] = (2.0 * up * seed.error().inv_hessian().get(i, i)).sqrt();
        }

        let st = MinimumState::without_error(
            MinimumParameters::with_step(x, dirin, amin),
            0.0,
            fcn.num_calls(),
        );
        FunctionMinimum::new(seed, vec![st], up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gradient::NumericalGradientCalculator;
    use crate::seed::{SeedGenerator, SimplexSeedGenerator};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_scans_every_parameter() {
        let state = UserParameterState::from_values(&[0.0, 0.0], &[1.0, 1.0]).unwrap();
        let f = |x: &[f64]| (x[0] - 1.0).powi(2) + (x[1] + 0.5).powi(2);
        let strategy = Strategy::medium();
        let fcn = Fcn::new(&f, 1.0, state.transformation().clone());
        let gc = NumericalGradientCalculator::new(&fcn, strategy);
        let seed = SimplexSeedGenerator.generate(&fcn, &gc, &state, &strategy);
        let min = ScanBuilder::new().minimum(&fcn, &gc, seed, &strategy, 0, 0.1);

        let st = min.user_state();
        assert_abs_diff_eq!(st.value(0_usize).unwrap(), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(st.value(1_usize).unwrap(), -0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(min.fval(), 0.0, epsilon = 1e-12);
        assert!(min.is_valid());
        // seed evaluation plus two scans of 41 points
        assert_eq!(fcn.num_calls(), 1 + 2 * 41);
    }
}
