//! Property-based tests for minimizer invariants.
//!
//! These tests verify properties that should hold for any input:
//! - Limit transforms round-trip inside the interval
//! - Positive-definite repair is idempotent
//! - Convex quadratics converge within the automatic call budget
//! - Fixing then releasing restores the index bookkeeping

use minuit::config::default_max_fcn;
use minuit::minimum::MinimumError;
use minuit::parameters::Transformation;
use minuit::posdef::make_pos_def;
use minuit::{Minimizer, UserParameterState};
use minuit_math::{MachinePrecision, SymMatrix};
use proptest::prelude::*;

// =============================================================================
// STRATEGIES
// =============================================================================

fn interval() -> impl Strategy<Value = (f64, f64)> {
    (-100.0..100.0_f64, 0.1..50.0_f64).prop_map(|(lower, width)| (lower, lower + width))
}

fn symmetric_3x3() -> impl Strategy<Value = SymMatrix> {
    (
        prop::array::uniform3(0.1..3.0_f64),
        prop::array::uniform3(-2.0..2.0_f64),
    )
        .prop_map(|(diag, off)| {
            // packed lower triangle: (0,0) (1,0) (1,1) (2,0) (2,1) (2,2)
            SymMatrix::from_packed(3, vec![diag[0], off[0], diag[1], off[1], off[2], diag[2]])
                .expect("six packed elements")
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_two_sided_transform_round_trip(
        (lower, upper) in interval(),
        t in 0.01..0.99_f64,
    ) {
        let value = lower + t * (upper - lower);
        let mut trafo = Transformation::new();
        trafo.add_limited("p", value, 0.1, lower, upper).unwrap();
        let internal = trafo.ext2int(0, value);
        let back = trafo.int2ext(0, internal);
        prop_assert!((back - value).abs() <= 1e-9 * (upper - lower).max(1.0));
    }

    #[test]
    fn test_one_sided_transform_round_trip(
        limit in -100.0..100.0_f64,
        offset in 0.01..50.0_f64,
    ) {
        let mut trafo = Transformation::new();
        trafo.add("lo", limit + offset, 0.1).unwrap();
        trafo.set_lower_limit("lo", limit).unwrap();
        trafo.add("hi", limit - offset, 0.1).unwrap();
        trafo.set_upper_limit("hi", limit).unwrap();

        for (ext, value) in [(0, limit + offset), (1, limit - offset)] {
            let back = trafo.int2ext(ext, trafo.ext2int(ext, value));
            prop_assert!((back - value).abs() <= 1e-9 * value.abs().max(1.0));
        }
    }

    #[test]
    fn test_pos_def_repair_is_idempotent(m in symmetric_3x3()) {
        let prec = MachinePrecision::new();
        let once = make_pos_def(&MinimumError::new(m, 0.0), &prec);
        let twice = make_pos_def(&once, &prec);
        prop_assert_eq!(&twice, &once);
        prop_assert!(once.inv_hessian().eigenvalues()[0] > 0.0);
    }

    #[test]
    fn test_quadratic_converges(
        centers in prop::collection::vec(-5.0..5.0_f64, 1..=5),
        offsets in prop::collection::vec(-5.0..5.0_f64, 5),
    ) {
        let n = centers.len();
        let c = centers.clone();
        let f = move |x: &[f64]| x.iter().zip(&c).map(|(xi, ci)| (xi - ci).powi(2)).sum::<f64>();

        let start: Vec<f64> = centers.iter().zip(&offsets).map(|(ci, o)| ci + o).collect();
        let state = UserParameterState::from_values(&start, &vec![0.1; n]).unwrap();
        let mut migrad = Minimizer::migrad(&f, state);
        let min = migrad.minimize().unwrap();

        prop_assert!(min.is_valid());
        prop_assert!(min.edm() < 0.1);
        prop_assert!(min.nfcn() < default_max_fcn(n));
        for (value, center) in migrad.values().iter().zip(&centers) {
            prop_assert!((value - center).abs() < 1e-2);
        }
    }

    #[test]
    fn test_fix_release_round_trip(
        values in prop::collection::vec(-10.0..10.0_f64, 2..8),
        pick in any::<prop::sample::Index>(),
    ) {
        let errors = vec![0.1; values.len()];
        let mut trafo = Transformation::from_values(&values, &errors).unwrap();
        let before: Vec<Option<usize>> = (0..values.len()).map(|e| trafo.int_of_ext(e)).collect();
        let ext = pick.index(values.len());

        trafo.fix(ext).unwrap();
        prop_assert_eq!(trafo.int_of_ext(ext), None);
        prop_assert_eq!(trafo.variable_parameters(), values.len() - 1);

        trafo.release(ext).unwrap();
        let after: Vec<Option<usize>> = (0..values.len()).map(|e| trafo.int_of_ext(e)).collect();
        prop_assert_eq!(after, before);
        prop_assert_eq!(trafo.values(), values);
    }
}
