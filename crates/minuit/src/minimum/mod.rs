//! Value types threaded through a minimization.
//!
//! Every iteration produces a new immutable [`MinimumState`]; a builder
//! collects them into a [`FunctionMinimum`].

mod error;
mod function_minimum;
mod gradient;
mod parameters;
mod seed;
mod state;

pub use error::{ErrorMatrixStatus, MinimumError};
pub use function_minimum::FunctionMinimum;
pub use gradient::FunctionGradient;
pub use parameters::MinimumParameters;
pub use seed::MinimumSeed;
pub use state::MinimumState;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::Transformation;
    use minuit_math::{DVector, SymMatrix};

    fn state(fval: f64, error: MinimumError) -> MinimumState {
        let p = MinimumParameters::new(DVector::from_vec(vec![1.0]), fval);
        let g = FunctionGradient::new(
            DVector::from_vec(vec![0.0]),
            DVector::from_vec(vec![2.0]),
            DVector::from_vec(vec![0.1]),
        );
        MinimumState::new(p, error, g, 0.0, 3)
    }

    fn seed() -> MinimumSeed {
        let trafo = Transformation::from_values(&[1.0], &[0.1]).unwrap();
        MinimumSeed::new(state(5.0, MinimumError::new(SymMatrix::identity(1), 1.0)), trafo)
    }

    #[test]
    fn test_state_validity() {
        assert!(state(1.0, MinimumError::new(SymMatrix::identity(1), 0.0)).is_valid());
        assert!(!state(1.0, MinimumError::made_pos_def(SymMatrix::identity(1))).is_valid());
        let p = MinimumParameters::new(DVector::from_vec(vec![1.0]), 1.0);
        let simplex = MinimumState::without_error(p, 0.1, 4);
        assert!(simplex.is_valid());
        assert!(!simplex.has_covariance());
    }

    #[test]
    fn test_function_minimum_flags() {
        let ok = FunctionMinimum::from_seed(seed(), 1.0);
        assert!(ok.is_valid());
        assert_eq!(ok.states().len(), 1);

        let limit = FunctionMinimum::with_call_limit(seed(), vec![], 1.0);
        assert!(limit.has_reached_call_limit());
        assert!(!limit.is_valid());

        let edm = FunctionMinimum::with_above_max_edm(seed(), vec![], 1.0);
        assert!(edm.is_above_max_edm());
        assert!(!edm.is_valid());
    }

    #[test]
    fn test_add_refreshes_user_state() {
        let mut min = FunctionMinimum::from_seed(seed(), 1.0);
        assert!((min.user_state().fval() - 5.0).abs() < 1e-12);
        min.add(state(2.0, MinimumError::new(SymMatrix::identity(1), 0.0)));
        assert!((min.fval() - 2.0).abs() < 1e-12);
        assert!((min.user_state().fval() - 2.0).abs() < 1e-12);
    }
}
