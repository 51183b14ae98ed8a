use std::cell::OnceCell;

use super::{FunctionGradient, MinimumError, MinimumParameters, MinimumSeed, MinimumState};
use crate::parameters::{UserCovariance, UserParameterState, UserParameters};

/// Result of a minimization.
///
/// Holds the seed, the history of improving states, and two termination
/// flags. A non-converged minimization is not an error: check
/// [`is_valid`](Self::is_valid) and the flags.
#[derive(Debug, Clone)]
pub struct FunctionMinimum {
    seed: MinimumSeed,
    states: Vec<MinimumState>,
    error_def: f64,
    above_max_edm: bool,
    reached_call_limit: bool,
    user_state: OnceCell<UserParameterState>,
}

impl FunctionMinimum {
    /// A minimum consisting of the seed state only.
    #[must_use]
    pub fn from_seed(seed: MinimumSeed, error_def: f64) -> Self {
        let states = vec![seed.state().clone()];
        Self::new(seed, states, error_def)
    }

    /// A converged (or aborted but not flagged) minimum.
    ///
    /// An empty history is replaced by the seed state.
    #[must_use]
    pub fn new(seed: MinimumSeed, mut states: Vec<MinimumState>, error_def: f64) -> Self {
        if states.is_empty() {
            states.push(seed.state().clone());
        }
        Self {
            seed,
            states,
            error_def,
            above_max_edm: false,
            reached_call_limit: false,
            user_state: OnceCell::new(),
        }
    }

    /// A minimum that ran out of function calls.
    #[must_use]
    pub fn with_call_limit(seed: MinimumSeed, states: Vec<MinimumState>, error_def: f64) -> Self {
        Self {
            reached_call_limit: true,
            ..Self::new(seed, states, error_def)
        }
    }

    /// A minimum whose EDM stayed above the requested value.
    #[must_use]
    pub fn with_above_max_edm(seed: MinimumSeed, states: Vec<MinimumState>, error_def: f64) -> Self {
        Self {
            above_max_edm: true,
            ..Self::new(seed, states, error_def)
        }
    }

    /// Appends a state (e.g. a Hesse refinement).
    pub fn add(&mut self, state: MinimumState) {
        self.states.push(state);
        self.user_state.take();
    }

    /// Marks the minimum as having exhausted its call budget.
    pub(crate) fn set_reached_call_limit(&mut self) {
        self.reached_call_limit = true;
    }

    /// The seed.
    pub fn seed(&self) -> &MinimumSeed {
        &self.seed
    }

    /// Every state, oldest first.
    pub fn states(&self) -> &[MinimumState] {
        &self.states
    }

    /// The last state. The history always holds at least one state.
    pub fn state(&self) -> &MinimumState {
        &self.states[self.states.len() - 1]
    }

    /// Internal parameters of the last state.
    pub fn parameters(&self) -> &MinimumParameters {
        self.state().parameters()
    }

    /// Error matrix of the last state.
    pub fn error(&self) -> &MinimumError {
        self.state().error()
    }

    /// Gradient of the last state.
    pub fn grad(&self) -> &FunctionGradient {
        self.state().gradient()
    }

    /// Function value at the minimum.
    pub fn fval(&self) -> f64 {
        self.state().fval()
    }

    /// Estimated distance to minimum.
    pub fn edm(&self) -> f64 {
        self.state().edm()
    }

    /// Function calls used.
    pub fn nfcn(&self) -> usize {
        self.state().nfcn()
    }

    /// Function change defining one standard deviation.
    pub fn error_def(&self) -> f64 {
        self.error_def
    }

    /// Last state valid, EDM converged and call budget respected.
    pub fn is_valid(&self) -> bool {
        self.state().is_valid() && !self.above_max_edm && !self.reached_call_limit
    }

    /// Returns true if the EDM stayed above the requested value.
    pub fn is_above_max_edm(&self) -> bool {
        self.above_max_edm
    }

    /// Returns true if the call budget ran out.
    pub fn has_reached_call_limit(&self) -> bool {
        self.reached_call_limit
    }

    /// Returns true if the last point is evaluated.
    pub fn has_valid_parameters(&self) -> bool {
        self.state().parameters().is_valid()
    }

    /// Returns true if an error matrix exists.
    pub fn has_covariance(&self) -> bool {
        self.error().is_available()
    }

    /// Returns true if the error matrix is a usable covariance.
    pub fn has_valid_covariance(&self) -> bool {
        self.error().is_valid()
    }

    /// Returns true if the error matrix is accurate.
    pub fn has_accurate_covar(&self) -> bool {
        self.error().is_accurate()
    }

    /// Returns true if the error matrix is positive definite.
    pub fn has_pos_def_covar(&self) -> bool {
        self.error().is_pos_def()
    }

    /// Returns true if the error matrix was forced positive definite.
    pub fn has_made_pos_def_covar(&self) -> bool {
        self.error().is_made_pos_def()
    }

    /// Returns true if the final Hesse failed.
    pub fn hesse_failed(&self) -> bool {
        self.error().is_hesse_failed()
    }

    /// The result in user space, computed on first access.
    pub fn user_state(&self) -> &UserParameterState {
        self.user_state.get_or_init(|| {
            UserParameterState::from_minimum_state(self.state(), self.error_def, self.seed.trafo())
        })
    }

    /// Parameters in user space.
    pub fn user_parameters(&self) -> &UserParameters {
        self.user_state().parameters()
    }

    /// Covariance in user space.
    pub fn user_covariance(&self) -> &UserCovariance {
        self.user_state().covariance()
    }
}
