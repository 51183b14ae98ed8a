use minuit_math::MachinePrecision;

use super::{FunctionGradient, MinimumError, MinimumParameters, MinimumState};
use crate::parameters::Transformation;

/// Starting state of a builder together with the transformation it refers to.
#[derive(Debug, Clone, PartialEq)]
pub struct MinimumSeed {
    state: MinimumState,
    trafo: Transformation,
    valid: bool,
}

impl MinimumSeed {
    /// Creates a seed.
    #[must_use]
    pub fn new(state: MinimumState, trafo: Transformation) -> Self {
        Self {
            state,
            trafo,
            valid: true,
        }
    }

    /// The seed state.
    pub fn state(&self) -> &MinimumState {
        &self.state
    }

    /// The transformation the state refers to.
    pub fn trafo(&self) -> &Transformation {
        &self.trafo
    }

    /// Precision of the transformation.
    pub fn precision(&self) -> &MachinePrecision {
        self.trafo.precision()
    }

    /// Starting point.
    pub fn parameters(&self) -> &MinimumParameters {
        self.state.parameters()
    }

    /// Starting error matrix.
    pub fn error(&self) -> &MinimumError {
        self.state.error()
    }

    /// Starting gradient.
    pub fn gradient(&self) -> &FunctionGradient {
        self.state.gradient()
    }

    /// Function value at the start.
    pub fn fval(&self) -> f64 {
        self.state.fval()
    }

    /// Calls spent on the seed.
    pub fn nfcn(&self) -> usize {
        self.state.nfcn()
    }

    /// Returns true if the seed is usable.
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}
