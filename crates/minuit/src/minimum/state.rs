use minuit_math::DVector;

use super::{FunctionGradient, MinimumError, MinimumParameters};

/// One iteration snapshot: point, error matrix, gradient, EDM and call count.
#[derive(Debug, Clone, PartialEq)]
pub struct MinimumState {
    parameters: MinimumParameters,
    error: MinimumError,
    gradient: FunctionGradient,
    edm: f64,
    nfcn: usize,
}

impl MinimumState {
    /// Creates a full state.
    #[must_use]
    pub fn new(
        parameters: MinimumParameters,
        error: MinimumError,
        gradient: FunctionGradient,
        edm: f64,
        nfcn: usize,
    ) -> Self {
        Self {
            parameters,
            error,
            gradient,
            edm,
            nfcn,
        }
    }

    /// A state without error matrix or gradient (simplex, scan).
    #[must_use]
    pub fn without_error(parameters: MinimumParameters, edm: f64, nfcn: usize) -> Self {
        let n = parameters.vec().len();
        Self {
            parameters,
            error: MinimumError::not_available(n),
            gradient: FunctionGradient::invalid(n),
            edm,
            nfcn,
        }
    }

    /// The point.
    pub fn parameters(&self) -> &MinimumParameters {
        &self.parameters
    }

    /// The error matrix.
    pub fn error(&self) -> &MinimumError {
        &self.error
    }

    /// The gradient.
    pub fn gradient(&self) -> &FunctionGradient {
        &self.gradient
    }

    /// Internal parameter values.
    pub fn vec(&self) -> &DVector<f64> {
        self.parameters.vec()
    }

    /// Number of variable parameters.
    pub fn size(&self) -> usize {
        self.parameters.vec().len()
    }

    /// Function value.
    pub fn fval(&self) -> f64 {
        self.parameters.fval()
    }

    /// Estimated distance to minimum.
    pub fn edm(&self) -> f64 {
        self.edm
    }

    /// Cumulative function calls.
    pub fn nfcn(&self) -> usize {
        self.nfcn
    }

    /// Returns true if the point is evaluated.
    pub fn has_parameters(&self) -> bool {
        self.parameters.is_valid()
    }

    /// Returns true if an error matrix is attached.
    pub fn has_covariance(&self) -> bool {
        self.error.is_available()
    }

    /// A state is valid if its point is, and its error matrix if present.
    pub fn is_valid(&self) -> bool {
        if self.has_parameters() && self.has_covariance() {
            self.parameters.is_valid() && self.error.is_valid()
        } else {
            self.has_parameters()
        }
    }
}
