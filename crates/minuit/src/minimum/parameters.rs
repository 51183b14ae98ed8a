use minuit_math::DVector;

/// A point in internal parameter space with its function value.
#[derive(Debug, Clone, PartialEq)]
pub struct MinimumParameters {
    vec: DVector<f64>,
    dirin: DVector<f64>,
    fval: f64,
    valid: bool,
    has_step: bool,
}

impl MinimumParameters {
    /// A valid point without step information.
    #[must_use]
    pub fn new(vec: DVector<f64>, fval: f64) -> Self {
        let n = vec.len();
        Self {
            vec,
            dirin: DVector::zeros(n),
            fval,
            valid: true,
            has_step: false,
        }
    }

    /// A valid point with the step (or spread) used to reach it.
    #[must_use]
    pub fn with_step(vec: DVector<f64>, dirin: DVector<f64>, fval: f64) -> Self {
        Self {
            vec,
            dirin,
            fval,
            valid: true,
            has_step: true,
        }
    }

    /// Internal parameter values.
    pub fn vec(&self) -> &DVector<f64> {
        &self.vec
    }

    /// Step per parameter.
    pub fn dirin(&self) -> &DVector<f64> {
        &self.dirin
    }

    /// Function value.
    pub fn fval(&self) -> f64 {
        self.fval
    }

    /// Returns true for an evaluated point.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Returns true if a step is attached.
    pub fn has_step_size(&self) -> bool {
        self.has_step
    }
}
