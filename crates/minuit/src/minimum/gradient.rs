use minuit_math::DVector;

/// Gradient in internal space with second derivatives and step sizes.
///
/// Numerical calculators fill all three vectors. An analytical gradient
/// carries zeros for `g2` and `gstep`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionGradient {
    grad: DVector<f64>,
    g2: DVector<f64>,
    gstep: DVector<f64>,
    valid: bool,
    analytical: bool,
}

impl FunctionGradient {
    /// Numerical gradient.
    #[must_use]
    pub fn new(grad: DVector<f64>, g2: DVector<f64>, gstep: DVector<f64>) -> Self {
        Self {
            grad,
            g2,
            gstep,
            valid: true,
            analytical: false,
        }
    }

    /// Gradient supplied by the objective function.
    #[must_use]
    pub fn analytical(grad: DVector<f64>) -> Self {
        let n = grad.len();
        Self {
            grad,
            g2: DVector::zeros(n),
            gstep: DVector::zeros(n),
            valid: true,
            analytical: true,
        }
    }

    /// Analytical first derivatives with numerically estimated `g2` and steps.
    #[must_use]
    pub fn analytical_with_g2(grad: DVector<f64>, g2: DVector<f64>, gstep: DVector<f64>) -> Self {
        Self {
            grad,
            g2,
            gstep,
            valid: true,
            analytical: true,
        }
    }

    /// Placeholder for states without a gradient.
    #[must_use]
    pub fn invalid(n: usize) -> Self {
        Self {
            grad: DVector::zeros(n),
            g2: DVector::zeros(n),
            gstep: DVector::zeros(n),
            valid: false,
            analytical: false,
        }
    }

    /// First derivatives.
    pub fn grad(&self) -> &DVector<f64> {
        &self.grad
    }

    /// Second derivative estimates (diagonal).
    pub fn g2(&self) -> &DVector<f64> {
        &self.g2
    }

    /// Step sizes used for the estimate.
    pub fn gstep(&self) -> &DVector<f64> {
        &self.gstep
    }

    /// Returns true if computed.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Returns true if supplied by the objective function.
    pub fn is_analytical(&self) -> bool {
        self.analytical
    }
}
