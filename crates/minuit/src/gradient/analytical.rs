use minuit_math::DVector;

use crate::fcn::Fcn;
use crate::minimum::{FunctionGradient, MinimumParameters};

use super::GradientCalculator;

/// Gradient from the derivatives of the objective function.
///
/// External derivatives are mapped to internal space by the chain rule
/// for limited parameters.
pub struct AnalyticalGradientCalculator<'f, 'a> {
    fcn: &'f Fcn<'a>,
}

impl<'f, 'a> AnalyticalGradientCalculator<'f, 'a> {
    /// Creates the calculator.
    pub fn new(fcn: &'f Fcn<'a>) -> Self {
        Self { fcn }
    }

    /// Returns true if the function provides a derivative for every
    /// variable parameter.
    pub fn is_supported(fcn: &Fcn<'_>) -> bool {
        let trafo = fcn.trafo();
        (0..trafo.variable_parameters())
            .all(|i| fcn.function().provides_derivative(trafo.ext_of_int(i)))
    }
}

impl GradientCalculator for AnalyticalGradientCalculator<'_, '_> {
    fn gradient(&self, par: &MinimumParameters) -> FunctionGradient {
        let trafo = self.fcn.trafo();
        let external = trafo.transform(par.vec());
        let function = self.fcn.function();
        let n = par.vec().len();

        let mut grad = DVector::zeros(n);
        for i in 0..n {
            let ext = trafo.ext_of_int(i);
            let dfdx = function.derivative(ext, &external);
            grad[i] = if trafo.parameters()[ext].has_limits() {
                trafo.d_int2ext(i, par.vec()[i]) * dfdx
            } else {
                dfdx
            };
        }

        FunctionGradient::analytical(grad)
    }

    fn gradient_with_previous(
        &self,
        par: &MinimumParameters,
        previous: &FunctionGradient,
    ) -> FunctionGradient {
        let grad = self.gradient(par);
        FunctionGradient::analytical_with_g2(
            grad.grad().clone(),
            previous.g2().clone(),
            previous.gstep().clone(),
        )
    }

    fn is_analytical(&self) -> bool {
        true
    }
}
