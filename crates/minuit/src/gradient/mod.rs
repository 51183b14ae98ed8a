//! Gradient calculators.
//!
//! Every calculator produces a [`FunctionGradient`] in internal space:
//!
//! - [`InitialGradientCalculator`]: a bootstrap estimate from parameter errors
//! - [`NumericalGradientCalculator`]: adaptive two-point central differences
//! - [`HessianGradientCalculator`]: shrinking-step refinement used by Hesse
//! - [`AnalyticalGradientCalculator`]: derivatives supplied by the function

mod analytical;
mod hessian;
mod initial;
mod numerical;

pub use analytical::AnalyticalGradientCalculator;
pub use hessian::HessianGradientCalculator;
pub use initial::InitialGradientCalculator;
pub use numerical::NumericalGradientCalculator;

use crate::minimum::{FunctionGradient, MinimumParameters};

/// Computes the gradient of the objective at a point.
pub trait GradientCalculator {
    /// Gradient at `par`, starting from scratch.
    fn gradient(&self, par: &MinimumParameters) -> FunctionGradient;

    /// Gradient at `par`, reusing steps and curvature of a previous gradient.
    fn gradient_with_previous(
        &self,
        par: &MinimumParameters,
        previous: &FunctionGradient,
    ) -> FunctionGradient;

    /// Returns true if the gradient comes from the objective function itself.
    fn is_analytical(&self) -> bool {
        false
    }
}
