//! The objective function contract.
//!
//! Users implement [`ObjectiveFunction`] (or pass a closure). The minimizer
//! wraps it in an [`Fcn`] that maps internal parameters to user space and
//! counts calls.

use std::cell::Cell;

use minuit_math::{DVector, MachinePrecision};

use crate::parameters::Transformation;

/// A scalar function of the user parameters, optionally with derivatives.
///
/// # Example
///
/// ```rust
/// use minuit::fcn::ObjectiveFunction;
///
/// struct Quadratic;
///
/// impl ObjectiveFunction for Quadratic {
///     fn value(&self, x: &[f64]) -> f64 {
///         x.iter().map(|v| v * v).sum()
///     }
///
///     fn provides_derivative(&self, _index: usize) -> bool {
///         true
///     }
///
///     fn derivative(&self, index: usize, x: &[f64]) -> f64 {
///         2.0 * x[index]
///     }
/// }
///
/// assert_eq!(Quadratic.value(&[1.0, 2.0]), 5.0);
/// ```
pub trait ObjectiveFunction {
    /// Function value at the external parameter values `x`.
    fn value(&self, x: &[f64]) -> f64;

    /// Returns true if [`derivative`](Self::derivative) is implemented for
    /// parameter `index`.
    fn provides_derivative(&self, _index: usize) -> bool {
        false
    }

    /// Partial derivative with respect to parameter `index` at `x`.
    fn derivative(&self, _index: usize, _x: &[f64]) -> f64 {
        0.0
    }
}

impl<F> ObjectiveFunction for F
where
    F: Fn(&[f64]) -> f64,
{
    fn value(&self, x: &[f64]) -> f64 {
        self(x)
    }
}

/// Pairs a value closure with a derivative closure.
pub struct FunctionWithGradient<F, G> {
    function: F,
    derivative: G,
}

impl<F, G> FunctionWithGradient<F, G>
where
    F: Fn(&[f64]) -> f64,
    G: Fn(usize, &[f64]) -> f64,
{
    /// Creates the adapter. `derivative(i, x)` returns `∂f/∂x_i`.
    pub fn new(function: F, derivative: G) -> Self {
        Self {
            function,
            derivative,
        }
    }
}

impl<F, G> ObjectiveFunction for FunctionWithGradient<F, G>
where
    F: Fn(&[f64]) -> f64,
    G: Fn(usize, &[f64]) -> f64,
{
    fn value(&self, x: &[f64]) -> f64 {
        (self.function)(x)
    }

    fn provides_derivative(&self, _index: usize) -> bool {
        true
    }

    fn derivative(&self, index: usize, x: &[f64]) -> f64 {
        (self.derivative)(index, x)
    }
}

/// Objective function bound to a transformation, with a call counter.
///
/// All evaluations of one minimization go through a single `Fcn`, so the
/// counter is the call budget used so far.
pub struct Fcn<'a> {
    function: &'a dyn ObjectiveFunction,
    error_def: f64,
    trafo: Transformation,
    num_calls: Cell<usize>,
}

impl<'a> Fcn<'a> {
    /// Wraps `function` for the parameters described by `trafo`.
    pub fn new(function: &'a dyn ObjectiveFunction, error_def: f64, trafo: Transformation) -> Self {
        Self {
            function,
            error_def,
            trafo,
            num_calls: Cell::new(0),
        }
    }

    /// Value at internal parameters `x`.
    pub fn value(&self, x: &DVector<f64>) -> f64 {
        self.num_calls.set(self.num_calls.get() + 1);
        self.function.value(&self.trafo.transform(x))
    }

    /// Value at external (user) parameters.
    pub fn external_value(&self, x: &[f64]) -> f64 {
        self.num_calls.set(self.num_calls.get() + 1);
        self.function.value(x)
    }

    /// The wrapped function.
    pub fn function(&self) -> &'a dyn ObjectiveFunction {
        self.function
    }

    /// Calls made so far.
    pub fn num_calls(&self) -> usize {
        self.num_calls.get()
    }

    /// Function change defining one standard deviation.
    pub fn error_def(&self) -> f64 {
        self.error_def
    }

    /// The transformation used to map internal parameters.
    pub fn trafo(&self) -> &Transformation {
        &self.trafo
    }

    /// Machine precision of the transformation.
    pub fn precision(&self) -> &MachinePrecision {
        self.trafo.precision()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_closure_is_objective() {
        let f = |x: &[f64]| x[0] * 2.0;
        assert_relative_eq!(f.value(&[3.0]), 6.0);
        assert!(!f.provides_derivative(0));
    }

    #[test]
    fn test_function_with_gradient() {
        let f = FunctionWithGradient::new(|x: &[f64]| x[0] * x[0], |_, x: &[f64]| 2.0 * x[0]);
        assert!(f.provides_derivative(0));
        assert_relative_eq!(f.derivative(0, &[3.0]), 6.0);
    }

    #[test]
    fn test_fcn_counts_and_transforms() {
        let mut trafo = Transformation::new();
        trafo.add("a", 1.0, 0.1).unwrap();
        trafo.add_const("b", 10.0).unwrap();
        let f = |x: &[f64]| x[0] + x[1];
        let fcn = Fcn::new(&f, 1.0, trafo);
        assert_relative_eq!(fcn.value(&DVector::from_vec(vec![2.0])), 12.0);
        assert_relative_eq!(fcn.external_value(&[1.0, 1.0]), 2.0);
        assert_eq!(fcn.num_calls(), 2);
    }
}
