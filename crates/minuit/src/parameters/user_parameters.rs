//! The user-facing parameter set.

use minuit_math::MachinePrecision;

use super::parameter::Parameter;
use super::transformation::Transformation;
use super::ParameterRef;
use crate::error::MinuitResult;

/// Declared parameters, addressable by index or name.
///
/// # Example
///
/// ```rust
/// use minuit::parameters::UserParameters;
///
/// let mut params = UserParameters::new();
/// params.add("x", 0.0, 0.1).unwrap();
/// params.add_limited("y", 1.0, 0.1, 0.0, 10.0).unwrap();
/// params.fix("y").unwrap();
/// assert_eq!(params.variable_parameters(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserParameters {
    trafo: Transformation,
}

impl UserParameters {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates free parameters `p0, p1, ...`.
    pub fn from_values(values: &[f64], errors: &[f64]) -> MinuitResult<Self> {
        Ok(Self {
            trafo: Transformation::from_values(values, errors)?,
        })
    }

    /// Adds a free parameter.
    pub fn add(&mut self, name: impl Into<String>, value: f64, error: f64) -> MinuitResult<()> {
        self.trafo.add(name, value, error)
    }

    /// Adds a parameter with lower and upper limits.
    pub fn add_limited(
        &mut self,
        name: impl Into<String>,
        value: f64,
        error: f64,
        lower: f64,
        upper: f64,
    ) -> MinuitResult<()> {
        self.trafo.add_limited(name, value, error, lower, upper)
    }

    /// Adds a constant parameter.
    pub fn add_const(&mut self, name: impl Into<String>, value: f64) -> MinuitResult<()> {
        self.trafo.add_const(name, value)
    }

    /// Fixes a parameter.
    pub fn fix<'a>(&mut self, param: impl Into<ParameterRef<'a>>) -> MinuitResult<()> {
        self.trafo.fix(param).map(|_| ())
    }

    /// Releases a fixed parameter.
    pub fn release<'a>(&mut self, param: impl Into<ParameterRef<'a>>) -> MinuitResult<()> {
        self.trafo.release(param).map(|_| ())
    }

    /// Sets a value.
    pub fn set_value<'a>(&mut self, param: impl Into<ParameterRef<'a>>, value: f64) -> MinuitResult<()> {
        self.trafo.set_value(param, value).map(|_| ())
    }

    /// Sets an error.
    pub fn set_error<'a>(&mut self, param: impl Into<ParameterRef<'a>>, error: f64) -> MinuitResult<()> {
        self.trafo.set_error(param, error).map(|_| ())
    }

    /// Sets both limits.
    pub fn set_limits<'a>(
        &mut self,
        param: impl Into<ParameterRef<'a>>,
        lower: f64,
        upper: f64,
    ) -> MinuitResult<()> {
        self.trafo.set_limits(param, lower, upper).map(|_| ())
    }

    /// Sets a lower limit only.
    pub fn set_lower_limit<'a>(&mut self, param: impl Into<ParameterRef<'a>>, lower: f64) -> MinuitResult<()> {
        self.trafo.set_lower_limit(param, lower).map(|_| ())
    }

    /// Sets an upper limit only.
    pub fn set_upper_limit<'a>(&mut self, param: impl Into<ParameterRef<'a>>, upper: f64) -> MinuitResult<()> {
        self.trafo.set_upper_limit(param, upper).map(|_| ())
    }

    /// Removes the limits.
    pub fn remove_limits<'a>(&mut self, param: impl Into<ParameterRef<'a>>) -> MinuitResult<()> {
        self.trafo.remove_limits(param).map(|_| ())
    }

    /// Value of a parameter.
    pub fn value<'a>(&self, param: impl Into<ParameterRef<'a>>) -> MinuitResult<f64> {
        Ok(self.trafo.parameter(param)?.value())
    }

    /// Error of a parameter.
    pub fn error<'a>(&self, param: impl Into<ParameterRef<'a>>) -> MinuitResult<f64> {
        Ok(self.trafo.parameter(param)?.error())
    }

    /// External index of a named parameter.
    pub fn index(&self, name: &str) -> MinuitResult<usize> {
        self.trafo.index_of(name)
    }

    /// Name of parameter `index`.
    pub fn name(&self, index: usize) -> MinuitResult<&str> {
        Ok(self.trafo.parameter(index)?.name())
    }

    /// The parameter addressed by `param`.
    pub fn parameter<'a>(&self, param: impl Into<ParameterRef<'a>>) -> MinuitResult<&Parameter> {
        self.trafo.parameter(param)
    }

    /// All declared parameters.
    pub fn parameters(&self) -> &[Parameter] {
        self.trafo.parameters()
    }

    /// Current values.
    pub fn values(&self) -> Vec<f64> {
        self.trafo.values()
    }

    /// Current errors.
    pub fn errors(&self) -> Vec<f64> {
        self.trafo.errors()
    }

    /// Number of declared parameters.
    pub fn len(&self) -> usize {
        self.trafo.len()
    }

    /// Returns true when nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.trafo.is_empty()
    }

    /// Number of variable parameters.
    pub fn variable_parameters(&self) -> usize {
        self.trafo.variable_parameters()
    }

    /// Machine precision of the set.
    pub fn precision(&self) -> &MachinePrecision {
        self.trafo.precision()
    }

    /// Overrides the machine precision.
    pub fn set_precision(&mut self, eps: f64) {
        self.trafo.set_precision(eps);
    }

    /// The underlying transformation.
    pub fn transformation(&self) -> &Transformation {
        &self.trafo
    }

    pub(crate) fn transformation_mut(&mut self) -> &mut Transformation {
        &mut self.trafo
    }
}

impl From<Transformation> for UserParameters {
    fn from(trafo: Transformation) -> Self {
        Self { trafo }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_access_by_name_and_index() {
        let mut p = UserParameters::new();
        p.add("x", 1.0, 0.1).unwrap();
        p.add("y", 2.0, 0.2).unwrap();
        p.set_value("y", 3.0).unwrap();
        p.set_error(0_usize, 0.5).unwrap();
        assert_relative_eq!(p.value(1_usize).unwrap(), 3.0);
        assert_relative_eq!(p.error("x").unwrap(), 0.5);
        assert_eq!(p.index("y").unwrap(), 1);
        assert_eq!(p.name(0).unwrap(), "x");
        assert!(p.value("z").is_err());
    }

    #[test]
    fn test_fix_release_round_trip() {
        let mut p = UserParameters::from_values(&[1.0, 2.0, 3.0], &[0.1, 0.1, 0.1]).unwrap();
        let before = p.transformation().ext_of_int_map().to_vec();
        p.fix("p1").unwrap();
        assert_eq!(p.variable_parameters(), 2);
        p.release("p1").unwrap();
        assert_eq!(p.transformation().ext_of_int_map(), before.as_slice());
        assert_relative_eq!(p.value("p1").unwrap(), 2.0);
    }

    #[test]
    fn test_const_parameter_is_not_variable() {
        let mut p = UserParameters::new();
        p.add_const("c", 1.0).unwrap();
        assert_eq!(p.variable_parameters(), 0);
        assert!(p.fix("c").is_err());
        assert!(p.release("c").is_err());
    }
}
