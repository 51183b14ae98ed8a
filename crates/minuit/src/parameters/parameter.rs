//! A single fit parameter.

use serde::{Deserialize, Serialize};

use crate::error::{MinuitError, MinuitResult};

/// One user parameter.
///
/// A constant parameter never varies and carries no error. A fixed parameter
/// is excluded from the minimization until released.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    number: usize,
    name: String,
    value: f64,
    error: f64,
    lower_limit: Option<f64>,
    upper_limit: Option<f64>,
    is_const: bool,
    is_fixed: bool,
}

impl Parameter {
    /// Creates a free parameter.
    pub fn new(number: usize, name: impl Into<String>, value: f64, error: f64) -> Self {
        Self {
            number,
            name: name.into(),
            value,
            error,
            lower_limit: None,
            upper_limit: None,
            is_const: false,
            is_fixed: false,
        }
    }

    /// Creates a constant parameter.
    pub fn constant(number: usize, name: impl Into<String>, value: f64) -> Self {
        Self {
            is_const: true,
            ..Self::new(number, name, value, 0.0)
        }
    }

    /// Creates a parameter with two limits. Swapped limits are reordered.
    pub fn limited(
        number: usize,
        name: impl Into<String>,
        value: f64,
        error: f64,
        lower: f64,
        upper: f64,
    ) -> MinuitResult<Self> {
        let mut p = Self::new(number, name, value, error);
        p.set_limits(lower, upper)?;
        Ok(p)
    }

    /// Position in the declared parameter list.
    pub fn number(&self) -> usize {
        self.number
    }

    /// Parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Current error estimate.
    pub fn error(&self) -> f64 {
        self.error
    }

    /// Lower limit, if any.
    pub fn lower_limit(&self) -> Option<f64> {
        self.lower_limit
    }

    /// Upper limit, if any.
    pub fn upper_limit(&self) -> Option<f64> {
        self.upper_limit
    }

    /// Returns true if either limit is set.
    pub fn has_limits(&self) -> bool {
        self.lower_limit.is_some() || self.upper_limit.is_some()
    }

    /// Returns true if the lower limit is set.
    pub fn has_lower_limit(&self) -> bool {
        self.lower_limit.is_some()
    }

    /// Returns true if the upper limit is set.
    pub fn has_upper_limit(&self) -> bool {
        self.upper_limit.is_some()
    }

    /// Returns true if both limits are set.
    pub fn has_both_limits(&self) -> bool {
        self.lower_limit.is_some() && self.upper_limit.is_some()
    }

    /// Returns true for a constant parameter.
    pub fn is_const(&self) -> bool {
        self.is_const
    }

    /// Returns true while fixed.
    pub fn is_fixed(&self) -> bool {
        self.is_fixed
    }

    /// Sets the value.
    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    /// Sets the error. A constant parameter becomes variable.
    pub fn set_error(&mut self, error: f64) {
        self.error = error;
        self.is_const = false;
    }

    /// Sets both limits.
    pub fn set_limits(&mut self, lower: f64, upper: f64) -> MinuitResult<()> {
        if lower == upper {
            return Err(MinuitError::EqualLimits {
                name: self.name.clone(),
                limit: lower,
            });
        }
        let (lo, up) = if lower > upper {
            (upper, lower)
        } else {
            (lower, upper)
        };
        self.lower_limit = Some(lo);
        self.upper_limit = Some(up);
        Ok(())
    }

    /// Sets a lower limit and removes the upper one.
    pub fn set_lower_limit(&mut self, lower: f64) {
        self.lower_limit = Some(lower);
        self.upper_limit = None;
    }

    /// Sets an upper limit and removes the lower one.
    pub fn set_upper_limit(&mut self, upper: f64) {
        self.lower_limit = None;
        self.upper_limit = Some(upper);
    }

    /// Removes both limits.
    pub fn remove_limits(&mut self) {
        self.lower_limit = None;
        self.upper_limit = None;
    }

    pub(crate) fn fix(&mut self) {
        self.is_fixed = true;
    }

    pub(crate) fn release(&mut self) {
        self.is_fixed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swapped_limits_reordered() {
        let p = Parameter::limited(0, "a", 1.0, 0.1, 5.0, -5.0).unwrap();
        assert_eq!(p.lower_limit(), Some(-5.0));
        assert_eq!(p.upper_limit(), Some(5.0));
        assert!(p.has_both_limits());
    }

    #[test]
    fn test_equal_limits_rejected() {
        let err = Parameter::limited(0, "a", 1.0, 0.1, 2.0, 2.0).unwrap_err();
        assert!(matches!(err, MinuitError::EqualLimits { .. }));
    }

    #[test]
    fn test_one_sided_limits_replace() {
        let mut p = Parameter::limited(0, "a", 1.0, 0.1, 0.0, 2.0).unwrap();
        p.set_lower_limit(-1.0);
        assert_eq!(p.lower_limit(), Some(-1.0));
        assert!(!p.has_upper_limit());
        p.set_upper_limit(3.0);
        assert!(!p.has_lower_limit());
        p.remove_limits();
        assert!(!p.has_limits());
    }

    #[test]
    fn test_const_becomes_variable_with_error() {
        let mut p = Parameter::constant(0, "c", 3.0);
        assert!(p.is_const());
        p.set_error(0.5);
        assert!(!p.is_const());
    }
}
