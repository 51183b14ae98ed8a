//! MINOS asymmetric errors.
//!
//! For each direction the parameter is fixed one parabolic error away from
//! the minimum, the other free parameters are shifted along their
//! correlation with it, and a [`FunctionCross`] search finds where the
//! profiled function rises by the error definition.

use log::warn;

use crate::config::default_max_fcn;
use crate::cross::{Cross, FunctionCross};
use crate::error::{MinuitError, MinuitResult};
use crate::fcn::ObjectiveFunction;
use crate::minimum::FunctionMinimum;
use crate::parameters::{ParameterRef, UserParameterState};
use crate::strategy::Strategy;

const MINOS_TOLERANCE: f64 = 0.1;

/// Search direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Lower,
    Upper,
}

impl Side {
    fn sign(self) -> f64 {
        match self {
            Self::Lower => -1.0,
            Self::Upper => 1.0,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Lower => "lower",
            Self::Upper => "upper",
        }
    }
}

// =============================================================================
// MINOS ERROR
// =============================================================================

/// Both MINOS crossings of one parameter.
#[derive(Debug, Clone)]
pub struct MinosError {
    parameter: usize,
    min_value: f64,
    lower: Cross,
    upper: Cross,
}

impl MinosError {
    /// Creates the error from the two crossings.
    pub fn new(parameter: usize, min_value: f64, lower: Cross, upper: Cross) -> Self {
        Self {
            parameter,
            min_value,
            lower,
            upper,
        }
    }

    /// External index of the parameter.
    pub fn parameter(&self) -> usize {
        self.parameter
    }

    /// Parameter value at the minimum.
    pub fn min_value(&self) -> f64 {
        self.min_value
    }

    fn side_error(cross: &Cross, parameter: usize) -> f64 {
        cross
            .state()
            .minuit_parameters()
            .get(parameter)
            .map_or(0.0, |p| p.error())
    }

    fn limit_offset(&self, cross: &Cross, side: Side) -> Option<f64> {
        let param = cross.state().minuit_parameters().get(self.parameter)?;
        let limit = match side {
            Side::Lower => param.lower_limit(),
            Side::Upper => param.upper_limit(),
        }?;
        Some(limit - self.min_value)
    }

    /// Negative offset of the lower crossing from the minimum.
    ///
    /// At a limit this is the distance to the limit.
    pub fn lower(&self) -> f64 {
        if self.lower.at_limit() {
            if let Some(offset) = self.limit_offset(&self.lower, Side::Lower) {
                return offset;
            }
        }
        -Self::side_error(&self.lower, self.parameter) * (1.0 + self.lower.value())
    }

    /// Positive offset of the upper crossing from the minimum.
    ///
    /// At a limit this is the distance to the limit.
    pub fn upper(&self) -> f64 {
        if self.upper.at_limit() {
            if let Some(offset) = self.limit_offset(&self.upper, Side::Upper) {
                return offset;
            }
        }
        Self::side_error(&self.upper, self.parameter) * (1.0 + self.upper.value())
    }

    /// `(lower, upper)` offsets.
    pub fn range(&self) -> (f64, f64) {
        (self.lower(), self.upper())
    }

    /// Returns true if both crossings were found.
    pub fn is_valid(&self) -> bool {
        self.lower.is_valid() && self.upper.is_valid()
    }

    /// Returns true if the lower crossing was found.
    pub fn lower_valid(&self) -> bool {
        self.lower.is_valid()
    }

    /// Returns true if the upper crossing was found.
    pub fn upper_valid(&self) -> bool {
        self.upper.is_valid()
    }

    /// Returns true if the lower search stopped at a limit.
    pub fn at_lower_limit(&self) -> bool {
        self.lower.at_limit()
    }

    /// Returns true if the upper search stopped at a limit.
    pub fn at_upper_limit(&self) -> bool {
        self.upper.at_limit()
    }

    /// Returns true if the lower search ran out of calls.
    pub fn at_lower_max_fcn(&self) -> bool {
        self.lower.at_max_fcn()
    }

    /// Returns true if the upper search ran out of calls.
    pub fn at_upper_max_fcn(&self) -> bool {
        self.upper.at_max_fcn()
    }

    /// Returns true if the lower search found a lower minimum.
    pub fn lower_new_min(&self) -> bool {
        self.lower.new_minimum()
    }

    /// Returns true if the upper search found a lower minimum.
    pub fn upper_new_min(&self) -> bool {
        self.upper.new_minimum()
    }

    /// The lower crossing.
    pub fn lower_cross(&self) -> &Cross {
        &self.lower
    }

    /// The upper crossing.
    pub fn upper_cross(&self) -> &Cross {
        &self.upper
    }

    /// State at the lower crossing.
    pub fn lower_state(&self) -> &UserParameterState {
        self.lower.state()
    }

    /// State at the upper crossing.
    pub fn upper_state(&self) -> &UserParameterState {
        self.upper.state()
    }

    /// Function calls spent by both searches.
    pub fn nfcn(&self) -> usize {
        self.lower.nfcn() + self.upper.nfcn()
    }
}

// =============================================================================
// MINOS
// =============================================================================

/// MINOS error analysis around a function minimum.
///
/// `errdef` arguments multiply the error definition of the minimum:
/// 1 for one standard deviation, 4 for two with a χ² function.
///
/// # Example
///
/// ```rust
/// use minuit::application::Minimizer;
/// use minuit::minos::Minos;
/// use minuit::parameters::UserParameterState;
/// use minuit::strategy::Strategy;
///
/// let f = |x: &[f64]| 4.0 * (x[0] - 1.0).powi(2);
/// let state = UserParameterState::from_values(&[0.0], &[0.1]).unwrap();
/// let min = Minimizer::migrad(&f, state).minimize().unwrap();
///
/// let minos = Minos::new(&f, &min, Strategy::medium());
/// let err = minos.minos(0_usize, 1.0, 0).unwrap();
/// assert!(err.is_valid());
/// assert!((err.upper() - 0.5).abs() < 0.01);
/// assert!((err.lower() + 0.5).abs() < 0.01);
/// ```
pub struct Minos<'a> {
    function: &'a dyn ObjectiveFunction,
    minimum: &'a FunctionMinimum,
    strategy: Strategy,
}

impl<'a> Minos<'a> {
    /// Creates the analysis.
    pub fn new(function: &'a dyn ObjectiveFunction, minimum: &'a FunctionMinimum, strategy: Strategy) -> Self {
        Self {
            function,
            minimum,
            strategy,
        }
    }

    /// The minimum being analysed.
    pub fn minimum(&self) -> &FunctionMinimum {
        self.minimum
    }

    /// The strategy of the inner minimizations.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Both crossings of a parameter.
    ///
    /// `max_calls` bounds every inner minimization; 0 selects
    /// `2·(n+1)·(200 + 100n + 5n²)`.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown, fixed or constant parameter.
    pub fn minos<'n>(
        &self,
        param: impl Into<ParameterRef<'n>>,
        errdef: f64,
        max_calls: usize,
    ) -> MinuitResult<MinosError> {
        let ext = self.minimum.user_state().transformation().index_of(param)?;
        let upper = self.upval(ext, errdef, max_calls)?;
        let lower = self.loval(ext, errdef, max_calls)?;
        Ok(MinosError::new(
            ext,
            self.minimum.user_state().value(ext)?,
            lower,
            upper,
        ))
    }

    /// `(lower, upper)` offsets of a parameter.
    ///
    /// # Errors
    ///
    /// See [`Minos::minos`].
    pub fn range<'n>(
        &self,
        param: impl Into<ParameterRef<'n>>,
        errdef: f64,
        max_calls: usize,
    ) -> MinuitResult<(f64, f64)> {
        Ok(self.minos(param, errdef, max_calls)?.range())
    }

    /// Negative offset of the lower crossing.
    ///
    /// When no crossing is found this is the lower limit if the search
    /// stopped there, otherwise the parameter value.
    ///
    /// # Errors
    ///
    /// See [`Minos::minos`].
    pub fn lower<'n>(&self, param: impl Into<ParameterRef<'n>>, errdef: f64, max_calls: usize) -> MinuitResult<f64> {
        self.bound(param, errdef, max_calls, Side::Lower)
    }

    /// Positive offset of the upper crossing.
    ///
    /// When no crossing is found this is the upper limit if the search
    /// stopped there, otherwise the parameter value.
    ///
    /// # Errors
    ///
    /// See [`Minos::minos`].
    pub fn upper<'n>(&self, param: impl Into<ParameterRef<'n>>, errdef: f64, max_calls: usize) -> MinuitResult<f64> {
        self.bound(param, errdef, max_calls, Side::Upper)
    }

    /// Lower crossing search.
    ///
    /// # Errors
    ///
    /// See [`Minos::minos`].
    pub fn loval<'n>(&self, param: impl Into<ParameterRef<'n>>, errdef: f64, max_calls: usize) -> MinuitResult<Cross> {
        self.crossing(param, errdef, max_calls, Side::Lower)
    }

    /// Upper crossing search.
    ///
    /// # Errors
    ///
    /// See [`Minos::minos`].
    pub fn upval<'n>(&self, param: impl Into<ParameterRef<'n>>, errdef: f64, max_calls: usize) -> MinuitResult<Cross> {
        self.crossing(param, errdef, max_calls, Side::Upper)
    }

    fn bound<'n>(
        &self,
        param: impl Into<ParameterRef<'n>>,
        errdef: f64,
        max_calls: usize,
        side: Side,
    ) -> MinuitResult<f64> {
        let state = self.minimum.user_state();
        let ext = state.transformation().index_of(param)?;
        let err = state.error(ext)?;
        let cross = self.crossing(ext, errdef, max_calls, side)?;
        if cross.is_valid() {
            return Ok(side.sign() * err * (1.0 + cross.value()));
        }
        let p = state.parameter(ext)?;
        let limit = match side {
            Side::Lower => p.lower_limit(),
            Side::Upper => p.upper_limit(),
        };
        Ok(match limit {
            Some(limit) if cross.at_limit() => limit,
            _ => p.value(),
        })
    }

    fn crossing<'n>(
        &self,
        param: impl Into<ParameterRef<'n>>,
        errdef: f64,
        max_calls: usize,
        side: Side,
    ) -> MinuitResult<Cross> {
        let min = self.minimum;
        let mut upar = min.user_state().clone();
        let ext = upar.transformation().index_of(param)?;
        let p = upar.parameter(ext)?;
        if p.is_const() || p.is_fixed() {
            return Err(MinuitError::invalid_operation(
                p.name(),
                "MINOS needs a variable parameter",
            ));
        }
        if !min.is_valid() {
            warn!("MINOS on an invalid minimum");
        }

        let errdef = errdef * min.error_def();
        let max_calls = if max_calls == 0 {
            let nvar = upar.variable_parameters();
            2 * (nvar + 1) * default_max_fcn(nvar)
        } else {
            max_calls
        };

        let err = upar.error(ext)?;
        let val = upar.value(ext)? + side.sign() * err;
        let ind = upar
            .int_of_ext(ext)
            .ok_or_else(|| MinuitError::invalid_state("MINOS parameter has no internal index"))?;

        // shift the other parameters along their correlation with this one
        let m = min.error().matrix();
        let xunit = (errdef / err).sqrt();
        for i in 0..m.size() {
            if i == ind {
                continue;
            }
            let xdev = xunit * m.get(ind, i);
            let other = upar.ext_of_int(i);
            let shifted = upar.value(other)? + side.sign() * xdev;
            upar.set_value(other, shifted)?;
        }

        upar.fix(ext)?;
        upar.set_value(ext, val)?;

        let cross = FunctionCross::new(self.function, upar, min.fval(), self.strategy, min.error_def(), errdef);
        let result = cross.cross(&[ext], &[val], &[side.sign() * err], MINOS_TOLERANCE, max_calls);

        if result.at_limit() {
            warn!("MINOS: parameter {ext} is at its {} limit", side.name());
        }
        if result.at_max_fcn() {
            warn!("MINOS: call limit exceeded for parameter {ext}");
        }
        if result.new_minimum() {
            warn!("MINOS: new minimum found while looking for parameter {ext}");
        }
        if !result.is_valid() {
            warn!("MINOS: could not find the {} value of parameter {ext}", side.name());
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::Minimizer;
    use crate::parameters::UserParameters;
    use approx::assert_abs_diff_eq;

    fn minimum_of(f: &dyn ObjectiveFunction, state: UserParameterState) -> FunctionMinimum {
        Minimizer::migrad(f, state).minimize().unwrap()
    }

    #[test]
    fn test_one_dimensional_parabola() {
        // curvature 8, so the error is sqrt(2/8)
        let f = |x: &[f64]| 4.0 * (x[0] - 1.0).powi(2);
        let min = minimum_of(&f, UserParameterState::from_values(&[0.0], &[0.1]).unwrap());
        let minos = Minos::new(&f, &min, Strategy::medium());
        let err = minos.minos(0_usize, 1.0, 0).unwrap();

        assert!(err.is_valid());
        assert_abs_diff_eq!(err.lower(), -0.5, epsilon = 0.01);
        assert_abs_diff_eq!(err.upper(), 0.5, epsilon = 0.01);
        assert_abs_diff_eq!(err.min_value(), 1.0, epsilon = 1e-3);
        assert!(err.nfcn() > 0);
    }

    #[test]
    fn test_error_definition_multiplier() {
        let f = |x: &[f64]| (x[0] - 1.0).powi(2);
        let min = minimum_of(&f, UserParameterState::from_values(&[0.0], &[0.1]).unwrap());
        let minos = Minos::new(&f, &min, Strategy::medium());
        // two standard deviations
        let (lo, hi) = minos.range(0_usize, 4.0, 0).unwrap();
        assert_abs_diff_eq!(lo, -2.0, epsilon = 0.05);
        assert_abs_diff_eq!(hi, 2.0, epsilon = 0.05);
    }

    #[test]
    fn test_asymmetric_errors() {
        // steeper above the minimum than below
        let f = |x: &[f64]| {
            let d = x[0] - 1.0;
            if d > 0.0 { 4.0 * d * d } else { d * d }
        };
        let min = minimum_of(&f, UserParameterState::from_values(&[0.5], &[0.1]).unwrap());
        let minos = Minos::new(&f, &min, Strategy::medium());
        let err = minos.minos(0_usize, 1.0, 0).unwrap();
        assert!(err.is_valid());
        assert_abs_diff_eq!(err.upper(), 0.5, epsilon = 0.05);
        assert_abs_diff_eq!(err.lower(), -1.0, epsilon = 0.05);
    }

    #[test]
    fn test_correlated_parameters() {
        // the profile of x has curvature 2·(1 - 0.25) after minimizing y
        let f = |x: &[f64]| x[0] * x[0] + x[1] * x[1] - x[0] * x[1];
        let mut params = UserParameters::new();
        params.add("x", 0.5, 0.1).unwrap();
        params.add("y", 0.5, 0.1).unwrap();
        let min = minimum_of(&f, UserParameterState::new(params));
        let minos = Minos::new(&f, &min, Strategy::medium());
        let err = minos.minos("x", 1.0, 0).unwrap();
        let expected = (1.0_f64 / 0.75).sqrt();
        assert!(err.is_valid());
        assert_abs_diff_eq!(err.upper(), expected, epsilon = 0.02);
        assert_abs_diff_eq!(err.lower(), -expected, epsilon = 0.02);
    }

    #[test]
    fn test_bound_substitution() {
        let f = |x: &[f64]| (x[0] - 1.0).powi(2);
        let min = minimum_of(&f, UserParameterState::from_values(&[0.0], &[0.1]).unwrap());
        let minos = Minos::new(&f, &min, Strategy::medium());
        assert_abs_diff_eq!(minos.upper(0_usize, 1.0, 0).unwrap(), 1.0, epsilon = 0.02);
        assert_abs_diff_eq!(minos.lower(0_usize, 1.0, 0).unwrap(), -1.0, epsilon = 0.02);
    }

    #[test]
    fn test_fixed_parameter_is_rejected() {
        let f = |x: &[f64]| x[0] * x[0] + x[1] * x[1];
        let mut params = UserParameters::new();
        params.add("x", 0.5, 0.1).unwrap();
        params.add("y", 0.5, 0.1).unwrap();
        params.fix("y").unwrap();
        let min = minimum_of(&f, UserParameterState::new(params));
        let minos = Minos::new(&f, &min, Strategy::medium());
        assert!(minos.minos("y", 1.0, 0).is_err());
        assert!(minos.minos("z", 1.0, 0).is_err());
    }
}
