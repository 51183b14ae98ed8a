//! Parameters together with their covariance.

use minuit_math::{DVector, MachinePrecision};

use super::covariance::UserCovariance;
use super::global_cc::GlobalCorrelationCoeff;
use super::parameter::Parameter;
use super::squeeze::squeeze_covariance;
use super::transformation::Transformation;
use super::user_parameters::UserParameters;
use super::ParameterRef;
use crate::error::{MinuitError, MinuitResult};
use crate::minimum::MinimumState;

/// User parameters plus covariance, function value and EDM.
///
/// This is both the input of a minimization and the user-space view of its
/// result. Changing limits, releasing a parameter or adding one invalidates
/// the covariance; fixing a parameter squeezes it.
#[derive(Debug, Clone, PartialEq)]
pub struct UserParameterState {
    valid: bool,
    covariance_valid: bool,
    gcc_valid: bool,
    fval: f64,
    edm: f64,
    nfcn: usize,
    parameters: UserParameters,
    covariance: UserCovariance,
    int_covariance: UserCovariance,
    global_cc: GlobalCorrelationCoeff,
}

impl UserParameterState {
    /// State of a parameter set without covariance.
    #[must_use]
    pub fn new(parameters: UserParameters) -> Self {
        Self {
            valid: true,
            covariance_valid: false,
            gcc_valid: false,
            fval: 0.0,
            edm: 0.0,
            nfcn: 0,
            parameters,
            covariance: UserCovariance::default(),
            int_covariance: UserCovariance::default(),
            global_cc: GlobalCorrelationCoeff::default(),
        }
    }

    /// State of free parameters `p0, p1, ...`.
    pub fn from_values(values: &[f64], errors: &[f64]) -> MinuitResult<Self> {
        Ok(Self::new(UserParameters::from_values(values, errors)?))
    }

    /// State with a user-supplied covariance of the variable parameters.
    ///
    /// The errors of the variable parameters are taken from the diagonal. The
    /// covariance is assumed to correspond to an error definition of one.
    pub fn with_covariance(mut parameters: UserParameters, cov: UserCovariance) -> MinuitResult<Self> {
        let n = parameters.variable_parameters();
        if cov.nrow() != n {
            return Err(MinuitError::invalid_covariance(format!(
                "covariance has {} rows but there are {n} variable parameters",
                cov.nrow()
            )));
        }
        for i in 0..n {
            let var = cov.get(i, i);
            if var <= 0.0 {
                return Err(MinuitError::invalid_covariance(format!(
                    "non-positive variance {var} at row {i}"
                )));
            }
            let ext = parameters.transformation().ext_of_int(i);
            parameters.set_error(ext, var.sqrt())?;
        }
        let mut int_covariance = cov.clone();
        int_covariance.scale(0.5);
        Ok(Self {
            covariance_valid: true,
            covariance: cov,
            int_covariance,
            ..Self::new(parameters)
        })
    }

    /// User-space view of a minimum state.
    #[must_use]
    pub fn from_minimum_state(state: &MinimumState, up: f64, trafo: &Transformation) -> Self {
        let mut params = trafo.clone();
        let vec = state.vec();
        let inv_hessian = state.error().inv_hessian();
        for i in 0..trafo.variable_parameters() {
            let ext = trafo.ext_of_int(i);
            let err = if state.has_covariance() {
                (2.0 * up * inv_hessian.get(i, i)).sqrt()
            } else {
                state.parameters().dirin()[i]
            };
            let value = trafo.int2ext(i, vec[i]);
            let error = trafo.int2ext_error(i, vec[i], err);
            let updated = params.set_value(ext, value).and_then(|_| params.set_error(ext, error));
            debug_assert!(updated.is_ok(), "external index {ext} missing from its own transformation");
        }

        let mut result = Self {
            valid: state.is_valid(),
            fval: state.fval(),
            edm: state.edm(),
            nfcn: state.nfcn(),
            ..Self::new(UserParameters::from(params))
        };
        if state.error().is_valid() {
            let mut cov = trafo.int2ext_covariance(vec, inv_hessian);
            cov.scale(2.0 * up);
            result.covariance = cov;
            result.int_covariance = UserCovariance::from_sym_matrix(inv_hessian);
            result.global_cc = GlobalCorrelationCoeff::new(inv_hessian);
            result.covariance_valid = true;
            result.gcc_valid = true;
        }
        result
    }

    /// Returns true if the state can be minimized or came from a valid minimum.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Returns true if a covariance is attached.
    pub fn has_covariance(&self) -> bool {
        self.covariance_valid
    }

    /// Returns true if global correlation coefficients are attached.
    pub fn has_global_cc(&self) -> bool {
        self.gcc_valid
    }

    /// Function value.
    pub fn fval(&self) -> f64 {
        self.fval
    }

    /// Estimated distance to minimum.
    pub fn edm(&self) -> f64 {
        self.edm
    }

    /// Function calls spent to reach this state.
    pub fn nfcn(&self) -> usize {
        self.nfcn
    }

    /// The parameters.
    pub fn parameters(&self) -> &UserParameters {
        &self.parameters
    }

    /// Covariance of the variable parameters in user units.
    pub fn covariance(&self) -> &UserCovariance {
        &self.covariance
    }

    /// Inverse Hessian in internal units.
    pub fn int_covariance(&self) -> &UserCovariance {
        &self.int_covariance
    }

    /// Global correlation coefficients.
    pub fn global_cc(&self) -> &GlobalCorrelationCoeff {
        &self.global_cc
    }

    /// The transformation.
    pub fn transformation(&self) -> &Transformation {
        self.parameters.transformation()
    }

    /// Internal values of the variable parameters.
    #[must_use]
    pub fn int_parameters(&self) -> DVector<f64> {
        self.transformation().internal_values()
    }

    /// Machine precision.
    pub fn precision(&self) -> &MachinePrecision {
        self.parameters.precision()
    }

    /// Overrides the machine precision.
    pub fn set_precision(&mut self, eps: f64) {
        self.parameters.set_precision(eps);
    }

    /// Number of variable parameters.
    pub fn variable_parameters(&self) -> usize {
        self.parameters.variable_parameters()
    }

    /// All declared parameters.
    pub fn minuit_parameters(&self) -> &[Parameter] {
        self.parameters.parameters()
    }

    /// The parameter addressed by `param`.
    pub fn parameter<'a>(&self, param: impl Into<ParameterRef<'a>>) -> MinuitResult<&Parameter> {
        self.parameters.parameter(param)
    }

    /// Value of a parameter.
    pub fn value<'a>(&self, param: impl Into<ParameterRef<'a>>) -> MinuitResult<f64> {
        self.parameters.value(param)
    }

    /// Error of a parameter.
    pub fn error<'a>(&self, param: impl Into<ParameterRef<'a>>) -> MinuitResult<f64> {
        self.parameters.error(param)
    }

    /// Values of all parameters.
    pub fn values(&self) -> Vec<f64> {
        self.parameters.values()
    }

    /// Errors of all parameters.
    pub fn errors(&self) -> Vec<f64> {
        self.parameters.errors()
    }

    /// External index of a named parameter.
    pub fn index(&self, name: &str) -> MinuitResult<usize> {
        self.parameters.index(name)
    }

    /// Name of parameter `index`.
    pub fn name(&self, index: usize) -> MinuitResult<&str> {
        self.parameters.name(index)
    }

    /// External index of internal parameter `internal`.
    pub fn ext_of_int(&self, internal: usize) -> usize {
        self.transformation().ext_of_int(internal)
    }

    /// Internal index of external parameter `ext`, if variable.
    pub fn int_of_ext(&self, ext: usize) -> Option<usize> {
        self.transformation().int_of_ext(ext)
    }

    fn invalidate_covariance(&mut self) {
        self.covariance_valid = false;
        self.gcc_valid = false;
    }

    /// Adds a free parameter.
    pub fn add(&mut self, name: impl Into<String>, value: f64, error: f64) -> MinuitResult<()> {
        self.parameters.add(name, value, error)?;
        self.invalidate_covariance();
        self.valid = true;
        Ok(())
    }

    /// Adds a parameter with two limits.
    pub fn add_limited(
        &mut self,
        name: impl Into<String>,
        value: f64,
        error: f64,
        lower: f64,
        upper: f64,
    ) -> MinuitResult<()> {
        self.parameters.add_limited(name, value, error, lower, upper)?;
        self.invalidate_covariance();
        self.valid = true;
        Ok(())
    }

    /// Adds a constant parameter.
    pub fn add_const(&mut self, name: impl Into<String>, value: f64) -> MinuitResult<()> {
        self.parameters.add_const(name, value)?;
        self.valid = true;
        Ok(())
    }

    /// Fixes a parameter; a valid covariance loses the matching row.
    pub fn fix<'a>(&mut self, param: impl Into<ParameterRef<'a>>) -> MinuitResult<()> {
        let ext = self.transformation().index_of(param)?;
        if let Some(internal) = self.int_of_ext(ext) {
            if self.covariance_valid {
                self.covariance = squeeze_covariance(&self.covariance, internal);
                self.int_covariance = squeeze_covariance(&self.int_covariance, internal);
            }
        }
        self.parameters.fix(ext)?;
        self.gcc_valid = false;
        Ok(())
    }

    /// Releases a fixed parameter.
    pub fn release<'a>(&mut self, param: impl Into<ParameterRef<'a>>) -> MinuitResult<()> {
        self.parameters.release(param)?;
        self.invalidate_covariance();
        Ok(())
    }

    /// Sets a value.
    pub fn set_value<'a>(&mut self, param: impl Into<ParameterRef<'a>>, value: f64) -> MinuitResult<()> {
        self.parameters.set_value(param, value)
    }

    /// Sets an error.
    pub fn set_error<'a>(&mut self, param: impl Into<ParameterRef<'a>>, error: f64) -> MinuitResult<()> {
        self.parameters.set_error(param, error)
    }

    fn is_variable(&self, ext: usize) -> bool {
        self.int_of_ext(ext).is_some()
    }

    /// Sets both limits. A variable parameter outside the new interval is
    /// moved to its midpoint.
    pub fn set_limits<'a>(
        &mut self,
        param: impl Into<ParameterRef<'a>>,
        lower: f64,
        upper: f64,
    ) -> MinuitResult<()> {
        let ext = self.transformation().index_of(param)?;
        self.parameters.set_limits(ext, lower, upper)?;
        self.invalidate_covariance();
        if self.is_variable(ext) {
            let p = self.parameters.parameter(ext)?;
            let (lo, up) = (p.lower_limit().unwrap_or(lower), p.upper_limit().unwrap_or(upper));
            let value = p.value();
            if !(lo < value && value < up) {
                self.parameters.set_value(ext, 0.5 * (lo + up))?;
            }
        }
        Ok(())
    }

    /// Sets a lower limit only. A variable parameter below it is moved inside.
    pub fn set_lower_limit<'a>(&mut self, param: impl Into<ParameterRef<'a>>, lower: f64) -> MinuitResult<()> {
        let ext = self.transformation().index_of(param)?;
        self.parameters.set_lower_limit(ext, lower)?;
        self.invalidate_covariance();
        if self.is_variable(ext) && self.parameters.value(ext)? <= lower {
            self.parameters.set_value(ext, lower + 0.5 * (lower + 1.0).abs())?;
        }
        Ok(())
    }

    /// Sets an upper limit only. A variable parameter above it is moved inside.
    pub fn set_upper_limit<'a>(&mut self, param: impl Into<ParameterRef<'a>>, upper: f64) -> MinuitResult<()> {
        let ext = self.transformation().index_of(param)?;
        self.parameters.set_upper_limit(ext, upper)?;
        self.invalidate_covariance();
        if self.is_variable(ext) && self.parameters.value(ext)? >= upper {
            self.parameters.set_value(ext, upper - 0.5 * (upper + 1.0).abs())?;
        }
        Ok(())
    }

    /// Removes the limits.
    pub fn remove_limits<'a>(&mut self, param: impl Into<ParameterRef<'a>>) -> MinuitResult<()> {
        self.parameters.remove_limits(param)?;
        self.invalidate_covariance();
        Ok(())
    }

    pub(crate) fn set_transformation(&mut self, trafo: Transformation) {
        *self.parameters.transformation_mut() = trafo;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minimum::{FunctionGradient, MinimumError, MinimumParameters};
    use approx::assert_relative_eq;
    use minuit_math::SymMatrix;

    #[test]
    fn test_set_limits_reprojects_value() {
        let mut st = UserParameterState::from_values(&[5.0, 0.5], &[0.1, 0.1]).unwrap();
        st.set_limits("p0", 0.0, 2.0).unwrap();
        assert_relative_eq!(st.value("p0").unwrap(), 1.0);
        st.set_limits("p1", 0.0, 2.0).unwrap();
        assert_relative_eq!(st.value("p1").unwrap(), 0.5);
        st.set_lower_limit("p1", 3.0).unwrap();
        assert_relative_eq!(st.value("p1").unwrap(), 5.0);
        st.set_upper_limit("p1", -3.0).unwrap();
        assert_relative_eq!(st.value("p1").unwrap(), -4.0);
    }

    #[test]
    fn test_covariance_constructor_checks_shape() {
        let params = UserParameters::from_values(&[1.0, 2.0], &[0.1, 0.1]).unwrap();
        let bad = UserCovariance::new(1);
        assert!(UserParameterState::with_covariance(params.clone(), bad).is_err());
        let cov = UserCovariance::from_packed(vec![4.0, 0.0, 9.0], 2).unwrap();
        let st = UserParameterState::with_covariance(params, cov).unwrap();
        assert!(st.has_covariance());
        assert_relative_eq!(st.error(1_usize).unwrap(), 3.0);
        assert_relative_eq!(st.int_covariance().get(0, 0), 2.0);
    }

    #[test]
    fn test_fix_squeezes_covariance() {
        let params = UserParameters::from_values(&[1.0, 2.0], &[0.1, 0.1]).unwrap();
        let cov = UserCovariance::from_packed(vec![1.0, 0.5, 1.0], 2).unwrap();
        let mut st = UserParameterState::with_covariance(params, cov).unwrap();
        st.fix(0_usize).unwrap();
        assert!(st.has_covariance());
        assert_eq!(st.covariance().nrow(), 1);
        assert_relative_eq!(st.covariance().get(0, 0), 0.75, epsilon = 1e-12);
        st.release(0_usize).unwrap();
        assert!(!st.has_covariance());
        assert_eq!(st.variable_parameters(), 2);
    }

    #[test]
    fn test_from_minimum_state() {
        let mut trafo = Transformation::new();
        trafo.add("a", 0.0, 1.0).unwrap();
        trafo.add_const("c", 7.0).unwrap();
        trafo.add("b", 0.0, 1.0).unwrap();
        let p = MinimumParameters::new(DVector::from_vec(vec![1.5, -2.0]), 3.0);
        let e = MinimumError::new(SymMatrix::from_diagonal(&[0.5, 2.0]), 0.0);
        let g = FunctionGradient::invalid(2);
        let state = MinimumState::new(p, e, g, 1e-4, 12);

        let st = UserParameterState::from_minimum_state(&state, 1.0, &trafo);
        assert!(st.is_valid());
        assert!(st.has_covariance());
        assert_relative_eq!(st.value("a").unwrap(), 1.5);
        assert_relative_eq!(st.value("b").unwrap(), -2.0);
        assert_relative_eq!(st.value("c").unwrap(), 7.0);
        assert_relative_eq!(st.error("a").unwrap(), 1.0);
        assert_relative_eq!(st.error("b").unwrap(), 2.0);
        assert_relative_eq!(st.covariance().get(1, 1), 4.0);
        assert_eq!(st.nfcn(), 12);
        assert_relative_eq!(st.fval(), 3.0);
    }
}
