//! Mapping between user (external) and optimizer (internal) parameters.

use std::collections::HashMap;

use minuit_math::{DVector, MachinePrecision, SymMatrix};

use super::covariance::UserCovariance;
use super::parameter::Parameter;
use super::transform::LimitTransform;
use super::ParameterRef;
use crate::error::{MinuitError, MinuitResult};

/// Owns the declared parameters and the internal ↔ external index map.
///
/// Internal indices enumerate the variable (neither fixed nor constant)
/// parameters in ascending external order.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformation {
    precision: MachinePrecision,
    parameters: Vec<Parameter>,
    ext_of_int: Vec<usize>,
    name_map: HashMap<String, usize>,
    cache: Vec<f64>,
}

impl Transformation {
    /// Creates an empty transformation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            precision: MachinePrecision::new(),
            parameters: Vec::new(),
            ext_of_int: Vec::new(),
            name_map: HashMap::new(),
            cache: Vec::new(),
        }
    }

    /// Creates free parameters `p0, p1, ...` from values and errors.
    pub fn from_values(values: &[f64], errors: &[f64]) -> MinuitResult<Self> {
        if values.len() != errors.len() {
            return Err(MinuitError::invalid_state(format!(
                "{} values but {} errors",
                values.len(),
                errors.len()
            )));
        }
        let mut trafo = Self::new();
        for (i, (&v, &e)) in values.iter().zip(errors).enumerate() {
            trafo.add(format!("p{i}"), v, e)?;
        }
        Ok(trafo)
    }

    fn register(&mut self, name: &str) -> MinuitResult<usize> {
        if self.name_map.contains_key(name) {
            return Err(MinuitError::DuplicateName {
                name: name.to_string(),
            });
        }
        let n = self.parameters.len();
        self.name_map.insert(name.to_string(), n);
        Ok(n)
    }

    /// Adds a free parameter.
    pub fn add(&mut self, name: impl Into<String>, value: f64, error: f64) -> MinuitResult<()> {
        let name = name.into();
        let n = self.register(&name)?;
        self.ext_of_int.push(n);
        self.cache.push(value);
        self.parameters.push(Parameter::new(n, name, value, error));
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
        let name = name.into();
        if self.name_map.contains_key(&name) {
            return Err(MinuitError::DuplicateName { name });
        }
        let param = Parameter::limited(self.parameters.len(), name.clone(), value, error, lower, upper)?;
        let n = self.register(&name)?;
        self.ext_of_int.push(n);
        self.cache.push(value);
        self.parameters.push(param);
        Ok(())
    }

    /// Adds a constant parameter.
    pub fn add_const(&mut self, name: impl Into<String>, value: f64) -> MinuitResult<()> {
        let name = name.into();
        let n = self.register(&name)?;
        self.cache.push(value);
        self.parameters.push(Parameter::constant(n, name, value));
        Ok(())
    }

    /// Precision used for the transforms.
    pub fn precision(&self) -> &MachinePrecision {
        &self.precision
    }

    /// Overrides the machine precision.
    pub fn set_precision(&mut self, eps: f64) {
        self.precision.set_precision(eps);
    }

    /// All declared parameters.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Number of declared parameters.
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// Returns true when no parameter is declared.
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Number of variable parameters.
    pub fn variable_parameters(&self) -> usize {
        self.ext_of_int.len()
    }

    /// Resolves a parameter reference to its external index.
    pub fn index_of<'a>(&self, param: impl Into<ParameterRef<'a>>) -> MinuitResult<usize> {
        match param.into() {
            ParameterRef::Index(index) => {
                if index < self.parameters.len() {
                    Ok(index)
                } else {
                    Err(MinuitError::IndexOutOfRange {
                        index,
                        len: self.parameters.len(),
                    })
                }
            }
            ParameterRef::Name(name) => {
                self.name_map
                    .get(name)
                    .copied()
                    .ok_or_else(|| MinuitError::UnknownName {
                        name: name.to_string(),
                    })
            }
        }
    }

    /// The parameter addressed by `param`.
    pub fn parameter<'a>(&self, param: impl Into<ParameterRef<'a>>) -> MinuitResult<&Parameter> {
        let index = self.index_of(param)?;
        Ok(&self.parameters[index])
    }

    /// External index of internal parameter `internal`.
    ///
    /// # Panics
    ///
    /// Panics when `internal` is not a valid internal index.
    pub fn ext_of_int(&self, internal: usize) -> usize {
        self.ext_of_int[internal]
    }

    /// Internal index of external parameter `ext`, if it is variable.
    pub fn int_of_ext(&self, ext: usize) -> Option<usize> {
        self.ext_of_int.iter().position(|&e| e == ext)
    }

    /// Sorted external indices of the variable parameters.
    pub fn ext_of_int_map(&self) -> &[usize] {
        &self.ext_of_int
    }

    fn limit_transform(&self, internal: usize) -> LimitTransform {
        LimitTransform::for_parameter(&self.parameters[self.ext_of_int[internal]])
    }

    /// Internal to external value of internal parameter `internal`.
    pub fn int2ext(&self, internal: usize, value: f64) -> f64 {
        self.limit_transform(internal).int2ext(value)
    }

    /// External to internal value of external parameter `ext`.
    pub fn ext2int(&self, ext: usize, value: f64) -> f64 {
        LimitTransform::for_parameter(&self.parameters[ext]).ext2int(value, &self.precision)
    }

    /// Derivative of the external value w.r.t. internal parameter `internal`.
    pub fn d_int2ext(&self, internal: usize, value: f64) -> f64 {
        self.limit_transform(internal).d_int2ext(value)
    }

    /// External error of internal parameter `internal` with internal error `err`.
    pub fn int2ext_error(&self, internal: usize, value: f64, err: f64) -> f64 {
        let param = &self.parameters[self.ext_of_int[internal]];
        if !param.has_limits() {
            return err;
        }
        let ui = self.int2ext(internal, value);
        let mut du1 = self.int2ext(internal, value + err) - ui;
        let du2 = self.int2ext(internal, value - err) - ui;
        if let (Some(lo), Some(up)) = (param.lower_limit(), param.upper_limit()) {
            if err > 1.0 {
                du1 = up - lo;
            }
        }
        0.5 * (du1.abs() + du2.abs())
    }

    /// Jacobian-scaled covariance in external space.
    pub fn int2ext_covariance(&self, values: &DVector<f64>, cov: &SymMatrix) -> UserCovariance {
        let n = values.len();
        let scale: Vec<f64> = (0..n).map(|i| self.d_int2ext(i, values[i])).collect();
        let mut result = UserCovariance::new(cov.size());
        for i in 0..n {
            for j in i..n {
                result.set(i, j, scale[i] * cov.get(i, j) * scale[j]);
            }
        }
        result
    }

    /// External values with the variable ones replaced by `internal`.
    pub fn transform(&self, internal: &DVector<f64>) -> Vec<f64> {
        let mut result = self.cache.clone();
        for (i, &v) in internal.iter().enumerate() {
            result[self.ext_of_int[i]] = self.int2ext(i, v);
        }
        result
    }

    /// Internal values of the variable parameters.
    #[must_use]
    pub fn internal_values(&self) -> DVector<f64> {
        DVector::from_fn(self.ext_of_int.len(), |i, _| {
            let ext = self.ext_of_int[i];
            self.ext2int(ext, self.parameters[ext].value())
        })
    }

    /// Fixes a parameter.
    pub fn fix<'a>(&mut self, param: impl Into<ParameterRef<'a>>) -> MinuitResult<usize> {
        let index = self.index_of(param)?;
        let internal = self.int_of_ext(index).ok_or_else(|| {
            MinuitError::invalid_operation(
                self.parameters[index].name(),
                "cannot fix a fixed or constant parameter",
            )
        })?;
        self.ext_of_int.remove(internal);
        self.parameters[index].fix();
        Ok(index)
    }

    /// Releases a fixed parameter.
    pub fn release<'a>(&mut self, param: impl Into<ParameterRef<'a>>) -> MinuitResult<usize> {
        let index = self.index_of(param)?;
        let p = &self.parameters[index];
        if p.is_const() || self.ext_of_int.contains(&index) {
            return Err(MinuitError::invalid_operation(
                p.name(),
                "only a fixed parameter can be released",
            ));
        }
        self.ext_of_int.push(index);
        self.ext_of_int.sort_unstable();
        self.parameters[index].release();
        Ok(index)
    }

    /// Sets a value.
    pub fn set_value<'a>(&mut self, param: impl Into<ParameterRef<'a>>, value: f64) -> MinuitResult<usize> {
        let index = self.index_of(param)?;
        self.parameters[index].set_value(value);
        self.cache[index] = value;
        Ok(index)
    }

    /// Sets an error.
    pub fn set_error<'a>(&mut self, param: impl Into<ParameterRef<'a>>, error: f64) -> MinuitResult<usize> {
        let index = self.index_of(param)?;
        self.parameters[index].set_error(error);
        Ok(index)
    }

    /// Sets both limits.
    pub fn set_limits<'a>(
        &mut self,
        param: impl Into<ParameterRef<'a>>,
        lower: f64,
        upper: f64,
    ) -> MinuitResult<usize> {
        let index = self.index_of(param)?;
        self.parameters[index].set_limits(lower, upper)?;
        Ok(index)
    }

    /// Sets a lower limit, removing any upper one.
    pub fn set_lower_limit<'a>(&mut self, param: impl Into<ParameterRef<'a>>, lower: f64) -> MinuitResult<usize> {
        let index = self.index_of(param)?;
        self.parameters[index].set_lower_limit(lower);
        Ok(index)
    }

    /// Sets an upper limit, removing any lower one.
    pub fn set_upper_limit<'a>(&mut self, param: impl Into<ParameterRef<'a>>, upper: f64) -> MinuitResult<usize> {
        let index = self.index_of(param)?;
        self.parameters[index].set_upper_limit(upper);
        Ok(index)
    }

    /// Removes all limits.
    pub fn remove_limits<'a>(&mut self, param: impl Into<ParameterRef<'a>>) -> MinuitResult<usize> {
        let index = self.index_of(param)?;
        self.parameters[index].remove_limits();
        Ok(index)
    }

    /// Current values of all parameters.
    pub fn values(&self) -> Vec<f64> {
        self.parameters.iter().map(Parameter::value).collect()
    }

    /// Current errors of all parameters.
    pub fn errors(&self) -> Vec<f64> {
        self.parameters.iter().map(Parameter::error).collect()
    }
}

impl Default for Transformation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> Transformation {
        let mut t = Transformation::new();
        t.add("a", 1.0, 0.1).unwrap();
        t.add_limited("b", 0.5, 0.1, 0.0, 1.0).unwrap();
        t.add_const("c", 3.0).unwrap();
        t.add("d", -2.0, 0.2).unwrap();
        t
    }

    #[test]
    fn test_index_bookkeeping() {
        let t = sample();
        assert_eq!(t.len(), 4);
        assert_eq!(t.variable_parameters(), 3);
        assert_eq!(t.ext_of_int_map(), &[0, 1, 3]);
        assert_eq!(t.int_of_ext(3), Some(2));
        assert_eq!(t.int_of_ext(2), None);
        assert_eq!(t.index_of("d").unwrap(), 3);
    }

    #[test]
    fn test_duplicate_and_unknown_names() {
        let mut t = sample();
        assert!(matches!(t.add("a", 0.0, 1.0), Err(MinuitError::DuplicateName { .. })));
        assert!(matches!(
            t.add_limited("c", 0.0, 1.0, 0.0, 1.0),
            Err(MinuitError::DuplicateName { .. })
        ));
        assert!(matches!(t.index_of("zz"), Err(MinuitError::UnknownName { .. })));
        assert!(matches!(t.index_of(9_usize), Err(MinuitError::IndexOutOfRange { .. })));
    }

    #[test]
    fn test_fix_release() {
        let mut t = sample();
        t.fix("b").unwrap();
        assert_eq!(t.ext_of_int_map(), &[0, 3]);
        assert!(t.fix("b").is_err());
        assert!(t.fix("c").is_err());
        assert!(t.release("a").is_err());
        t.release("b").unwrap();
        assert_eq!(t.ext_of_int_map(), &[0, 1, 3]);
        assert!(!t.parameter("b").unwrap().is_fixed());
    }

    #[test]
    fn test_transform_uses_cache_for_fixed() {
        let mut t = sample();
        t.fix(0_usize).unwrap();
        let internal = DVector::from_vec(vec![0.0, 5.0]);
        let ext = t.transform(&internal);
        assert_relative_eq!(ext[0], 1.0);
        assert_relative_eq!(ext[1], 0.5);
        assert_relative_eq!(ext[2], 3.0);
        assert_relative_eq!(ext[3], 5.0);
    }

    #[test]
    fn test_internal_values_round_trip() {
        let t = sample();
        let internal = t.internal_values();
        let ext = t.transform(&internal);
        assert_relative_eq!(ext[1], 0.5, epsilon = 1e-12);
        assert_relative_eq!(ext[3], -2.0);
    }

    #[test]
    fn test_int2ext_error_two_sided_large() {
        let t = sample();
        let v = t.ext2int(1, 0.5);
        // internal error above one spans the full interval on the upper side
        let err = t.int2ext_error(1, v, 2.0);
        assert!(err > 0.5);
        assert_relative_eq!(t.int2ext_error(0, 1.0, 0.3), 0.3);
    }

    #[test]
    fn test_int2ext_covariance_scales_bounded() {
        let t = sample();
        let v = t.internal_values();
        let cov = SymMatrix::identity(3);
        let ext = t.int2ext_covariance(&v, &cov);
        let d = t.d_int2ext(1, v[1]);
        assert_relative_eq!(ext.get(1, 1), d * d);
        assert_relative_eq!(ext.get(0, 0), 1.0);
        assert_relative_eq!(ext.get(0, 1), 0.0);
    }
}
