//! One-dimensional parameter scans.

use crate::error::{MinuitError, MinuitResult};
use crate::fcn::Fcn;
use crate::parameters::{ParameterRef, UserParameters};

/// Largest number of points in one scan.
pub const MAX_SCAN_STEPS: usize = 101;

/// Default number of points in one scan.
pub const DEFAULT_SCAN_STEPS: usize = 41;

/// Scans single parameters while holding the others at their values.
///
/// Whenever a scan point improves on the best function value seen so far,
/// the parameter is moved there, so consecutive scans of different
/// parameters act as a coordinate search.
pub struct ParameterScan<'f, 'a> {
    fcn: &'f Fcn<'a>,
    parameters: UserParameters,
    amin: f64,
}

impl<'f, 'a> ParameterScan<'f, 'a> {
    /// Starts a scan, evaluating the function at the current values.
    pub fn new(fcn: &'f Fcn<'a>, parameters: UserParameters) -> Self {
        let amin = fcn.external_value(&parameters.values());
        Self::with_fval(fcn, parameters, amin)
    }

    /// Starts a scan with a known function value at the current values.
    pub fn with_fval(fcn: &'f Fcn<'a>, parameters: UserParameters, fval: f64) -> Self {
        Self {
            fcn,
            parameters,
            amin: fval,
        }
    }

    /// Lowest function value found.
    pub fn fval(&self) -> f64 {
        self.amin
    }

    /// Parameters at the lowest function value found.
    pub fn parameters(&self) -> &UserParameters {
        &self.parameters
    }

    /// Scans `param` over `[low, high]` in `max_steps` points.
    ///
    /// `low == high == 0` selects `value ± 2·error`. The interval is clamped
    /// to the parameter limits and `max_steps` to [`MAX_SCAN_STEPS`]. The
    /// first returned point is the starting value with the best value so far;
    /// a reversed interval or fewer than two steps returns only that point.
    pub fn scan<'n>(
        &mut self,
        param: impl Into<ParameterRef<'n>>,
        max_steps: usize,
        low: f64,
        high: f64,
    ) -> MinuitResult<Vec<(f64, f64)>> {
        let ext = self.parameters.transformation().index_of(param)?;
        let max_steps = max_steps.min(MAX_SCAN_STEPS);
        let mut params = self.parameters.values();

        let mut result = Vec::with_capacity(max_steps + 1);
        result.push((params[ext], self.amin));
        if low > high || max_steps < 2 {
            return Ok(result);
        }

        let p = self.parameters.parameter(ext)?;
        let (mut low, mut high) = (low, high);
        if low == 0.0 && high == 0.0 {
            low = params[ext] - 2.0 * p.error();
            high = params[ext] + 2.0 * p.error();
        }
        if let Some(lower) = p.lower_limit() {
            low = low.max(lower);
        }
        if let Some(upper) = p.upper_limit() {
            high = high.min(upper);
        }
        if low > high {
            return Err(MinuitError::invalid_operation(
                p.name(),
                format!("scan interval [{low}, {high}] lies outside the limits"),
            ));
        }

        let stp = (high - low) / (max_steps as f64 - 1.0);
        for i in 0..max_steps {
            params[ext] = low + i as f64 * stp;
            let fval = self.fcn.external_value(&params);
            if fval < self.amin {
                self.parameters.set_value(ext, params[ext])?;
                self.amin = fval;
            }
            result.push((params[ext], fval));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_default_range_finds_lower_point() {
        let params = UserParameters::from_values(&[0.0, 3.0], &[1.0, 1.0]).unwrap();
        let f = |x: &[f64]| (x[0] - 1.0).powi(2) + x[1];
        let fcn = Fcn::new(&f, 1.0, params.transformation().clone());
        let mut scan = ParameterScan::new(&fcn, params);
        let points = scan.scan("p0", 41, 0.0, 0.0).unwrap();

        assert_eq!(points.len(), 42);
        assert_abs_diff_eq!(points[1].0, -2.0);
        assert_abs_diff_eq!(points[41].0, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(scan.parameters().value("p0").unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(scan.fval(), 3.0, epsilon = 1e-12);
        assert_eq!(fcn.num_calls(), 42);
    }

    #[test]
    fn test_range_is_clamped_to_limits() {
        let mut params = UserParameters::new();
        params.add_limited("a", 0.5, 1.0, 0.0, 1.0).unwrap();
        let f = |x: &[f64]| -x[0];
        let fcn = Fcn::new(&f, 1.0, params.transformation().clone());
        let mut scan = ParameterScan::new(&fcn, params);
        let points = scan.scan(0_usize, 500, 0.0, 0.0).unwrap();
        assert_eq!(points.len(), MAX_SCAN_STEPS + 1);
        assert!(points.iter().skip(1).all(|(x, _)| (0.0..=1.0 + 1e-12).contains(x)));
        assert_abs_diff_eq!(scan.parameters().value("a").unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_requests() {
        let params = UserParameters::from_values(&[0.0], &[1.0]).unwrap();
        let f = |x: &[f64]| x[0] * x[0];
        let fcn = Fcn::new(&f, 1.0, params.transformation().clone());
        let mut scan = ParameterScan::with_fval(&fcn, params, 0.0);
        assert_eq!(scan.scan(0_usize, 10, 1.0, -1.0).unwrap().len(), 1);
        assert_eq!(scan.scan(0_usize, 1, 0.0, 0.0).unwrap().len(), 1);
        assert!(scan.scan("missing", 10, 0.0, 0.0).is_err());
        assert_eq!(fcn.num_calls(), 0);
    }
}
