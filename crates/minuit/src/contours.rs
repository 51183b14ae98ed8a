//! Two-parameter confidence contours.
//!
//! The contour starts from the four MINOS points of the two parameters and
//! is refined by bisecting its widest gap with a crossing search
//! perpendicular to the gap, until the requested number of points is found.

use log::{debug, warn};

use crate::application::Minimizer;
use crate::config::MinimizerConfig;
use crate::cross::FunctionCross;
use crate::error::{MinuitError, MinuitResult};
use crate::fcn::ObjectiveFunction;
use crate::minimum::FunctionMinimum;
use crate::minos::{MinosError, Minos};
use crate::parameters::{ParameterRef, UserParameterState};
use crate::strategy::Strategy;

/// Default number of contour points.
pub const DEFAULT_CONTOUR_POINTS: usize = 20;

const CONTOUR_TOLERANCE: f64 = 0.05;

/// A contour with the MINOS errors of its two parameters.
///
/// When the search fails part way `points` holds what was found so far.
#[derive(Debug, Clone)]
pub struct ContoursError {
    px: usize,
    py: usize,
    points: Vec<(f64, f64)>,
    xmin: MinosError,
    ymin: MinosError,
    nfcn: usize,
}

impl ContoursError {
    /// External index of the first parameter.
    pub fn px(&self) -> usize {
        self.px
    }

    /// External index of the second parameter.
    pub fn py(&self) -> usize {
        self.py
    }

    /// Contour points `(x, y)` in order around the minimum.
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Consumes the result, returning the points.
    pub fn into_points(self) -> Vec<(f64, f64)> {
        self.points
    }

    /// MINOS error of the first parameter.
    pub fn xminos(&self) -> &MinosError {
        &self.xmin
    }

    /// MINOS error of the second parameter.
    pub fn yminos(&self) -> &MinosError {
        &self.ymin
    }

    /// `(lower, upper)` MINOS offsets of the first parameter.
    pub fn xrange(&self) -> (f64, f64) {
        self.xmin.range()
    }

    /// `(lower, upper)` MINOS offsets of the second parameter.
    pub fn yrange(&self) -> (f64, f64) {
        self.ymin.range()
    }

    /// Value of the first parameter at the minimum.
    pub fn xmin(&self) -> f64 {
        self.xmin.min_value()
    }

    /// Value of the second parameter at the minimum.
    pub fn ymin(&self) -> f64 {
        self.ymin.min_value()
    }

    /// Function calls spent.
    pub fn nfcn(&self) -> usize {
        self.nfcn
    }
}

/// Contour finder around a function minimum.
pub struct Contours<'a> {
    function: &'a dyn ObjectiveFunction,
    minimum: &'a FunctionMinimum,
    strategy: Strategy,
}

impl<'a> Contours<'a> {
    /// Creates the finder.
    pub fn new(function: &'a dyn ObjectiveFunction, minimum: &'a FunctionMinimum, strategy: Strategy) -> Self {
        Self {
            function,
            minimum,
            strategy,
        }
    }

    /// Contour points of two parameters; see [`Contours::contour`].
    ///
    /// # Errors
    ///
    /// See [`Contours::contour`].
    pub fn points<'n>(
        &self,
        px: impl Into<ParameterRef<'n>>,
        py: impl Into<ParameterRef<'n>>,
        errdef: f64,
        npoints: usize,
    ) -> MinuitResult<Vec<(f64, f64)>> {
        Ok(self.contour(px, py, errdef, npoints)?.into_points())
    }

    fn fixed_minimizer(&self, fixed: usize, value: f64) -> MinuitResult<Minimizer<'a>> {
        let config = MinimizerConfig::new()
            .with_strategy(self.strategy.lowered().level())
            .with_error_def(self.minimum.error_def());
        let mut migrad = Minimizer::migrad(self.function, self.minimum.user_state().clone()).with_config(config);
        migrad.fix(fixed)?;
        migrad.set_value(fixed, value)?;
        Ok(migrad)
    }

    /// Minimizes with `fixed` held at `at`; returns the value of `free`
    /// (none if the minimization failed) and the calls spent.
    fn profile(&self, fixed: usize, at: f64, free: usize) -> MinuitResult<(Option<f64>, usize)> {
        let mut migrad = self.fixed_minimizer(fixed, at)?;
        let min = migrad.minimize()?;
        if !min.is_valid() {
            warn!("contour: minimization with parameter {fixed} fixed at {at} failed");
            return Ok((None, min.nfcn()));
        }
        Ok((Some(min.user_state().value(free)?), min.nfcn()))
    }

    /// Finds `npoints` points on the contour where the function, minimized
    /// over all other free parameters, equals `fmin + errdef·error_def`.
    ///
    /// A failed search ends the contour early; the result then holds fewer
    /// points and the failure is logged.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown, fixed or identical parameters, or fewer
    /// than four points.
    pub fn contour<'n>(
        &self,
        px: impl Into<ParameterRef<'n>>,
        py: impl Into<ParameterRef<'n>>,
        errdef: f64,
        npoints: usize,
    ) -> MinuitResult<ContoursError> {
        let state = self.minimum.user_state();
        let px = state.transformation().index_of(px)?;
        let py = state.transformation().index_of(py)?;
        if px == py {
            return Err(MinuitError::invalid_state("contour needs two distinct parameters"));
        }
        if npoints < 4 {
            return Err(MinuitError::invalid_state("contour needs at least four points"));
        }

        let scaled_errdef = errdef * self.minimum.error_def();
        let nvar = state.variable_parameters();
        let max_calls = 100 * (npoints + 5) * (nvar + 1);
        let mut nfcn = 0;
        let mut points = Vec::with_capacity(npoints);

        let minos = Minos::new(self.function, self.minimum, self.strategy);
        let valx = state.value(px)?;
        let valy = state.value(py)?;

        let mex = minos.minos(px, errdef, 0)?;
        nfcn += mex.nfcn();
        if !mex.is_valid() {
            warn!("contour: no MINOS errors for parameter {px}");
            return Ok(ContoursError {
                px,
                py,
                points,
                xmin: mex.clone(),
                ymin: mex,
                nfcn,
            });
        }
        let (ex_lo, ex_hi) = mex.range();

        let mey = minos.minos(py, errdef, 0)?;
        nfcn += mey.nfcn();
        let partial = |points: Vec<(f64, f64)>, nfcn: usize| ContoursError {
            px,
            py,
            points,
            xmin: mex.clone(),
            ymin: mey.clone(),
            nfcn,
        };
        if !mey.is_valid() {
            warn!("contour: no MINOS errors for parameter {py}");
            return Ok(partial(points, nfcn));
        }
        let (ey_lo, ey_hi) = mey.range();

        // the four cardinal points: one parameter at its MINOS bound, the
        // other minimized
        let mut cardinal = [0.0; 4];
        for (slot, (fixed, at, free)) in cardinal.iter_mut().zip([
            (px, valx + ex_hi, py),
            (px, valx + ex_lo, py),
            (py, valy + ey_hi, px),
            (py, valy + ey_lo, px),
        ]) {
            let (value, calls) = self.profile(fixed, at, free)?;
            nfcn += calls;
            let Some(value) = value else {
                return Ok(partial(points, nfcn));
            };
            *slot = value;
        }
        let [y_at_xhi, y_at_xlo, x_at_yhi, x_at_ylo] = cardinal;

        let scalx = 1.0 / (ex_hi - ex_lo);
        let scaly = 1.0 / (ey_hi - ey_lo);
        points.push((valx + ex_lo, y_at_xlo));
        points.push((x_at_ylo, valy + ey_lo));
        points.push((valx + ex_hi, y_at_xhi));
        points.push((x_at_yhi, valy + ey_hi));

        let mut upar: UserParameterState = state.clone();
        upar.fix(px)?;
        upar.fix(py)?;
        let cross = FunctionCross::new(
            self.function,
            upar,
            self.minimum.fval(),
            self.strategy,
            self.minimum.error_def(),
            scaled_errdef,
        );
        let scaled_dist = |a: (f64, f64), b: (f64, f64)| {
            let dx = scalx * (a.0 - b.0);
            let dy = scaly * (a.1 - b.1);
            dx * dx + dy * dy
        };

        for i in 4..npoints {
            // widest gap, including the one closing the contour
            let last = points.len() - 1;
            let (mut p1, mut p2, mut pos2) = (points[last], points[0], 0);
            let mut bigdis = scaled_dist(p1, p2);
            for j in 0..last {
                let dist = scaled_dist(points[j], points[j + 1]);
                if dist > bigdis {
                    bigdis = dist;
                    p1 = points[j];
                    p2 = points[j + 1];
                    pos2 = j + 1;
                }
            }

            // outward normal of the gap, then inward if that fails
            let mut sca = 1.0;
            loop {
                if nfcn > max_calls {
                    warn!("contour: call limit exhausted after {i} points");
                    return Ok(partial(points, nfcn));
                }
                let xmidcr = 0.5 * (p1.0 + p2.0);
                let ymidcr = 0.5 * (p1.1 + p2.1);
                let xdir = p2.1 - p1.1;
                let ydir = p1.0 - p2.0;
                let scalfac = sca * (xdir * scalx).abs().max((ydir * scaly).abs());
                let xdircr = xdir / scalfac;
                let ydircr = ydir / scalfac;

                let opt = cross.cross(&[px, py], &[xmidcr, ymidcr], &[xdircr, ydircr], CONTOUR_TOLERANCE, max_calls);
                nfcn += opt.nfcn();
                if opt.is_valid() {
                    let point = (xmidcr + opt.value() * xdircr, ymidcr + opt.value() * ydircr);
                    debug!("contour point {}: ({:.6}, {:.6})", i + 1, point.0, point.1);
                    if pos2 == 0 {
                        points.push(point);
                    } else {
                        points.insert(pos2, point);
                    }
                    break;
                }
                if sca < 0.0 {
                    warn!("contour: unable to find point {}, returning {i} points", i + 1);
                    return Ok(partial(points, nfcn));
                }
                sca = -1.0;
            }
        }

        Ok(partial(points, nfcn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::UserParameters;
    use approx::assert_abs_diff_eq;

    fn bowl(x: &[f64]) -> f64 {
        (x[0] - 1.0).powi(2) + 4.0 * (x[1] - 2.0).powi(2)
    }

    fn minimum() -> FunctionMinimum {
        let mut params = UserParameters::new();
        params.add("x", 0.0, 0.1).unwrap();
        params.add("y", 0.0, 0.1).unwrap();
        Minimizer::migrad(&bowl, UserParameterState::new(params)).minimize().unwrap()
    }

    #[test]
    fn test_points_lie_on_the_ellipse() {
        let min = minimum();
        let contours = Contours::new(&bowl, &min, Strategy::medium());
        let result = contours.contour("x", "y", 1.0, 12).unwrap();

        assert_eq!(result.points().len(), 12);
        assert_abs_diff_eq!(result.xrange().1, 1.0, epsilon = 0.02);
        assert_abs_diff_eq!(result.yrange().1, 0.5, epsilon = 0.02);
        for &(x, y) in result.points() {
            // contour of f = fmin + 1
            assert_abs_diff_eq!(bowl(&[x, y]), 1.0, epsilon = 0.05);
        }
        assert!(result.nfcn() > 0);
    }

    #[test]
    fn test_cardinal_points_come_first() {
        let min = minimum();
        let contours = Contours::new(&bowl, &min, Strategy::medium());
        let points = contours.points(0_usize, 1_usize, 1.0, 4).unwrap();
        assert_eq!(points.len(), 4);
        assert_abs_diff_eq!(points[0].0, 0.0, epsilon = 0.02);
        assert_abs_diff_eq!(points[0].1, 2.0, epsilon = 0.02);
        assert_abs_diff_eq!(points[1].1, 1.5, epsilon = 0.02);
        assert_abs_diff_eq!(points[2].0, 2.0, epsilon = 0.02);
        assert_abs_diff_eq!(points[3].1, 2.5, epsilon = 0.02);
    }

    #[test]
    fn test_rejects_bad_arguments() {
        let min = minimum();
        let contours = Contours::new(&bowl, &min, Strategy::medium());
        assert!(contours.contour("x", "x", 1.0, 10).is_err());
        assert!(contours.contour("x", "y", 1.0, 3).is_err());
        assert!(contours.contour("x", "z", 1.0, 10).is_err());
    }
}
