use minuit_math::DVector;

use crate::fcn::Fcn;
use crate::minimum::{FunctionGradient, MinimumParameters};

/// Bootstrap gradient derived from the parameter errors.
///
/// Assumes a parabola whose width over one error is `errorDef`, which
/// gives a curvature guess and a step size for the iterative calculators.
/// No function calls are made.
pub struct InitialGradientCalculator<'f, 'a> {
    fcn: &'f Fcn<'a>,
}

impl<'f, 'a> InitialGradientCalculator<'f, 'a> {
    /// Creates the calculator.
    pub fn new(fcn: &'f Fcn<'a>) -> Self {
        Self { fcn }
    }

    /// Gradient estimate at `par`.
    pub fn gradient(&self, par: &MinimumParameters) -> FunctionGradient {
        let trafo = self.fcn.trafo();
        let prec = trafo.precision();
        let n = trafo.variable_parameters();
        debug_assert_eq!(n, par.vec().len());

        let mut grd = DVector::zeros(n);
        let mut g2 = DVector::zeros(n);
        let mut gstep = DVector::zeros(n);

        for i in 0..n {
            let ext = trafo.ext_of_int(i);
            let p = &trafo.parameters()[ext];
            let var = par.vec()[i];
            let werr = p.error();
            let sav = trafo.int2ext(i, var);

            let mut sav2 = sav + werr;
            if let Some(upper) = p.upper_limit() {
                sav2 = sav2.min(upper);
            }
            let vplu = trafo.ext2int(ext, sav2) - var;

            sav2 = sav - werr;
            if let Some(lower) = p.lower_limit() {
                sav2 = sav2.max(lower);
            }
            let vmin = trafo.ext2int(ext, sav2) - var;

            let dirin = 0.5 * (vplu.abs() + vmin.abs());
            let curvature = 2.0 * self.fcn.error_def() / (dirin * dirin);
            let gsmin = 8.0 * prec.eps2() * (var.abs() + prec.eps2());
            let mut step = gsmin.max(0.1 * dirin);
            if p.has_limits() && step > 0.5 {
                step = 0.5;
            }

            grd[i] = curvature * dirin;
            g2[i] = curvature;
            gstep[i] = step;
        }

        FunctionGradient::new(grd, g2, gstep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::Transformation;
    use approx::assert_relative_eq;

    #[test]
    fn test_free_parameter_guess() {
        let trafo = Transformation::from_values(&[1.0], &[0.5]).unwrap();
        let f = |x: &[f64]| x[0] * x[0];
        let fcn = Fcn::new(&f, 1.0, trafo);
        let par = MinimumParameters::new(DVector::from_vec(vec![1.0]), 1.0);
        let g = InitialGradientCalculator::new(&fcn).gradient(&par);
        // dirin = 0.5, g2 = 2 / 0.25
        assert_relative_eq!(g.g2()[0], 8.0, epsilon = 1e-12);
        assert_relative_eq!(g.grad()[0], 4.0, epsilon = 1e-12);
        assert_relative_eq!(g.gstep()[0], 0.05, epsilon = 1e-12);
        assert_eq!(fcn.num_calls(), 0);
    }

    #[test]
    fn test_limited_step_is_clamped() {
        let mut trafo = Transformation::new();
        trafo.add_limited("x", 0.0, 100.0, -1.0, 1.0).unwrap();
        let f = |x: &[f64]| x[0] * x[0];
        let internal = trafo.internal_values();
        let fcn = Fcn::new(&f, 1.0, trafo);
        let par = MinimumParameters::new(internal, 0.0);
        let g = InitialGradientCalculator::new(&fcn).gradient(&par);
        assert!(g.gstep()[0] <= 0.5);
        assert!(g.g2()[0] > 0.0);
    }
}
