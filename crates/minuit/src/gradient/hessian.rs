use minuit_math::DVector;

use crate::fcn::Fcn;
use crate::minimum::{FunctionGradient, MinimumParameters};
use crate::strategy::Strategy;

use super::{GradientCalculator, InitialGradientCalculator};

/// Gradient refinement with a shrinking central-difference step.
///
/// Keeps the curvature and steps of the previous gradient and re-estimates
/// only the first derivatives. Also reports the uncertainty of each
/// component, which the analytical gradient check compares against.
pub struct HessianGradientCalculator<'f, 'a> {
    fcn: &'f Fcn<'a>,
    strategy: Strategy,
}

impl<'f, 'a> HessianGradientCalculator<'f, 'a> {
    /// Creates the calculator.
    pub fn new(fcn: &'f Fcn<'a>, strategy: Strategy) -> Self {
        Self { fcn, strategy }
    }

    /// Refined gradient and the per-component derivative uncertainty.
    pub fn delta_gradient(
        &self,
        par: &MinimumParameters,
        previous: &FunctionGradient,
    ) -> (FunctionGradient, DVector<f64>) {
        let prec = self.fcn.precision();
        let mut x = par.vec().clone();
        let mut grd = previous.grad().clone();
        let g2 = previous.g2();
        let gstep = previous.gstep();
        let fcnmin = par.fval();
        let dfmin = 4.0 * prec.eps2() * (fcnmin.abs() + self.fcn.error_def());
        let ncycle = self.strategy.hessian_gradient_ncycles();

        let n = x.len();
        let mut dgrd = DVector::zeros(n);

        for i in 0..n {
            let xtf = x[i];
            let dmin = 4.0 * prec.eps2() * (xtf + prec.eps2());
            let epspri = prec.eps2() + (grd[i] * prec.eps2()).abs();
            let optstp = (dfmin / (g2[i].abs() + epspri)).sqrt();
            let mut d = (0.2 * gstep[i].abs()).min(optstp);
            if d < dmin {
                d = dmin;
            }

            let mut chgold = 10000.0;
            let mut dgmin = 0.0;
            let mut grdold = 0.0;
            let mut grdnew = 0.0;

            for j in 0..ncycle {
                x[i] = xtf + d;
                let fs1 = self.fcn.value(&x);
                x[i] = xtf - d;
                let fs2 = self.fcn.value(&x);
                x[i] = xtf;

                grdold = grd[i];
                grdnew = (fs1 - fs2) / (2.0 * d);
                dgmin = prec.eps() * (fs1.abs() + fs2.abs()) / d;
                if grdnew.abs() < prec.eps() {
                    break;
                }
                let change = ((grdold - grdnew) / grdnew).abs();
                if change > chgold && j > 1 {
                    break;
                }
                chgold = change;
                grd[i] = grdnew;
                if change < 0.05 {
                    break;
                }
                if (grdold - grdnew).abs() < dgmin {
                    break;
                }
                if d < dmin {
                    break;
                }
                d *= 0.2;
            }

            dgrd[i] = dgmin.max((grdold - grdnew).abs());
        }

        (FunctionGradient::new(grd, g2.clone(), gstep.clone()), dgrd)
    }
}

impl GradientCalculator for HessianGradientCalculator<'_, '_> {
    fn gradient(&self, par: &MinimumParameters) -> FunctionGradient {
        let initial = InitialGradientCalculator::new(self.fcn).gradient(par);
        self.gradient_with_previous(par, &initial)
    }

    fn gradient_with_previous(
        &self,
        par: &MinimumParameters,
        previous: &FunctionGradient,
    ) -> FunctionGradient {
        self.delta_gradient(par, previous).0
    }
}
