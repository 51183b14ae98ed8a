use crate::fcn::Fcn;
use crate::minimum::{FunctionGradient, MinimumParameters};
use crate::strategy::Strategy;

use super::{GradientCalculator, InitialGradientCalculator};

/// Two-point central-difference gradient with adaptive steps.
///
/// Each component is refined for up to `gradient_ncycles` cycles; a cycle
/// stops early when the step or the derivative no longer changes within the
/// strategy tolerances.
pub struct NumericalGradientCalculator<'f, 'a> {
    fcn: &'f Fcn<'a>,
    strategy: Strategy,
}

impl<'f, 'a> NumericalGradientCalculator<'f, 'a> {
    /// Creates the calculator.
    pub fn new(fcn: &'f Fcn<'a>, strategy: Strategy) -> Self {
        Self { fcn, strategy }
    }
}

impl GradientCalculator for NumericalGradientCalculator<'_, '_> {
    fn gradient(&self, par: &MinimumParameters) -> FunctionGradient {
        let initial = InitialGradientCalculator::new(self.fcn).gradient(par);
        self.gradient_with_previous(par, &initial)
    }

    fn gradient_with_previous(
        &self,
        par: &MinimumParameters,
        previous: &FunctionGradient,
    ) -> FunctionGradient {
        let trafo = self.fcn.trafo();
        let prec = trafo.precision();
        let mut x = par.vec().clone();
        let fcnmin = par.fval();
        let dfmin = 8.0 * prec.eps2() * (fcnmin.abs() + self.fcn.error_def());
        let vrysml = 8.0 * prec.eps() * prec.eps();
        let ncycle = self.strategy.gradient_ncycles();

        let mut grd = previous.grad().clone();
        let mut g2 = previous.g2().clone();
        let mut gstep = previous.gstep().clone();

        for i in 0..x.len() {
            let xtf = x[i];
            let epspri = prec.eps2() + (grd[i] * prec.eps2()).abs();
            let limited = trafo.parameters()[trafo.ext_of_int(i)].has_limits();
            let mut stepb4 = 0.0;

            for _ in 0..ncycle {
                let optstp = (dfmin / (g2[i].abs() + epspri)).sqrt();
                let mut step = optstp.max((0.1 * gstep[i]).abs());
                if limited && step > 0.5 {
                    step = 0.5;
                }
                let stpmax = 10.0 * gstep[i].abs();
                if step > stpmax {
                    step = stpmax;
                }
                let stpmin = vrysml.max(8.0 * (prec.eps2() * x[i]).abs());
                if step < stpmin {
                    step = stpmin;
                }
                if ((step - stepb4) / step).abs() < self.strategy.gradient_step_tolerance() {
                    break;
                }
                gstep[i] = step;
                stepb4 = step;

                x[i] = xtf + step;
                let fs1 = self.fcn.value(&x);
                x[i] = xtf - step;
                let fs2 = self.fcn.value(&x);
                x[i] = xtf;

                let grdb4 = grd[i];
                grd[i] = 0.5 * (fs1 - fs2) / step;
                g2[i] = (fs1 + fs2 - 2.0 * fcnmin) / step / step;

                if (grdb4 - grd[i]).abs() / (grd[i].abs() + dfmin / step)
                    < self.strategy.gradient_tolerance()
                {
                    break;
                }
            }
        }

        FunctionGradient::new(grd, g2, gstep)
    }
}
