//! One-dimensional parabolic line search.

use minuit_math::{DVector, MachinePrecision, Parabola, ParabolaPoint};

use crate::fcn::Fcn;
use crate::minimum::MinimumParameters;

const OVERAL: f64 = 1000.0;
const UNDRAL: f64 = -100.0;
const TOLER: f64 = 0.05;
const SLAMBG: f64 = 5.0;
const ALPHA: f64 = 2.0;
const MAX_ITER: usize = 12;

/// Searches for the minimum along `step` starting at `start`.
///
/// `gdel` is the directional derivative `g·step` at the start. The result is
/// the best step multiple found (`x`) with its function value (`y`); `x = 0`
/// means no improvement.
pub fn line_search(
    fcn: &Fcn<'_>,
    start: &MinimumParameters,
    step: &DVector<f64>,
    gdel: f64,
    prec: &MachinePrecision,
) -> ParabolaPoint {
    let mut overal = OVERAL;
    let mut undral = UNDRAL;
    let eval = |slam: f64| fcn.value(&(start.vec() + step * slam));

    let mut slamin = 0.0_f64;
    for (x, s) in start.vec().iter().zip(step.iter()) {
        if *s == 0.0 {
            continue;
        }
        let ratio = (x / s).abs();
        if slamin == 0.0 || ratio < slamin {
            slamin = ratio;
        }
    }
    if slamin.abs() < prec.eps() {
        slamin = prec.eps();
    }
    slamin *= prec.eps2();

    let f0 = start.fval();
    let f1 = eval(1.0);
    let mut niter = 1;
    let mut fvmin = f0;
    let mut xvmin = 0.0;
    if f1 < f0 {
        fvmin = f1;
        xvmin = 1.0;
    }

    let mut toler8 = TOLER;
    let mut slamax = SLAMBG;
    let mut flast = f1;
    let mut slam = 1.0;

    let mut p0 = ParabolaPoint::new(0.0, f0);
    let mut p1 = ParabolaPoint::new(slam, flast);
    let mut f2;

    // two points and the slope at the start
    loop {
        let denom = 2.0 * (flast - f0 - gdel * slam) / (slam * slam);
        slam = if denom != 0.0 { -gdel / denom } else { 1.0 };
        if slam < 0.0 || slam > slamax {
            slam = slamax;
        }
        if slam < toler8 {
            slam = toler8;
        }
        if slam < slamin {
            return ParabolaPoint::new(xvmin, fvmin);
        }
        if (slam - 1.0).abs() < toler8 && p1.y < p0.y {
            return ParabolaPoint::new(xvmin, fvmin);
        }
        if (slam - 1.0).abs() < toler8 {
            slam = 1.0 + toler8;
        }

        f2 = eval(slam);
        niter += 1;
        if f2 < fvmin {
            fvmin = f2;
            xvmin = slam;
        }

        let flat = p0.y - prec.eps() < fvmin && fvmin < p0.y + prec.eps();
        if !flat {
            break;
        }
        flast = f2;
        toler8 = TOLER * slam;
        overal = slam - toler8;
        slamax = overal;
        p1 = ParabolaPoint::new(slam, flast);
        niter += 1;
        if niter >= MAX_ITER {
            return ParabolaPoint::new(xvmin, fvmin);
        }
    }

    let mut p2 = ParabolaPoint::new(slam, f2);

    // three-point parabolic interpolation
    loop {
        slamax = slamax.max(ALPHA * xvmin.abs());
        let pb = Parabola::through_points(p0, p1, p2);
        if pb.a() < prec.eps2() {
            let slopem = 2.0 * pb.a() * xvmin + pb.b();
            slam = if slopem < 0.0 {
                xvmin + slamax
            } else {
                xvmin - slamax
            };
        } else {
            slam = pb.x_min().clamp(xvmin - slamax, xvmin + slamax);
        }
        if slam > 0.0 {
            slam = slam.min(overal);
        } else {
            slam = slam.max(undral);
        }

        let mut f3;
        loop {
            let toler9 = toler8.max((toler8 * slam).abs());
            if (p0.x - slam).abs() < toler9
                || (p1.x - slam).abs() < toler9
                || (p2.x - slam).abs() < toler9
            {
                return ParabolaPoint::new(xvmin, fvmin);
            }

            f3 = eval(slam);
            niter += 1;

            if f3 > p0.y && f3 > p1.y && f3 > p2.y {
                if slam > xvmin {
                    overal = overal.min(slam - toler8);
                }
                if slam < xvmin {
                    undral = undral.max(slam + toler8);
                }
                slam = 0.5 * (slam + xvmin);
                niter += 1;
                if niter >= MAX_ITER {
                    return ParabolaPoint::new(xvmin, fvmin);
                }
                continue;
            }
            break;
        }

        let p3 = ParabolaPoint::new(slam, f3);
        if p0.y > p1.y && p0.y > p2.y {
            p0 = p3;
        } else if p1.y > p0.y && p1.y > p2.y {
            p1 = p3;
        } else {
            p2 = p3;
        }
        if f3 < fvmin {
            fvmin = f3;
            xvmin = slam;
        } else {
            if slam > xvmin {
                overal = overal.min(slam - toler8);
            }
            if slam < xvmin {
                undral = undral.max(slam + toler8);
            }
        }

        niter += 1;
        if niter >= MAX_ITER {
            return ParabolaPoint::new(xvmin, fvmin);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::Transformation;
    use approx::assert_abs_diff_eq;

    fn search(f: &dyn Fn(&[f64]) -> f64, x0: f64, step: f64) -> (ParabolaPoint, usize) {
        let trafo = Transformation::from_values(&[x0], &[0.1]).unwrap();
        let fcn = Fcn::new(&f, 1.0, trafo);
        let x = DVector::from_vec(vec![x0]);
        let par = MinimumParameters::new(x.clone(), fcn.value(&x));
        let step = DVector::from_vec(vec![step]);
        // derivative of f along step at x0, by central difference
        let h = 1e-6;
        let gdel = (f(&[x0 + h]) - f(&[x0 - h])) / (2.0 * h) * step[0];
        let pp = line_search(&fcn, &par, &step, gdel, &MachinePrecision::new());
        (pp, fcn.num_calls())
    }

    #[test]
    fn test_exact_step_on_quadratic() {
        let f = |x: &[f64]| (x[0] - 3.0).powi(2);
        let (pp, calls) = search(&f, 0.0, 3.0);
        assert_abs_diff_eq!(pp.x, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(pp.y, 0.0, epsilon = 1e-10);
        assert!(calls <= 1 + MAX_ITER);
    }

    #[test]
    fn test_short_step_is_extended() {
        let f = |x: &[f64]| (x[0] - 3.0).powi(2);
        let (pp, _) = search(&f, 0.0, 1.0);
        assert_abs_diff_eq!(pp.x, 3.0, epsilon = 1e-3);
        assert!(pp.y < 1e-5);
    }

    #[test]
    fn test_overshoot_is_cut_back() {
        let f = |x: &[f64]| (x[0] - 1.0).powi(2);
        let (pp, _) = search(&f, 0.0, 10.0);
        assert_abs_diff_eq!(pp.x, 0.1, epsilon = 1e-3);
        assert!(pp.y < 1e-4);
    }

    #[test]
    fn test_non_quadratic_improves() {
        let f = |x: &[f64]| (x[0] - 2.0).powi(4) + 0.1 * x[0];
        let (pp, _) = search(&f, 0.0, 1.0);
        assert!(pp.x > 0.0);
        assert!(pp.y < f(&[0.0]));
    }
}
