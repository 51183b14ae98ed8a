//! Nelder-Mead simplex minimization.

use log::{debug, warn};
use minuit_math::DVector;

use super::MinimumBuilder;
use crate::fcn::Fcn;
use crate::gradient::GradientCalculator;
use crate::minimum::{FunctionMinimum, MinimumParameters, MinimumSeed, MinimumState};
use crate::strategy::Strategy;

const ALPHA: f64 = 1.0;
const BETA: f64 = 0.5;
const GAMMA: f64 = 2.0;
const RHO_MIN: f64 = 4.0;
const RHO_MAX: f64 = 8.0;

/// The `n + 1` vertices of a simplex with their function values.
///
/// Tracks the best (`jl`) and worst (`jh`) vertex.
#[derive(Debug, Clone)]
struct SimplexParameters {
    vertices: Vec<(f64, DVector<f64>)>,
    jh: usize,
    jl: usize,
}

impl SimplexParameters {
    fn new(vertices: Vec<(f64, DVector<f64>)>, jh: usize, jl: usize) -> Self {
        Self { vertices, jh, jl }
    }

    /// Replaces the worst vertex.
    fn update(&mut self, y: f64, p: DVector<f64>) {
        self.vertices[self.jh] = (y, p);
        if y < self.vertices[self.jl].0 {
            self.jl = self.jh;
        }
        let mut jh = 0;
        for i in 1..self.vertices.len() {
            if self.vertices[i].0 > self.vertices[jh].0 {
                jh = i;
            }
        }
        self.jh = jh;
    }

    fn value(&self, i: usize) -> f64 {
        self.vertices[i].0
    }

    fn point(&self, i: usize) -> &DVector<f64> {
        &self.vertices[i].1
    }

    /// Spread of the vertices along each coordinate.
    fn dirin(&self) -> DVector<f64> {
        let n = self.vertices.len() - 1;
        DVector::from_fn(n, |i, _| {
            let mut pbig = self.vertices[0].1[i];
            let mut plit = pbig;
            for (_, p) in &self.vertices {
                plit = plit.min(p[i]);
                pbig = pbig.max(p[i]);
            }
            pbig - plit
        })
    }

    /// Difference between the worst and best function value.
    fn edm(&self) -> f64 {
        self.value(self.jh) - self.value(self.jl)
    }

    /// Centroid of every vertex except the worst.
    fn centroid(&self) -> DVector<f64> {
        let n = self.vertices.len() - 1;
        let wg = 1.0 / n as f64;
        let mut pbar = DVector::zeros(n);
        for (i, (_, p)) in self.vertices.iter().enumerate() {
            if i != self.jh {
                pbar += p * wg;
            }
        }
        pbar
    }
}

/// Nelder-Mead simplex minimizer.
///
/// Uses reflection, expansion and contraction with an extrapolation factor
/// fitted by a parabola through the reflected and expanded points. The
/// convergence measure is the spread of function values over the simplex;
/// no gradient or error matrix is computed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplexBuilder;

impl SimplexBuilder {
    /// Creates the builder.
    pub fn new() -> Self {
        Self
    }
}

impl MinimumBuilder for SimplexBuilder {
    #[allow(clippy::too_many_lines)]
    fn minimum(
        &self,
        fcn: &Fcn<'_>,
        _gc: &dyn GradientCalculator,
        seed: MinimumSeed,
        _strategy: &Strategy,
        max_fcn: usize,
        minedm: f64,
    ) -> FunctionMinimum {
        let up = fcn.error_def();
        let n = seed.parameters().vec().len();
        if n == 0 {
            return FunctionMinimum::from_seed(seed, up);
        }

        let prec = *seed.precision();
        let mut x = seed.parameters().vec().clone();
        let mut step = seed.gradient().gstep() * 10.0;

        let rho1 = 1.0 + ALPHA;
        let rho2 = 1.0 + ALPHA * GAMMA;

        let mut vertices = Vec::with_capacity(n + 1);
        vertices.push((seed.fval(), x.clone()));
        let mut jl = 0;
        let mut jh = 0;
        let mut amin = seed.fval();
        let mut aming = seed.fval();

        for i in 0..n {
            let dmin = 8.0 * prec.eps2() * (x[i].abs() + prec.eps2());
            if step[i] < dmin {
                step[i] = dmin;
            }
            x[i] += step[i];
            let tmp = fcn.value(&x);
            if tmp < amin {
                amin = tmp;
                jl = i + 1;
            }
            if tmp > aming {
                aming = tmp;
                jh = i + 1;
            }
            vertices.push((tmp, x.clone()));
            x[i] -= step[i];
        }

        let mut simplex = SimplexParameters::new(vertices, jh, jl);

        'search: loop {
            'step: {
                jl = simplex.jl;
                jh = simplex.jh;
                amin = simplex.value(jl);

                let pbar = simplex.centroid();
                let pstar = &pbar * (1.0 + ALPHA) - simplex.point(jh) * ALPHA;
                let ystar = fcn.value(&pstar);

                if ystar > amin {
                    if ystar < simplex.value(jh) {
                        simplex.update(ystar, pstar);
                        if jh != simplex.jh {
                            break 'step;
                        }
                    }
                    let pstst = simplex.point(jh) * BETA + &pbar * (1.0 - BETA);
                    let ystst = fcn.value(&pstst);
                    if ystst > simplex.value(jh) {
                        break 'search;
                    }
                    simplex.update(ystst, pstst);
                    break 'step;
                }

                let pstst = &pstar * GAMMA + &pbar * (1.0 - GAMMA);
                let ystst = fcn.value(&pstst);

                let y1 = (ystar - simplex.value(jh)) * rho2;
                let y2 = (ystst - simplex.value(jh)) * rho1;
                let mut rho = 0.5 * (rho2 * y1 - rho1 * y2) / (y1 - y2);
                if rho < RHO_MIN {
                    if ystst < simplex.value(jl) {
                        simplex.update(ystst, pstst);
                    } else {
                        simplex.update(ystar, pstar);
                    }
                    break 'step;
                }
                if rho > RHO_MAX {
                    rho = RHO_MAX;
                }

                let prho = &pbar * rho + simplex.point(jh) * (1.0 - rho);
                let yrho = fcn.value(&prho);
                if yrho < simplex.value(jl) && yrho < ystst {
                    simplex.update(yrho, prho);
                    break 'step;
                }
                if ystst < simplex.value(jl) {
                    simplex.update(ystst, pstst);
                    break 'step;
                }
                if yrho > simplex.value(jl) {
                    if ystst < simplex.value(jl) {
                        simplex.update(ystst, pstst);
                    } else {
                        simplex.update(ystar, pstar);
                    }
                    break 'step;
                }
                if ystar > simplex.value(jh) {
                    let pstst = simplex.point(jh) * BETA + &pbar * (1.0 - BETA);
                    let ystst = fcn.value(&pstst);
                    if ystst > simplex.value(jh) {
                        break 'search;
                    }
                    simplex.update(ystst, pstst);
                }
            }

            debug!(
                "simplex: best = {:.10e}, spread = {:e}, nfcn = {}",
                simplex.value(simplex.jl),
                simplex.edm(),
                fcn.num_calls()
            );
            if !(simplex.edm() > minedm && fcn.num_calls() < max_fcn) {
                break;
            }
        }

        jl = simplex.jl;
        amin = simplex.value(jl);

        let mut pbar = simplex.centroid();
        let mut ybar = fcn.value(&pbar);
        if ybar < amin {
            simplex.update(ybar, pbar.clone());
        } else {
            pbar = simplex.point(jl).clone();
            ybar = amin;
        }

        let edm = simplex.edm();
        let mut dirin = simplex.dirin();
        if edm > 0.0 {
            // werr² = dirin² · up / edm
            dirin *= (up / edm).sqrt();
        }

        let st = MinimumState::without_error(
            MinimumParameters::with_step(pbar, dirin, ybar),
            edm,
            fcn.num_calls(),
        );

        if fcn.num_calls() > max_fcn {
            warn!("simplex did not converge, call limit of {max_fcn} exhausted");
            return FunctionMinimum::with_call_limit(seed, vec![st], up);
        }
        if edm > minedm {
            warn!("simplex did not converge, edm = {edm:e} > {minedm:e}");
            return FunctionMinimum::with_above_max_edm(seed, vec![st], up);
        }
        FunctionMinimum::new(seed, vec![st], up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gradient::NumericalGradientCalculator;
    use crate::parameters::UserParameterState;
    use crate::seed::{SeedGenerator, SimplexSeedGenerator};
    use approx::assert_abs_diff_eq;

    fn vertices(points: &[(f64, [f64; 2])]) -> SimplexParameters {
        let v = points
            .iter()
            .map(|(y, p)| (*y, DVector::from_vec(p.to_vec())))
            .collect();
        SimplexParameters::new(v, 0, 0)
    }

    #[test]
    fn test_update_tracks_extremes() {
        let mut s = vertices(&[(3.0, [0.0, 0.0]), (1.0, [1.0, 0.0]), (2.0, [0.0, 1.0])]);
        s.jh = 0;
        s.jl = 1;
        s.update(0.5, DVector::from_vec(vec![1.0, 1.0]));
        assert_eq!(s.jl, 0);
        assert_eq!(s.jh, 2);
        assert_abs_diff_eq!(s.edm(), 1.5);
        let d = s.dirin();
        assert_abs_diff_eq!(d[0], 1.0);
        assert_abs_diff_eq!(d[1], 1.0);
    }

    #[test]
    fn test_centroid_skips_worst() {
        let mut s = vertices(&[(3.0, [0.0, 0.0]), (1.0, [2.0, 0.0]), (2.0, [0.0, 2.0])]);
        s.jh = 0;
        let c = s.centroid();
        assert_abs_diff_eq!(c[0], 1.0);
        assert_abs_diff_eq!(c[1], 1.0);
    }

    fn run(f: &dyn Fn(&[f64]) -> f64, x0: &[f64], max_fcn: usize) -> FunctionMinimum {
        let state = UserParameterState::from_values(x0, &vec![0.5; x0.len()]).unwrap();
        let strategy = Strategy::medium();
        let fcn = Fcn::new(&f, 1.0, state.transformation().clone());
        let gc = NumericalGradientCalculator::new(&fcn, strategy);
        let seed = SimplexSeedGenerator.generate(&fcn, &gc, &state, &strategy);
        SimplexBuilder::new().minimum(&fcn, &gc, seed, &strategy, max_fcn, 1e-3)
    }

    #[test]
    fn test_quadratic_converges() {
        let f = |x: &[f64]| (x[0] - 1.0).powi(2) + (x[1] - 2.0).powi(2);
        let min = run(&f, &[0.0, 0.0], 1000);
        assert!(min.is_valid());
        assert!(!min.has_covariance());
        assert!(min.fval() < 1e-2);
        let st = min.user_state();
        assert_abs_diff_eq!(st.value(0_usize).unwrap(), 1.0, epsilon = 0.1);
        assert_abs_diff_eq!(st.value(1_usize).unwrap(), 2.0, epsilon = 0.1);
    }

    #[test]
    fn test_call_limit_is_flagged() {
        let f = |x: &[f64]| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2);
        // seed and initial vertices use 3 of the 4 calls
        let min = run(&f, &[-1.2, 1.0], 4);
        assert!(min.has_reached_call_limit());
        assert!(!min.is_valid());
    }
}
