//! One-dimensional root search for the profile crossing.
//!
//! Moves a set of fixed parameters along a direction, re-minimizing the
//! remaining free parameters at every trial point, until the profiled
//! function reaches `fmin + error_def`. Used by MINOS and contours.

use log::{debug, warn};
use minuit_math::{Parabola, ParabolaPoint};

use crate::application::Minimizer;
use crate::config::MinimizerConfig;
use crate::fcn::ObjectiveFunction;
use crate::minimum::FunctionMinimum;
use crate::parameters::UserParameterState;
use crate::strategy::Strategy;

const MAX_ITERATIONS: usize = 15;

// =============================================================================
// RESULT
// =============================================================================

/// Outcome of a crossing search.
///
/// `value` is the step `a` along the search direction at which the crossing
/// was found: the crossing point is `pmid + a·pdir`. Every failure leaves
/// `valid` false and raises at most one of the diagnostic flags.
#[derive(Debug, Clone)]
pub struct Cross {
    value: f64,
    state: UserParameterState,
    nfcn: usize,
    valid: bool,
    at_limit: bool,
    at_max_fcn: bool,
    new_minimum: bool,
}

impl Cross {
    fn found(value: f64, state: UserParameterState, nfcn: usize) -> Self {
        Self {
            value,
            state,
            nfcn,
            valid: true,
            at_limit: false,
            at_max_fcn: false,
            new_minimum: false,
        }
    }

    pub(crate) fn invalid(state: UserParameterState, nfcn: usize) -> Self {
        Self {
            value: 0.0,
            state,
            nfcn,
            valid: false,
            at_limit: false,
            at_max_fcn: false,
            new_minimum: false,
        }
    }

    fn limit(state: UserParameterState, nfcn: usize) -> Self {
        Self {
            at_limit: true,
            ..Self::invalid(state, nfcn)
        }
    }

    fn call_limit(state: UserParameterState, nfcn: usize) -> Self {
        Self {
            at_max_fcn: true,
            ..Self::invalid(state, nfcn)
        }
    }

    fn lower_minimum(state: UserParameterState, nfcn: usize) -> Self {
        Self {
            new_minimum: true,
            ..Self::invalid(state, nfcn)
        }
    }

    /// Step along the search direction at the crossing.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Parameter state of the last minimization.
    pub fn state(&self) -> &UserParameterState {
        &self.state
    }

    /// Function calls spent by the search.
    pub fn nfcn(&self) -> usize {
        self.nfcn
    }

    /// Returns true if the crossing was found.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Returns true if a parameter limit was reached before the crossing.
    pub fn at_limit(&self) -> bool {
        self.at_limit
    }

    /// Returns true if a minimization ran out of calls.
    pub fn at_max_fcn(&self) -> bool {
        self.at_max_fcn
    }

    /// Returns true if a lower minimum than the reference was found.
    pub fn new_minimum(&self) -> bool {
        self.new_minimum
    }
}

// =============================================================================
// SEARCH
// =============================================================================

/// Crossing search around a known minimum.
pub struct FunctionCross<'a> {
    function: &'a dyn ObjectiveFunction,
    state: UserParameterState,
    fval: f64,
    strategy: Strategy,
    up: f64,
    error_def: f64,
}

/// The fixed parameters being moved and their line.
struct Line<'l> {
    pars: &'l [usize],
    pmid: &'l [f64],
    pdir: &'l [f64],
}

struct Bracket {
    aim: f64,
    fmin: f64,
    tlf: f64,
    tlr: f64,
    max_calls: usize,
}

impl<'a> FunctionCross<'a> {
    /// Creates a search.
    ///
    /// `state` has the moved parameters fixed. `fval` is the reference
    /// minimum, `up` the error definition of the function and `error_def`
    /// the offset above `fval` to cross.
    pub fn new(
        function: &'a dyn ObjectiveFunction,
        state: UserParameterState,
        fval: f64,
        strategy: Strategy,
        up: f64,
        error_def: f64,
    ) -> Self {
        Self {
            function,
            state,
            fval,
            strategy,
            up,
            error_def,
        }
    }

    /// Searches along `pmid + a·pdir` for the crossing.
    ///
    /// `tlr` is the tolerance on `a`; the tolerance on the function value is
    /// a tenth of it. `max_calls` bounds every inner minimization.
    pub fn cross(&self, pars: &[usize], pmid: &[f64], pdir: &[f64], tlr: f64, max_calls: usize) -> Cross {
        if pars.len() != pmid.len() || pars.len() != pdir.len() {
            warn!("crossing search needs one midpoint and direction per parameter");
            return Cross::invalid(self.state.clone(), 0);
        }
        let line = Line { pars, pmid, pdir };
        let bracket = Bracket {
            aim: self.fval + self.error_def,
            fmin: self.fval,
            tlf: 0.1 * tlr,
            tlr,
            max_calls,
        };
        let mut nfcn = 0;
        match self.search(&line, &bracket, &mut nfcn) {
            Ok(cross) | Err(cross) => cross,
        }
    }

    /// Largest step allowed by the parameter limits, at most 100.
    fn step_limit(&self, line: &Line<'_>) -> Option<f64> {
        let eps = self.state.precision().eps();
        let mut aulim: f64 = 100.0;
        for ((&kex, &zmid), &zdir) in line.pars.iter().zip(line.pmid).zip(line.pdir) {
            let param = self.state.parameter(kex).ok()?;
            if zdir.abs() < eps {
                continue;
            }
            let limit = if zdir > 0.0 {
                param.upper_limit()
            } else {
                param.lower_limit()
            };
            if let Some(zlim) = limit {
                aulim = aulim.min((zlim - zmid) / zdir);
            }
        }
        Some(aulim)
    }

    fn inner_minimizer(&self) -> Minimizer<'a> {
        let config = MinimizerConfig::new()
            .with_strategy(self.strategy.lowered().level())
            .with_error_def(self.up);
        Minimizer::migrad(self.function, self.state.clone()).with_config(config)
    }

    /// Moves to `pmid + aopt·pdir` and minimizes the free parameters.
    ///
    /// `Err` carries the terminal result when the search cannot continue.
    fn run(
        &self,
        migrad: &mut Minimizer<'_>,
        line: &Line<'_>,
        bracket: &Bracket,
        aopt: f64,
        limset: bool,
        nfcn: &mut usize,
    ) -> Result<FunctionMinimum, Cross> {
        for ((&par, &mid), &dir) in line.pars.iter().zip(line.pmid).zip(line.pdir) {
            if migrad.set_value(par, mid + aopt * dir).is_err() {
                return Err(Cross::invalid(self.state.clone(), *nfcn));
            }
        }
        let Ok(min) = migrad.minimize_with(bracket.max_calls, bracket.tlr) else {
            return Err(Cross::invalid(self.state.clone(), *nfcn));
        };
        *nfcn += min.nfcn();
        debug!("crossing trial a = {aopt:.6}: fval = {:.10e}", min.fval());

        if min.has_reached_call_limit() {
            return Err(Cross::call_limit(min.user_state().clone(), *nfcn));
        }
        if !min.is_valid() {
            return Err(Cross::invalid(self.state.clone(), *nfcn));
        }
        if limset && min.fval() < bracket.aim {
            return Err(Cross::limit(min.user_state().clone(), *nfcn));
        }
        if min.fval() < bracket.fmin - bracket.tlf {
            return Err(Cross::lower_minimum(min.user_state().clone(), *nfcn));
        }
        Ok(min)
    }

    fn search(&self, line: &Line<'_>, bracket: &Bracket, nfcn: &mut usize) -> Result<Cross, Cross> {
        let prec = *self.state.precision();
        let (aim, tlf, tlr) = (bracket.aim, bracket.tlf, bracket.tlr);
        let invalid = |nfcn: usize| Cross::invalid(self.state.clone(), nfcn);

        let Some(aulim) = self.step_limit(line) else {
            return Err(invalid(*nfcn));
        };
        let mut migrad = self.inner_minimizer();
        let mut alsb = [0.0_f64; 3];
        let mut flsb = [0.0_f64; 3];

        // first point on the line itself
        let mut aopt = 0.0;
        let mut limset = aulim < aopt + tlr;
        let min0 = self.run(&mut migrad, line, bracket, aopt, limset, nfcn)?;
        alsb[0] = aopt;
        flsb[0] = min0.fval().max(bracket.fmin + 0.1 * self.error_def);

        aopt = (self.error_def / (flsb[0] - bracket.fmin)).sqrt() - 1.0;
        if (flsb[0] - aim).abs() < tlf {
            return Ok(Cross::found(aopt, min0.user_state().clone(), *nfcn));
        }

        // second point from the quadratic guess
        aopt = aopt.clamp(-0.5, 1.0);
        limset = aopt > aulim;
        if limset {
            aopt = aulim;
        }
        let mut latest = self.run(&mut migrad, line, bracket, aopt, limset, nfcn)?;
        let mut ipt = 1;
        alsb[1] = aopt;
        flsb[1] = latest.fval();
        let mut dfda = (flsb[1] - flsb[0]) / (alsb[1] - alsb[0]);

        let mut ibest = 'ascend: loop {
            // walk forward until the function rises
            if dfda < 0.0 {
                let steps = MAX_ITERATIONS.saturating_sub(ipt);
                for it in 0..steps {
                    alsb[0] = alsb[1];
                    flsb[0] = flsb[1];
                    aopt = alsb[0] + 0.2 * (it + 1) as f64;
                    limset = aopt > aulim;
                    if limset {
                        aopt = aulim;
                    }
                    latest = self.run(&mut migrad, line, bracket, aopt, limset, nfcn)?;
                    ipt += 1;
                    alsb[1] = aopt;
                    flsb[1] = latest.fval();
                    dfda = (flsb[1] - flsb[0]) / (alsb[1] - alsb[0]);
                    if dfda > 0.0 {
                        break;
                    }
                }
                if ipt > MAX_ITERATIONS {
                    return Err(invalid(*nfcn));
                }
            }

            // secant steps through the two latest points
            loop {
                if dfda == 0.0 || !dfda.is_finite() {
                    return Err(invalid(*nfcn));
                }
                aopt = alsb[1] + (aim - flsb[1]) / dfda;
                let fdist = (aim - flsb[0]).abs().min((aim - flsb[1]).abs());
                let adist = (aopt - alsb[0]).abs().min((aopt - alsb[1]).abs());
                let tla = if aopt.abs() > 1.0 { tlr * aopt.abs() } else { tlr };
                if adist < tla && fdist < tlf {
                    return Ok(Cross::found(aopt, latest.user_state().clone(), *nfcn));
                }
                if ipt > MAX_ITERATIONS {
                    return Err(invalid(*nfcn));
                }
                let bmin = alsb[0].min(alsb[1]) - 1.0;
                let bmax = alsb[0].max(alsb[1]) + 1.0;
                aopt = aopt.clamp(bmin, bmax);
                limset = aopt > aulim;
                if limset {
                    aopt = aulim;
                }

                latest = self.run(&mut migrad, line, bracket, aopt, limset, nfcn)?;
                ipt += 1;
                alsb[2] = aopt;
                flsb[2] = latest.fval();

                let mut ecarmn = (flsb[2] - aim).abs();
                let mut ecarmx = 0.0;
                let mut ibest = 2;
                let mut iworst = 0;
                let mut noless = 0;
                for i in 0..3 {
                    let ecart = (flsb[i] - aim).abs();
                    if ecart > ecarmx {
                        ecarmx = ecart;
                        iworst = i;
                    }
                    if ecart < ecarmn {
                        ecarmn = ecart;
                        ibest = i;
                    }
                    if flsb[i] < aim {
                        noless += 1;
                    }
                }

                match noless {
                    1 | 2 => break 'ascend ibest,
                    0 if ibest != 2 => return Err(invalid(*nfcn)),
                    3 if ibest != 2 => {
                        alsb[1] = alsb[2];
                        flsb[1] = flsb[2];
                        continue 'ascend;
                    }
                    _ => {
                        alsb[iworst] = alsb[2];
                        flsb[iworst] = flsb[2];
                        dfda = (flsb[1] - flsb[0]) / (alsb[1] - alsb[0]);
                    }
                }
            }
        };

        // the crossing is bracketed: refine with parabolas
        while ipt < MAX_ITERATIONS {
            let parabola = Parabola::through_points(
                ParabolaPoint::new(alsb[0], flsb[0]),
                ParabolaPoint::new(alsb[1], flsb[1]),
                ParabolaPoint::new(alsb[2], flsb[2]),
            );
            let (c, b, a) = (parabola.c(), parabola.b(), parabola.a());
            let determ = b * b - 4.0 * a * (c - aim);
            if determ < prec.eps() || a.abs() < prec.eps() {
                return Err(invalid(*nfcn));
            }
            let rt = determ.sqrt();
            let x1 = (-b + rt) / (2.0 * a);
            let x2 = (-b - rt) / (2.0 * a);
            let s1 = b + 2.0 * x1 * a;
            let s2 = b + 2.0 * x2 * a;
            if s1 * s2 > 0.0 {
                warn!("crossing parabola has equal slopes at both roots");
            }
            let (mut aopt, slope) = if s2 > 0.0 { (x2, s2) } else { (x1, s1) };

            let tla = if aopt.abs() > 1.0 { tlr * aopt.abs() } else { tlr };
            if (aopt - alsb[ibest]).abs() < tla && (flsb[ibest] - aim).abs() < tlf {
                return Ok(Cross::found(aopt, latest.user_state().clone(), *nfcn));
            }

            // points left and right of the crossing, and the one to replace
            let mut ileft = None;
            let mut iright = None;
            let mut iout = None;
            let mut ecarmx = 0.0_f64;
            for i in 0..3 {
                ecarmx = ecarmx.max((flsb[i] - aim).abs());
                if flsb[i] > aim {
                    match iright {
                        None => iright = Some(i),
                        Some(r) if flsb[i] > flsb[r] => iout = Some(i),
                        Some(r) => {
                            iout = Some(r);
                            iright = Some(i);
                        }
                    }
                } else {
                    match ileft {
                        None => ileft = Some(i),
                        Some(l) if flsb[i] < flsb[l] => iout = Some(i),
                        Some(l) => {
                            iout = Some(l);
                            ileft = Some(i);
                        }
                    }
                }
            }
            let (Some(ileft), Some(iright), Some(iout)) = (ileft, iright, iout) else {
                return Err(invalid(*nfcn));
            };

            if ecarmx > 10.0 * (flsb[iout] - aim).abs() {
                aopt = 0.5 * (aopt + 0.5 * (alsb[iright] + alsb[ileft]));
            }
            let mut smalla = 0.1 * tla;
            if slope * smalla > tlf {
                smalla = tlf / slope;
            }
            let aleft = alsb[ileft] + smalla;
            let aright = alsb[iright] - smalla;
            aopt = if aleft > aright {
                0.5 * (aleft + aright)
            } else {
                aopt.clamp(aleft, aright)
            };
            limset = aopt > aulim;
            if limset {
                aopt = aulim;
            }

            latest = self.run(&mut migrad, line, bracket, aopt, limset, nfcn)?;
            ipt += 1;
            alsb[iout] = aopt;
            flsb[iout] = latest.fval();
            ibest = iout;
        }

        Err(invalid(*nfcn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::UserParameters;
    use approx::assert_abs_diff_eq;

    fn profiled(x: &[f64]) -> f64 {
        // minimum over y is x², reached at y = x
        x[0] * x[0] + (x[1] - x[0]).powi(2)
    }

    fn fixed_x(value: f64) -> UserParameterState {
        let mut params = UserParameters::new();
        params.add("x", value, 0.1).unwrap();
        params.add("y", 0.0, 0.1).unwrap();
        let mut state = UserParameterState::new(params);
        state.fix("x").unwrap();
        state
    }

    #[test]
    fn test_crossing_of_profiled_parabola() {
        let cross = FunctionCross::new(&profiled, fixed_x(0.5), 0.0, Strategy::medium(), 1.0, 1.0);
        let result = cross.cross(&[0], &[0.5], &[0.5], 0.1, 1000);

        assert!(result.is_valid());
        assert!(!result.at_limit() && !result.new_minimum() && !result.at_max_fcn());
        // x = 0.5 + a·0.5 crosses f = 1 at x = 1
        assert_abs_diff_eq!(result.value(), 1.0, epsilon = 0.02);
        assert!(result.nfcn() > 0);
    }

    #[test]
    fn test_larger_offset() {
        let cross = FunctionCross::new(&profiled, fixed_x(1.0), 0.0, Strategy::medium(), 1.0, 4.0);
        let result = cross.cross(&[0], &[1.0], &[1.0], 0.1, 1000);
        assert!(result.is_valid());
        // x = 2 gives f = 4
        assert_abs_diff_eq!(result.value(), 1.0, epsilon = 0.05);
    }

    #[test]
    fn test_limit_stops_search() {
        let f = |x: &[f64]| x[0] * x[0] + x[1] * x[1];
        let mut params = UserParameters::new();
        params.add_limited("x", 0.3, 0.1, -2.0, 0.5).unwrap();
        params.add("y", 0.0, 0.1).unwrap();
        let mut state = UserParameterState::new(params);
        state.fix("x").unwrap();

        let cross = FunctionCross::new(&f, state, 0.0, Strategy::medium(), 1.0, 1.0);
        let result = cross.cross(&[0], &[0.3], &[0.3], 0.1, 1000);
        assert!(!result.is_valid());
        assert!(result.at_limit());
    }

    #[test]
    fn test_lower_minimum_is_reported() {
        let f = |x: &[f64]| x[0] * x[0] + x[1] * x[1];
        let cross = FunctionCross::new(&f, fixed_x(0.0), 5.0, Strategy::medium(), 1.0, 1.0);
        let result = cross.cross(&[0], &[0.0], &[1.0], 0.1, 1000);
        assert!(!result.is_valid());
        assert!(result.new_minimum());
    }

    #[test]
    fn test_call_limit_is_reported() {
        let cross = FunctionCross::new(&profiled, fixed_x(0.5), 0.0, Strategy::medium(), 1.0, 1.0);
        let result = cross.cross(&[0], &[0.5], &[0.5], 0.1, 1);
        assert!(!result.is_valid());
        assert!(result.at_max_fcn());
    }

    #[test]
    fn test_mismatched_line_is_invalid() {
        let cross = FunctionCross::new(&profiled, fixed_x(0.5), 0.0, Strategy::medium(), 1.0, 1.0);
        let result = cross.cross(&[0], &[0.5, 1.0], &[0.5], 0.1, 1000);
        assert!(!result.is_valid());
        assert_eq!(result.nfcn(), 0);
    }
}
