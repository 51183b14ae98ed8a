//! Text reports for results.
//!
//! Tables follow a fixed-width layout so that results can be logged or
//! compared line by line.

use std::fmt;

use crate::contours::ContoursError;
use crate::minimum::FunctionMinimum;
use crate::minos::MinosError;
use crate::parameters::{GlobalCorrelationCoeff, UserCovariance, UserParameterState, UserParameters};

fn write_row(f: &mut fmt::Formatter<'_>, values: impl IntoIterator<Item = f64>) -> fmt::Result {
    for v in values {
        write!(f, "{v:>12.5e} ")?;
    }
    writeln!(f)
}

impl fmt::Display for UserParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "  ext. ||       name ||    type ||        value ||       error +/-")?;
        writeln!(f)?;

        let eps2 = self.precision().eps2();
        let mut at_lower = false;
        let mut at_upper = false;
        for p in self.parameters() {
            write!(f, " {:>5} || {:>10} || ", p.number(), p.name())?;
            if p.is_const() {
                writeln!(f, "  const || {:>12.5e} ||", p.value())?;
            } else if p.is_fixed() {
                writeln!(f, "  fixed || {:>12.5e} ||", p.value())?;
            } else if p.has_limits() {
                write!(f, "limited || {:>12.5e}", p.value())?;
                if p.lower_limit().is_some_and(|l| (p.value() - l).abs() < eps2) {
                    write!(f, "*")?;
                    at_lower = true;
                }
                if p.upper_limit().is_some_and(|u| (p.value() - u).abs() < eps2) {
                    write!(f, "**")?;
                    at_upper = true;
                }
                writeln!(f, " || {:>12.5e}", p.error())?;
            } else if p.error() > 0.0 {
                writeln!(f, "   free || {:>12.5e} || {:>12.5e}", p.value(), p.error())?;
            } else {
                writeln!(f, "   free || {:>12.5e} ||           no", p.value())?;
            }
        }
        if at_lower {
            writeln!(f, "* parameter is at lower limit")?;
        }
        if at_upper {
            writeln!(f, "** parameter is at upper limit")?;
        }
        Ok(())
    }
}

impl fmt::Display for UserCovariance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.nrow();
        writeln!(f)?;
        writeln!(f, "covariance:")?;
        for i in 0..n {
            write_row(f, (0..n).map(|j| self.get(i, j)))?;
        }
        writeln!(f)?;
        writeln!(f, "correlations:")?;
        for i in 0..n {
            for j in 0..n {
                write!(f, "{:>8.4} ", self.correlation(i, j))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Display for GlobalCorrelationCoeff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "global correlation coefficients:")?;
        if !self.is_valid() {
            return writeln!(f, "  not available");
        }
        for (i, cc) in self.coefficients().iter().enumerate() {
            writeln!(f, " {i:>5} {cc:>8.4}")?;
        }
        Ok(())
    }
}

impl fmt::Display for UserParameterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        if !self.is_valid() {
            writeln!(f, "WARNING: parameter state is not valid")?;
        }
        writeln!(f, "# of function calls: {}", self.nfcn())?;
        writeln!(f, "function value: {:.10e}", self.fval())?;
        writeln!(f, "expected distance to the minimum (edm): {:.5e}", self.edm())?;
        write!(f, "{}", self.parameters())?;
        if self.has_covariance() {
            write!(f, "{}", self.covariance())?;
        }
        if self.has_global_cc() {
            write!(f, "{}", self.global_cc())?;
        }
        Ok(())
    }
}

impl fmt::Display for FunctionMinimum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        if self.is_valid() {
            writeln!(f, "minimization converged")?;
        } else {
            writeln!(f, "WARNING: minimization did not converge")?;
            if self.has_reached_call_limit() {
                writeln!(f, "  call limit reached")?;
            }
            if self.is_above_max_edm() {
                writeln!(f, "  edm above the requested tolerance")?;
            }
        }
        writeln!(f)?;
        writeln!(f, "# of function calls: {}", self.nfcn())?;
        writeln!(f, "minimum function value: {:.10e}", self.fval())?;
        writeln!(f, "minimum edm: {:.5e}", self.edm())?;
        write!(f, "minimum internal state vector: ")?;
        write_row(f, self.parameters().vec().iter().copied())?;
        if self.has_valid_covariance() {
            write!(f, "minimum internal covariance matrix:\n{}", self.error().matrix())?;
        }
        write!(f, "{}", self.user_parameters())?;
        if self.has_covariance() {
            write!(f, "{}", self.user_covariance())?;
            write!(f, "{}", self.user_state().global_cc())?;
        }
        Ok(())
    }
}

impl fmt::Display for MinosError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let par = self.parameter();
        writeln!(f)?;
        writeln!(f, "MINOS # of function calls: {}", self.nfcn())?;
        if !self.lower_valid() {
            writeln!(f, "lower MINOS error is not valid")?;
        }
        if !self.upper_valid() {
            writeln!(f, "upper MINOS error is not valid")?;
        }
        if self.at_lower_limit() {
            writeln!(f, "lower MINOS error is the lower limit of parameter {par}")?;
        }
        if self.at_upper_limit() {
            writeln!(f, "upper MINOS error is the upper limit of parameter {par}")?;
        }
        if self.at_lower_max_fcn() {
            writeln!(f, "call limit exhausted for the lower error")?;
        }
        if self.at_upper_max_fcn() {
            writeln!(f, "call limit exhausted for the upper error")?;
        }
        if self.lower_new_min() {
            write!(f, "new minimum found in negative direction:{}", self.lower_state())?;
        }
        if self.upper_new_min() {
            write!(f, "new minimum found in positive direction:{}", self.upper_state())?;
        }
        let name = self.lower_state().name(par).unwrap_or("?");
        writeln!(f, "  ext. ||       name ||    value@min ||     negative ||     positive")?;
        writeln!(
            f,
            " {par:>5} || {name:>10} || {:>12.5e} || {:>12.5e} || {:>12.5e}",
            self.min_value(),
            self.lower(),
            self.upper()
        )
    }
}

impl fmt::Display for ContoursError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "contour # of function calls: {}", self.nfcn())?;
        write!(f, "MINOS error in x:{}", self.xminos())?;
        write!(f, "MINOS error in y:{}", self.yminos())?;
        writeln!(f, "contour points around ({:.5e}, {:.5e}):", self.xmin(), self.ymin())?;
        for (i, (x, y)) in self.points().iter().enumerate() {
            writeln!(f, " {i:>3} {x:>12.5e} {y:>12.5e}")?;
        }
        Ok(())
    }
}
