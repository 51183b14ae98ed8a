//! Machine precision as seen by the minimizer.
//!
//! The minimizer never uses `f64::EPSILON` directly. It determines the
//! smallest relative increment that survives an addition to one, then works
//! with a safety factor applied to it. Users may override the value when the
//! objective function is computed to a lower precision than `f64`.

/// Precision used by every numerical step of the minimizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MachinePrecision {
    eps: f64,
    eps2: f64,
}

impl MachinePrecision {
    /// Default precision before the machine value is computed.
    pub const DEFAULT_EPS: f64 = 4.0e-7;

    /// Determines the machine precision by repeated halving.
    #[must_use]
    pub fn new() -> Self {
        let mut precision = Self::with_eps(Self::DEFAULT_EPS);
        precision.compute_precision();
        precision
    }

    /// Creates a precision with an explicit epsilon.
    #[must_use]
    pub fn with_eps(eps: f64) -> Self {
        Self {
            eps,
            eps2: 2.0 * eps.sqrt(),
        }
    }

    /// Smallest value for which `1 + eps > 1`, times a safety factor.
    pub fn eps(&self) -> f64 {
        self.eps
    }

    /// `2·sqrt(eps)`.
    pub fn eps2(&self) -> f64 {
        self.eps2
    }

    /// Overrides the precision, e.g. for single precision objectives.
    pub fn set_precision(&mut self, prec: f64) {
        self.eps = prec;
        self.eps2 = 2.0 * prec.sqrt();
    }

    /// Computes the precision of the running machine.
    pub fn compute_precision(&mut self) {
        let mut epstry = 0.5;
        let one = 1.0_f64;
        for _ in 0..100 {
            epstry *= 0.5;
            let epsp1 = one + epstry;
            let epsbak = tiny(epsp1);
            if epsbak < epstry {
                self.set_precision(8.0 * epstry);
                break;
            }
        }
    }
}

impl Default for MachinePrecision {
    fn default() -> Self {
        Self::new()
    }
}

#[inline(never)]
fn tiny(a: f64) -> f64 {
    std::hint::black_box(a) - 1.0
}
