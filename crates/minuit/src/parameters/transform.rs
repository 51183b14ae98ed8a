//! Bounded ↔ unbounded variable transforms.
//!
//! A parameter with two limits is mapped with `x = lo + (up - lo)(sin v + 1)/2`,
//! a parameter with one limit with a square-root transform. The minimizer
//! works on the unbounded internal variable `v`.

use std::f64::consts::FRAC_PI_2;

use minuit_math::MachinePrecision;

use super::parameter::Parameter;

/// Transform selected by the limits of a parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LimitTransform {
    /// No limits; identity.
    Identity,
    /// Two limits; sine transform.
    Sin {
        /// Lower limit.
        lower: f64,
        /// Upper limit.
        upper: f64,
    },
    /// Lower limit only.
    SqrtLow {
        /// Lower limit.
        lower: f64,
    },
    /// Upper limit only.
    SqrtUp {
        /// Upper limit.
        upper: f64,
    },
}

impl LimitTransform {
    /// Transform for the current limits of `param`.
    pub fn for_parameter(param: &Parameter) -> Self {
        match (param.lower_limit(), param.upper_limit()) {
            (Some(lower), Some(upper)) => Self::Sin { lower, upper },
            (Some(lower), None) => Self::SqrtLow { lower },
            (None, Some(upper)) => Self::SqrtUp { upper },
            (None, None) => Self::Identity,
        }
    }

    /// Internal to external value.
    pub fn int2ext(&self, value: f64) -> f64 {
        match *self {
            Self::Identity => value,
            Self::Sin { lower, upper } => lower + 0.5 * (upper - lower) * (value.sin() + 1.0),
            Self::SqrtLow { lower } => lower - 1.0 + (value * value + 1.0).sqrt(),
            Self::SqrtUp { upper } => upper + 1.0 - (value * value + 1.0).sqrt(),
        }
    }

    /// External to internal value.
    ///
    /// Values at or beyond a limit are mapped to a point slightly inside, so
    /// the derivative of the inverse stays finite.
    pub fn ext2int(&self, value: f64, prec: &MachinePrecision) -> f64 {
        match *self {
            Self::Identity => value,
            Self::Sin { lower, upper } => {
                let piby2 = FRAC_PI_2;
                let distnn = 8.0 * prec.eps2().sqrt();
                let vlimhi = piby2 - distnn;
                let vlimlo = -piby2 + distnn;

                let yy = 2.0 * (value - lower) / (upper - lower) - 1.0;
                let yy2 = yy * yy;
                if yy2 > 1.0 - prec.eps2() {
                    if yy < 0.0 {
                        vlimlo
                    } else {
                        vlimhi
                    }
                } else {
                    yy.asin()
                }
            }
            Self::SqrtLow { lower } => {
                let yy = value - lower + 1.0;
                let yy2 = yy * yy;
                if yy2 < 1.0 + prec.eps2() {
                    8.0 * prec.eps2().sqrt()
                } else {
                    (yy2 - 1.0).sqrt()
                }
            }
            Self::SqrtUp { upper } => {
                let yy = upper - value + 1.0;
                let yy2 = yy * yy;
                if yy2 < 1.0 + prec.eps2() {
                    8.0 * prec.eps2().sqrt()
                } else {
                    (yy2 - 1.0).sqrt()
                }
            }
        }
    }

    /// Derivative `d(ext)/d(int)` at an internal value.
    pub fn d_int2ext(&self, value: f64) -> f64 {
        match *self {
            Self::Identity => 1.0,
            Self::Sin { lower, upper } => 0.5 * (upper - lower) * value.cos(),
            Self::SqrtLow { .. } => value / (value * value + 1.0).sqrt(),
            Self::SqrtUp { .. } => -value / (value * value + 1.0).sqrt(),
        }
    }
}
