//! User parameters and their mapping to optimizer space.
//!
//! - [`Parameter`]: one declared parameter with optional limits
//! - [`Transformation`]: external ↔ internal index map and value transforms
//! - [`UserParameters`]: the user-facing parameter set
//! - [`UserParameterState`]: parameters plus covariance, the input and
//!   output of every minimization
//! - [`UserCovariance`], [`GlobalCorrelationCoeff`]: error summaries

mod covariance;
mod global_cc;
mod parameter;
mod squeeze;
mod state;
mod transform;
mod transformation;
mod user_parameters;

pub use covariance::UserCovariance;
pub use global_cc::GlobalCorrelationCoeff;
pub use parameter::Parameter;
pub use squeeze::{squeeze_covariance, squeeze_error, squeeze_matrix};
pub use state::UserParameterState;
pub use transform::LimitTransform;
pub use transformation::Transformation;
pub use user_parameters::UserParameters;

/// Addresses a parameter by external index or by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterRef<'a> {
    /// Position in the declared parameter list.
    Index(usize),
    /// Parameter name.
    Name(&'a str),
}

impl From<usize> for ParameterRef<'_> {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl<'a> From<&'a str> for ParameterRef<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl<'a> From<&'a String> for ParameterRef<'a> {
    fn from(name: &'a String) -> Self {
        Self::Name(name.as_str())
    }
}
