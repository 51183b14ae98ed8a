//! Minimization algorithms.
//!
//! A builder takes a [`MinimumSeed`] and iterates until convergence or until
//! the call budget is spent:
//!
//! - [`VariableMetricBuilder`]: quasi-Newton with Davidon updates (Migrad)
//! - [`SimplexBuilder`]: Nelder-Mead simplex
//! - [`ScanBuilder`]: one-dimensional scans of every parameter
//! - [`CombinedBuilder`]: Migrad, falling back to Simplex then Migrad again

mod combined;
mod scan;
mod simplex;
mod variable_metric;

pub use combined::CombinedBuilder;
pub use scan::ScanBuilder;
pub use simplex::SimplexBuilder;
pub use variable_metric::{davidon_update, estimate_edm, VariableMetricBuilder};

use crate::fcn::Fcn;
use crate::gradient::GradientCalculator;
use crate::minimum::{FunctionMinimum, MinimumSeed};
use crate::strategy::Strategy;

/// Runs a minimization from a seed.
///
/// `max_fcn` bounds the total number of calls made through `fcn` (calls
/// spent on the seed included). `edmval` is the requested EDM in function
/// units, already scaled by the error definition.
pub trait MinimumBuilder {
    /// Iterates from `seed` and collects the result.
    fn minimum(
        &self,
        fcn: &Fcn<'_>,
        gc: &dyn GradientCalculator,
        seed: MinimumSeed,
        strategy: &Strategy,
        max_fcn: usize,
        edmval: f64,
    ) -> FunctionMinimum;
}
