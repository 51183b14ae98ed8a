//! Starting states for the builders.
//!
//! - [`MigradSeedGenerator`]: gradient, diagonal or user-supplied error
//!   matrix, negative-curvature correction and optional Hesse
//! - [`SimplexSeedGenerator`]: the starting point with an error-based
//!   gradient estimate, no extra function calls

mod migrad;
mod negative_g2;
mod simplex;

pub use migrad::MigradSeedGenerator;
pub use negative_g2::{has_negative_g2, negative_g2_line_search};
pub use simplex::SimplexSeedGenerator;

use crate::fcn::Fcn;
use crate::gradient::GradientCalculator;
use crate::minimum::MinimumSeed;
use crate::parameters::UserParameterState;
use crate::strategy::Strategy;

/// Builds the seed of a minimization from the user state.
pub trait SeedGenerator {
    /// Evaluates the starting point and estimates gradient and error matrix.
    fn generate(
        &self,
        fcn: &Fcn<'_>,
        gc: &dyn GradientCalculator,
        state: &UserParameterState,
        strategy: &Strategy,
    ) -> MinimumSeed;
}
