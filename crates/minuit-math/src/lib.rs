//! # Minuit Math
//!
//! Numerical building blocks for the Minuit function minimizer.
//!
//! This crate provides:
//!
//! - **Precision**: The machine precision used by every tolerance of the minimizer
//! - **Linear Algebra**: A packed symmetric matrix with inversion and eigenvalues
//! - **Parabola**: Parabolic interpolation for line and root searches
//!
//! ## Design Philosophy
//!
//! - **Small surface**: only the symmetric-matrix algebra the minimizer needs
//! - **Numerical Stability**: Careful handling of edge cases
//! - **Explicit failures**: singular matrices are a `Result`, never a panic

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::similar_names)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::float_cmp)]
#![allow(clippy::needless_range_loop)]

pub mod error;
pub mod linear_algebra;
pub mod parabola;
pub mod precision;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{MathError, MathResult};
    pub use crate::linear_algebra::{abs_sum, inner_product, outer_product, similarity, SymMatrix};
    pub use crate::parabola::{Parabola, ParabolaPoint};
    pub use crate::precision::MachinePrecision;
}

pub use error::{MathError, MathResult};
pub use linear_algebra::SymMatrix;
pub use nalgebra::DVector;
pub use parabola::{Parabola, ParabolaPoint};
pub use precision::MachinePrecision;
