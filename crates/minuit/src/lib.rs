//! # Minuit
//!
//! Function minimization and error analysis in the style of MINUIT.
//!
//! This crate provides:
//!
//! - **Parameters**: named parameters with optional limits, fixing and
//!   releasing, mapped to an unbounded internal space
//! - **Minimizers**: Migrad (variable metric), Simplex, a combined strategy
//!   and parameter scans, behind the [`Minimizer`](application::Minimizer)
//!   application
//! - **Error analysis**: Hesse (full second-derivative matrix), MINOS
//!   (asymmetric profile errors) and two-parameter contours
//! - **Configuration**: serde-backed settings loadable from TOML or JSON
//!
//! ## Quick start
//!
//! ```rust
//! use minuit::prelude::*;
//!
//! let f = |x: &[f64]| (x[0] - 1.0).powi(2) + (x[1] - 2.0).powi(2);
//!
//! let mut params = UserParameters::new();
//! params.add("x", 0.0, 0.1).unwrap();
//! params.add("y", 0.0, 0.1).unwrap();
//!
//! let mut migrad = Minimizer::migrad(&f, UserParameterState::new(params));
//! let min = migrad.minimize().unwrap();
//! assert!(min.is_valid());
//! assert!(min.edm() < 1e-3);
//!
//! let minos = Minos::new(&f, &min, Strategy::medium());
//! let err = minos.minos("x", 1.0, 0).unwrap();
//! assert!((err.upper() - 1.0).abs() < 0.02);
//! ```
//!
//! ## Results, not errors
//!
//! Only configuration mistakes are returned as [`MinuitError`](error::MinuitError).
//! A minimization that runs out of calls or misses the EDM target returns a
//! [`FunctionMinimum`](minimum::FunctionMinimum) whose flags say so; MINOS
//! and contour searches report their failures the same way.

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
#![allow(clippy::too_many_lines)]
#![allow(clippy::too_many_arguments)]

pub mod application;
pub mod builder;
pub mod config;
pub mod contours;
pub mod cross;
pub mod error;
pub mod fcn;
pub mod gradient;
pub mod hesse;
pub mod line_search;
pub mod minimum;
pub mod minos;
pub mod parameter_scan;
pub mod parameters;
pub mod posdef;
pub mod print;
pub mod seed;
pub mod strategy;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::application::{Algorithm, Minimizer};
    pub use crate::config::{FitConfig, GradientCheck, MinimizerConfig, ParameterSpec, Validate};
    pub use crate::contours::{Contours, ContoursError};
    pub use crate::cross::Cross;
    pub use crate::error::{MinuitError, MinuitResult};
    pub use crate::fcn::{FunctionWithGradient, ObjectiveFunction};
    pub use crate::hesse::Hesse;
    pub use crate::minimum::FunctionMinimum;
    pub use crate::minos::{Minos, MinosError};
    pub use crate::parameters::{
        GlobalCorrelationCoeff, ParameterRef, UserCovariance, UserParameterState, UserParameters,
    };
    pub use crate::strategy::Strategy;
}

pub use application::{Algorithm, Minimizer};
pub use error::{MinuitError, MinuitResult};
pub use minimum::FunctionMinimum;
pub use parameters::{UserParameterState, UserParameters};
pub use strategy::Strategy;
