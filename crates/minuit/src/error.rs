//! Error types for the minimizer.
//!
//! Only configuration mistakes are errors. A minimization that does not
//! converge is a normal outcome reported through the flags of
//! [`FunctionMinimum`](crate::minimum::FunctionMinimum).

use minuit_math::MathError;
use thiserror::Error;

use crate::config::ValidationError;

/// A specialized Result type for minimizer operations.
pub type MinuitResult<T> = Result<T, MinuitError>;

/// Errors raised by the minimizer API.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MinuitError {
    /// A parameter with this name already exists.
    #[error("Duplicate parameter name: {name}")]
    DuplicateName {
        /// The duplicated name.
        name: String,
    },

    /// No parameter with this name exists.
    #[error("Unknown parameter: {name}")]
    UnknownName {
        /// The unknown name.
        name: String,
    },

    /// Parameter index out of range.
    #[error("Parameter index {index} out of range (have {len} parameters)")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of declared parameters.
        len: usize,
    },

    /// Lower and upper limit coincide.
    #[error("Parameter {name}: lower and upper limit are equal ({limit})")]
    EqualLimits {
        /// Parameter name.
        name: String,
        /// The common limit.
        limit: f64,
    },

    /// Operation not allowed for the parameter in its current state.
    #[error("Parameter {name}: {reason}")]
    InvalidParameterOperation {
        /// Parameter name.
        name: String,
        /// What was wrong.
        reason: String,
    },

    /// The parameter state cannot be minimized.
    #[error("Invalid parameter state: {reason}")]
    InvalidState {
        /// Why the state was rejected.
        reason: String,
    },

    /// A covariance has the wrong shape or content.
    #[error("Invalid covariance: {reason}")]
    InvalidCovariance {
        /// Why the covariance was rejected.
        reason: String,
    },

    /// Configuration failed validation.
    #[error("Invalid configuration: {}", format_validation(.0))]
    InvalidConfig(Vec<ValidationError>),

    /// Configuration could not be parsed.
    #[error("Configuration parse error: {0}")]
    Parse(String),

    /// Underlying numerical error.
    #[error("Math error: {0}")]
    Math(#[from] MathError),
}

fn format_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl MinuitError {
    /// Creates an invalid state error.
    #[must_use]
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }

    /// Creates an invalid parameter operation error.
    #[must_use]
    pub fn invalid_operation(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameterOperation {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid covariance error.
    #[must_use]
    pub fn invalid_covariance(reason: impl Into<String>) -> Self {
        Self::InvalidCovariance {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for MinuitError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<toml::de::Error> for MinuitError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MinuitError::DuplicateName {
            name: "x".to_string(),
        };
        assert_eq!(err.to_string(), "Duplicate parameter name: x");

        let err = MinuitError::InvalidConfig(vec![
            ValidationError::new("tolerance", "must be positive"),
            ValidationError::with_rule("strategy", "out of range", "0..=2"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("tolerance: must be positive"));
        assert!(msg.contains("(rule: 0..=2)"));
    }

    #[test]
    fn test_from_math_error() {
        let err: MinuitError = MathError::SingularMatrix.into();
        assert!(matches!(err, MinuitError::Math(MathError::SingularMatrix)));
    }
}
