//! Minimizer and fit configuration.
//!
//! Configurations deserialize from TOML or JSON with field defaults, and are
//! checked through the [`Validate`] trait before use.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{MinuitError, MinuitResult};
use crate::parameters::{UserParameterState, UserParameters};
use crate::strategy::Strategy;

// =============================================================================
// VALIDATION
// =============================================================================

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Field that failed validation.
    pub field: String,
    /// Validation error message.
    pub message: String,
    /// Validation rule that was violated.
    pub rule: Option<String>,
}

impl ValidationError {
    /// Creates a new validation error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: None,
        }
    }

    /// Creates a validation error with a rule name.
    pub fn with_rule(
        field: impl Into<String>,
        message: impl Into<String>,
        rule: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: Some(rule.into()),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref rule) = self.rule {
            write!(f, "{}: {} (rule: {})", self.field, self.message, rule)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// Trait for validatable configurations.
pub trait Validate {
    /// Validates the configuration.
    ///
    /// Returns a list of validation errors, or an empty vector if valid.
    fn validate(&self) -> Vec<ValidationError>;

    /// Returns true if the configuration is valid.
    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Validates and returns an error if invalid.
    fn validate_or_error(&self) -> MinuitResult<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(MinuitError::InvalidConfig(errors))
        }
    }
}

// =============================================================================
// MINIMIZER CONFIGURATION
// =============================================================================

/// What to do when an analytical gradient disagrees with a numerical estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradientCheck {
    /// Do not compare.
    Off,
    /// Log the discrepancy and keep the analytical gradient.
    #[default]
    Warn,
    /// Log the discrepancy and fall back to numerical derivatives.
    Reject,
}

/// Settings shared by every minimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimizerConfig {
    /// Strategy level: 0 (low), 1 (medium) or 2 (high).
    #[serde(default = "default_strategy")]
    pub strategy: u32,

    /// Call budget; 0 selects `200 + 100n + 5n²`.
    #[serde(default)]
    pub max_fcn: usize,

    /// Convergence tolerance in units of `error_def`.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Function change for one standard deviation.
    #[serde(default = "default_error_def")]
    pub error_def: f64,

    /// Overrides the computed machine precision.
    #[serde(default)]
    pub precision: Option<f64>,

    /// Use derivatives provided by the objective function.
    #[serde(default = "default_use_analytical")]
    pub use_analytical_derivatives: bool,

    /// Policy for the analytical gradient cross-check.
    #[serde(default)]
    pub gradient_check: GradientCheck,
}

fn default_strategy() -> u32 {
    1
}

fn default_tolerance() -> f64 {
    0.1
}

fn default_error_def() -> f64 {
    1.0
}

fn default_use_analytical() -> bool {
    true
}

impl Default for MinimizerConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            max_fcn: 0,
            tolerance: default_tolerance(),
            error_def: default_error_def(),
            precision: None,
            use_analytical_derivatives: default_use_analytical(),
            gradient_check: GradientCheck::default(),
        }
    }
}

impl MinimizerConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(s: &str) -> MinuitResult<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate_or_error()?;
        Ok(config)
    }

    /// Parses and validates a JSON document.
    pub fn from_json_str(s: &str) -> MinuitResult<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate_or_error()?;
        Ok(config)
    }

    /// The strategy for the configured level.
    pub fn strategy(&self) -> Strategy {
        Strategy::new(self.strategy)
    }

    /// Call budget for `nvar` variable parameters.
    pub fn max_fcn_for(&self, nvar: usize) -> usize {
        if self.max_fcn == 0 {
            default_max_fcn(nvar)
        } else {
            self.max_fcn
        }
    }

    /// Builder method to set the strategy level.
    #[must_use]
    pub fn with_strategy(mut self, level: u32) -> Self {
        self.strategy = level;
        self
    }

    /// Builder method to set the call budget.
    #[must_use]
    pub fn with_max_fcn(mut self, max_fcn: usize) -> Self {
        self.max_fcn = max_fcn;
        self
    }

    /// Builder method to set the tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Builder method to set the error definition.
    #[must_use]
    pub fn with_error_def(mut self, error_def: f64) -> Self {
        self.error_def = error_def;
        self
    }

    /// Builder method to override the machine precision.
    #[must_use]
    pub fn with_precision(mut self, eps: f64) -> Self {
        self.precision = Some(eps);
        self
    }

    /// Builder method to enable or disable analytical derivatives.
    #[must_use]
    pub fn with_analytical_derivatives(mut self, enabled: bool) -> Self {
        self.use_analytical_derivatives = enabled;
        self
    }

    /// Builder method to set the gradient check policy.
    #[must_use]
    pub fn with_gradient_check(mut self, check: GradientCheck) -> Self {
        self.gradient_check = check;
        self
    }
}

/// Automatic call budget for `n` variable parameters.
pub fn default_max_fcn(n: usize) -> usize {
    200 + 100 * n + 5 * n * n
}

impl Validate for MinimizerConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.strategy > 2 {
            errors.push(ValidationError::with_rule(
                "strategy",
                format!("Strategy {} must be 0, 1 or 2", self.strategy),
                "valid_strategy",
            ));
        }

        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            errors.push(ValidationError::with_rule(
                "tolerance",
                "Tolerance must be positive",
                "positive",
            ));
        }

        if !self.error_def.is_finite() || self.error_def <= 0.0 {
            errors.push(ValidationError::with_rule(
                "error_def",
                "Error definition must be positive",
                "positive",
            ));
        }

        if let Some(eps) = self.precision {
            if !(eps > 0.0 && eps < 1.0) {
                errors.push(ValidationError::with_rule(
                    "precision",
                    format!("Precision {eps} must lie in (0, 1)"),
                    "valid_precision",
                ));
            }
        }

        errors
    }
}

// =============================================================================
// FIT CONFIGURATION
// =============================================================================

/// Declaration of one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Unique name.
    pub name: String,

    /// Starting value.
    pub value: f64,

    /// Starting step / error estimate.
    #[serde(default)]
    pub error: f64,

    /// Lower limit.
    #[serde(default)]
    pub lower: Option<f64>,

    /// Upper limit.
    #[serde(default)]
    pub upper: Option<f64>,

    /// Start fixed (can be released later).
    #[serde(default)]
    pub fixed: bool,

    /// Never varies.
    #[serde(default)]
    pub constant: bool,
}

impl ParameterSpec {
    /// A free parameter.
    pub fn new(name: impl Into<String>, value: f64, error: f64) -> Self {
        Self {
            name: name.into(),
            value,
            error,
            lower: None,
            upper: None,
            fixed: false,
            constant: false,
        }
    }

    /// Builder method to set both limits.
    #[must_use]
    pub fn with_limits(mut self, lower: f64, upper: f64) -> Self {
        self.lower = Some(lower);
        self.upper = Some(upper);
        self
    }

    /// Builder method to set a lower limit.
    #[must_use]
    pub fn with_lower(mut self, lower: f64) -> Self {
        self.lower = Some(lower);
        self
    }

    /// Builder method to set an upper limit.
    #[must_use]
    pub fn with_upper(mut self, upper: f64) -> Self {
        self.upper = Some(upper);
        self
    }

    /// Builder method to start the parameter fixed.
    #[must_use]
    pub fn fixed(mut self) -> Self {
        self.fixed = true;
        self
    }

    /// Builder method to make the parameter constant.
    #[must_use]
    pub fn constant(mut self) -> Self {
        self.constant = true;
        self
    }

    fn add_to(&self, params: &mut UserParameters) -> MinuitResult<()> {
        if self.constant {
            return params.add_const(self.name.as_str(), self.value);
        }
        match (self.lower, self.upper) {
            (Some(lower), Some(upper)) => {
                params.add_limited(self.name.as_str(), self.value, self.error, lower, upper)?;
            }
            (Some(lower), None) => {
                params.add(self.name.as_str(), self.value, self.error)?;
                params.set_lower_limit(self.name.as_str(), lower)?;
            }
            (None, Some(upper)) => {
                params.add(self.name.as_str(), self.value, self.error)?;
                params.set_upper_limit(self.name.as_str(), upper)?;
            }
            (None, None) => params.add(self.name.as_str(), self.value, self.error)?,
        }
        if self.fixed {
            params.fix(self.name.as_str())?;
        }
        Ok(())
    }
}

impl Validate for ParameterSpec {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let field = |f: &str| format!("parameters.{}.{}", self.name, f);

        if self.name.is_empty() {
            errors.push(ValidationError::new("parameters.name", "Name cannot be empty"));
        }

        if !self.value.is_finite() {
            errors.push(ValidationError::new(field("value"), "Value must be finite"));
        }

        if !self.constant && (!self.error.is_finite() || self.error < 0.0) {
            errors.push(ValidationError::with_rule(
                field("error"),
                "Error must be a non-negative number",
                "non_negative",
            ));
        }

        if let (Some(lower), Some(upper)) = (self.lower, self.upper) {
            if lower == upper {
                errors.push(ValidationError::with_rule(
                    field("limits"),
                    format!("Lower and upper limit are equal ({lower})"),
                    "distinct_limits",
                ));
            }
        }

        if self.constant && (self.lower.is_some() || self.upper.is_some()) {
            errors.push(ValidationError::new(
                field("constant"),
                "A constant parameter cannot have limits",
            ));
        }

        errors
    }
}

/// A complete fit setup: minimizer settings and parameter declarations.
///
/// # Example
///
/// ```rust
/// use minuit::config::FitConfig;
///
/// let config = FitConfig::from_toml_str(
///     r#"
///     [minimizer]
///     strategy = 2
///
///     [[parameters]]
///     name = "mean"
///     value = 0.0
///     error = 0.1
///
///     [[parameters]]
///     name = "sigma"
///     value = 1.0
///     error = 0.1
///     lower = 0.0
///     "#,
/// )
/// .unwrap();
///
/// let params = config.user_parameters().unwrap();
/// assert_eq!(params.len(), 2);
/// assert_eq!(config.minimizer.strategy, 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitConfig {
    /// Minimizer settings.
    #[serde(default)]
    pub minimizer: MinimizerConfig,

    /// Parameter declarations in external order.
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
}

impl FitConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(s: &str) -> MinuitResult<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate_or_error()?;
        Ok(config)
    }

    /// Parses and validates a JSON document.
    pub fn from_json_str(s: &str) -> MinuitResult<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate_or_error()?;
        Ok(config)
    }

    /// Serializes to pretty JSON.
    pub fn to_json_string(&self) -> MinuitResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Builds the declared parameter set.
    pub fn user_parameters(&self) -> MinuitResult<UserParameters> {
        let mut params = UserParameters::new();
        for spec in &self.parameters {
            spec.add_to(&mut params)?;
        }
        if let Some(eps) = self.minimizer.precision {
            params.set_precision(eps);
        }
        Ok(params)
    }

    /// Builds the declared parameter set as a state without covariance.
    pub fn user_state(&self) -> MinuitResult<UserParameterState> {
        Ok(UserParameterState::new(self.user_parameters()?))
    }
}

impl Validate for FitConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = self.minimizer.validate();

        let mut seen = HashSet::new();
        for spec in &self.parameters {
            errors.extend(spec.validate());
            if !seen.insert(spec.name.as_str()) {
                errors.push(ValidationError::with_rule(
                    "parameters",
                    format!("Duplicate parameter name '{}'", spec.name),
                    "unique_names",
                ));
            }
        }

        errors
    }
}
