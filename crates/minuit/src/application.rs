//! User-facing minimizers.
//!
//! A [`Minimizer`] owns the parameter state, runs one of the [`Algorithm`]s
//! on it and replaces the state by the result, so consecutive calls continue
//! from the last minimum.

use log::{debug, warn};

use crate::builder::{
    CombinedBuilder, MinimumBuilder, ScanBuilder, SimplexBuilder, VariableMetricBuilder,
};
use crate::config::{default_max_fcn, FitConfig, GradientCheck, MinimizerConfig};
use crate::error::{MinuitError, MinuitResult};
use crate::fcn::{Fcn, ObjectiveFunction};
use crate::gradient::{AnalyticalGradientCalculator, GradientCalculator, NumericalGradientCalculator};
use crate::minimum::FunctionMinimum;
use crate::parameter_scan::ParameterScan;
use crate::parameters::{ParameterRef, UserCovariance, UserParameterState, UserParameters};
use crate::seed::{MigradSeedGenerator, SeedGenerator, SimplexSeedGenerator};

/// Minimization algorithm run by a [`Minimizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    /// Variable metric with Davidon updates.
    #[default]
    Migrad,
    /// Nelder-Mead simplex.
    Simplex,
    /// Migrad, falling back to Simplex followed by Migrad.
    Combined,
    /// One scan per parameter.
    Scan,
}

impl Algorithm {
    fn seed_generator(self, check: GradientCheck) -> Box<dyn SeedGenerator> {
        match self {
            Self::Migrad | Self::Combined => Box::new(MigradSeedGenerator::new(check)),
            Self::Simplex | Self::Scan => Box::new(SimplexSeedGenerator),
        }
    }

    fn builder(self) -> Box<dyn MinimumBuilder> {
        match self {
            Self::Migrad => Box::new(VariableMetricBuilder::new()),
            Self::Simplex => Box::new(SimplexBuilder::new()),
            Self::Combined => Box::new(CombinedBuilder::new()),
            Self::Scan => Box::new(ScanBuilder::new()),
        }
    }
}

/// Runs an [`Algorithm`] on an objective function and a parameter state.
///
/// # Example
///
/// ```rust
/// use minuit::application::Minimizer;
/// use minuit::parameters::UserParameterState;
///
/// let f = |x: &[f64]| (x[0] - 1.0).powi(2) + (x[1] - 2.0).powi(2);
/// let state = UserParameterState::from_values(&[0.0, 0.0], &[0.1, 0.1]).unwrap();
/// let mut migrad = Minimizer::migrad(&f, state);
/// let min = migrad.minimize().unwrap();
///
/// assert!(min.is_valid());
/// assert!((migrad.value(0_usize).unwrap() - 1.0).abs() < 1e-3);
/// ```
pub struct Minimizer<'f> {
    function: &'f dyn ObjectiveFunction,
    state: UserParameterState,
    config: MinimizerConfig,
    algorithm: Algorithm,
    num_calls: usize,
}

impl<'f> Minimizer<'f> {
    /// Creates a minimizer with the default configuration.
    pub fn new(function: &'f dyn ObjectiveFunction, state: UserParameterState, algorithm: Algorithm) -> Self {
        Self {
            function,
            state,
            config: MinimizerConfig::default(),
            algorithm,
            num_calls: 0,
        }
    }

    /// Variable-metric minimizer.
    pub fn migrad(function: &'f dyn ObjectiveFunction, state: UserParameterState) -> Self {
        Self::new(function, state, Algorithm::Migrad)
    }

    /// Simplex minimizer.
    pub fn simplex(function: &'f dyn ObjectiveFunction, state: UserParameterState) -> Self {
        Self::new(function, state, Algorithm::Simplex)
    }

    /// Migrad with a Simplex fallback.
    pub fn combined(function: &'f dyn ObjectiveFunction, state: UserParameterState) -> Self {
        Self::new(function, state, Algorithm::Combined)
    }

    /// Scan minimizer.
    pub fn scanner(function: &'f dyn ObjectiveFunction, state: UserParameterState) -> Self {
        Self::new(function, state, Algorithm::Scan)
    }

    /// Builds a minimizer from a parsed fit configuration.
    pub fn from_config(
        function: &'f dyn ObjectiveFunction,
        config: &FitConfig,
        algorithm: Algorithm,
    ) -> MinuitResult<Self> {
        Ok(Self::new(function, config.user_state()?, algorithm).with_config(config.minimizer.clone()))
    }

    /// Replaces the configuration. A precision override is applied to the
    /// parameter state.
    #[must_use]
    pub fn with_config(mut self, config: MinimizerConfig) -> Self {
        if let Some(eps) = config.precision {
            self.state.set_precision(eps);
        }
        self.config = config;
        self
    }

    /// Minimizes with the configured call budget and tolerance.
    pub fn minimize(&mut self) -> MinuitResult<FunctionMinimum> {
        self.minimize_with(self.config.max_fcn, self.config.tolerance)
    }

    /// Minimizes with an explicit call budget (0 for automatic) and
    /// tolerance.
    ///
    /// The EDM target is `tolerance · error_def`, at least `eps2`. The
    /// parameter state is replaced by the result even when it is not valid.
    ///
    /// # Errors
    ///
    /// Returns [`MinuitError::InvalidState`] if the current state cannot be
    /// minimized.
    pub fn minimize_with(&mut self, max_fcn: usize, tolerance: f64) -> MinuitResult<FunctionMinimum> {
        if !self.state.is_valid() {
            return Err(MinuitError::invalid_state(
                "the parameter state is not valid for minimization",
            ));
        }

        let n = self.state.variable_parameters();
        let max_fcn = if max_fcn == 0 {
            default_max_fcn(n)
        } else {
            max_fcn
        };
        let strategy = self.config.strategy();
        let up = self.config.error_def;
        let fcn = Fcn::new(self.function, up, self.state.transformation().clone());

        let numerical = NumericalGradientCalculator::new(&fcn, strategy);
        let analytical = AnalyticalGradientCalculator::new(&fcn);
        let use_analytical =
            self.config.use_analytical_derivatives && AnalyticalGradientCalculator::is_supported(&fcn);
        let mut gc: &dyn GradientCalculator = if use_analytical {
            &analytical
        } else {
            &numerical
        };

        let seed = self
            .algorithm
            .seed_generator(self.config.gradient_check)
            .generate(&fcn, gc, &self.state, &strategy);
        if gc.is_analytical()
            && self.algorithm != Algorithm::Simplex
            && self.algorithm != Algorithm::Scan
            && !seed.gradient().is_analytical()
        {
            debug!("switching to numerical derivatives for this minimization");
            gc = &numerical;
        }

        let edmval = (tolerance * up).max(fcn.precision().eps2());
        let min = if fcn.num_calls() >= max_fcn {
            warn!("call limit of {max_fcn} exhausted by the seed");
            let mut min = FunctionMinimum::from_seed(seed, up);
            min.set_reached_call_limit();
            min
        } else {
            self.algorithm
                .builder()
                .minimum(&fcn, gc, seed, &strategy, max_fcn, edmval)
        };

        self.num_calls += min.nfcn();
        self.state = min.user_state().clone();
        Ok(min)
    }

    /// Scans one parameter; see [`ParameterScan::scan`].
    ///
    /// If a lower function value is found the parameter is moved there.
    pub fn scan<'n>(
        &mut self,
        param: impl Into<ParameterRef<'n>>,
        max_steps: usize,
        low: f64,
        high: f64,
    ) -> MinuitResult<Vec<(f64, f64)>> {
        let ext = self.state.transformation().index_of(param)?;
        let fcn = Fcn::new(self.function, self.config.error_def, self.state.transformation().clone());
        let mut scan = ParameterScan::new(&fcn, self.state.parameters().clone());
        let amin = scan.fval();

        let points = scan.scan(ext, max_steps, low, high)?;
        if scan.fval() < amin {
            self.state.set_value(ext, scan.parameters().value(ext)?)?;
        }
        self.num_calls += fcn.num_calls();
        Ok(points)
    }

    // =========================================================================
    // Parameter facade
    // =========================================================================

    /// Adds a free parameter.
    pub fn add(&mut self, name: impl Into<String>, value: f64, error: f64) -> MinuitResult<()> {
        self.state.add(name, value, error)
    }

    /// Adds a parameter with limits.
    pub fn add_limited(
        &mut self,
        name: impl Into<String>,
        value: f64,
        error: f64,
        lower: f64,
        upper: f64,
    ) -> MinuitResult<()> {
        self.state.add_limited(name, value, error, lower, upper)
    }

    /// Adds a constant.
    pub fn add_const(&mut self, name: impl Into<String>, value: f64) -> MinuitResult<()> {
        self.state.add_const(name, value)
    }

    /// Fixes a parameter.
    pub fn fix<'n>(&mut self, param: impl Into<ParameterRef<'n>>) -> MinuitResult<()> {
        self.state.fix(param)
    }

    /// Releases a fixed parameter.
    pub fn release<'n>(&mut self, param: impl Into<ParameterRef<'n>>) -> MinuitResult<()> {
        self.state.release(param)
    }

    /// Sets a value.
    pub fn set_value<'n>(&mut self, param: impl Into<ParameterRef<'n>>, value: f64) -> MinuitResult<()> {
        self.state.set_value(param, value)
    }

    /// Sets an error.
    pub fn set_error<'n>(&mut self, param: impl Into<ParameterRef<'n>>, error: f64) -> MinuitResult<()> {
        self.state.set_error(param, error)
    }

    /// Sets both limits.
    pub fn set_limits<'n>(
        &mut self,
        param: impl Into<ParameterRef<'n>>,
        lower: f64,
        upper: f64,
    ) -> MinuitResult<()> {
        self.state.set_limits(param, lower, upper)
    }

    /// Sets a lower limit.
    pub fn set_lower_limit<'n>(&mut self, param: impl Into<ParameterRef<'n>>, lower: f64) -> MinuitResult<()> {
        self.state.set_lower_limit(param, lower)
    }

    /// Sets an upper limit.
    pub fn set_upper_limit<'n>(&mut self, param: impl Into<ParameterRef<'n>>, upper: f64) -> MinuitResult<()> {
        self.state.set_upper_limit(param, upper)
    }

    /// Removes the limits.
    pub fn remove_limits<'n>(&mut self, param: impl Into<ParameterRef<'n>>) -> MinuitResult<()> {
        self.state.remove_limits(param)
    }

    /// Overrides the machine precision.
    pub fn set_precision(&mut self, eps: f64) {
        self.state.set_precision(eps);
    }

    /// A parameter value.
    pub fn value<'n>(&self, param: impl Into<ParameterRef<'n>>) -> MinuitResult<f64> {
        self.state.value(param)
    }

    /// A parameter error.
    pub fn error<'n>(&self, param: impl Into<ParameterRef<'n>>) -> MinuitResult<f64> {
        self.state.error(param)
    }

    /// All parameter values.
    pub fn values(&self) -> Vec<f64> {
        self.state.values()
    }

    /// All parameter errors.
    pub fn errors(&self) -> Vec<f64> {
        self.state.errors()
    }

    /// External index of a name.
    pub fn index(&self, name: &str) -> MinuitResult<usize> {
        self.state.index(name)
    }

    /// Name of an external index.
    pub fn name(&self, index: usize) -> MinuitResult<&str> {
        self.state.name(index)
    }

    /// Number of variable parameters.
    pub fn variable_parameters(&self) -> usize {
        self.state.variable_parameters()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The current parameter state.
    pub fn state(&self) -> &UserParameterState {
        &self.state
    }

    /// The current parameters.
    pub fn parameters(&self) -> &UserParameters {
        self.state.parameters()
    }

    /// The current covariance.
    pub fn covariance(&self) -> &UserCovariance {
        self.state.covariance()
    }

    /// Function calls made by all minimizations and scans so far.
    pub fn num_calls(&self) -> usize {
        self.num_calls
    }

    /// The configuration.
    pub fn config(&self) -> &MinimizerConfig {
        &self.config
    }

    /// The algorithm.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// The objective function.
    pub fn function(&self) -> &'f dyn ObjectiveFunction {
        self.function
    }
}
