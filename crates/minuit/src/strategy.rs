//! Accuracy/cost trade-off of the minimizer.

use serde::{Deserialize, Serialize};

/// Iteration counts and tolerances of the numerical derivative calculators.
///
/// Three presets exist: low (0), medium (1, the default) and high (2). Any
/// level above 2 is treated as high. Individual tunables can be overridden
/// after choosing a preset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    level: u32,
    gradient_ncycles: u32,
    gradient_step_tolerance: f64,
    gradient_tolerance: f64,
    hessian_ncycles: u32,
    hessian_step_tolerance: f64,
    hessian_g2_tolerance: f64,
    hessian_gradient_ncycles: u32,
}

impl Strategy {
    /// Creates the preset for a level (0, 1, or 2 and above).
    #[must_use]
    pub fn new(level: u32) -> Self {
        match level {
            0 => Self::low(),
            1 => Self::medium(),
            _ => Self::high(),
        }
    }

    /// Cheapest preset: few derivative cycles, loose tolerances.
    #[must_use]
    pub fn low() -> Self {
        Self {
            level: 0,
            gradient_ncycles: 2,
            gradient_step_tolerance: 0.5,
            gradient_tolerance: 0.1,
            hessian_ncycles: 3,
            hessian_step_tolerance: 0.5,
            hessian_g2_tolerance: 0.1,
            hessian_gradient_ncycles: 1,
        }
    }

    /// Default preset.
    #[must_use]
    pub fn medium() -> Self {
        Self {
            level: 1,
            gradient_ncycles: 3,
            gradient_step_tolerance: 0.3,
            gradient_tolerance: 0.05,
            hessian_ncycles: 5,
            hessian_step_tolerance: 0.3,
            hessian_g2_tolerance: 0.05,
            hessian_gradient_ncycles: 2,
        }
    }

    /// Most accurate preset.
    #[must_use]
    pub fn high() -> Self {
        Self {
            level: 2,
            gradient_ncycles: 5,
            gradient_step_tolerance: 0.1,
            gradient_tolerance: 0.02,
            hessian_ncycles: 7,
            hessian_step_tolerance: 0.1,
            hessian_g2_tolerance: 0.02,
            hessian_gradient_ncycles: 6,
        }
    }

    /// Preset level.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Returns true for level 0.
    pub fn is_low(&self) -> bool {
        self.level == 0
    }

    /// Returns true for level 1.
    pub fn is_medium(&self) -> bool {
        self.level == 1
    }

    /// Returns true for level 2.
    pub fn is_high(&self) -> bool {
        self.level >= 2
    }

    /// One level lower, saturating at 0.
    #[must_use]
    pub fn lowered(&self) -> Self {
        Self::new(self.level.saturating_sub(1))
    }

    /// Maximum cycles of the two-point gradient.
    pub fn gradient_ncycles(&self) -> u32 {
        self.gradient_ncycles
    }

    /// Relative step change below which the gradient is converged.
    pub fn gradient_step_tolerance(&self) -> f64 {
        self.gradient_step_tolerance
    }

    /// Relative gradient change below which the gradient is converged.
    pub fn gradient_tolerance(&self) -> f64 {
        self.gradient_tolerance
    }

    /// Maximum cycles per diagonal element of the Hessian.
    pub fn hessian_ncycles(&self) -> u32 {
        self.hessian_ncycles
    }

    /// Relative step change below which a Hessian element is converged.
    pub fn hessian_step_tolerance(&self) -> f64 {
        self.hessian_step_tolerance
    }

    /// Relative second derivative change below which a Hessian element is converged.
    pub fn hessian_g2_tolerance(&self) -> f64 {
        self.hessian_g2_tolerance
    }

    /// Maximum cycles of the Hessian-refined gradient.
    pub fn hessian_gradient_ncycles(&self) -> u32 {
        self.hessian_gradient_ncycles
    }

    /// Sets the gradient cycles.
    pub fn set_gradient_ncycles(&mut self, n: u32) {
        self.gradient_ncycles = n;
    }

    /// Sets the gradient step tolerance.
    pub fn set_gradient_step_tolerance(&mut self, tol: f64) {
        self.gradient_step_tolerance = tol;
    }

    /// Sets the gradient tolerance.
    pub fn set_gradient_tolerance(&mut self, tol: f64) {
        self.gradient_tolerance = tol;
    }

    /// Sets the Hessian cycles.
    pub fn set_hessian_ncycles(&mut self, n: u32) {
        self.hessian_ncycles = n;
    }

    /// Sets the Hessian step tolerance.
    pub fn set_hessian_step_tolerance(&mut self, tol: f64) {
        self.hessian_step_tolerance = tol;
    }

    /// Sets the Hessian g2 tolerance.
    pub fn set_hessian_g2_tolerance(&mut self, tol: f64) {
        self.hessian_g2_tolerance = tol;
    }

    /// Sets the Hessian-gradient cycles.
    pub fn set_hessian_gradient_ncycles(&mut self, n: u32) {
        self.hessian_gradient_ncycles = n;
    }

    /// Sets the gradient cycles.
    #[must_use]
    pub fn with_gradient_ncycles(mut self, n: u32) -> Self {
        self.gradient_ncycles = n;
        self
    }

    /// Sets the Hessian cycles.
    #[must_use]
    pub fn with_hessian_ncycles(mut self, n: u32) -> Self {
        self.hessian_ncycles = n;
        self
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Self::medium()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_presets() {
        let low = Strategy::new(0);
        assert!(low.is_low());
        assert_eq!(low.gradient_ncycles(), 2);
        assert_eq!(low.hessian_gradient_ncycles(), 1);

        let medium = Strategy::default();
        assert!(medium.is_medium());
        assert_eq!(medium.hessian_ncycles(), 5);
        assert_relative_eq!(medium.gradient_tolerance(), 0.05);

        let high = Strategy::new(7);
        assert!(high.is_high());
        assert_eq!(high.level(), 2);
        assert_eq!(high.hessian_ncycles(), 7);
        assert_relative_eq!(high.hessian_g2_tolerance(), 0.02);
    }

    #[test]
    fn test_lowered() {
        assert_eq!(Strategy::high().lowered(), Strategy::medium());
        assert_eq!(Strategy::low().lowered(), Strategy::low());
    }

    #[test]
    fn test_overrides() {
        let mut s = Strategy::medium().with_gradient_ncycles(4);
        s.set_hessian_step_tolerance(0.2);
        assert_eq!(s.gradient_ncycles(), 4);
        assert_relative_eq!(s.hessian_step_tolerance(), 0.2);
        assert_eq!(s.level(), 1);
    }
}
