//! Global correlation coefficients.

use minuit_math::SymMatrix;

/// Global correlation coefficient of each variable parameter.
///
/// The coefficient of parameter `i` measures its strongest correlation with
/// any linear combination of the other parameters:
/// `sqrt(1 - 1/(V_ii · V⁻¹_ii))`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalCorrelationCoeff {
    coefficients: Vec<f64>,
    valid: bool,
}

impl GlobalCorrelationCoeff {
    /// Computes the coefficients of a covariance (or inverse Hessian).
    ///
    /// The result is invalid if the matrix cannot be inverted.
    #[must_use]
    pub fn new(cov: &SymMatrix) -> Self {
        let Ok(inv) = cov.invert() else {
            return Self::default();
        };
        let coefficients = (0..cov.size())
            .map(|i| {
                let denom = inv.get(i, i) * cov.get(i, i);
                if denom < 1.0 && denom > 0.0 {
                    0.0
                } else {
                    (1.0 - 1.0 / denom).sqrt()
                }
            })
            .collect();
        Self {
            coefficients,
            valid: true,
        }
    }

    /// The coefficients, ordered by internal index.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Returns true if the covariance could be inverted.
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_uncorrelated() {
        let gcc = GlobalCorrelationCoeff::new(&SymMatrix::from_diagonal(&[2.0, 5.0]));
        assert!(gcc.is_valid());
        assert_relative_eq!(gcc.coefficients()[0], 0.0);
        assert_relative_eq!(gcc.coefficients()[1], 0.0);
    }

    #[test]
    fn test_two_parameters_equals_correlation() {
        let mut cov = SymMatrix::new(2);
        cov.set(0, 0, 1.0);
        cov.set(1, 1, 4.0);
        cov.set(0, 1, 1.2); // rho = 0.6
        let gcc = GlobalCorrelationCoeff::new(&cov);
        assert_relative_eq!(gcc.coefficients()[0], 0.6, epsilon = 1e-12);
        assert_relative_eq!(gcc.coefficients()[1], 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_singular_is_invalid() {
        let gcc = GlobalCorrelationCoeff::new(&SymMatrix::from_diagonal(&[1.0, 0.0]));
        assert!(!gcc.is_valid());
        assert!(gcc.coefficients().is_empty());
    }
}
