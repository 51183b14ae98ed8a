use log::warn;
use minuit_math::SymMatrix;

/// Condition of an error matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorMatrixStatus {
    /// No matrix has been estimated.
    NotAvailable,
    /// Positive definite, usable as covariance.
    Valid,
    /// Had to be forced positive definite.
    MadePosDef,
    /// Hesse failed; the matrix is a diagonal fallback.
    HesseFailed,
    /// Inversion failed; the matrix is a diagonal fallback.
    InvertFailed,
    /// Not positive definite.
    NotPosDef,
}

/// Inverse-Hessian estimate with its reliability.
///
/// `dcovar` tracks the relative change of the matrix in the last update;
/// values below 0.1 mean the matrix is accurate.
#[derive(Debug, Clone, PartialEq)]
pub struct MinimumError {
    matrix: SymMatrix,
    dcovar: f64,
    status: ErrorMatrixStatus,
}

impl MinimumError {
    /// A usable inverse Hessian.
    #[must_use]
    pub fn new(matrix: SymMatrix, dcovar: f64) -> Self {
        Self {
            matrix,
            dcovar,
            status: ErrorMatrixStatus::Valid,
        }
    }

    /// No error estimate for `n` parameters.
    #[must_use]
    pub fn not_available(n: usize) -> Self {
        Self::with_status(SymMatrix::new(n), ErrorMatrixStatus::NotAvailable)
    }

    /// Diagonal fallback after a Hesse failure.
    #[must_use]
    pub fn hesse_failed(matrix: SymMatrix) -> Self {
        Self::with_status(matrix, ErrorMatrixStatus::HesseFailed)
    }

    /// Matrix forced positive definite.
    #[must_use]
    pub fn made_pos_def(matrix: SymMatrix) -> Self {
        Self::with_status(matrix, ErrorMatrixStatus::MadePosDef)
    }

    /// Diagonal fallback after a failed inversion.
    #[must_use]
    pub fn invert_failed(matrix: SymMatrix) -> Self {
        Self::with_status(matrix, ErrorMatrixStatus::InvertFailed)
    }

    /// Matrix known not to be positive definite.
    #[must_use]
    pub fn not_pos_def(matrix: SymMatrix) -> Self {
        Self::with_status(matrix, ErrorMatrixStatus::NotPosDef)
    }

    fn with_status(matrix: SymMatrix, status: ErrorMatrixStatus) -> Self {
        Self {
            matrix,
            dcovar: 1.0,
            status,
        }
    }

    /// The inverse Hessian.
    pub fn inv_hessian(&self) -> &SymMatrix {
        &self.matrix
    }

    /// Covariance in internal units, `2·V`.
    #[must_use]
    pub fn matrix(&self) -> SymMatrix {
        &self.matrix * 2.0
    }

    /// The Hessian, or the reciprocal diagonal if the matrix is singular.
    #[must_use]
    pub fn hessian(&self) -> SymMatrix {
        match self.matrix.invert() {
            Ok(h) => h,
            Err(_) => {
                warn!("error matrix inversion failed; using diagonal Hessian");
                let diag: Vec<f64> = (0..self.matrix.size())
                    .map(|i| 1.0 / self.matrix.get(i, i))
                    .collect();
                SymMatrix::from_diagonal(&diag)
            }
        }
    }

    /// Relative change of the last update.
    pub fn dcovar(&self) -> f64 {
        self.dcovar
    }

    /// Matrix condition.
    pub fn status(&self) -> ErrorMatrixStatus {
        self.status
    }

    /// Returns true when `dcovar < 0.1`.
    pub fn is_accurate(&self) -> bool {
        self.dcovar < 0.1
    }

    /// Returns true for a usable covariance.
    pub fn is_valid(&self) -> bool {
        self.status == ErrorMatrixStatus::Valid
    }

    /// Returns true if an estimate exists.
    pub fn is_available(&self) -> bool {
        self.status != ErrorMatrixStatus::NotAvailable
    }

    /// Returns true if positive definite.
    pub fn is_pos_def(&self) -> bool {
        matches!(
            self.status,
            ErrorMatrixStatus::Valid | ErrorMatrixStatus::InvertFailed
        )
    }

    /// Returns true if forced positive definite.
    pub fn is_made_pos_def(&self) -> bool {
        self.status == ErrorMatrixStatus::MadePosDef
    }

    /// Returns true if Hesse failed.
    pub fn is_hesse_failed(&self) -> bool {
        self.status == ErrorMatrixStatus::HesseFailed
    }

    /// Returns true if an inversion failed.
    pub fn is_invert_failed(&self) -> bool {
        self.status == ErrorMatrixStatus::InvertFailed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_flags() {
        let m = SymMatrix::identity(2);
        let e = MinimumError::new(m.clone(), 0.05);
        assert!(e.is_valid() && e.is_pos_def() && e.is_available() && e.is_accurate());

        let e = MinimumError::made_pos_def(m.clone());
        assert!(!e.is_valid() && e.is_made_pos_def() && !e.is_accurate());

        let e = MinimumError::invert_failed(m.clone());
        assert!(e.is_pos_def() && e.is_invert_failed() && !e.is_valid());

        let e = MinimumError::not_available(2);
        assert!(!e.is_available());
        assert!(MinimumError::hesse_failed(m).is_hesse_failed());
    }

    #[test]
    fn test_matrix_and_hessian() {
        let e = MinimumError::new(SymMatrix::from_diagonal(&[0.5, 0.25]), 0.0);
        assert_relative_eq!(e.matrix().get(0, 0), 1.0);
        assert_relative_eq!(e.hessian().get(1, 1), 4.0, epsilon = 1e-12);

        let singular = MinimumError::new(SymMatrix::from_diagonal(&[2.0, -1.0]), 0.0);
        let h = singular.hessian();
        assert_relative_eq!(h.get(0, 0), 0.5);
        assert_relative_eq!(h.get(1, 1), -1.0);
    }
}
