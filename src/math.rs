//! Small dense linear-algebra helpers shared by the projector and the fitter.

use nalgebra::{Cholesky, Dyn};

use crate::types::{Matrix, Vector};

/// Cholesky factor of a symmetric positive definite matrix.
///
/// Returns `None` when factorisation fails or when the smallest pivot is
/// negligible next to the largest diagonal entry, i.e. the matrix is
/// singular to working precision. No pseudo-inverse fallback exists.
pub(crate) fn spd_cholesky(matrix: Matrix) -> Option<Cholesky<f64, Dyn>> {
    let dim = matrix.nrows();
    let max_diag = matrix.diagonal().iter().fold(0.0_f64, |acc, &d| acc.max(d));
    if !(max_diag.is_finite() && max_diag > 0.0) {
        return None;
    }
    let chol = Cholesky::new(matrix)?;
    let min_pivot = chol
        .l_dirty()
        .diagonal()
        .iter()
        .fold(f64::INFINITY, |acc, &l| acc.min(l * l));
    let tolerance = f64::EPSILON * dim as f64 * max_diag;
    (min_pivot > tolerance).then_some(chol)
}

/// `Aᵗ W` for a diagonal weight `W` given as a vector.
pub(crate) fn weighted_transpose(a: &Matrix, weights: &Vector) -> Matrix {
    let mut at = a.transpose();
    for (j, mut column) in at.column_iter_mut().enumerate() {
        column *= weights[j];
    }
    at
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spd_cholesky_accepts_identity() {
        assert!(spd_cholesky(Matrix::identity(3, 3)).is_some());
    }

    #[test]
    fn test_spd_cholesky_rejects_rank_deficient() {
        let m = Matrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        assert!(spd_cholesky(m).is_none());
        assert!(spd_cholesky(Matrix::zeros(2, 2)).is_none());
    }

    #[test]
    fn test_weighted_transpose() {
        let a = Matrix::from_row_slice(2, 1, &[1.0, 2.0]);
        let w = Vector::from_vec(vec![3.0, 0.5]);
        let atw = weighted_transpose(&a, &w);
        assert_eq!(atw.shape(), (1, 2));
        assert_eq!(atw[(0, 0)], 3.0);
        assert_eq!(atw[(0, 1)], 1.0);
    }
}
