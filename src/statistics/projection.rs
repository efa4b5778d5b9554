//! Weighted nuisance annihilator.
//!
//! For a nuisance sub-design `Z` and diagonal weight `W` the residual-forming
//! matrix is
//!
//! ```text
//! Rz = I - Z (Zᵗ W Z)⁻¹ Zᵗ W
//! ```
//!
//! `Rz` is idempotent and annihilates the nuisance columns (`Rz·Z = 0`).
//! Applying it to a unit's response before sign flipping is the
//! Freedman-Lane style restriction of Winkler et al. (2014), pg. 385: only
//! the part of the signal not explained by nuisance regressors is permuted.
//!
//! The weight differs from unit to unit, so `Rz` is per unit.

use crate::error::FitError;
use crate::math::{spd_cholesky, weighted_transpose};
use crate::types::{Matrix, Vector};

/// Build the weighted annihilator `Rz` for one unit.
///
/// # Arguments
///
/// * `z` - Nuisance design, subjects × nuisance predictors (may have zero columns)
/// * `weights` - Diagonal of `W`, one weight per subject
///
/// # Returns
///
/// The `n × n` projector, or [`FitError::SingularNuisance`] when `Zᵗ W Z`
/// cannot be factorised.
pub fn nuisance_projector(z: &Matrix, weights: &Vector) -> Result<Matrix, FitError> {
    let n = z.nrows();
    debug_assert_eq!(weights.len(), n);
    if z.ncols() == 0 {
        return Ok(Matrix::identity(n, n));
    }

    let ztw = weighted_transpose(z, weights);
    let chol = spd_cholesky(&ztw * z).ok_or(FitError::SingularNuisance)?;

    // (Zᵗ W Z)⁻¹ Zᵗ W, solved column by column rather than inverted
    let hat_coef = chol.solve(&ztw);
    Ok(Matrix::identity(n, n) - z * hat_coef)
}

/// Residualise a response: `Rz · y`.
pub fn residualize(projector: &Matrix, response: &Vector) -> Vector {
    projector * response
}
