//! Weighted least squares with an F-test on the effect of interest.
//!
//! Model: `y = X β + ε`, `Var(ε) ∝ W⁻¹`, with `W` diagonal.
//!
//! ```text
//! β̂   = (Xᵗ W X)⁻¹ Xᵗ W y
//! σ̂²  = (y - X β̂)ᵗ W (y - X β̂) / (n - p)
//! F   = β̂₀² / (σ̂² [(Xᵗ W X)⁻¹]₀₀)
//! ```
//!
//! `F` tests the first column (the effect of interest) against residual
//! variance with `(1, n - p)` degrees of freedom.
//!
//! The factorisation of `Xᵗ W X` depends only on the unit's weights, so
//! [`WlsModel`] is built once per unit and reused for every permutation.

use nalgebra::{Cholesky, Dyn};

use crate::error::FitError;
use crate::math::{spd_cholesky, weighted_transpose};
use crate::types::{Matrix, Vector};

/// Result of one weighted fit.
#[derive(Debug, Clone, PartialEq)]
pub struct WlsFit {
    /// All coefficients, effect of interest first.
    pub coefficients: Vector,
    /// F-statistic for the effect of interest.
    pub f_statistic: f64,
    /// Weighted residual variance `σ̂²`.
    pub residual_variance: f64,
    /// Residual degrees of freedom `n - p`.
    pub dof: usize,
}

impl WlsFit {
    /// Coefficient of the effect of interest.
    pub fn effect(&self) -> f64 {
        self.coefficients[0]
    }
}

/// Weighted design factorised for one unit.
#[derive(Debug, Clone)]
pub struct WlsModel {
    weights: Vector,
    xtw: Matrix,
    chol: Cholesky<f64, Dyn>,
    /// `[(Xᵗ W X)⁻¹]₀₀`
    effect_variance_factor: f64,
    dof: usize,
}

impl WlsModel {
    /// Factorise `Xᵗ W X` for the given design and weights.
    ///
    /// The design is not retained; pass the same `x` to [`WlsModel::fit`].
    ///
    /// Fails with [`FitError::SingularDesign`] when the weighted design is
    /// rank deficient.
    pub fn new(x: &Matrix, weights: &Vector) -> Result<Self, FitError> {
        debug_assert_eq!(weights.len(), x.nrows());
        let xtw = weighted_transpose(x, weights);
        let chol = spd_cholesky(&xtw * x).ok_or(FitError::SingularDesign)?;

        let p = x.ncols();
        let mut e0 = Vector::zeros(p);
        e0[0] = 1.0;
        let effect_variance_factor = chol.solve(&e0)[0];

        Ok(Self {
            weights: weights.clone(),
            xtw,
            chol,
            effect_variance_factor,
            dof: x.nrows().saturating_sub(p),
        })
    }

    /// Residual degrees of freedom.
    pub fn dof(&self) -> usize {
        self.dof
    }

    /// Fit one response vector against the design the model was built from.
    ///
    /// A zero residual variance or any other non-finite outcome is
    /// reported as [`FitError::NonFiniteStatistic`].
    pub fn fit(&self, x: &Matrix, y: &Vector) -> Result<WlsFit, FitError> {
        debug_assert_eq!(x.shape(), (self.xtw.ncols(), self.xtw.nrows()));
        let coefficients = self.chol.solve(&(&self.xtw * y));
        let residuals = y - x * &coefficients;
        let rss: f64 = residuals
            .iter()
            .zip(self.weights.iter())
            .map(|(r, w)| w * r * r)
            .sum();

        let dof = self.dof;
        let residual_variance = rss / dof as f64;
        let beta = coefficients[0];
        let f_statistic = beta * beta / (residual_variance * self.effect_variance_factor);

        if !(beta.is_finite() && f_statistic.is_finite()) {
            return Err(FitError::NonFiniteStatistic);
        }

        Ok(WlsFit {
            coefficients,
            f_statistic,
            residual_variance,
            dof,
        })
    }
}

/// One-shot weighted fit of `y` on `x`.
pub fn wls(x: &Matrix, y: &Vector, weights: &Vector) -> Result<WlsFit, FitError> {
    WlsModel::new(x, weights)?.fit(x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::projection::{nuisance_projector, residualize};

    fn design() -> Matrix {
        Matrix::from_row_slice(6, 2, &[
            -1.5, 1.0, //
            -0.5, 1.0, //
            0.0, 1.0, //
            0.5, 1.0, //
            1.0, 1.0, //
            2.5, 1.0,
        ])
    }

    #[test]
    fn test_ols_matches_closed_form() {
        // y = 2x + 1 + small noise
        let x = design();
        let y = Vector::from_vec(vec![-2.1, 0.05, 1.1, 1.9, 3.05, 5.9]);
        let fit = wls(&x, &y, &Vector::from_element(6, 1.0)).unwrap();

        // closed-form simple regression
        let xs: Vec<f64> = x.column(0).iter().copied().collect();
        let n = xs.len() as f64;
        let mx = xs.iter().sum::<f64>() / n;
        let my = y.iter().sum::<f64>() / n;
        let sxy: f64 = xs.iter().zip(y.iter()).map(|(a, b)| (a - mx) * (b - my)).sum();
        let sxx: f64 = xs.iter().map(|a| (a - mx) * (a - mx)).sum();
        let slope = sxy / sxx;
        assert!((fit.effect() - slope).abs() < 1e-10);
        assert!((fit.coefficients[1] - (my - slope * mx)).abs() < 1e-10);

        // F equals squared t-statistic of the slope
        let rss: f64 = xs
            .iter()
            .zip(y.iter())
            .map(|(a, b)| {
                let r = b - (my - slope * mx) - slope * a;
                r * r
            })
            .sum();
        let se2 = rss / (n - 2.0) / sxx;
        let expected = slope * slope / se2;
        assert!((fit.f_statistic - expected).abs() < 1e-9 * expected);
        assert_eq!(fit.dof, 4);
    }

    #[test]
    fn test_weights_scale_invariance() {
        let x = design();
        let y = Vector::from_vec(vec![0.3, -1.0, 0.4, 2.0, 0.1, 1.7]);
        let w = Vector::from_vec(vec![1.0, 2.0, 0.5, 1.0, 3.0, 1.0]);
        let a = wls(&x, &y, &w).unwrap();
        let b = wls(&x, &y, &(&w * 10.0)).unwrap();
        assert!((a.effect() - b.effect()).abs() < 1e-10);
        assert!((a.f_statistic - b.f_statistic).abs() < 1e-9 * a.f_statistic.max(1.0));
    }

    #[test]
    fn test_f_statistic_non_negative() {
        let x = design();
        let y = Vector::from_vec(vec![1.0, -1.0, 2.0, -2.0, 0.5, -0.5]);
        let fit = wls(&x, &y, &Vector::from_element(6, 1.0)).unwrap();
        assert!(fit.f_statistic >= 0.0);
    }

    #[test]
    fn test_singular_design_reported() {
        let mut x = design();
        x.column_mut(0).fill(1.0);
        let y = Vector::from_element(6, 1.0);
        assert_eq!(
            wls(&x, &y, &Vector::from_element(6, 1.0)).unwrap_err(),
            FitError::SingularDesign
        );
    }

    #[test]
    fn test_exact_fit_is_non_finite() {
        let x = design();
        let y = Vector::zeros(6);
        assert_eq!(
            wls(&x, &y, &Vector::from_element(6, 1.0)).unwrap_err(),
            FitError::NonFiniteStatistic
        );
    }

    #[test]
    fn test_model_reused_across_responses() {
        // One factorisation serves every flipped response of a unit
        let x = design();
        let w = Vector::from_vec(vec![1.0, 0.5, 2.0, 1.5, 0.8, 1.2]);
        let model = WlsModel::new(&x, &w).unwrap();
        assert_eq!(model.dof(), 4);

        let y = Vector::from_vec(vec![0.9, -1.4, 2.2, 2.0, -3.1, 4.4]);
        for signs in [[1.0, 1.0, -1.0, 1.0, -1.0, 1.0], [-1.0; 6]] {
            let flipped = y.component_mul(&Vector::from_row_slice(&signs));
            let reused = model.fit(&x, &flipped).unwrap();
            let fresh = wls(&x, &flipped, &w).unwrap();
            assert_eq!(reused.coefficients, fresh.coefficients);
            assert_eq!(reused.f_statistic, fresh.f_statistic);
            assert_eq!(reused.dof, fresh.dof);
        }
    }

    #[test]
    fn test_residualized_fit_matches_direct_fit() {
        // Frisch-Waugh-Lovell: projecting out the nuisance columns first
        // leaves the effect estimate and its F-test unchanged.
        let x = design();
        let z = Matrix::from_fn(6, 1, |i, _| x[(i, 1)]);
        let w = Vector::from_vec(vec![1.0, 0.5, 2.0, 1.5, 0.8, 1.2]);
        let y = Vector::from_vec(vec![0.9, 1.4, 2.2, 2.0, 3.1, 4.4]);

        let direct = wls(&x, &y, &w).unwrap();
        let rz = nuisance_projector(&z, &w).unwrap();
        let residualized = wls(&x, &residualize(&rz, &y), &w).unwrap();

        assert!((direct.effect() - residualized.effect()).abs() < 1e-10);
        assert!(
            (direct.f_statistic - residualized.f_statistic).abs()
                < 1e-9 * direct.f_statistic.max(1.0)
        );
    }
}
