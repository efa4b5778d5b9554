//! Result types for permutation inference.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::{fwe_pvalues, max_statistic_null, ClusterLabels};
use crate::data::Eligibility;
use crate::error::{Error, FitError, Result};
use crate::types::Tail;

// ============================================================================
// ResultTensors - coefficient and statistic maps
// ============================================================================

/// Coefficient (`Bmap`) and enhanced statistic (`Fmap`) maps, shaped
/// `[n_permutations, n_units]` and stored row-major.
///
/// Every cell starts at zero. Cells of ineligible units are never written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultTensors {
    n_permutations: usize,
    n_units: usize,
    bmap: Vec<f64>,
    fmap: Vec<f64>,
}

impl ResultTensors {
    /// Zero-initialised tensors.
    pub fn zeros(n_permutations: usize, n_units: usize) -> Self {
        Self {
            n_permutations,
            n_units,
            bmap: vec![0.0; n_permutations * n_units],
            fmap: vec![0.0; n_permutations * n_units],
        }
    }

    /// `[n_permutations, n_units]`.
    pub fn shape(&self) -> [usize; 2] {
        [self.n_permutations, self.n_units]
    }

    /// Number of permutation rows.
    pub fn n_permutations(&self) -> usize {
        self.n_permutations
    }

    /// Number of spatial units per row.
    pub fn n_units(&self) -> usize {
        self.n_units
    }

    /// Fitted effect coefficients of permutation `p`.
    pub fn bmap_row(&self, p: usize) -> &[f64] {
        &self.bmap[p * self.n_units..(p + 1) * self.n_units]
    }

    /// Enhanced statistics of permutation `p`.
    pub fn fmap_row(&self, p: usize) -> &[f64] {
        &self.fmap[p * self.n_units..(p + 1) * self.n_units]
    }

    /// Single coefficient cell.
    pub fn bmap(&self, p: usize, unit: usize) -> f64 {
        self.bmap[p * self.n_units + unit]
    }

    /// Single statistic cell.
    pub fn fmap(&self, p: usize, unit: usize) -> f64 {
        self.fmap[p * self.n_units + unit]
    }

    /// Iterate statistic rows in permutation order.
    pub fn fmap_rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.fmap.chunks(self.n_units.max(1)).take(self.n_permutations)
    }

    /// Whole coefficient tensor, row-major.
    pub fn bmap_flat(&self) -> &[f64] {
        &self.bmap
    }

    /// Whole statistic tensor, row-major.
    pub fn fmap_flat(&self) -> &[f64] {
        &self.fmap
    }

    /// Mutable coefficient and statistic buffers, for filling disjoint rows.
    pub(crate) fn buffers_mut(&mut self) -> (&mut [f64], &mut [f64]) {
        (&mut self.bmap, &mut self.fmap)
    }
}

// ============================================================================
// Failures
// ============================================================================

/// A unit that could not be fit under [`FailurePolicy::Isolate`](crate::FailurePolicy::Isolate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFailure {
    /// Spatial unit index.
    pub unit: usize,
    /// Permutation row, or `None` if the unit failed during preparation and
    /// is missing from every row.
    pub permutation: Option<usize>,
    /// What went wrong.
    pub reason: FitError,
}

impl From<UnitFailure> for Error {
    fn from(failure: UnitFailure) -> Self {
        Error::UnitFit {
            unit: failure.unit,
            permutation: failure.permutation,
            source: failure.reason,
        }
    }
}

// ============================================================================
// RunLabel - identifies a run for persistence
// ============================================================================

/// Identifies a run to the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunLabel {
    /// Model name.
    pub model: String,
    /// Experimental condition.
    pub condition: String,
    /// Surface or volume space.
    pub space: String,
    /// Requested permutation count; zero means observed-only.
    pub permutations: usize,
}

impl RunLabel {
    /// Create a label.
    pub fn new(
        model: impl Into<String>,
        condition: impl Into<String>,
        space: impl Into<String>,
        permutations: usize,
    ) -> Self {
        Self {
            model: model.into(),
            condition: condition.into(),
            space: space.into(),
            permutations,
        }
    }

    /// File stem: `model.condition.space_obs` or
    /// `model.condition.space_perm-N`.
    pub fn stem(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RunLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.model, self.condition, self.space)?;
        if self.permutations > 0 {
            write!(f, "_perm-{}", self.permutations)
        } else {
            write!(f, "_obs")
        }
    }
}

// ============================================================================
// RunResult - everything a run produces
// ============================================================================

/// Output of [`PermutationEngine::run`](crate::PermutationEngine::run).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Coefficient and enhanced statistic maps.
    pub tensors: ResultTensors,

    /// Units that were modelled (after removing preparation failures).
    pub eligibility: Eligibility,

    /// Units that failed and were isolated. Empty under the abort policy.
    pub failures: Vec<UnitFailure>,

    /// Clusters of each permutation row at the first threshold, when
    /// requested in the configuration.
    pub cluster_labels: Option<Vec<ClusterLabels>>,

    /// Tail used for enhancement.
    pub tail: Tail,

    /// Whether permutation row 0 is the unpermuted (all-ones) sign vector.
    pub observed_first: bool,
}

impl RunResult {
    /// Number of permutation rows.
    pub fn n_permutations(&self) -> usize {
        self.tensors.n_permutations()
    }

    /// True when at least one unit was isolated.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// FWE-corrected p-values of the observed row against the remaining
    /// rows' maximum statistics.
    ///
    /// Requires row 0 to be the observed map and at least one further row.
    pub fn corrected_pvalues(&self) -> Result<Vec<f64>> {
        if !self.observed_first {
            return Err(Error::InvalidInput {
                message: "permutation row 0 is not the observed sign vector".to_string(),
            });
        }
        let null = max_statistic_null(self.tensors.fmap_rows().skip(1), self.tail);
        fwe_pvalues(self.tensors.fmap_row(0), &null, self.tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensors_zero_initialised() {
        let t = ResultTensors::zeros(2, 3);
        assert_eq!(t.shape(), [2, 3]);
        assert!(t.bmap_flat().iter().all(|&v| v == 0.0));
        assert_eq!(t.fmap_row(1), &[0.0; 3]);
        assert_eq!(t.fmap_rows().count(), 2);
    }

    #[test]
    fn test_row_layout() {
        let mut t = ResultTensors::zeros(2, 3);
        {
            let (b, f) = t.buffers_mut();
            b[4] = 1.5;
            f[2] = 7.0;
        }
        assert_eq!(t.bmap(1, 1), 1.5);
        assert_eq!(t.fmap(0, 2), 7.0);
        assert_eq!(t.bmap_row(1), &[0.0, 1.5, 0.0]);
    }

    #[test]
    fn test_run_label_stem() {
        assert_eq!(
            RunLabel::new("glm", "reward", "fsaverage5", 0).stem(),
            "glm.reward.fsaverage5_obs"
        );
        assert_eq!(
            RunLabel::new("glm", "reward", "mni305", 5000).stem(),
            "glm.reward.mni305_perm-5000"
        );
    }

    #[test]
    fn test_failure_into_error() {
        let err: Error = UnitFailure {
            unit: 4,
            permutation: Some(1),
            reason: FitError::NonFiniteStatistic,
        }
        .into();
        assert!(matches!(err, Error::UnitFit { unit: 4, permutation: Some(1), .. }));
    }

    #[test]
    fn test_corrected_pvalues_require_observed_row() {
        let mut t = ResultTensors::zeros(3, 2);
        {
            let (_, f) = t.buffers_mut();
            f.copy_from_slice(&[5.0, 1.0, 2.0, 0.5, 6.0, 0.0]);
        }
        let mut result = RunResult {
            tensors: t,
            eligibility: Eligibility::from_mask(vec![true, true]),
            failures: Vec::new(),
            cluster_labels: None,
            tail: Tail::Positive,
            observed_first: true,
        };
        // null maxima 2.0 and 6.0
        assert_eq!(result.corrected_pvalues().unwrap(), vec![2.0 / 3.0, 1.0]);

        result.observed_first = false;
        assert!(result.corrected_pvalues().is_err());
    }
}
