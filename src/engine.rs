//! Main `PermutationEngine` entry point and builder.
//!
//! A run has three stages:
//!
//! 1. **Preparation**: every eligible unit gets its nuisance-residualised
//!    response `Rz·y` and its factorised weighted design. Both depend only on
//!    the unit, so they are computed once and shared by every permutation.
//! 2. **Permutation rows**: each sign vector is applied to every prepared
//!    unit, the unit is refit, and the row's coefficient and F maps are
//!    written. Rows are independent and run in parallel with the `parallel`
//!    feature.
//! 3. **Enhancement**: the F map of each row is replaced by its TFCE scores
//!    over the eligible subgraph.

use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::analysis::{ClusterLabels, Tfce};
use crate::config::{Config, ThresholdSweep};
use crate::data::{Adjacency, Dataset};
use crate::error::{Error, FitError, Result};
use crate::result::{ResultTensors, RunResult, UnitFailure};
use crate::statistics::{apply_sign_flip, nuisance_projector, residualize, SignFlipSet, WlsModel};
use crate::types::{FailurePolicy, Matrix, Tail, Vector};

/// Main entry point for sign-flip permutation inference.
///
/// Use the builder pattern to configure, then call [`PermutationEngine::run`].
///
/// # Example
///
/// ```ignore
/// use signflip_tfce::{PermutationEngine, SignFlipSet, Tail};
///
/// let flips = SignFlipSet::random(dataset.n_subjects(), 5000, 42)?;
/// let result = PermutationEngine::new()
///     .tail(Tail::Positive)
///     .max_step(2)
///     .run(&dataset, &adjacency, &flips)?;
/// let p = result.corrected_pvalues()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct PermutationEngine {
    config: Config,
}

impl PermutationEngine {
    /// Create with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with an explicit configuration.
    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    /// Set the TFCE threshold sweep.
    pub fn threshold(mut self, sweep: ThresholdSweep) -> Self {
        self.config.threshold = sweep;
        self
    }

    /// Set the enhanced tail.
    pub fn tail(mut self, tail: Tail) -> Self {
        self.config.tail = tail;
        self
    }

    /// Set the hop limit for cluster growth.
    pub fn max_step(mut self, max_step: usize) -> Self {
        self.config.max_step = max_step;
        self
    }

    /// Set how unit fit failures are handled.
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    /// Keep cluster labels of every permutation row.
    pub fn keep_cluster_labels(mut self, keep: bool) -> Self {
        self.config.keep_cluster_labels = keep;
        self
    }

    /// Get the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run every sign vector of `flips` over `dataset`.
    ///
    /// # Arguments
    ///
    /// * `dataset` - Design, contrast estimates and variances
    /// * `adjacency` - Neighbourhood graph over the dataset's units
    /// * `flips` - Sign vectors; row 0 is conventionally the identity
    ///
    /// # Errors
    ///
    /// Configuration and shape errors are reported before any fitting.
    /// Under [`FailurePolicy::Abort`], the failing unit with the lowest
    /// permutation row, then the lowest unit index, is reported.
    pub fn run(
        &self,
        dataset: &Dataset,
        adjacency: &Adjacency,
        flips: &SignFlipSet,
    ) -> Result<RunResult> {
        self.config.validate()?;
        check_shapes(dataset, adjacency, flips)?;

        let start = Instant::now();
        let n_units = dataset.n_units();
        let n_permutations = flips.len();
        let policy = self.config.failure_policy;

        let eligibility = dataset.eligibility();
        tracing::info!(
            "Permutation run: {} units ({} eligible), {} subjects, {} permutations",
            n_units,
            eligibility.len(),
            dataset.n_subjects(),
            n_permutations
        );

        // Stage 1: per-unit preparation
        let prepared: Vec<(usize, std::result::Result<UnitModel, FitError>)> = {
            #[cfg(feature = "parallel")]
            let iter = eligibility.index().par_iter();
            #[cfg(not(feature = "parallel"))]
            let iter = eligibility.index().iter();
            iter.map(|&unit| (unit, UnitModel::prepare(dataset, unit)))
                .collect()
        };

        let mut models = Vec::with_capacity(prepared.len());
        let mut failures = Vec::new();
        for (unit, outcome) in prepared {
            match outcome {
                Ok(model) => models.push(model),
                Err(reason) => {
                    let failure = UnitFailure {
                        unit,
                        permutation: None,
                        reason,
                    };
                    if policy == FailurePolicy::Abort {
                        return Err(failure.into());
                    }
                    tracing::warn!("Unit {} excluded: {}", unit, reason);
                    failures.push(failure);
                }
            }
        }

        let failed_units: Vec<usize> = failures.iter().map(|f| f.unit).collect();
        let eligibility = eligibility.without(&failed_units);
        let tfce = Tfce::from_config(adjacency, eligibility.include(), &self.config)?;
        tracing::debug!(
            "Prepared {} unit models ({} failed)",
            models.len(),
            failed_units.len()
        );

        // Stage 2 and 3: permutation rows
        let mut tensors = ResultTensors::zeros(n_permutations, n_units);
        let rows: Vec<Result<RowOutcome>> = {
            let job = RowJob {
                design: dataset.design().full(),
                models: &models,
                tfce: &tfce,
                flips,
                policy,
                keep_labels: self.config.keep_cluster_labels,
            };
            let chunk = n_units.max(1);
            let (bmap, fmap) = tensors.buffers_mut();

            #[cfg(feature = "parallel")]
            let rows: Vec<Result<RowOutcome>> = bmap
                .par_chunks_mut(chunk)
                .zip(fmap.par_chunks_mut(chunk))
                .enumerate()
                .map(|(p, (b, f))| job.fill(p, b, f))
                .collect();
            #[cfg(not(feature = "parallel"))]
            let rows: Vec<Result<RowOutcome>> = bmap
                .chunks_mut(chunk)
                .zip(fmap.chunks_mut(chunk))
                .enumerate()
                .map(|(p, (b, f))| job.fill(p, b, f))
                .collect();
            rows
        };

        let mut cluster_labels = self.config.keep_cluster_labels.then(Vec::new);
        for row in rows {
            let outcome = row?;
            for failure in &outcome.failures {
                tracing::warn!(
                    "Unit {} failed at permutation {:?}: {}",
                    failure.unit,
                    failure.permutation,
                    failure.reason
                );
            }
            failures.extend(outcome.failures);
            if let (Some(all), Some(labels)) = (cluster_labels.as_mut(), outcome.labels) {
                all.push(labels);
            }
        }

        tracing::info!(
            "Permutation run finished in {:.2}s ({} unit failures)",
            start.elapsed().as_secs_f64(),
            failures.len()
        );

        Ok(RunResult {
            tensors,
            eligibility,
            failures,
            cluster_labels,
            tail: self.config.tail,
            observed_first: n_permutations > 0 && flips.is_identity(0),
        })
    }
}

fn check_shapes(dataset: &Dataset, adjacency: &Adjacency, flips: &SignFlipSet) -> Result<()> {
    if adjacency.n_units() != dataset.n_units() {
        return Err(Error::ShapeMismatch {
            what: "adjacency units",
            expected: dataset.n_units(),
            actual: adjacency.n_units(),
        });
    }
    if flips.is_empty() {
        return Err(Error::InvalidInput {
            message: "sign-flip set has no rows".to_string(),
        });
    }
    if flips.n_subjects() != dataset.n_subjects() {
        return Err(Error::ShapeMismatch {
            what: "sign-flip subjects",
            expected: dataset.n_subjects(),
            actual: flips.n_subjects(),
        });
    }
    Ok(())
}

/// Everything about one unit that is shared across permutations.
#[derive(Debug)]
struct UnitModel {
    unit: usize,
    /// `Rz · y`
    residualized: Vector,
    model: WlsModel,
}

impl UnitModel {
    fn prepare(dataset: &Dataset, unit: usize) -> std::result::Result<Self, FitError> {
        let design = dataset.design();
        let weights = dataset.weights(unit);
        let projector = nuisance_projector(design.nuisance(), &weights)?;
        let residualized = residualize(&projector, &dataset.response(unit));
        let model = WlsModel::new(design.full(), &weights)?;
        Ok(Self {
            unit,
            residualized,
            model,
        })
    }
}

struct RowOutcome {
    failures: Vec<UnitFailure>,
    labels: Option<ClusterLabels>,
}

/// Shared, read-only state for filling permutation rows.
struct RowJob<'a> {
    /// Full design shared by every unit model.
    design: &'a Matrix,
    models: &'a [UnitModel],
    tfce: &'a Tfce,
    flips: &'a SignFlipSet,
    policy: FailurePolicy,
    keep_labels: bool,
}

impl RowJob<'_> {
    /// Fit every prepared unit under sign vector `p` into `bmap`/`fmap`, then
    /// replace `fmap` by its enhancement.
    fn fill(&self, p: usize, bmap: &mut [f64], fmap: &mut [f64]) -> Result<RowOutcome> {
        let signs = self.flips.row(p);
        let mut failures = Vec::new();

        for unit in self.models {
            let flipped = apply_sign_flip(signs, &unit.residualized);
            match unit.model.fit(self.design, &flipped) {
                Ok(fit) => {
                    bmap[unit.unit] = fit.effect();
                    fmap[unit.unit] = fit.f_statistic;
                }
                Err(reason) => {
                    let failure = UnitFailure {
                        unit: unit.unit,
                        permutation: Some(p),
                        reason,
                    };
                    if self.policy == FailurePolicy::Abort {
                        return Err(failure.into());
                    }
                    failures.push(failure);
                }
            }
        }

        let enhanced = if self.keep_labels {
            self.tfce
                .enhance_with_labels(fmap)
                .map(|(scores, labels)| (scores, Some(labels)))
        } else {
            self.tfce.enhance(fmap).map(|scores| (scores, None))
        };
        let (scores, labels) = enhanced.map_err(|err| match err {
            Error::SweepTooLong {
                unit,
                statistic,
                limit,
                ..
            } => Error::SweepTooLong {
                unit,
                statistic,
                limit,
                permutation: Some(p),
            },
            other => other,
        })?;
        fmap.copy_from_slice(&scores);
        tracing::debug!("Permutation {} done", p);

        Ok(RowOutcome { failures, labels })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DesignMatrix;
    use crate::types::Matrix;

    fn design() -> DesignMatrix {
        DesignMatrix::from_rows(&[
            vec![1.0, 1.0],
            vec![-0.5, 1.0],
            vec![0.3, 1.0],
            vec![2.0, 1.0],
            vec![-1.2, 1.0],
        ])
        .unwrap()
    }

    fn dataset(cesvar: Matrix) -> Dataset {
        let ces = Matrix::from_row_slice(3, 5, &[
            1.2, 0.1, 0.8, 2.5, -0.4, //
            0.3, -0.2, 0.5, 0.9, 0.1, //
            -1.0, 0.4, -0.3, -2.2, 0.9,
        ]);
        Dataset::new(design(), ces, cesvar).unwrap()
    }

    fn chain(n: usize) -> Adjacency {
        Adjacency::from_edges(n, (1..n).map(|i| (i - 1, i))).unwrap()
    }

    #[test]
    fn test_observed_run_shape() {
        let data = dataset(Matrix::from_element(3, 5, 1.0));
        let result = PermutationEngine::new()
            .run(&data, &chain(3), &SignFlipSet::observed(5))
            .unwrap();
        assert_eq!(result.tensors.shape(), [1, 3]);
        assert!(result.observed_first);
        assert!(result.failures.is_empty());
        assert!(result.cluster_labels.is_none());
    }

    #[test]
    fn test_rows_are_independent_of_set_size() {
        let data = dataset(Matrix::from_element(3, 5, 1.0));
        let adj = chain(3);
        let flips = SignFlipSet::exhaustive(5).unwrap();
        let engine = PermutationEngine::new();
        let full = engine.run(&data, &adj, &flips).unwrap();

        let subset: Vec<Vec<f64>> = (0..4).map(|i| flips.row(i).to_vec()).collect();
        let partial = engine
            .run(&data, &adj, &SignFlipSet::from_rows(&subset).unwrap())
            .unwrap();
        for p in 0..4 {
            assert_eq!(full.tensors.bmap_row(p), partial.tensors.bmap_row(p));
            assert_eq!(full.tensors.fmap_row(p), partial.tensors.fmap_row(p));
        }
    }

    #[test]
    fn test_shape_errors() {
        let data = dataset(Matrix::from_element(3, 5, 1.0));
        let engine = PermutationEngine::new();
        assert!(matches!(
            engine.run(&data, &chain(4), &SignFlipSet::observed(5)),
            Err(Error::ShapeMismatch { what: "adjacency units", .. })
        ));
        assert!(matches!(
            engine.run(&data, &chain(3), &SignFlipSet::observed(4)),
            Err(Error::ShapeMismatch { what: "sign-flip subjects", .. })
        ));
    }

    #[test]
    fn test_invalid_config_rejected_before_fitting() {
        let data = dataset(Matrix::from_element(3, 5, 1.0));
        let mut config = Config::default();
        config.threshold.step = 0.0;
        let err = PermutationEngine::with_config(config)
            .run(&data, &chain(3), &SignFlipSet::observed(5))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn test_labels_kept_per_row() {
        let data = dataset(Matrix::from_element(3, 5, 1.0));
        let flips = SignFlipSet::random(5, 6, 7).unwrap();
        let result = PermutationEngine::new()
            .keep_cluster_labels(true)
            .run(&data, &chain(3), &flips)
            .unwrap();
        let labels = result.cluster_labels.unwrap();
        assert_eq!(labels.len(), 6);
        assert!(labels.iter().all(|l| l.labels.len() == 3));
    }
}
