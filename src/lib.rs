//! # signflip-tfce
//!
//! Sign-flip permutation inference for group-level neuroimaging maps.
//!
//! For every spatial unit (a vertex or voxel) the crate fits a weighted
//! linear model of per-subject contrast estimates on a design matrix whose
//! first column is the effect of interest, then enhances the resulting
//! F-statistic map with threshold-free cluster enhancement (TFCE) over the
//! spatial adjacency graph. Repeating this under random sign flips of the
//! nuisance-residualised data yields a null distribution for family-wise
//! error control.
//!
//! Per permutation `P` and unit `M`:
//!
//! ```text
//! W    = diag(|1 / cesvar[M]|)
//! Rz   = I - Z (Zᵗ W Z)⁻¹ Zᵗ W
//! y_P  = diag(signs[P]) · Rz · ces[M]
//! β, F = WLS(X, y_P, W)
//! Bmap[P, M] = β₀
//! Fmap[P, ·] = TFCE(F map of row P)
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use signflip_tfce::data::{Adjacency, Dataset, DesignMatrix};
//! use signflip_tfce::{PermutationEngine, SignFlipSet, DEFAULT_SEED};
//!
//! let dataset = Dataset::new(DesignMatrix::new(x)?, ces, cesvar)?;
//! let adjacency = Adjacency::from_edges(dataset.n_units(), edges)?;
//! let flips = SignFlipSet::random(dataset.n_subjects(), 1000, DEFAULT_SEED)?;
//!
//! let result = PermutationEngine::new().run(&dataset, &adjacency, &flips)?;
//! let pvalues = result.corrected_pvalues()?;
//! println!("{}", signflip_tfce::output::format_summary(&result));
//! ```
//!
//! ## Failures
//!
//! Singular weighted designs and non-finite statistics are never turned
//! into zeros silently. By default the first failing unit aborts the run;
//! with [`FailurePolicy::Isolate`] failures are listed in
//! [`RunResult::failures`] and the affected cells stay zero.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
mod config;
mod constants;
mod engine;
mod error;
mod math;
mod result;
mod types;

// Functional modules
pub mod analysis;
pub mod data;
pub mod output;
pub mod statistics;

// Re-exports for public API
pub use config::{Config, ThresholdSweep};
pub use constants::{
    DEFAULT_E_POWER, DEFAULT_H_POWER, DEFAULT_MAX_THRESHOLDS, DEFAULT_SEED, DEFAULT_TFCE_START,
    DEFAULT_TFCE_STEP, MAX_EXHAUSTIVE_SUBJECTS,
};
pub use engine::PermutationEngine;
pub use error::{Error, FitError, Result};
pub use result::{ResultTensors, RunLabel, RunResult, UnitFailure};
pub use statistics::SignFlipSet;
pub use types::{FailurePolicy, Matrix, Tail, Vector};
