//! Error types for permutation inference.

use serde::{Deserialize, Serialize};

/// Numeric failure of a single unit's model.
///
/// These are always attributed to a unit (and, for per-fit failures, a
/// permutation) by [`Error::UnitFit`]; they are never turned into a zero
/// statistic that would be indistinguishable from a null result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum FitError {
    /// `Zᵗ W Z` is not positive definite, so the nuisance annihilator
    /// cannot be formed.
    #[error("nuisance design Z'WZ is singular")]
    SingularNuisance,

    /// `Xᵗ W X` is not positive definite, so the weighted fit is undefined.
    #[error("weighted design X'WX is singular")]
    SingularDesign,

    /// The fitted coefficient or F-statistic is NaN or infinite
    /// (for example a zero residual variance).
    #[error("fit produced a non-finite statistic")]
    NonFiniteStatistic,
}

/// Errors that can occur while setting up or running an analysis.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed configuration; reported before any computation starts.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// What is wrong with the configuration.
        message: String,
    },

    /// Two inputs disagree on a dimension.
    #[error("shape mismatch in {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Which dimension is inconsistent.
        what: &'static str,
        /// Size implied by the other inputs.
        expected: usize,
        /// Size actually provided.
        actual: usize,
    },

    /// Input values that are well-shaped but unusable.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of the offending input.
        message: String,
    },

    /// A unit's model failed numerically.
    #[error("unit {unit}{}: {source}", describe_permutation(.permutation))]
    UnitFit {
        /// Index of the spatial unit.
        unit: usize,
        /// Permutation row, or `None` when the failure happened while
        /// preparing the unit (and so affects every permutation).
        permutation: Option<usize>,
        /// The underlying numeric failure.
        #[source]
        source: FitError,
    },

    /// A statistic map's peak is too large to sweep with the configured
    /// threshold step, usually because a unit fits almost exactly.
    #[error(
        "statistic {statistic:e} at unit {unit}{} needs more than {limit} thresholds",
        describe_permutation(.permutation)
    )]
    SweepTooLong {
        /// Unit holding the peak statistic.
        unit: usize,
        /// The peak statistic.
        statistic: f64,
        /// Configured `max_thresholds`.
        limit: usize,
        /// Permutation row of the map, when known.
        permutation: Option<usize>,
    },

    /// A result could not be handed to its sink.
    #[error("failed to persist {stem}: {source}")]
    Persist {
        /// File stem of the run being written.
        stem: String,
        /// Serialisation or I/O failure.
        #[source]
        source: serde_json::Error,
    },
}

fn describe_permutation(permutation: &Option<usize>) -> String {
    match permutation {
        Some(p) => format!(" (permutation {})", p),
        None => String::new(),
    }
}

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
