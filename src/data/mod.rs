//! Inputs consumed by the analysis.
//!
//! Loading is left to the caller; this module only checks that the pieces
//! fit together and derives the quantities every later stage needs:
//!
//! - **Design** ([`DesignMatrix`]): subjects × predictors, column 0 is the
//!   effect of interest and the remaining columns are nuisance predictors
//! - **Dataset** ([`Dataset`]): per-unit contrast estimates and variances
//! - **Eligibility** ([`Eligibility`]): which units can be modelled at all
//! - **Adjacency** ([`Adjacency`]): the spatial neighbourhood graph
//!
//! # Example
//!
//! ```ignore
//! use signflip_tfce::data::{Dataset, DesignMatrix};
//!
//! let design = DesignMatrix::new(x)?;
//! let dataset = Dataset::new(design, ces, cesvar)?;
//! let eligibility = dataset.eligibility();
//! println!("{} of {} units eligible", eligibility.len(), dataset.n_units());
//! ```

mod adjacency;

pub use adjacency::Adjacency;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Matrix, Vector};

/// Design matrix with the effect of interest in column 0.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrix {
    x: Matrix,
    z: Matrix,
}

impl DesignMatrix {
    /// Wrap a subjects × predictors matrix.
    ///
    /// Requires at least one column, finite entries, and more subjects than
    /// predictors so that the residual variance has degrees of freedom.
    pub fn new(x: Matrix) -> Result<Self> {
        if x.ncols() == 0 {
            return Err(Error::InvalidInput {
                message: "design matrix has no columns".to_string(),
            });
        }
        if x.nrows() <= x.ncols() {
            return Err(Error::InvalidInput {
                message: format!(
                    "design needs more subjects than predictors (got {} subjects, {} predictors)",
                    x.nrows(),
                    x.ncols()
                ),
            });
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidInput {
                message: "design matrix contains non-finite entries".to_string(),
            });
        }
        let z = Matrix::from_fn(x.nrows(), x.ncols() - 1, |i, j| x[(i, j + 1)]);
        Ok(Self { x, z })
    }

    /// Build from row-major subject rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let n_pred = rows.first().map_or(0, Vec::len);
        for row in rows {
            if row.len() != n_pred {
                return Err(Error::ShapeMismatch {
                    what: "design row length",
                    expected: n_pred,
                    actual: row.len(),
                });
            }
        }
        let x = Matrix::from_fn(rows.len(), n_pred, |i, j| rows[i][j]);
        Self::new(x)
    }

    /// Full design `X`.
    pub fn full(&self) -> &Matrix {
        &self.x
    }

    /// Nuisance sub-design `Z` (every column but the first). May have zero
    /// columns.
    pub fn nuisance(&self) -> &Matrix {
        &self.z
    }

    /// Number of subjects (rows).
    pub fn n_subjects(&self) -> usize {
        self.x.nrows()
    }

    /// Number of predictors (columns).
    pub fn n_predictors(&self) -> usize {
        self.x.ncols()
    }
}

/// Per-unit contrast estimates and their variances.
#[derive(Debug, Clone)]
pub struct Dataset {
    design: DesignMatrix,
    /// Units × subjects.
    ces: Matrix,
    /// Units × subjects.
    cesvar: Matrix,
}

impl Dataset {
    /// Assemble a dataset, checking that all shapes agree.
    ///
    /// `ces` and `cesvar` are units × subjects. Variances may contain
    /// non-finite values; such units are excluded by [`Dataset::eligibility`].
    pub fn new(design: DesignMatrix, ces: Matrix, cesvar: Matrix) -> Result<Self> {
        if ces.ncols() != design.n_subjects() {
            return Err(Error::ShapeMismatch {
                what: "contrast estimate subjects",
                expected: design.n_subjects(),
                actual: ces.ncols(),
            });
        }
        if cesvar.nrows() != ces.nrows() {
            return Err(Error::ShapeMismatch {
                what: "contrast variance units",
                expected: ces.nrows(),
                actual: cesvar.nrows(),
            });
        }
        if cesvar.ncols() != ces.ncols() {
            return Err(Error::ShapeMismatch {
                what: "contrast variance subjects",
                expected: ces.ncols(),
                actual: cesvar.ncols(),
            });
        }
        Ok(Self {
            design,
            ces,
            cesvar,
        })
    }

    /// The shared design.
    pub fn design(&self) -> &DesignMatrix {
        &self.design
    }

    /// Number of spatial units.
    pub fn n_units(&self) -> usize {
        self.ces.nrows()
    }

    /// Number of subjects.
    pub fn n_subjects(&self) -> usize {
        self.design.n_subjects()
    }

    /// Contrast estimates of one unit.
    pub fn response(&self, unit: usize) -> Vector {
        self.ces.row(unit).transpose()
    }

    /// Per-subject weights of one unit, `|1 / variance|`.
    pub fn weights(&self, unit: usize) -> Vector {
        self.cesvar.row(unit).transpose().map(|v| (1.0 / v).abs())
    }

    /// Units that can be modelled.
    ///
    /// A unit is excluded when any variance is non-finite or when any
    /// weight `|1/v|` is non-finite (a zero variance).
    pub fn eligibility(&self) -> Eligibility {
        let include = (0..self.n_units())
            .map(|m| {
                self.cesvar
                    .row(m)
                    .iter()
                    .all(|&v| v.is_finite() && (1.0 / v).is_finite())
            })
            .collect();
        Eligibility::from_mask(include)
    }
}

/// Which spatial units take part in modelling and clustering.
///
/// Computed once before the permutation loop and never changed by it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    include: Vec<bool>,
    index: Vec<usize>,
}

impl Eligibility {
    /// Build from a boolean mask over all units.
    pub fn from_mask(include: Vec<bool>) -> Self {
        let index = include
            .iter()
            .enumerate()
            .filter_map(|(m, &keep)| keep.then_some(m))
            .collect();
        Self { include, index }
    }

    /// Mask over all units; `true` means eligible.
    pub fn include(&self) -> &[bool] {
        &self.include
    }

    /// Ascending indices of eligible units.
    pub fn index(&self) -> &[usize] {
        &self.index
    }

    /// Whether `unit` is eligible.
    pub fn contains(&self, unit: usize) -> bool {
        self.include.get(unit).copied().unwrap_or(false)
    }

    /// Number of eligible units.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True when no unit is eligible.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Total number of units, eligible or not.
    pub fn n_units(&self) -> usize {
        self.include.len()
    }

    /// Copy with the given units removed.
    pub(crate) fn without(&self, removed: &[usize]) -> Self {
        let mut include = self.include.clone();
        for &unit in removed {
            if let Some(slot) = include.get_mut(unit) {
                *slot = false;
            }
        }
        Self::from_mask(include)
    }
}
