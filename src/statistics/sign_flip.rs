//! Sign-flip permutation sets.
//!
//! Under the null hypothesis that the effect of interest is zero and with
//! nuisance signal projected out, residuals are symmetric about zero, so
//! flipping the sign of each subject's residual yields an exchangeable
//! replicate (Winkler et al., 2014). Row 0 of every generated set is the
//! all-ones vector, which reproduces the observed statistic.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::constants::MAX_EXHAUSTIVE_SUBJECTS;
use crate::error::{Error, Result};
use crate::types::Vector;

/// Ordered collection of sign vectors, each of length `n_subjects`.
#[derive(Debug, Clone, PartialEq)]
pub struct SignFlipSet {
    n_subjects: usize,
    /// Row-major, one row per permutation.
    signs: Vec<f64>,
}

impl SignFlipSet {
    /// The single all-ones vector: observed data only.
    pub fn observed(n_subjects: usize) -> Self {
        Self {
            n_subjects,
            signs: vec![1.0; n_subjects],
        }
    }

    /// Wrap precomputed sign vectors.
    ///
    /// Every row must have the same length and contain only `-1` or `+1`.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let n_subjects = match rows.first() {
            Some(row) if !row.is_empty() => row.len(),
            _ => {
                return Err(Error::InvalidInput {
                    message: "sign-flip set must contain at least one non-empty row".to_string(),
                })
            }
        };

        let mut signs = Vec::with_capacity(rows.len() * n_subjects);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n_subjects {
                return Err(Error::ShapeMismatch {
                    what: "sign-flip row length",
                    expected: n_subjects,
                    actual: row.len(),
                });
            }
            if let Some(bad) = row.iter().find(|&&s| s != 1.0 && s != -1.0) {
                return Err(Error::InvalidInput {
                    message: format!("sign-flip row {} contains {} (expected -1 or +1)", i, bad),
                });
            }
            signs.extend_from_slice(row);
        }
        Ok(Self { n_subjects, signs })
    }

    /// Random sign flips with the identity as row 0.
    ///
    /// Row `i` is drawn from its own generator seeded with
    /// [`counter_rng_seed`]`(seed, i)`, so a row never depends on how many
    /// rows precede it or which thread generated it.
    pub fn random(n_subjects: usize, count: usize, seed: u64) -> Result<Self> {
        if n_subjects == 0 || count == 0 {
            return Err(Error::InvalidInput {
                message: format!(
                    "random sign flips need subjects and rows (got {} subjects, {} rows)",
                    n_subjects, count
                ),
            });
        }
        let mut signs = vec![1.0; n_subjects * count];
        for (i, row) in signs.chunks_mut(n_subjects).enumerate().skip(1) {
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(counter_rng_seed(seed, i as u64));
            for s in row.iter_mut() {
                if rng.gen::<bool>() {
                    *s = -1.0;
                }
            }
        }
        Ok(Self { n_subjects, signs })
    }

    /// Sign vectors for a requested permutation count.
    ///
    /// A count of zero selects observed-only mode ([`SignFlipSet::observed`]);
    /// any other count draws that many rows with [`SignFlipSet::random`].
    pub fn for_count(n_subjects: usize, permutations: usize, seed: u64) -> Result<Self> {
        if permutations == 0 {
            if n_subjects == 0 {
                return Err(Error::InvalidInput {
                    message: "sign flips need at least one subject".to_string(),
                });
            }
            Ok(Self::observed(n_subjects))
        } else {
            Self::random(n_subjects, permutations, seed)
        }
    }

    /// Every one of the `2^n` sign vectors, identity first.
    ///
    /// Row `k` flips subject `j` when bit `j` of `k` is set.
    pub fn exhaustive(n_subjects: usize) -> Result<Self> {
        if n_subjects == 0 || n_subjects > MAX_EXHAUSTIVE_SUBJECTS {
            return Err(Error::InvalidInput {
                message: format!(
                    "exhaustive sign flips support 1..={} subjects (got {})",
                    MAX_EXHAUSTIVE_SUBJECTS, n_subjects
                ),
            });
        }
        let count = 1usize << n_subjects;
        let mut signs = Vec::with_capacity(count * n_subjects);
        for k in 0..count {
            signs.extend((0..n_subjects).map(|j| if (k >> j) & 1 == 1 { -1.0 } else { 1.0 }));
        }
        Ok(Self { n_subjects, signs })
    }

    /// Number of sign vectors.
    pub fn len(&self) -> usize {
        if self.n_subjects == 0 {
            0
        } else {
            self.signs.len() / self.n_subjects
        }
    }

    /// True when the set has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length of each sign vector.
    pub fn n_subjects(&self) -> usize {
        self.n_subjects
    }

    /// Sign vector `i`.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.signs[i * self.n_subjects..(i + 1) * self.n_subjects]
    }

    /// Iterate sign vectors in order.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.signs.chunks(self.n_subjects.max(1))
    }

    /// Whether row `i` is the all-ones vector.
    pub fn is_identity(&self, i: usize) -> bool {
        self.row(i).iter().all(|&s| s == 1.0)
    }
}

/// Apply a sign vector to a residualised response: `diag(sf) · v`.
pub fn apply_sign_flip(signs: &[f64], residualized: &Vector) -> Vector {
    debug_assert_eq!(signs.len(), residualized.len());
    Vector::from_iterator(
        residualized.len(),
        residualized.iter().zip(signs).map(|(v, s)| v * s),
    )
}

/// Derive a well-mixed per-row seed from a base seed and a counter
/// (SplitMix64 finaliser).
pub fn counter_rng_seed(seed: u64, counter: u64) -> u64 {
    let mut z = seed ^ counter.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
