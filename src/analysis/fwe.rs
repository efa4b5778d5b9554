//! Family-wise error correction from the permutation distribution of the
//! map-wise maximum statistic (Nichols & Holmes, 2002).
//!
//! Each permutation row contributes one value, its largest statistic. An
//! observed unit's corrected p-value is the fraction of that null
//! distribution reaching the unit's statistic, with the observed map itself
//! counted once:
//!
//! ```text
//! p = (1 + #{null_max ≥ stat}) / (1 + n_null)
//! ```

use crate::error::{Error, Result};
use crate::types::Tail;

/// The statistic compared against the null for a given tail.
fn tail_statistic(x: f64, tail: Tail) -> f64 {
    match tail {
        Tail::Positive => x,
        Tail::Negative => -x,
        Tail::Both => x.abs(),
    }
}

/// Largest tail statistic of one map. An all-zero map gives zero.
pub fn max_statistic(map: &[f64], tail: Tail) -> f64 {
    map.iter()
        .map(|&x| tail_statistic(x, tail))
        .fold(0.0, f64::max)
}

/// Maximum statistic of every permutation row.
pub fn max_statistic_null<'a, I>(rows: I, tail: Tail) -> Vec<f64>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    rows.into_iter().map(|row| max_statistic(row, tail)).collect()
}

/// FWE-corrected p-value of every unit of `observed`.
///
/// `null_max` must not contain the observed map's own maximum; it is added
/// implicitly by the `+1` terms.
pub fn fwe_pvalues(observed: &[f64], null_max: &[f64], tail: Tail) -> Result<Vec<f64>> {
    if null_max.is_empty() {
        return Err(Error::InvalidInput {
            message: "FWE correction needs at least one permutation besides the observed map"
                .to_string(),
        });
    }

    let mut sorted = null_max.to_vec();
    sorted.sort_by(f64::total_cmp);
    let denom = (sorted.len() + 1) as f64;

    Ok(observed
        .iter()
        .map(|&x| {
            let stat = tail_statistic(x, tail);
            let below = sorted.partition_point(|&m| m < stat);
            let exceed = sorted.len() - below;
            (1 + exceed) as f64 / denom
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_statistic_tails() {
        let map = [1.0, -3.0, 2.0];
        assert_eq!(max_statistic(&map, Tail::Positive), 2.0);
        assert_eq!(max_statistic(&map, Tail::Negative), 3.0);
        assert_eq!(max_statistic(&map, Tail::Both), 3.0);
        assert_eq!(max_statistic(&[0.0; 4], Tail::Both), 0.0);
    }

    #[test]
    fn test_null_from_rows() {
        let rows: Vec<Vec<f64>> = vec![vec![1.0, 5.0], vec![-7.0, 2.0]];
        let null = max_statistic_null(rows.iter().map(Vec::as_slice), Tail::Both);
        assert_eq!(null, vec![5.0, 7.0]);
    }

    #[test]
    fn test_pvalues() {
        let null = [1.0, 2.0, 3.0, 4.0];
        let p = fwe_pvalues(&[10.0, 3.0, 0.0], &null, Tail::Positive).unwrap();
        assert_eq!(p, vec![0.2, 0.6, 1.0]);
    }

    #[test]
    fn test_pvalues_need_null() {
        assert!(fwe_pvalues(&[1.0], &[], Tail::Both).is_err());
    }
}
