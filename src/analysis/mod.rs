//! Map-level analysis of permutation statistics.
//!
//! 1. **Cluster enhancement** ([`tfce`]): threshold-free cluster enhancement over a
//!    spatial adjacency graph
//! 2. **FWE correction** ([`fwe`]): maximum-statistic null distribution and corrected p-values

pub mod fwe;
pub mod tfce;

pub use fwe::{fwe_pvalues, max_statistic, max_statistic_null};
pub use tfce::{enhance, ClusterLabels, Tfce};
