//! Configuration for permutation inference with cluster enhancement.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_E_POWER, DEFAULT_H_POWER, DEFAULT_MAX_THRESHOLDS, DEFAULT_TFCE_START, DEFAULT_TFCE_STEP,
};
use crate::error::{Error, Result};
use crate::types::{FailurePolicy, Tail};

/// Threshold sweep used by threshold-free cluster enhancement.
///
/// Thresholds are `start, start + step, start + 2·step, ...` strictly below
/// the largest statistic in the map. Every cluster surviving a threshold
/// `t` adds `extent^h_power · t^e_power · step` to each of its units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSweep {
    /// First threshold of the sweep. Must be non-negative.
    pub start: f64,
    /// Spacing between thresholds. Must be positive.
    pub step: f64,
    /// Exponent on cluster extent.
    pub h_power: f64,
    /// Exponent on threshold height.
    pub e_power: f64,
    /// Largest number of thresholds one map may need. A map whose peak
    /// statistic would exceed it is rejected instead of swept.
    pub max_thresholds: usize,
}

impl Default for ThresholdSweep {
    fn default() -> Self {
        Self {
            start: DEFAULT_TFCE_START,
            step: DEFAULT_TFCE_STEP,
            h_power: DEFAULT_H_POWER,
            e_power: DEFAULT_E_POWER,
            max_thresholds: DEFAULT_MAX_THRESHOLDS,
        }
    }
}

impl ThresholdSweep {
    /// Check that every parameter is usable.
    pub fn validate(&self) -> Result<()> {
        if !self.start.is_finite() || self.start < 0.0 {
            return Err(invalid(format!(
                "threshold start must be finite and >= 0 (got {})",
                self.start
            )));
        }
        if !self.step.is_finite() || self.step <= 0.0 {
            return Err(invalid(format!(
                "threshold step must be finite and > 0 (got {})",
                self.step
            )));
        }
        if !self.h_power.is_finite() || self.h_power < 0.0 {
            return Err(invalid(format!(
                "h_power must be finite and >= 0 (got {})",
                self.h_power
            )));
        }
        if !self.e_power.is_finite() || self.e_power < 0.0 {
            return Err(invalid(format!(
                "e_power must be finite and >= 0 (got {})",
                self.e_power
            )));
        }
        if self.max_thresholds == 0 {
            return Err(invalid("max_thresholds must be >= 1".to_string()));
        }
        Ok(())
    }

    /// Thresholds of the sweep for a map whose largest statistic is `stop`.
    ///
    /// Mirrors a half-open range: the count is `ceil((stop - start) / step)`
    /// and each threshold is computed as `start + k·step` so that rounding
    /// does not accumulate. Thresholds are produced lazily, highest first
    /// when reversed.
    ///
    /// Returns `None` when the sweep would need more than `max_thresholds`
    /// thresholds.
    pub fn thresholds(
        &self,
        stop: f64,
    ) -> Option<impl DoubleEndedIterator<Item = f64> + ExactSizeIterator> {
        let count = if !stop.is_finite() || stop <= self.start {
            0
        } else {
            let count = ((stop - self.start) / self.step).ceil();
            if count > self.max_thresholds as f64 {
                return None;
            }
            count as usize
        };
        let (start, step) = (self.start, self.step);
        Some((0..count).map(move |k| start + k as f64 * step))
    }
}

/// Configuration options for [`PermutationEngine`](crate::PermutationEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// TFCE threshold sweep.
    ///
    /// Default: start 0.1, step 0.1, h_power 2, e_power 0.5, at most
    /// 100 000 thresholds per map.
    pub threshold: ThresholdSweep,

    /// Which excursions are enhanced. Default: [`Tail::Both`].
    pub tail: Tail,

    /// Largest number of adjacency hops that joins two units into the
    /// same cluster. `1` means direct neighbours only. Default: 1.
    pub max_step: usize,

    /// Handling of units whose fit fails. Default: [`FailurePolicy::Abort`].
    pub failure_policy: FailurePolicy,

    /// Keep the cluster labels of every permutation row for auditing.
    ///
    /// Default: false.
    pub keep_cluster_labels: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: ThresholdSweep::default(),
            tail: Tail::Both,
            max_step: 1,
            failure_policy: FailurePolicy::Abort,
            keep_cluster_labels: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fine-grained sweep for maps with small statistic ranges.
    ///
    /// - step 0.01
    /// - start 0.01
    pub fn fine() -> Self {
        Self {
            threshold: ThresholdSweep {
                start: 0.01,
                step: 0.01,
                ..ThresholdSweep::default()
            },
            ..Default::default()
        }
    }

    /// Positive-tail enhancement only.
    pub fn one_sided() -> Self {
        Self {
            tail: Tail::Positive,
            ..Default::default()
        }
    }

    // =========================================================================
    // Builder methods
    // =========================================================================

    /// Set the full threshold sweep.
    pub fn threshold(mut self, sweep: ThresholdSweep) -> Self {
        self.threshold = sweep;
        self
    }

    /// Set the first threshold.
    pub fn start(mut self, start: f64) -> Self {
        assert!(start >= 0.0, "start must be non-negative");
        self.threshold.start = start;
        self
    }

    /// Set the threshold step.
    pub fn step(mut self, step: f64) -> Self {
        assert!(step > 0.0, "step must be positive");
        self.threshold.step = step;
        self
    }

    /// Set the extent and height exponents.
    pub fn powers(mut self, h_power: f64, e_power: f64) -> Self {
        assert!(h_power >= 0.0, "h_power must be non-negative");
        assert!(e_power >= 0.0, "e_power must be non-negative");
        self.threshold.h_power = h_power;
        self.threshold.e_power = e_power;
        self
    }

    /// Set the tail.
    pub fn tail(mut self, tail: Tail) -> Self {
        self.tail = tail;
        self
    }

    /// Set the hop limit for cluster growth.
    pub fn max_step(mut self, max_step: usize) -> Self {
        assert!(max_step > 0, "max_step must be positive");
        self.max_step = max_step;
        self
    }

    /// Set the failure policy.
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Keep per-permutation cluster labels.
    pub fn keep_cluster_labels(mut self, keep: bool) -> Self {
        self.keep_cluster_labels = keep;
        self
    }

    /// Check if the configuration is valid.
    ///
    /// Called by the engine before any data is touched.
    pub fn validate(&self) -> Result<()> {
        self.threshold.validate()?;
        if self.max_step == 0 {
            return Err(invalid("max_step must be >= 1".to_string()));
        }
        Ok(())
    }
}

fn invalid(message: String) -> Error {
    Error::InvalidConfig { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.threshold.start, 0.1);
        assert_eq!(config.threshold.step, 0.1);
        assert_eq!(config.threshold.h_power, 2.0);
        assert_eq!(config.threshold.e_power, 0.5);
        assert_eq!(config.tail, Tail::Both);
        assert_eq!(config.max_step, 1);
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_preset_configs() {
        let fine = Config::fine();
        assert_eq!(fine.threshold.step, 0.01);
        assert_eq!(fine.threshold.h_power, 2.0);

        let one_sided = Config::one_sided();
        assert_eq!(one_sided.tail, Tail::Positive);
    }

    #[test]
    fn test_builder_methods() {
        let config = Config::new()
            .start(0.0)
            .step(0.5)
            .powers(1.0, 1.0)
            .tail(Tail::Negative)
            .max_step(2)
            .failure_policy(FailurePolicy::Isolate);

        assert_eq!(config.threshold.start, 0.0);
        assert_eq!(config.threshold.step, 0.5);
        assert_eq!(config.threshold.h_power, 1.0);
        assert_eq!(config.tail, Tail::Negative);
        assert_eq!(config.max_step, 2);
        assert_eq!(config.failure_policy, FailurePolicy::Isolate);
    }

    #[test]
    fn test_validation() {
        let mut invalid = Config::default();
        invalid.threshold.step = 0.0;
        assert!(invalid.validate().is_err());

        let mut invalid = Config::default();
        invalid.threshold.start = f64::NAN;
        assert!(invalid.validate().is_err());

        let mut invalid = Config::default();
        invalid.threshold.e_power = -1.0;
        assert!(invalid.validate().is_err());

        let mut invalid = Config::default();
        invalid.max_step = 0;
        assert!(invalid.validate().is_err());

        let mut invalid = Config::default();
        invalid.threshold.max_thresholds = 0;
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_thresholds_half_open() {
        let sweep = ThresholdSweep::default();
        let t: Vec<f64> = sweep.thresholds(0.35).unwrap().collect();
        assert_eq!(t.len(), 3);
        assert!((t[2] - 0.3).abs() < 1e-12);

        assert_eq!(sweep.thresholds(0.1).unwrap().len(), 0);
        assert_eq!(sweep.thresholds(0.0).unwrap().len(), 0);
        assert_eq!(sweep.thresholds(f64::INFINITY).unwrap().len(), 0);
    }

    #[test]
    fn test_thresholds_bounded_by_limit() {
        let sweep = ThresholdSweep {
            max_thresholds: 10,
            ..ThresholdSweep::default()
        };
        // ceil(0.95 / 0.1) = 10
        assert_eq!(sweep.thresholds(1.05).unwrap().len(), 10);
        assert!(sweep.thresholds(2.0).is_none());
        assert!(ThresholdSweep::default().thresholds(1e20).is_none());
        assert!(ThresholdSweep::default().thresholds(f64::MAX).is_none());
    }

    #[test]
    #[should_panic]
    fn test_invalid_step_panics() {
        Config::new().step(0.0);
    }
}
