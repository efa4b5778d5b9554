//! Tests for configuration validation.
//!
//! Builder methods panic on values that can never be valid; `validate`
//! reports everything else as `Error::InvalidConfig` before a run starts.

use signflip_tfce::data::{Adjacency, Dataset, DesignMatrix};
use signflip_tfce::{Config, Error, Matrix, PermutationEngine, SignFlipSet, Tail, ThresholdSweep};

// =============================================================================
// THRESHOLD SWEEP
// =============================================================================

#[test]
#[should_panic(expected = "step must be positive")]
fn step_zero_panics() {
    let _ = Config::new().step(0.0);
}

#[test]
#[should_panic(expected = "step must be positive")]
fn step_nan_panics() {
    let _ = Config::new().step(f64::NAN);
}

#[test]
#[should_panic(expected = "start must be non-negative")]
fn start_negative_panics() {
    let _ = Config::new().start(-0.1);
}

#[test]
fn start_zero_valid() {
    let config = Config::new().start(0.0);
    assert_eq!(config.threshold.start, 0.0);
    assert!(config.validate().is_ok());
}

#[test]
#[should_panic(expected = "h_power must be non-negative")]
fn h_power_negative_panics() {
    let _ = Config::new().powers(-1.0, 0.5);
}

#[test]
fn infinite_power_rejected_by_validate() {
    let config = Config::new().threshold(ThresholdSweep {
        e_power: f64::INFINITY,
        ..ThresholdSweep::default()
    });
    assert!(matches!(config.validate(), Err(Error::InvalidConfig { .. })));
}

#[test]
fn negative_step_via_fields_rejected() {
    let mut config = Config::default();
    config.threshold.step = -0.1;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("step"));
}

#[test]
fn zero_max_thresholds_rejected_by_validate() {
    let config = Config::new().threshold(ThresholdSweep {
        max_thresholds: 0,
        ..ThresholdSweep::default()
    });
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("max_thresholds"));
}

// =============================================================================
// MAX STEP
// =============================================================================

#[test]
#[should_panic(expected = "max_step must be positive")]
fn max_step_zero_panics() {
    let _ = Config::new().max_step(0);
}

#[test]
fn max_step_zero_rejected_by_engine() {
    let design = DesignMatrix::from_rows(&[
        vec![1.0, 1.0],
        vec![-1.0, 1.0],
        vec![0.5, 1.0],
    ])
    .unwrap();
    let dataset = Dataset::new(design, Matrix::from_element(2, 3, 1.0), Matrix::from_element(2, 3, 1.0))
        .unwrap();
    let adjacency = Adjacency::from_edges(2, [(0, 1)]).unwrap();

    let err = PermutationEngine::new()
        .max_step(0)
        .run(&dataset, &adjacency, &SignFlipSet::observed(3))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { .. }));
}

// =============================================================================
// TAIL
// =============================================================================

#[test]
fn tail_codes_roundtrip() {
    for tail in [Tail::Negative, Tail::Both, Tail::Positive] {
        assert_eq!(Tail::try_from(tail.code()).unwrap(), tail);
    }
}

#[test]
fn tail_code_out_of_range_rejected() {
    assert!(matches!(Tail::try_from(2), Err(Error::InvalidConfig { .. })));
    assert!(matches!(Tail::try_from(-3), Err(Error::InvalidConfig { .. })));
}

// =============================================================================
// PRESETS
// =============================================================================

#[test]
fn presets_are_valid() {
    for config in [Config::default(), Config::fine(), Config::one_sided()] {
        assert!(config.validate().is_ok());
    }
}
