//! Numerical constants used throughout the crate.

/// Default first threshold of the TFCE sweep.
pub const DEFAULT_TFCE_START: f64 = 0.1;

/// Default spacing between consecutive TFCE thresholds.
pub const DEFAULT_TFCE_STEP: f64 = 0.1;

/// Default exponent applied to cluster extent.
///
/// Smith & Nichols (2009) write the extent exponent as `E` and recommend
/// 0.5; this crate names it `h_power` and defaults it to 2.
pub const DEFAULT_H_POWER: f64 = 2.0;

/// Default exponent applied to threshold height.
///
/// This is the paper's `H` (recommended 2), named `e_power` here.
pub const DEFAULT_E_POWER: f64 = 0.5;

/// Default cap on the number of thresholds swept for one map.
///
/// With the default step this admits statistics up to about 10⁴; a larger
/// peak almost always means a near-exact fit.
pub const DEFAULT_MAX_THRESHOLDS: usize = 100_000;

/// Default seed for sign-flip generation.
///
/// The value `0x7369676E666C6970` is "signflip" encoded in ASCII.
pub const DEFAULT_SEED: u64 = 0x7369_676E_666C_6970;

/// Largest subject count for which every sign vector is enumerated.
pub const MAX_EXHAUSTIVE_SUBJECTS: usize = 20;

/// Absolute tolerance used when checking projector identities.
#[cfg(test)]
pub const PROJECTION_TOLERANCE: f64 = 1e-9;
