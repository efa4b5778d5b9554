//! Per-unit statistical machinery.
//!
//! This module provides the building blocks applied to every spatial unit:
//! - Weighted nuisance annihilator `Rz = I - Z (Zᵗ W Z)⁻¹ Zᵗ W`
//! - Sign-flip permutation sets and their application to residuals
//! - Weighted least squares with an F-test on the effect of interest

mod projection;
mod sign_flip;
mod wls;

pub use projection::{nuisance_projector, residualize};
pub use sign_flip::{apply_sign_flip, counter_rng_seed, SignFlipSet};
pub use wls::{wls, WlsFit, WlsModel};
