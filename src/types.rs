//! Type aliases and common types.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Dense, column-major matrix of `f64`.
pub type Matrix = DMatrix<f64>;

/// Dense column vector of `f64`.
pub type Vector = DVector<f64>;

/// Which excursions of the statistic map are enhanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Tail {
    /// Only negative-going excursions (`x < -t`).
    Negative,
    /// Both directions; enhanced values keep the sign of the excursion.
    #[default]
    Both,
    /// Only positive-going excursions (`x > t`).
    Positive,
}

impl Tail {
    /// Numeric code of the tail (`-1`, `0` or `1`).
    pub fn code(self) -> i8 {
        match self {
            Tail::Negative => -1,
            Tail::Both => 0,
            Tail::Positive => 1,
        }
    }

    /// Signs of the excursion directions swept for this tail.
    pub(crate) fn directions(self) -> &'static [f64] {
        match self {
            Tail::Negative => &[-1.0],
            Tail::Both => &[1.0, -1.0],
            Tail::Positive => &[1.0],
        }
    }
}

impl TryFrom<i8> for Tail {
    type Error = Error;

    fn try_from(code: i8) -> Result<Self, Self::Error> {
        match code {
            -1 => Ok(Tail::Negative),
            0 => Ok(Tail::Both),
            1 => Ok(Tail::Positive),
            other => Err(Error::InvalidConfig {
                message: format!("tail must be one of -1, 0, 1 (got {})", other),
            }),
        }
    }
}

/// What happens when a single unit cannot be fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Stop the whole run at the first failing unit.
    #[default]
    Abort,
    /// Record the failure, leave the unit's cells at zero and keep going.
    Isolate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_roundtrip_codes() {
        for code in [-1i8, 0, 1] {
            assert_eq!(Tail::try_from(code).unwrap().code(), code);
        }
    }

    #[test]
    fn test_tail_rejects_unknown_code() {
        assert!(Tail::try_from(2).is_err());
        assert!(Tail::try_from(-2).is_err());
    }

    #[test]
    fn test_tail_directions() {
        assert_eq!(Tail::Both.directions(), &[1.0, -1.0]);
        assert_eq!(Tail::Negative.directions(), &[-1.0]);
    }
}
