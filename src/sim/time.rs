//! Logical simulation time.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EquipError, Result};

/// Scheduler-tracked logical time in seconds.
///
/// Always finite and non-negative, which makes the ordering total.
///
/// # Examples
///
/// ```
/// use equip_sim::sim::time::SimTime;
///
/// let t = SimTime::from_secs(90.0).unwrap();
/// assert_eq!(t.as_secs(), 90.0);
/// assert!(SimTime::from_secs(f64::NAN).is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SimTime(f64);

impl SimTime {
    /// Start of every run.
    pub const ZERO: SimTime = SimTime(0.0);

    /// Creates a logical time from seconds.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTime` for NaN, infinite, or negative values.
    /// Negative zero is stored as zero.
    pub fn from_secs(secs: f64) -> Result<Self> {
        if !secs.is_finite() {
            return Err(EquipError::InvalidTime {
                value: Some(secs),
                reason: "must be finite".into(),
            });
        }
        if secs < 0.0 {
            return Err(EquipError::InvalidTime {
                value: Some(secs),
                reason: "must be >= 0".into(),
            });
        }
        // -0.0 + 0.0 == +0.0
        Ok(Self(secs + 0.0))
    }

    pub fn as_secs(self) -> f64 {
        self.0
    }

    /// Seconds elapsed since `earlier`, zero if `earlier` is later.
    pub fn since(self, earlier: SimTime) -> f64 {
        (self.0 - earlier.0).max(0.0)
    }
}

impl Eq for SimTime {}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl TryFrom<f64> for SimTime {
    type Error = EquipError;

    fn try_from(secs: f64) -> Result<Self> {
        Self::from_secs(secs)
    }
}

impl From<SimTime> for f64 {
    fn from(t: SimTime) -> f64 {
        t.0
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.0)
    }
}
