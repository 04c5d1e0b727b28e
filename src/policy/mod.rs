//! Power repartition among a composite appliance's sub-loads.
//!
//! A [`RepartitionPolicy`] turns one [`PolicyInformation`] (budget plus
//! per-sub-load bounds) into a [`PowerRepartition`]. The policy is always a
//! parameter of the call; [`PolicyKind`] is the serializable selector used by
//! events and configuration.

pub mod greedy;
pub mod proportional;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EquipError, Result};

pub use greedy::GreedyPolicy;
pub use proportional::ProportionalPolicy;

/// Internal power-consuming component of a heat pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubLoad {
    Pump,
    Compressor,
    Sensor,
}

impl SubLoad {
    /// Allocation precedence: pump, then compressor, then sensor.
    pub const PRECEDENCE: [SubLoad; 3] = [SubLoad::Pump, SubLoad::Compressor, SubLoad::Sensor];

    pub fn as_str(self) -> &'static str {
        match self {
            SubLoad::Pump => "pump",
            SubLoad::Compressor => "compressor",
            SubLoad::Sensor => "sensor",
        }
    }
}

impl fmt::Display for SubLoad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimum requirement and maximum support of one sub-load, in watts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBounds")]
pub struct SubLoadBounds {
    min_required_w: f64,
    max_supported_w: f64,
}

#[derive(Deserialize)]
struct RawBounds {
    min_required_w: f64,
    max_supported_w: f64,
}

impl TryFrom<RawBounds> for SubLoadBounds {
    type Error = EquipError;

    fn try_from(raw: RawBounds) -> Result<Self> {
        Self::new(raw.min_required_w, raw.max_supported_w)
    }
}

impl SubLoadBounds {
    /// Creates validated bounds.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBounds` if either value is negative or non-finite, or
    /// if `min_required_w > max_supported_w`.
    pub fn new(min_required_w: f64, max_supported_w: f64) -> Result<Self> {
        check_non_negative("min_required_w", min_required_w)?;
        check_non_negative("max_supported_w", max_supported_w)?;
        if min_required_w > max_supported_w {
            return Err(EquipError::InvalidBounds {
                field: "min_required_w".into(),
                reason: format!("{min_required_w} W exceeds max_supported_w {max_supported_w} W"),
            });
        }
        Ok(Self {
            min_required_w,
            max_supported_w,
        })
    }

    pub fn min_required_w(&self) -> f64 {
        self.min_required_w
    }

    pub fn max_supported_w(&self) -> f64 {
        self.max_supported_w
    }

    /// Room above the minimum: `max - min`.
    pub fn headroom_w(&self) -> f64 {
        self.max_supported_w - self.min_required_w
    }
}

fn check_non_negative(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(EquipError::InvalidBounds {
            field: field.to_string(),
            reason: format!("must be a finite value >= 0, got {value}"),
        });
    }
    Ok(())
}

/// Input of one allocation round. Immutable once built.
///
/// # Examples
///
/// ```
/// use equip_sim::policy::{PolicyInformation, SubLoadBounds};
///
/// let info = PolicyInformation::new(
///     100.0,
///     SubLoadBounds::new(10.0, 30.0).unwrap(),
///     SubLoadBounds::new(20.0, 40.0).unwrap(),
///     SubLoadBounds::new(5.0, 10.0).unwrap(),
/// )
/// .unwrap();
/// assert_eq!(info.total_min_required_w(), 35.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPolicyInformation")]
pub struct PolicyInformation {
    power_available_w: f64,
    pump: SubLoadBounds,
    compressor: SubLoadBounds,
    sensor: SubLoadBounds,
}

#[derive(Deserialize)]
struct RawPolicyInformation {
    power_available_w: f64,
    pump: SubLoadBounds,
    compressor: SubLoadBounds,
    sensor: SubLoadBounds,
}

impl TryFrom<RawPolicyInformation> for PolicyInformation {
    type Error = EquipError;

    fn try_from(raw: RawPolicyInformation) -> Result<Self> {
        Self::new(raw.power_available_w, raw.pump, raw.compressor, raw.sensor)
    }
}

impl PolicyInformation {
    /// Creates the input of an allocation round.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBounds` if `power_available_w` is negative or not finite.
    pub fn new(
        power_available_w: f64,
        pump: SubLoadBounds,
        compressor: SubLoadBounds,
        sensor: SubLoadBounds,
    ) -> Result<Self> {
        check_non_negative("power_available_w", power_available_w)?;
        Ok(Self {
            power_available_w,
            pump,
            compressor,
            sensor,
        })
    }

    pub fn power_available_w(&self) -> f64 {
        self.power_available_w
    }

    pub fn bounds(&self, sub_load: SubLoad) -> SubLoadBounds {
        match sub_load {
            SubLoad::Pump => self.pump,
            SubLoad::Compressor => self.compressor,
            SubLoad::Sensor => self.sensor,
        }
    }

    pub fn total_min_required_w(&self) -> f64 {
        SubLoad::PRECEDENCE
            .iter()
            .map(|s| self.bounds(*s).min_required_w())
            .sum()
    }

    pub fn total_max_supported_w(&self) -> f64 {
        SubLoad::PRECEDENCE
            .iter()
            .map(|s| self.bounds(*s).max_supported_w())
            .sum()
    }

    /// Fails with `InfeasibleAllocation` when minimums exceed the budget.
    ///
    /// Minimums are summed in precedence order, the same way
    /// [`PowerRepartition::total_w`] sums an allocation, so a feasible
    /// budget always fits the all-minimums split.
    pub fn ensure_feasible(&self) -> Result<()> {
        let required_w = self.total_min_required_w();
        if required_w > self.power_available_w {
            return Err(EquipError::InfeasibleAllocation {
                required_w,
                available_w: self.power_available_w,
            });
        }
        Ok(())
    }
}

/// Power assigned to each sub-load by one allocation round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerRepartition {
    pub pump_w: f64,
    pub compressor_w: f64,
    pub sensor_w: f64,
}

impl PowerRepartition {
    pub fn get(&self, sub_load: SubLoad) -> f64 {
        match sub_load {
            SubLoad::Pump => self.pump_w,
            SubLoad::Compressor => self.compressor_w,
            SubLoad::Sensor => self.sensor_w,
        }
    }

    pub(crate) fn set(&mut self, sub_load: SubLoad, watts: f64) {
        match sub_load {
            SubLoad::Pump => self.pump_w = watts,
            SubLoad::Compressor => self.compressor_w = watts,
            SubLoad::Sensor => self.sensor_w = watts,
        }
    }

    pub fn total_w(&self) -> f64 {
        self.pump_w + self.compressor_w + self.sensor_w
    }

    /// Each sub-load starts at its minimum requirement.
    pub(crate) fn minimums(info: &PolicyInformation) -> Self {
        let mut out = Self::default();
        for s in SubLoad::PRECEDENCE {
            out.set(s, info.bounds(s).min_required_w());
        }
        out
    }

    /// Lowers extra power, last sub-load in precedence first, until the
    /// summed total fits the budget. Never goes below a minimum.
    ///
    /// Rounding while adding extras back onto minimums can overshoot the
    /// budget by a few ulps; a feasible `info` guarantees the minimums fit.
    pub(crate) fn trim_to_budget(&mut self, info: &PolicyInformation) {
        let budget_w = info.power_available_w();
        for s in SubLoad::PRECEDENCE.into_iter().rev() {
            let min_w = info.bounds(s).min_required_w();
            while self.total_w() > budget_w && self.get(s) > min_w {
                let current_w = self.get(s);
                let mut lowered_w = (current_w - (self.total_w() - budget_w)).max(min_w);
                if lowered_w >= current_w {
                    // current_w > min_w >= 0, so the previous float is positive
                    lowered_w = f64::from_bits(current_w.to_bits() - 1).max(min_w);
                }
                self.set(s, lowered_w);
            }
        }
    }
}

impl fmt::Display for PowerRepartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pump={:.1} W compressor={:.1} W sensor={:.1} W",
            self.pump_w, self.compressor_w, self.sensor_w
        )
    }
}

/// Capability to split a power budget across sub-loads.
pub trait RepartitionPolicy {
    /// Computes a bounded allocation.
    ///
    /// Implementations must return an allocation where every sub-load gets
    /// between its minimum and maximum, and the total stays within the budget.
    ///
    /// # Errors
    ///
    /// `InfeasibleAllocation` when minimums exceed the budget.
    fn allocate(&self, info: &PolicyInformation) -> Result<PowerRepartition>;

    /// Short identifier used in logs.
    fn name(&self) -> &'static str;
}

/// Serializable selector over the built-in strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    Greedy,
    Proportional,
}

impl PolicyKind {
    pub const NAMES: &[&str] = &["greedy", "proportional"];
}

impl RepartitionPolicy for PolicyKind {
    fn allocate(&self, info: &PolicyInformation) -> Result<PowerRepartition> {
        match self {
            PolicyKind::Greedy => GreedyPolicy.allocate(info),
            PolicyKind::Proportional => ProportionalPolicy.allocate(info),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            PolicyKind::Greedy => GreedyPolicy.name(),
            PolicyKind::Proportional => ProportionalPolicy.name(),
        }
    }
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "greedy" => Ok(PolicyKind::Greedy),
            "proportional" => Ok(PolicyKind::Proportional),
            other => Err(format!(
                "unknown policy \"{other}\", available: {}",
                Self::NAMES.join(", ")
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(min: f64, max: f64) -> SubLoadBounds {
        SubLoadBounds::new(min, max).unwrap()
    }

    #[test]
    fn bounds_reject_min_above_max() {
        let err = SubLoadBounds::new(20.0, 10.0).unwrap_err();
        assert!(matches!(err, EquipError::InvalidBounds { .. }));
    }

    #[test]
    fn bounds_reject_negative() {
        assert!(SubLoadBounds::new(-1.0, 10.0).is_err());
        assert!(SubLoadBounds::new(0.0, f64::NAN).is_err());
    }

    #[test]
    fn information_rejects_negative_budget() {
        let err = PolicyInformation::new(-5.0, bounds(0.0, 1.0), bounds(0.0, 1.0), bounds(0.0, 1.0))
            .unwrap_err();
        assert!(matches!(err, EquipError::InvalidBounds { .. }));
    }

    #[test]
    fn feasibility_compares_minimum_sum() {
        let info =
            PolicyInformation::new(20.0, bounds(10.0, 30.0), bounds(20.0, 40.0), bounds(5.0, 10.0))
                .unwrap();
        assert_eq!(
            info.ensure_feasible(),
            Err(EquipError::InfeasibleAllocation {
                required_w: 35.0,
                available_w: 20.0
            })
        );
    }

    #[test]
    fn deserialization_revalidates_bounds() {
        let bad = r#"{"power_available_w": 10.0,
            "pump": {"min_required_w": 5.0, "max_supported_w": 1.0},
            "compressor": {"min_required_w": 0.0, "max_supported_w": 1.0},
            "sensor": {"min_required_w": 0.0, "max_supported_w": 1.0}}"#;
        let parsed: std::result::Result<PolicyInformation, _> = serde_json::from_str(bad);
        assert!(parsed.is_err());
    }

    #[test]
    fn policy_kind_parses_names() {
        assert_eq!("greedy".parse::<PolicyKind>(), Ok(PolicyKind::Greedy));
        assert_eq!(
            "proportional".parse::<PolicyKind>(),
            Ok(PolicyKind::Proportional)
        );
        assert!("fair".parse::<PolicyKind>().is_err());
    }

    #[test]
    fn trim_lowers_sensor_before_pump() {
        let info =
            PolicyInformation::new(50.0, bounds(10.0, 30.0), bounds(20.0, 40.0), bounds(5.0, 10.0))
                .unwrap();
        let mut r = PowerRepartition {
            pump_w: 25.0,
            compressor_w: 20.0,
            sensor_w: 10.0,
        };
        r.trim_to_budget(&info);
        assert_eq!((r.pump_w, r.compressor_w, r.sensor_w), (25.0, 20.0, 5.0));
    }

    #[test]
    fn trim_never_goes_below_minimums() {
        let info =
            PolicyInformation::new(40.0, bounds(10.0, 30.0), bounds(20.0, 40.0), bounds(5.0, 10.0))
                .unwrap();
        let mut r = PowerRepartition {
            pump_w: 30.0,
            compressor_w: 40.0,
            sensor_w: 10.0,
        };
        r.trim_to_budget(&info);
        assert_eq!((r.pump_w, r.compressor_w, r.sensor_w), (15.0, 20.0, 5.0));
        assert_eq!(r.total_w(), 40.0);
    }
}
