//! Household equipment state machines and their caller-facing interfaces.
//!
//! Each equipment type composes the role traits it supports instead of
//! inheriting a single wide interface:
//! - [`UserControl`] / [`ThermalControl`]: occupant-facing operations
//! - [`ExternalControl`]: operations used by an energy manager or policy
//! - [`SimulationControl`]: what event execution calls

/// Dimmable switchable loads (lamp, fan).
pub mod dimmable;
/// Heat pump with pump, compressor and sensor sub-loads.
pub mod heat_pump;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::policy::{PolicyKind, PowerRepartition, RepartitionPolicy};
use crate::sim::time::SimTime;

pub use dimmable::{DimmableLoad, LoadState};
pub use heat_pump::{HeatPump, HeatPumpParams, HeatPumpState};

/// Unit attached to a [`Measurement`]. No conversion happens in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeasurementUnit {
    Watts,
    Celsius,
}

impl fmt::Display for MeasurementUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasurementUnit::Watts => f.write_str("W"),
            MeasurementUnit::Celsius => f.write_str("°C"),
        }
    }
}

/// A value with its unit and the logical time it was last updated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub value: f64,
    pub unit: MeasurementUnit,
    pub timestamp: SimTime,
}

impl Measurement {
    pub fn watts(value: f64, timestamp: SimTime) -> Self {
        Self {
            value,
            unit: MeasurementUnit::Watts,
            timestamp,
        }
    }

    pub fn celsius(value: f64, timestamp: SimTime) -> Self {
        Self {
            value,
            unit: MeasurementUnit::Celsius,
            timestamp,
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {} @ {}", self.value, self.unit, self.timestamp)
    }
}

/// Point-in-time view of an equipment, used for execution records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentSnapshot {
    pub label: String,
    pub state: String,
    pub power_w: f64,
    /// Present only for equipment with sub-loads.
    pub repartition: Option<PowerRepartition>,
}

/// Read-only surface shared by every equipment.
pub trait Equipment {
    /// Instance name used in logs and records.
    fn label(&self) -> &str;

    /// Reported power consumption.
    fn current_power(&self) -> Measurement;

    fn snapshot(&self) -> EquipmentSnapshot;
}

/// Occupant-facing operations.
pub trait UserControl: Equipment {
    /// # Errors
    ///
    /// `IllegalStateTransition` unless the equipment is off.
    fn switch_on(&mut self) -> Result<()>;

    /// # Errors
    ///
    /// `IllegalStateTransition` if the equipment is already off.
    fn switch_off(&mut self) -> Result<()>;

    fn is_on(&self) -> bool;
}

/// Occupant-facing operations specific to thermal units.
pub trait ThermalControl: UserControl {
    fn start_heating(&mut self) -> Result<()>;
    fn stop_heating(&mut self) -> Result<()>;
    fn start_cooling(&mut self) -> Result<()>;
    fn stop_cooling(&mut self) -> Result<()>;
    fn target_temperature(&self) -> Measurement;
    fn set_target_temperature(&mut self, celsius: f64) -> Result<()>;
    fn current_temperature(&self) -> Measurement;
}

/// Operations used by an external energy manager.
pub trait ExternalControl: Equipment {
    fn max_power(&self) -> Measurement;

    /// Sets a new total power. Equipment with sub-loads splits it with
    /// `policy`, or with its default policy when `None`.
    ///
    /// # Errors
    ///
    /// `IllegalStateTransition` while off, `InvalidPower` outside
    /// `[0, max_power]`, allocation errors from the policy.
    fn set_current_power(
        &mut self,
        power_w: f64,
        policy: Option<&dyn RepartitionPolicy>,
    ) -> Result<()>;
}

/// Simulation-facing operations invoked by [`Event::execute_on`].
///
/// [`Event::execute_on`]: crate::sim::event::Event::execute_on
pub trait SimulationControl: Equipment {
    /// Name of the current state, e.g. `"Off"` or `"Heating"`.
    fn state_label(&self) -> &'static str;

    /// True in every state other than `Off`.
    fn is_switched_on(&self) -> bool;

    fn simulate_switch_on(&mut self, at: SimTime) -> Result<()>;

    fn simulate_switch_off(&mut self, at: SimTime) -> Result<()>;

    fn simulate_set_power(
        &mut self,
        power_w: f64,
        policy: Option<PolicyKind>,
        at: SimTime,
    ) -> Result<()>;
}
