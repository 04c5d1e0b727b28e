use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    Equipment, EquipmentSnapshot, ExternalControl, Measurement, SimulationControl, UserControl,
};
use crate::error::{EquipError, Result};
use crate::policy::{PolicyKind, RepartitionPolicy};
use crate::sim::event::PowerVariation;
use crate::sim::time::SimTime;

/// On/off state of a dimmable load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadState {
    Off,
    On,
}

impl LoadState {
    pub fn as_str(self) -> &'static str {
        match self {
            LoadState::Off => "Off",
            LoadState::On => "On",
        }
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A switchable load with an adjustable power level (lamp, fan).
///
/// The power level is only meaningful while `On`: switching on restores the
/// default level, switching off drops it to zero.
#[derive(Debug, Clone)]
pub struct DimmableLoad {
    name: String,
    state: LoadState,
    power_w: f64,
    default_power_w: f64,
    max_power_w: f64,
    variation: PowerVariation,
    last_update: SimTime,
}

impl DimmableLoad {
    /// Creates a load in the `Off` state.
    ///
    /// # Errors
    ///
    /// `InvalidBounds` if `max_power_w` is not positive, if
    /// `default_power_w` is outside `[0, max_power_w]`, or if the variation
    /// range exceeds `max_power_w`.
    pub fn new(
        name: impl Into<String>,
        max_power_w: f64,
        default_power_w: f64,
        variation: PowerVariation,
    ) -> Result<Self> {
        if !max_power_w.is_finite() || max_power_w <= 0.0 {
            return Err(EquipError::InvalidBounds {
                field: "max_power_w".into(),
                reason: format!("must be > 0, got {max_power_w}"),
            });
        }
        if !(0.0..=max_power_w).contains(&default_power_w) {
            return Err(EquipError::InvalidBounds {
                field: "default_power_w".into(),
                reason: format!("must be in [0, {max_power_w}], got {default_power_w}"),
            });
        }
        if variation.max_w > max_power_w {
            return Err(EquipError::InvalidBounds {
                field: "power_variation".into(),
                reason: format!("max {} W exceeds max_power_w {max_power_w}", variation.max_w),
            });
        }
        Ok(Self {
            name: name.into(),
            state: LoadState::Off,
            power_w: 0.0,
            default_power_w,
            max_power_w,
            variation,
            last_update: SimTime::ZERO,
        })
    }

    /// 100 W dimmer lamp, adjustable between 10 W and 100 W.
    pub fn lamp() -> Self {
        Self {
            name: "lamp".into(),
            state: LoadState::Off,
            power_w: 0.0,
            default_power_w: 100.0,
            max_power_w: 100.0,
            variation: PowerVariation {
                min_w: 10.0,
                max_w: 100.0,
            },
            last_update: SimTime::ZERO,
        }
    }

    /// 60 W fan, adjustable between 15 W and 60 W.
    pub fn fan() -> Self {
        Self {
            name: "fan".into(),
            state: LoadState::Off,
            power_w: 0.0,
            default_power_w: 30.0,
            max_power_w: 60.0,
            variation: PowerVariation {
                min_w: 15.0,
                max_w: 60.0,
            },
            last_update: SimTime::ZERO,
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Allowed range for set-power events targeting this load.
    pub fn variation(&self) -> &PowerVariation {
        &self.variation
    }

    fn apply_switch_on(&mut self, at: SimTime) -> Result<()> {
        if self.state != LoadState::Off {
            return Err(EquipError::illegal(&self.name, self.state, "switch on"));
        }
        self.state = LoadState::On;
        self.power_w = self.default_power_w;
        self.last_update = at;
        info!(equipment = %self.name, at = %at, "switched on");
        Ok(())
    }

    fn apply_switch_off(&mut self, at: SimTime) -> Result<()> {
        if self.state != LoadState::On {
            return Err(EquipError::illegal(&self.name, self.state, "switch off"));
        }
        self.state = LoadState::Off;
        self.power_w = 0.0;
        self.last_update = at;
        info!(equipment = %self.name, at = %at, "switched off");
        Ok(())
    }

    fn apply_power(&mut self, power_w: f64, at: SimTime) -> Result<()> {
        if self.state != LoadState::On {
            return Err(EquipError::illegal(&self.name, self.state, "set power"));
        }
        if !power_w.is_finite() || !(0.0..=self.max_power_w).contains(&power_w) {
            return Err(EquipError::InvalidPower {
                value_w: power_w,
                max_w: self.max_power_w,
            });
        }
        self.power_w = power_w;
        self.last_update = at;
        info!(equipment = %self.name, at = %at, power_w, "power set");
        Ok(())
    }
}

impl Equipment for DimmableLoad {
    fn label(&self) -> &str {
        &self.name
    }

    fn current_power(&self) -> Measurement {
        Measurement::watts(self.power_w, self.last_update)
    }

    fn snapshot(&self) -> EquipmentSnapshot {
        EquipmentSnapshot {
            label: self.name.clone(),
            state: self.state.as_str().to_string(),
            power_w: self.power_w,
            repartition: None,
        }
    }
}

impl UserControl for DimmableLoad {
    fn switch_on(&mut self) -> Result<()> {
        self.apply_switch_on(self.last_update)
    }

    fn switch_off(&mut self) -> Result<()> {
        self.apply_switch_off(self.last_update)
    }

    fn is_on(&self) -> bool {
        self.state == LoadState::On
    }
}

impl ExternalControl for DimmableLoad {
    fn max_power(&self) -> Measurement {
        Measurement::watts(self.max_power_w, self.last_update)
    }

    /// No sub-loads, so `policy` is ignored.
    fn set_current_power(
        &mut self,
        power_w: f64,
        _policy: Option<&dyn RepartitionPolicy>,
    ) -> Result<()> {
        self.apply_power(power_w, self.last_update)
    }
}

impl SimulationControl for DimmableLoad {
    fn state_label(&self) -> &'static str {
        self.state.as_str()
    }

    fn is_switched_on(&self) -> bool {
        self.state == LoadState::On
    }

    fn simulate_switch_on(&mut self, at: SimTime) -> Result<()> {
        self.apply_switch_on(at)
    }

    fn simulate_switch_off(&mut self, at: SimTime) -> Result<()> {
        self.apply_switch_off(at)
    }

    fn simulate_set_power(
        &mut self,
        power_w: f64,
        _policy: Option<PolicyKind>,
        at: SimTime,
    ) -> Result<()> {
        self.apply_power(power_w, at)
    }
}
