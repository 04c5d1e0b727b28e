use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{
    Equipment, EquipmentSnapshot, ExternalControl, Measurement, SimulationControl,
    ThermalControl, UserControl,
};
use crate::error::{EquipError, Result};
use crate::policy::{
    PolicyInformation, PolicyKind, PowerRepartition, RepartitionPolicy, SubLoadBounds,
};
use crate::sim::event::PowerVariation;
use crate::sim::time::SimTime;

/// Operating state of a heat pump. Heating and cooling are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeatPumpState {
    Off,
    On,
    Heating,
    Cooling,
}

impl HeatPumpState {
    pub fn as_str(self) -> &'static str {
        match self {
            HeatPumpState::Off => "Off",
            HeatPumpState::On => "On",
            HeatPumpState::Heating => "Heating",
            HeatPumpState::Cooling => "Cooling",
        }
    }
}

impl fmt::Display for HeatPumpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Construction parameters of a [`HeatPump`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatPumpParams {
    pub max_power_w: f64,
    pub variation: PowerVariation,
    pub pump: SubLoadBounds,
    pub compressor: SubLoadBounds,
    pub sensor: SubLoadBounds,
    pub default_policy: PolicyKind,
    pub target_temperature_c: f64,
    pub min_target_c: f64,
    pub max_target_c: f64,
    pub initial_temperature_c: f64,
}

impl HeatPumpParams {
    /// A 2 kW unit: pump 50–400 W, compressor 200–1500 W, sensor 5–20 W.
    pub fn standard() -> Result<Self> {
        Ok(Self {
            max_power_w: 2000.0,
            variation: PowerVariation::new(255.0, 1920.0)?,
            pump: SubLoadBounds::new(50.0, 400.0)?,
            compressor: SubLoadBounds::new(200.0, 1500.0)?,
            sensor: SubLoadBounds::new(5.0, 20.0)?,
            default_policy: PolicyKind::Greedy,
            target_temperature_c: 20.0,
            min_target_c: 10.0,
            max_target_c: 30.0,
            initial_temperature_c: 18.0,
        })
    }
}

/// Heat-pump-like thermal unit with three internal sub-loads.
///
/// Every accepted power change is split across pump, compressor and sensor
/// by a [`RepartitionPolicy`]; the split is validated before any field
/// changes, so a rejected call leaves the unit untouched.
#[derive(Debug, Clone)]
pub struct HeatPump {
    name: String,
    state: HeatPumpState,
    power_w: f64,
    repartition: PowerRepartition,
    params: HeatPumpParams,
    target_temperature_c: f64,
    current_temperature_c: f64,
    last_update: SimTime,
}

impl HeatPump {
    /// Creates a unit in the `Off` state.
    ///
    /// # Errors
    ///
    /// `InvalidBounds` for a non-positive maximum power, a variation range
    /// above it, or an inverted target temperature range;
    /// `InvalidTemperature` if the initial target is out of range.
    pub fn new(name: impl Into<String>, params: HeatPumpParams) -> Result<Self> {
        if !params.max_power_w.is_finite() || params.max_power_w <= 0.0 {
            return Err(EquipError::InvalidBounds {
                field: "max_power_w".into(),
                reason: format!("must be > 0, got {}", params.max_power_w),
            });
        }
        if params.variation.max_w > params.max_power_w {
            return Err(EquipError::InvalidBounds {
                field: "power_variation".into(),
                reason: format!(
                    "max {} W exceeds max_power_w {}",
                    params.variation.max_w, params.max_power_w
                ),
            });
        }
        if params.min_target_c > params.max_target_c {
            return Err(EquipError::InvalidBounds {
                field: "min_target_c".into(),
                reason: format!(
                    "{} °C exceeds max_target_c {} °C",
                    params.min_target_c, params.max_target_c
                ),
            });
        }
        check_temperature(&params, params.target_temperature_c)?;

        Ok(Self {
            name: name.into(),
            state: HeatPumpState::Off,
            power_w: 0.0,
            repartition: PowerRepartition::default(),
            target_temperature_c: params.target_temperature_c,
            current_temperature_c: params.initial_temperature_c,
            params,
            last_update: SimTime::ZERO,
        })
    }

    pub fn state(&self) -> HeatPumpState {
        self.state
    }

    /// Current split of the reported power across sub-loads.
    pub fn sub_load_powers(&self) -> PowerRepartition {
        self.repartition
    }

    pub fn default_policy(&self) -> PolicyKind {
        self.params.default_policy
    }

    /// Allowed range for set-power events targeting this unit.
    pub fn variation(&self) -> &PowerVariation {
        &self.params.variation
    }

    /// Records a sensed room temperature.
    pub fn set_current_temperature(&mut self, celsius: f64, at: SimTime) {
        self.current_temperature_c = celsius;
        self.last_update = self.last_update.max(at);
    }

    /// Builds the allocation input for a new total budget.
    pub fn policy_information(&self, power_w: f64) -> Result<PolicyInformation> {
        PolicyInformation::new(
            power_w,
            self.params.pump,
            self.params.compressor,
            self.params.sensor,
        )
    }

    fn transition(
        &mut self,
        allowed_from: &[HeatPumpState],
        to: HeatPumpState,
        operation: &'static str,
        at: SimTime,
    ) -> Result<()> {
        if !allowed_from.contains(&self.state) {
            return Err(EquipError::illegal(&self.name, self.state, operation));
        }
        let from = self.state;
        self.state = to;
        self.last_update = at;
        info!(equipment = %self.name, at = %at, %from, %to, "{operation}");
        Ok(())
    }

    fn apply_switch_off(&mut self, at: SimTime) -> Result<()> {
        self.transition(
            &[
                HeatPumpState::On,
                HeatPumpState::Heating,
                HeatPumpState::Cooling,
            ],
            HeatPumpState::Off,
            "switch off",
            at,
        )?;
        self.power_w = 0.0;
        self.repartition = PowerRepartition::default();
        Ok(())
    }

    fn apply_power(
        &mut self,
        power_w: f64,
        policy: &dyn RepartitionPolicy,
        at: SimTime,
    ) -> Result<PowerRepartition> {
        if self.state == HeatPumpState::Off {
            return Err(EquipError::illegal(&self.name, self.state, "set power"));
        }
        if !power_w.is_finite() || !(0.0..=self.params.max_power_w).contains(&power_w) {
            return Err(EquipError::InvalidPower {
                value_w: power_w,
                max_w: self.params.max_power_w,
            });
        }

        let info = self.policy_information(power_w)?;
        let repartition = policy.allocate(&info).inspect_err(|e| {
            warn!(equipment = %self.name, policy = policy.name(), error = %e, "allocation refused");
        })?;

        self.power_w = power_w;
        self.repartition = repartition;
        self.last_update = at;
        info!(
            equipment = %self.name,
            at = %at,
            power_w,
            policy = policy.name(),
            %repartition,
            "power set"
        );
        Ok(repartition)
    }
}

fn check_temperature(params: &HeatPumpParams, celsius: f64) -> Result<()> {
    if !celsius.is_finite() || !(params.min_target_c..=params.max_target_c).contains(&celsius) {
        return Err(EquipError::InvalidTemperature {
            value_c: celsius,
            min_c: params.min_target_c,
            max_c: params.max_target_c,
        });
    }
    Ok(())
}

impl Equipment for HeatPump {
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
            repartition: Some(self.repartition),
        }
    }
}

impl UserControl for HeatPump {
    fn switch_on(&mut self) -> Result<()> {
        self.transition(
            &[HeatPumpState::Off],
            HeatPumpState::On,
            "switch on",
            self.last_update,
        )
    }

    fn switch_off(&mut self) -> Result<()> {
        self.apply_switch_off(self.last_update)
    }

    fn is_on(&self) -> bool {
        self.state != HeatPumpState::Off
    }
}

impl ThermalControl for HeatPump {
    fn start_heating(&mut self) -> Result<()> {
        self.transition(
            &[HeatPumpState::On],
            HeatPumpState::Heating,
            "start heating",
            self.last_update,
        )
    }

    fn stop_heating(&mut self) -> Result<()> {
        self.transition(
            &[HeatPumpState::Heating],
            HeatPumpState::On,
            "stop heating",
            self.last_update,
        )
    }

    fn start_cooling(&mut self) -> Result<()> {
        self.transition(
            &[HeatPumpState::On],
            HeatPumpState::Cooling,
            "start cooling",
            self.last_update,
        )
    }

    fn stop_cooling(&mut self) -> Result<()> {
        self.transition(
            &[HeatPumpState::Cooling],
            HeatPumpState::On,
            "stop cooling",
            self.last_update,
        )
    }

    fn target_temperature(&self) -> Measurement {
        Measurement::celsius(self.target_temperature_c, self.last_update)
    }

    fn set_target_temperature(&mut self, celsius: f64) -> Result<()> {
        check_temperature(&self.params, celsius)?;
        self.target_temperature_c = celsius;
        Ok(())
    }

    fn current_temperature(&self) -> Measurement {
        Measurement::celsius(self.current_temperature_c, self.last_update)
    }
}

impl ExternalControl for HeatPump {
    fn max_power(&self) -> Measurement {
        Measurement::watts(self.params.max_power_w, self.last_update)
    }

    fn set_current_power(
        &mut self,
        power_w: f64,
        policy: Option<&dyn RepartitionPolicy>,
    ) -> Result<()> {
        let default = self.params.default_policy;
        let policy: &dyn RepartitionPolicy = match policy {
            Some(p) => p,
            None => &default,
        };
        self.apply_power(power_w, policy, self.last_update)
            .map(|_| ())
    }
}

impl SimulationControl for HeatPump {
    fn state_label(&self) -> &'static str {
        self.state.as_str()
    }

    fn is_switched_on(&self) -> bool {
        self.state != HeatPumpState::Off
    }

    fn simulate_switch_on(&mut self, at: SimTime) -> Result<()> {
        self.transition(&[HeatPumpState::Off], HeatPumpState::On, "switch on", at)
    }

    fn simulate_switch_off(&mut self, at: SimTime) -> Result<()> {
        self.apply_switch_off(at)
    }

    fn simulate_set_power(
        &mut self,
        power_w: f64,
        policy: Option<PolicyKind>,
        at: SimTime,
    ) -> Result<()> {
        let policy = policy.unwrap_or(self.params.default_policy);
        self.apply_power(power_w, &policy, at).map(|_| ())
    }
}
