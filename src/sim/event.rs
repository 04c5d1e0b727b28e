//! Equipment events: occurrence time, priority class, payload, cancellation.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::time::SimTime;
use crate::equipment::SimulationControl;
use crate::error::{EquipError, Result};
use crate::policy::PolicyKind;

/// Closed set of event kinds, each with a fixed priority rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SwitchOn,
    SetPower,
    SwitchOff,
}

impl EventKind {
    /// Tie-break rank, lower wins: switch-on 1, set-power 2, switch-off 3.
    pub fn rank(self) -> u8 {
        match self {
            EventKind::SwitchOn => 1,
            EventKind::SetPower => 2,
            EventKind::SwitchOff => 3,
        }
    }

    pub fn requires_payload(self) -> bool {
        matches!(self, EventKind::SetPower)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::SwitchOn => "switch_on",
            EventKind::SetPower => "set_power",
            EventKind::SwitchOff => "switch_off",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Allowed range for set-power values of one equipment.
///
/// Passed explicitly at event construction so equipment with different
/// bounds can coexist in one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerVariation {
    pub min_w: f64,
    pub max_w: f64,
}

impl PowerVariation {
    /// # Errors
    ///
    /// Returns `InvalidBounds` for negative, non-finite or inverted ranges.
    pub fn new(min_w: f64, max_w: f64) -> Result<Self> {
        if !min_w.is_finite() || !max_w.is_finite() || min_w < 0.0 {
            return Err(EquipError::InvalidBounds {
                field: "power_variation".into(),
                reason: format!("[{min_w}, {max_w}] must be finite and >= 0"),
            });
        }
        if min_w > max_w {
            return Err(EquipError::InvalidBounds {
                field: "power_variation".into(),
                reason: format!("min {min_w} W exceeds max {max_w} W"),
            });
        }
        Ok(Self { min_w, max_w })
    }

    pub fn contains(&self, watts: f64) -> bool {
        (self.min_w..=self.max_w).contains(&watts)
    }
}

/// Payload of a set-power event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetPowerPayload {
    pub power_w: f64,
    /// `None` resolves to the equipment's default repartition policy.
    #[serde(default)]
    pub policy: Option<PolicyKind>,
}

/// What an event does to its equipment, with the kind-specific payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EquipmentAction {
    SwitchOn,
    SwitchOff,
    SetPower(SetPowerPayload),
}

impl EquipmentAction {
    pub fn kind(&self) -> EventKind {
        match self {
            EquipmentAction::SwitchOn => EventKind::SwitchOn,
            EquipmentAction::SwitchOff => EventKind::SwitchOff,
            EquipmentAction::SetPower(_) => EventKind::SetPower,
        }
    }
}

/// A discrete event targeting one piece of equipment.
///
/// Time is the primary order; [`Event::has_priority_over`] only breaks ties
/// between events sharing the same occurrence time.
///
/// # Examples
///
/// ```
/// use equip_sim::sim::event::{Event, PowerVariation};
/// use equip_sim::sim::time::SimTime;
///
/// let t = SimTime::from_secs(10.0).unwrap();
/// let range = PowerVariation::new(0.0, 100.0).unwrap();
/// let on = Event::switch_on(t);
/// let dim = Event::set_power(t, 40.0, None, &range).unwrap();
/// assert!(on.has_priority_over(&dim));
/// assert!(!dim.has_priority_over(&on));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    time_of_occurrence: SimTime,
    action: EquipmentAction,
    #[serde(default)]
    cancelled: bool,
}

impl Event {
    /// Generic constructor validating time and payload against the kind.
    ///
    /// # Errors
    ///
    /// - `InvalidTime` if `time` is `None`.
    /// - `InvalidPayload` if the payload is missing for `SetPower`, present
    ///   for a switch event, or its power falls outside `variation`.
    pub fn new(
        kind: EventKind,
        time: Option<SimTime>,
        payload: Option<SetPowerPayload>,
        variation: &PowerVariation,
    ) -> Result<Self> {
        let time_of_occurrence = time.ok_or_else(|| EquipError::InvalidTime {
            value: None,
            reason: "time of occurrence is required".into(),
        })?;

        let action = match (kind, payload) {
            (EventKind::SwitchOn, None) => EquipmentAction::SwitchOn,
            (EventKind::SwitchOff, None) => EquipmentAction::SwitchOff,
            (EventKind::SetPower, Some(p)) => {
                if !p.power_w.is_finite() || !variation.contains(p.power_w) {
                    return Err(EquipError::InvalidPayload {
                        kind,
                        reason: format!(
                            "power {} W outside [{}, {}] W",
                            p.power_w, variation.min_w, variation.max_w
                        ),
                    });
                }
                EquipmentAction::SetPower(p)
            }
            (EventKind::SetPower, None) => {
                return Err(EquipError::InvalidPayload {
                    kind,
                    reason: "a power value is required".into(),
                });
            }
            (_, Some(_)) => {
                return Err(EquipError::InvalidPayload {
                    kind,
                    reason: "this kind carries no payload".into(),
                });
            }
        };

        Ok(Self {
            time_of_occurrence,
            action,
            cancelled: false,
        })
    }

    pub fn switch_on(time: SimTime) -> Self {
        Self {
            time_of_occurrence: time,
            action: EquipmentAction::SwitchOn,
            cancelled: false,
        }
    }

    pub fn switch_off(time: SimTime) -> Self {
        Self {
            time_of_occurrence: time,
            action: EquipmentAction::SwitchOff,
            cancelled: false,
        }
    }

    /// Builds a set-power event; the value is checked against `variation`.
    pub fn set_power(
        time: SimTime,
        power_w: f64,
        policy: Option<PolicyKind>,
        variation: &PowerVariation,
    ) -> Result<Self> {
        Self::new(
            EventKind::SetPower,
            Some(time),
            Some(SetPowerPayload { power_w, policy }),
            variation,
        )
    }

    pub fn time_of_occurrence(&self) -> SimTime {
        self.time_of_occurrence
    }

    pub fn kind(&self) -> EventKind {
        self.action.kind()
    }

    pub fn action(&self) -> &EquipmentAction {
        &self.action
    }

    /// Secondary order among simultaneous events.
    ///
    /// True iff `self` ranks strictly higher than `other`, or both have the
    /// same kind. Same-kind pairs therefore dominate each other, so this is
    /// a preorder and callers must not expect asymmetry between instances.
    pub fn has_priority_over(&self, other: &Event) -> bool {
        let (a, b) = (self.kind(), other.kind());
        a == b || a.rank() < b.rank()
    }

    /// Marks the event so the executor skips it. No effect once executed.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Applies this event to `target` after checking the kind's precondition.
    ///
    /// A cancelled event is a no-op. On error the target is left unchanged.
    ///
    /// # Errors
    ///
    /// `IllegalStateTransition` when the target's state does not allow the
    /// event; allocation errors from the heat pump's repartition policy.
    pub fn execute_on<E: SimulationControl + ?Sized>(&self, target: &mut E) -> Result<()> {
        if self.cancelled {
            debug!(equipment = target.label(), kind = %self.kind(), "skipping cancelled event");
            return Ok(());
        }

        let at = self.time_of_occurrence;
        match self.action {
            EquipmentAction::SwitchOn => {
                if target.is_switched_on() {
                    return Err(EquipError::illegal(
                        target.label(),
                        target.state_label(),
                        "switch on",
                    ));
                }
                target.simulate_switch_on(at)?;
            }
            EquipmentAction::SwitchOff => {
                if !target.is_switched_on() {
                    return Err(EquipError::illegal(
                        target.label(),
                        target.state_label(),
                        "switch off",
                    ));
                }
                target.simulate_switch_off(at)?;
            }
            EquipmentAction::SetPower(p) => {
                if !target.is_switched_on() {
                    return Err(EquipError::illegal(
                        target.label(),
                        target.state_label(),
                        "set power",
                    ));
                }
                target.simulate_set_power(p.power_w, p.policy, at)?;
            }
        }

        debug!(
            equipment = target.label(),
            kind = %self.kind(),
            at = %at,
            state = %target.state_label(),
            "event executed"
        );
        Ok(())
    }
}
