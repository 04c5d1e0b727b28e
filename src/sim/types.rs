//! Core run types: error handling mode and per-event execution records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::event::EventKind;
use super::time::SimTime;
use crate::equipment::EquipmentSnapshot;
use crate::policy::PowerRepartition;

/// What the engine does when an event is rejected by its equipment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
    /// Record the rejection and continue with the next event.
    #[default]
    Skip,
    /// Stop the run and return the error.
    Abort,
}

impl FromStr for ErrorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip" => Ok(ErrorMode::Skip),
            "abort" => Ok(ErrorMode::Abort),
            other => Err(format!("must be \"skip\" or \"abort\", got \"{other}\"")),
        }
    }
}

/// Result of handing one dequeued event to the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum Outcome {
    Executed,
    /// Cancelled before it came due; the equipment was not touched.
    Cancelled,
    /// The equipment refused the event; state is unchanged.
    Rejected(String),
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Executed => "executed",
            Outcome::Cancelled => "cancelled",
            Outcome::Rejected(_) => "rejected",
        }
    }
}

/// Complete record of one dequeued event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Occurrence time of the event.
    pub time: SimTime,
    /// Equipment label.
    pub equipment: String,
    pub kind: EventKind,
    pub outcome: Outcome,
    /// Equipment state after handling the event.
    pub state: String,
    /// Reported power after handling the event (W).
    pub power_w: f64,
    /// Sub-load split after handling the event, for equipment that has one.
    pub repartition: Option<PowerRepartition>,
}

impl ExecutionRecord {
    pub fn new(time: SimTime, kind: EventKind, outcome: Outcome, snap: EquipmentSnapshot) -> Self {
        Self {
            time,
            equipment: snap.label,
            kind,
            outcome,
            state: snap.state,
            power_w: snap.power_w,
            repartition: snap.repartition,
        }
    }
}

impl fmt::Display for ExecutionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>9} | {:<10} {:<10} {:<9} | state={:<8} power={:>8.2} W",
            self.time.to_string(),
            self.equipment,
            self.kind.as_str(),
            self.outcome.as_str(),
            self.state,
            self.power_w,
        )?;
        if let Some(r) = &self.repartition {
            write!(f, " ({r})")?;
        }
        if let Outcome::Rejected(reason) = &self.outcome {
            write!(f, " ! {reason}")?;
        }
        Ok(())
    }
}
