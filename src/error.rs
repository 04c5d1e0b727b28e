//! Error taxonomy shared by events, equipment, and repartition policies.

use thiserror::Error;

use crate::sim::event::EventKind;

/// Errors raised synchronously at the point of violation.
///
/// None of these are transient: they signal a programming or configuration
/// error, so nothing in the crate retries after receiving one.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EquipError {
    /// Event payload missing or extraneous for its kind, or out of range.
    #[error("invalid payload for {kind} event: {reason}")]
    InvalidPayload { kind: EventKind, reason: String },

    /// Missing or invalid occurrence time.
    #[error("invalid time{}: {reason}", .value.map(|v| format!(" {v} s")).unwrap_or_default())]
    InvalidTime { value: Option<f64>, reason: String },

    /// Operation not allowed from the equipment's current state.
    #[error("{equipment}: cannot {operation} while {state}")]
    IllegalStateTransition {
        equipment: String,
        state: String,
        operation: &'static str,
    },

    /// Malformed power bounds (min > max, negative or non-finite values).
    #[error("invalid bounds for {field}: {reason}")]
    InvalidBounds { field: String, reason: String },

    /// The budget cannot cover the sum of all minimum requirements.
    #[error("infeasible allocation: minimums need {required_w} W, only {available_w} W available")]
    InfeasibleAllocation { required_w: f64, available_w: f64 },

    /// Direct power setter called with a value outside `[0, max_w]`.
    #[error("power {value_w} W outside [0, {max_w}] W")]
    InvalidPower { value_w: f64, max_w: f64 },

    /// Target temperature outside the supported range.
    #[error("temperature {value_c} °C outside [{min_c}, {max_c}] °C")]
    InvalidTemperature { value_c: f64, min_c: f64, max_c: f64 },
}

pub type Result<T> = std::result::Result<T, EquipError>;

impl EquipError {
    pub(crate) fn illegal(
        equipment: &str,
        state: impl ToString,
        operation: &'static str,
    ) -> Self {
        Self::IllegalStateTransition {
            equipment: equipment.to_string(),
            state: state.to_string(),
            operation,
        }
    }
}
