//! Post-hoc run summary computed from execution records.

use std::fmt;

use super::time::SimTime;
use super::types::{ExecutionRecord, Outcome};

/// Aggregate figures for one equipment's run.
///
/// Computed post-hoc from the record vector so reported numbers always
/// agree with the exported records.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Equipment label.
    pub equipment: String,
    /// Events applied to the equipment.
    pub executed: usize,
    /// Events skipped because they were cancelled.
    pub cancelled: usize,
    /// Events refused by the equipment.
    pub rejected: usize,
    /// Energy consumed in Wh, reported power held constant between records.
    pub energy_wh: f64,
    /// Highest reported power (W).
    pub peak_power_w: f64,
    /// State after the last record, `None` if nothing was handled.
    pub final_state: Option<String>,
}

impl RunSummary {
    /// Computes the summary of one equipment's records up to `end`.
    ///
    /// # Arguments
    ///
    /// * `equipment` - Label of the equipment the records belong to
    /// * `records` - Records in handling order
    /// * `end` - Logical end of the run; the last power level holds until then
    pub fn from_records(equipment: &str, records: &[ExecutionRecord], end: SimTime) -> Self {
        let mut executed = 0;
        let mut cancelled = 0;
        let mut rejected = 0;
        let mut energy_ws = 0.0_f64;
        let mut peak_power_w = 0.0_f64;

        for (i, r) in records.iter().enumerate() {
            match r.outcome {
                Outcome::Executed => executed += 1,
                Outcome::Cancelled => cancelled += 1,
                Outcome::Rejected(_) => rejected += 1,
            }
            peak_power_w = peak_power_w.max(r.power_w);

            let until = records.get(i + 1).map_or(end, |next| next.time);
            energy_ws += r.power_w * until.since(r.time);
        }

        Self {
            equipment: equipment.to_string(),
            executed,
            cancelled,
            rejected,
            energy_wh: energy_ws / 3600.0,
            peak_power_w,
            final_state: records.last().map(|r| r.state.clone()),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Run Summary: {} ---", self.equipment)?;
        writeln!(
            f,
            "Events: {} executed, {} cancelled, {} rejected",
            self.executed, self.cancelled, self.rejected
        )?;
        writeln!(f, "Energy consumed: {:.3} Wh", self.energy_wh)?;
        writeln!(f, "Peak power: {:.2} W", self.peak_power_w)?;
        write!(
            f,
            "Final state: {}",
            self.final_state.as_deref().unwrap_or("n/a")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::event::EventKind;

    fn rec(secs: f64, kind: EventKind, outcome: Outcome, power_w: f64, state: &str) -> ExecutionRecord {
        ExecutionRecord {
            time: SimTime::from_secs(secs).unwrap(),
            equipment: "lamp".into(),
            kind,
            outcome,
            state: state.into(),
            power_w,
            repartition: None,
        }
    }

    #[test]
    fn empty_records_give_zeroes() {
        let s = RunSummary::from_records("lamp", &[], SimTime::from_secs(10.0).unwrap());
        assert_eq!(s.executed, 0);
        assert_eq!(s.energy_wh, 0.0);
        assert_eq!(s.final_state, None);
    }

    #[test]
    fn energy_integrates_piecewise_constant_power() {
        let records = vec![
            rec(0.0, EventKind::SwitchOn, Outcome::Executed, 100.0, "On"),
            rec(1800.0, EventKind::SetPower, Outcome::Executed, 50.0, "On"),
            rec(3600.0, EventKind::SwitchOff, Outcome::Executed, 0.0, "Off"),
        ];
        let s = RunSummary::from_records("lamp", &records, SimTime::from_secs(7200.0).unwrap());
        // 100 W for 0.5 h + 50 W for 0.5 h
        assert!((s.energy_wh - 75.0).abs() < 1e-9);
        assert_eq!(s.peak_power_w, 100.0);
        assert_eq!(s.final_state.as_deref(), Some("Off"));
    }

    #[test]
    fn counts_outcomes() {
        let records = vec![
            rec(0.0, EventKind::SwitchOn, Outcome::Cancelled, 0.0, "Off"),
            rec(1.0, EventKind::SwitchOff, Outcome::Rejected("off".into()), 0.0, "Off"),
            rec(2.0, EventKind::SwitchOn, Outcome::Executed, 100.0, "On"),
        ];
        let s = RunSummary::from_records("lamp", &records, SimTime::from_secs(2.0).unwrap());
        assert_eq!((s.executed, s.cancelled, s.rejected), (1, 1, 1));
    }

    #[test]
    fn display_does_not_panic() {
        let s = RunSummary::from_records("lamp", &[], SimTime::ZERO);
        assert!(format!("{s}").contains("Run Summary: lamp"));
    }
}
