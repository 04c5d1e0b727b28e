//! Engine that runs one equipment's event queue in total order.

use tracing::{debug, info, warn};

use super::clock::SimClock;
use super::event::Event;
use super::queue::{EventId, EventQueue};
use super::time::SimTime;
use super::types::{ErrorMode, ExecutionRecord, Outcome};
use crate::equipment::SimulationControl;
use crate::error::{EquipError, Result};

/// Simulation engine owning one equipment, its pending events and clock.
///
/// Generic over `E: SimulationControl` for static dispatch. Events are
/// processed strictly one at a time; cancellation is checked immediately
/// before execution.
pub struct Engine<E: SimulationControl> {
    equipment: E,
    queue: EventQueue,
    clock: SimClock,
    error_mode: ErrorMode,
    records: Vec<ExecutionRecord>,
}

impl<E: SimulationControl> Engine<E> {
    /// Creates an engine at time zero.
    pub fn new(equipment: E, error_mode: ErrorMode) -> Self {
        Self {
            equipment,
            queue: EventQueue::new(),
            clock: SimClock::new(),
            error_mode,
            records: Vec::new(),
        }
    }

    /// Enqueues an event for this engine's equipment.
    ///
    /// # Errors
    ///
    /// `InvalidTime` if the event occurs before the current logical time.
    pub fn schedule(&mut self, event: Event) -> Result<EventId> {
        let at = event.time_of_occurrence();
        if at < self.clock.now() {
            return Err(EquipError::InvalidTime {
                value: Some(at.as_secs()),
                reason: format!("earlier than current time {}", self.clock.now()),
            });
        }
        let id = self.queue.schedule(event);
        debug!(equipment = self.equipment.label(), %id, at = %at, "event scheduled");
        Ok(id)
    }

    /// Schedules every event in order, stopping at the first error.
    pub fn schedule_all(&mut self, events: impl IntoIterator<Item = Event>) -> Result<Vec<EventId>> {
        events.into_iter().map(|e| self.schedule(e)).collect()
    }

    /// Cancels a pending event. Returns `false` if it is no longer pending.
    pub fn cancel(&mut self, id: EventId) -> bool {
        let cancelled = self.queue.cancel(id);
        if cancelled {
            debug!(equipment = self.equipment.label(), %id, "event cancelled");
        }
        cancelled
    }

    /// Handles the next pending event.
    ///
    /// # Returns
    ///
    /// The record of the handled event, or `None` when the queue is empty.
    ///
    /// # Errors
    ///
    /// In [`ErrorMode::Abort`], the error that made the equipment reject the
    /// event. The rejection is still recorded.
    pub fn step(&mut self) -> Result<Option<ExecutionRecord>> {
        let Some((id, event)) = self.queue.pop() else {
            return Ok(None);
        };
        let at = event.time_of_occurrence();
        self.clock.advance_to(at)?;

        let (outcome, failure) = if event.is_cancelled() {
            debug!(equipment = self.equipment.label(), %id, "skipping cancelled event");
            (Outcome::Cancelled, None)
        } else {
            match event.execute_on(&mut self.equipment) {
                Ok(()) => (Outcome::Executed, None),
                Err(e) => {
                    warn!(
                        equipment = self.equipment.label(),
                        %id,
                        kind = %event.kind(),
                        at = %at,
                        error = %e,
                        "event rejected"
                    );
                    (Outcome::Rejected(e.to_string()), Some(e))
                }
            }
        };

        let record = ExecutionRecord::new(at, event.kind(), outcome, self.equipment.snapshot());
        self.records.push(record.clone());

        match (failure, self.error_mode) {
            (Some(e), ErrorMode::Abort) => Err(e),
            _ => Ok(Some(record)),
        }
    }

    /// Handles every pending event and returns all records of this engine.
    pub fn run(&mut self) -> Result<&[ExecutionRecord]> {
        info!(equipment = self.equipment.label(), pending = self.queue.len(), "run started");
        while self.step()?.is_some() {}
        info!(
            equipment = self.equipment.label(),
            handled = self.records.len(),
            now = %self.clock.now(),
            "run finished"
        );
        Ok(&self.records)
    }

    /// Handles events occurring at or before `end`, then moves the clock to
    /// `end`. Later events stay pending.
    pub fn run_until(&mut self, end: SimTime) -> Result<&[ExecutionRecord]> {
        while self.queue.peek_time().is_some_and(|t| t <= end) {
            self.step()?;
        }
        if end > self.clock.now() {
            self.clock.advance_to(end)?;
        }
        Ok(&self.records)
    }

    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn records(&self) -> &[ExecutionRecord] {
        &self.records
    }

    /// Returns a reference to the equipment (read-only state access).
    pub fn equipment(&self) -> &E {
        &self.equipment
    }

    /// Consumes the engine, returning the equipment and all records.
    pub fn into_parts(self) -> (E, Vec<ExecutionRecord>) {
        (self.equipment, self.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equipment::{DimmableLoad, Equipment, HeatPump, HeatPumpParams, UserControl};
    use crate::sim::event::EventKind;

    fn t(secs: f64) -> SimTime {
        SimTime::from_secs(secs).unwrap()
    }

    fn lamp_engine(mode: ErrorMode) -> Engine<DimmableLoad> {
        Engine::new(DimmableLoad::lamp(), mode)
    }

    #[test]
    fn runs_events_in_order() {
        let mut engine = lamp_engine(ErrorMode::Skip);
        let range = *engine.equipment().variation();
        engine.schedule(Event::switch_off(t(20.0))).unwrap();
        engine
            .schedule(Event::set_power(t(10.0), 40.0, None, &range).unwrap())
            .unwrap();
        engine.schedule(Event::switch_on(t(0.0))).unwrap();

        let records = engine.run().unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.outcome == Outcome::Executed));
        assert_eq!(records[1].power_w, 40.0);
        assert!(!engine.equipment().is_on());
        assert_eq!(engine.now(), t(20.0));
    }

    #[test]
    fn same_time_switch_on_precedes_set_power() {
        let mut engine = lamp_engine(ErrorMode::Abort);
        let range = *engine.equipment().variation();
        // scheduled "wrong way round" but same time: priority puts switch-on first
        engine
            .schedule(Event::set_power(t(5.0), 20.0, None, &range).unwrap())
            .unwrap();
        engine.schedule(Event::switch_on(t(5.0))).unwrap();
        engine.run().unwrap();
        assert_eq!(engine.equipment().current_power().value, 20.0);
    }

    #[test]
    fn cancelled_event_is_recorded_but_not_applied() {
        let mut engine = lamp_engine(ErrorMode::Skip);
        let id = engine.schedule(Event::switch_on(t(1.0))).unwrap();
        assert!(engine.cancel(id));
        let records = engine.run().unwrap().to_vec();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome, Outcome::Cancelled);
        assert!(!engine.equipment().is_on());
    }

    #[test]
    fn skip_mode_records_rejection_and_continues() {
        let mut engine = lamp_engine(ErrorMode::Skip);
        engine.schedule(Event::switch_off(t(1.0))).unwrap();
        engine.schedule(Event::switch_on(t(2.0))).unwrap();
        let records = engine.run().unwrap();
        assert!(matches!(records[0].outcome, Outcome::Rejected(_)));
        assert_eq!(records[1].outcome, Outcome::Executed);
    }

    #[test]
    fn abort_mode_returns_error() {
        let mut engine = lamp_engine(ErrorMode::Abort);
        engine.schedule(Event::switch_off(t(1.0))).unwrap();
        engine.schedule(Event::switch_on(t(2.0))).unwrap();
        let err = engine.run().unwrap_err();
        assert!(matches!(err, EquipError::IllegalStateTransition { .. }));
        assert_eq!(engine.pending(), 1);
        assert_eq!(engine.records().len(), 1);
    }

    #[test]
    fn rejects_events_in_the_past() {
        let mut engine = lamp_engine(ErrorMode::Skip);
        engine.schedule(Event::switch_on(t(10.0))).unwrap();
        engine.run().unwrap();
        let err = engine.schedule(Event::switch_off(t(5.0))).unwrap_err();
        assert!(matches!(err, EquipError::InvalidTime { .. }));
    }

    #[test]
    fn run_until_leaves_later_events_pending() {
        let mut engine = lamp_engine(ErrorMode::Skip);
        engine.schedule(Event::switch_on(t(1.0))).unwrap();
        engine.schedule(Event::switch_off(t(100.0))).unwrap();
        engine.run_until(t(50.0)).unwrap();
        assert_eq!(engine.records().len(), 1);
        assert_eq!(engine.pending(), 1);
        assert_eq!(engine.now(), t(50.0));
        assert!(engine.equipment().is_on());
    }

    #[test]
    fn heat_pump_records_repartition() {
        let hp = HeatPump::new("heat_pump", HeatPumpParams::standard().unwrap()).unwrap();
        let range = *hp.variation();
        let mut engine = Engine::new(hp, ErrorMode::Skip);
        engine.schedule(Event::switch_on(t(0.0))).unwrap();
        engine
            .schedule(Event::set_power(t(60.0), 1920.0, None, &range).unwrap())
            .unwrap();
        let records = engine.run().unwrap();
        let last = records.last().unwrap();
        assert_eq!(last.kind, EventKind::SetPower);
        let r = last.repartition.unwrap();
        assert_eq!((r.pump_w, r.compressor_w, r.sensor_w), (400.0, 1500.0, 20.0));
    }
}
