use super::time::SimTime;
use crate::error::{EquipError, Result};

/// Logical clock of one simulation run.
///
/// Time only moves forward: the engine advances it to each event's
/// occurrence time before executing the event.
///
/// # Examples
///
/// ```
/// use equip_sim::sim::clock::SimClock;
/// use equip_sim::sim::time::SimTime;
///
/// let mut clock = SimClock::new();
/// clock.advance_to(SimTime::from_secs(5.0).unwrap()).unwrap();
/// assert_eq!(clock.now().as_secs(), 5.0);
/// assert!(clock.advance_to(SimTime::from_secs(1.0).unwrap()).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    /// Current logical time
    now: SimTime,
}

impl SimClock {
    /// Creates a clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clock starting at `start`.
    pub fn starting_at(start: SimTime) -> Self {
        Self { now: start }
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Moves the clock to `t`.
    ///
    /// # Errors
    ///
    /// `InvalidTime` if `t` is earlier than the current time.
    pub fn advance_to(&mut self, t: SimTime) -> Result<()> {
        if t < self.now {
            return Err(EquipError::InvalidTime {
                value: Some(t.as_secs()),
                reason: format!("clock is already at {}", self.now),
            });
        }
        self.now = t;
        Ok(())
    }
}
