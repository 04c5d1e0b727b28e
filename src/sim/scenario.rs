//! Seeded occupant usage scenarios for dimmable loads.

use rand::{Rng, SeedableRng, rngs::StdRng};

use super::event::{Event, PowerVariation};
use super::time::SimTime;
use crate::error::{EquipError, Result};

/// Largest accepted number of sessions per scenario.
pub const MAX_SESSIONS: usize = 10_000;
/// Largest accepted number of set-power events per session.
pub const MAX_ADJUSTMENTS_PER_SESSION: usize = 100;

/// Random but reproducible occupant behaviour over a horizon.
///
/// The horizon is split into equal slots, one usage session per slot. Each
/// session switches the load on in the first third of its slot, adjusts the
/// power a few times in the middle third, and switches off in the last
/// third, so the generated sequence is always valid for a load that starts
/// off.
///
/// # Examples
///
/// ```
/// use equip_sim::sim::event::PowerVariation;
/// use equip_sim::sim::scenario::UsageScenario;
/// use equip_sim::sim::time::SimTime;
///
/// let scenario = UsageScenario::new(7, SimTime::from_secs(3600.0).unwrap(), 2, 1);
/// let events = scenario.generate(&PowerVariation::new(10.0, 100.0).unwrap()).unwrap();
/// assert_eq!(events.len(), 6);
/// ```
#[derive(Debug, Clone)]
pub struct UsageScenario {
    seed: u64,
    horizon: SimTime,
    sessions: usize,
    adjustments_per_session: usize,
}

impl UsageScenario {
    pub fn new(seed: u64, horizon: SimTime, sessions: usize, adjustments_per_session: usize) -> Self {
        Self {
            seed,
            horizon,
            sessions,
            adjustments_per_session,
        }
    }

    /// Generates the events in chronological order.
    ///
    /// # Errors
    ///
    /// `InvalidBounds` if `sessions` exceeds [`MAX_SESSIONS`] or
    /// `adjustments_per_session` exceeds [`MAX_ADJUSTMENTS_PER_SESSION`].
    /// Event construction errors are propagated; with power values drawn
    /// from `variation` itself none are expected.
    pub fn generate(&self, variation: &PowerVariation) -> Result<Vec<Event>> {
        if self.sessions > MAX_SESSIONS {
            return Err(EquipError::InvalidBounds {
                field: "sessions".into(),
                reason: format!("must be <= {MAX_SESSIONS}, got {}", self.sessions),
            });
        }
        if self.adjustments_per_session > MAX_ADJUSTMENTS_PER_SESSION {
            return Err(EquipError::InvalidBounds {
                field: "adjustments_per_session".into(),
                reason: format!(
                    "must be <= {MAX_ADJUSTMENTS_PER_SESSION}, got {}",
                    self.adjustments_per_session
                ),
            });
        }
        if self.sessions == 0 || self.horizon.as_secs() <= 0.0 {
            return Ok(Vec::new());
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let slot = self.horizon.as_secs() / self.sessions as f64;
        let third = slot / 3.0;
        let capacity = (2 + self.adjustments_per_session)
            .checked_mul(self.sessions)
            .unwrap_or(0);
        let mut events = Vec::with_capacity(capacity);

        for i in 0..self.sessions {
            let start = i as f64 * slot;

            let on_at = draw(&mut rng, start, start + third);
            events.push(Event::switch_on(SimTime::from_secs(on_at)?));

            let mut adjust_times: Vec<f64> = (0..self.adjustments_per_session)
                .map(|_| draw(&mut rng, start + third, start + 2.0 * third))
                .collect();
            adjust_times.sort_by(f64::total_cmp);
            for at in adjust_times {
                let power_w = rng.random_range(variation.min_w..=variation.max_w);
                events.push(Event::set_power(
                    SimTime::from_secs(at)?,
                    power_w,
                    None,
                    variation,
                )?);
            }

            let off_at = draw(&mut rng, start + 2.0 * third, start + slot);
            events.push(Event::switch_off(SimTime::from_secs(off_at)?));
        }

        Ok(events)
    }
}

/// Uniform draw in `[lo, hi)`, or `lo` when the range collapsed to nothing.
fn draw(rng: &mut StdRng, lo: f64, hi: f64) -> f64 {
    if hi > lo { rng.random_range(lo..hi) } else { lo }
}
