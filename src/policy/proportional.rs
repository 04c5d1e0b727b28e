use super::{PolicyInformation, PowerRepartition, RepartitionPolicy, SubLoad};
use crate::error::Result;

/// Alternate strategy sharing the remainder in proportion to headroom.
///
/// Every sub-load receives its minimum, then the same fraction of its own
/// headroom (`max - min`). The fraction is `remainder / total_headroom`,
/// capped at 1, so no sub-load is starved by the precedence order.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProportionalPolicy;

impl RepartitionPolicy for ProportionalPolicy {
    fn allocate(&self, info: &PolicyInformation) -> Result<PowerRepartition> {
        info.ensure_feasible()?;

        let mut out = PowerRepartition::minimums(info);
        let remainder_w = info.power_available_w() - info.total_min_required_w();
        let total_headroom_w: f64 = SubLoad::PRECEDENCE
            .iter()
            .map(|s| info.bounds(*s).headroom_w())
            .sum();

        if total_headroom_w <= 0.0 || remainder_w <= 0.0 {
            return Ok(out);
        }

        let share = (remainder_w / total_headroom_w).min(1.0);
        for s in SubLoad::PRECEDENCE {
            let bounds = info.bounds(s);
            let watts = bounds.min_required_w() + bounds.headroom_w() * share;
            out.set(s, watts.min(bounds.max_supported_w()));
        }
        out.trim_to_budget(info);

        Ok(out)
    }

    fn name(&self) -> &'static str {
        "proportional"
    }
}
