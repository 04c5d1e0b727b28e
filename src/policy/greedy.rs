use super::{PolicyInformation, PowerRepartition, RepartitionPolicy, SubLoad};
use crate::error::Result;

/// Default strategy: minimums first, then the remainder in precedence order.
///
/// After every sub-load receives its minimum requirement, the remaining
/// budget fills the pump up to its maximum, then the compressor, then the
/// sensor. Whatever is left once all three are at their maximum stays
/// unallocated.
#[derive(Debug, Default, Clone, Copy)]
pub struct GreedyPolicy;

impl RepartitionPolicy for GreedyPolicy {
    fn allocate(&self, info: &PolicyInformation) -> Result<PowerRepartition> {
        info.ensure_feasible()?;

        let mut out = PowerRepartition::minimums(info);
        let mut remainder_w = info.power_available_w() - info.total_min_required_w();

        for s in SubLoad::PRECEDENCE {
            if remainder_w <= 0.0 {
                break;
            }
            let bounds = info.bounds(s);
            let extra_w = bounds.headroom_w().min(remainder_w);
            out.set(s, bounds.min_required_w() + extra_w);
            remainder_w -= extra_w;
        }
        out.trim_to_budget(info);

        Ok(out)
    }

    fn name(&self) -> &'static str {
        "greedy"
    }
}
