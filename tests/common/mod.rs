//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use equip_sim::equipment::{DimmableLoad, HeatPump, HeatPumpParams};
use equip_sim::policy::{PolicyInformation, SubLoadBounds};
use equip_sim::sim::event::{Event, EventKind, PowerVariation};
use equip_sim::sim::time::SimTime;

/// Logical time from seconds.
pub fn t(secs: f64) -> SimTime {
    SimTime::from_secs(secs).expect("test times are valid")
}

/// Lamp set-power range (10–100 W).
pub fn lamp_range() -> PowerVariation {
    PowerVariation::new(10.0, 100.0).expect("valid range")
}

/// Standard 2 kW heat pump (pump 50–400 W, compressor 200–1500 W, sensor 5–20 W).
pub fn standard_heat_pump() -> HeatPump {
    let params = HeatPumpParams::standard().expect("standard params are valid");
    HeatPump::new("heat_pump", params).expect("standard heat pump is valid")
}

/// Fresh lamp in the Off state.
pub fn lamp() -> DimmableLoad {
    DimmableLoad::lamp()
}

/// One event of each kind at `at`, valid against [`lamp_range`].
pub fn one_of_each_kind(at: SimTime) -> Vec<Event> {
    vec![
        Event::switch_on(at),
        Event::set_power(at, 50.0, None, &lamp_range()).expect("in range"),
        Event::switch_off(at),
    ]
}

/// Every kind, in rank order.
pub const ALL_KINDS: [EventKind; 3] = [EventKind::SwitchOn, EventKind::SetPower, EventKind::SwitchOff];

/// Sub-load bounds from `(min, max)`.
pub fn bounds(min_w: f64, max_w: f64) -> SubLoadBounds {
    SubLoadBounds::new(min_w, max_w).expect("valid bounds")
}

/// Bounds used by the documented allocation scenarios:
/// pump 10–30 W, compressor 20–40 W, sensor 5–10 W.
pub fn scenario_info(available_w: f64) -> PolicyInformation {
    PolicyInformation::new(
        available_w,
        bounds(10.0, 30.0),
        bounds(20.0, 40.0),
        bounds(5.0, 10.0),
    )
    .expect("valid policy information")
}
