//! Integration tests for event execution through the engine.

mod common;

use std::thread;

use equip_sim::equipment::{
    Equipment, ExternalControl, HeatPumpState, LoadState, SimulationControl, ThermalControl,
    UserControl,
};
use equip_sim::error::EquipError;
use equip_sim::policy::PolicyKind;
use equip_sim::sim::engine::Engine;
use equip_sim::sim::event::{Event, EventKind, SetPowerPayload};
use equip_sim::sim::scenario::UsageScenario;
use equip_sim::sim::shared::SharedEquipment;
use equip_sim::sim::summary::RunSummary;
use equip_sim::sim::types::{ErrorMode, Outcome};

#[test]
fn switch_on_twice_is_an_illegal_transition() {
    let mut lamp = common::lamp();
    Event::switch_on(common::t(0.0)).execute_on(&mut lamp).unwrap();
    assert_eq!(lamp.state(), LoadState::On);

    let err = Event::switch_on(common::t(1.0)).execute_on(&mut lamp).unwrap_err();
    assert!(matches!(err, EquipError::IllegalStateTransition { .. }));
    assert_eq!(lamp.state(), LoadState::On);
}

#[test]
fn out_of_range_set_power_never_reaches_execution() {
    for power_w in [9.99, 100.01, f64::NAN] {
        let err = Event::new(
            EventKind::SetPower,
            Some(common::t(0.0)),
            Some(SetPowerPayload {
                power_w,
                policy: None,
            }),
            &common::lamp_range(),
        )
        .unwrap_err();
        assert!(matches!(err, EquipError::InvalidPayload { .. }));
    }
}

#[test]
fn missing_time_is_rejected() {
    let err = Event::new(EventKind::SwitchOn, None, None, &common::lamp_range()).unwrap_err();
    assert!(matches!(err, EquipError::InvalidTime { value: None, .. }));
}

#[test]
fn cancelled_events_leave_state_untouched() {
    let mut engine = Engine::new(common::lamp(), ErrorMode::Abort);
    let range = common::lamp_range();
    let on = engine.schedule(Event::switch_on(common::t(1.0))).unwrap();
    let set = engine
        .schedule(Event::set_power(common::t(2.0), 40.0, None, &range).unwrap())
        .unwrap();
    assert!(engine.cancel(on));
    assert!(engine.cancel(set));
    // cancelling again is harmless
    assert!(engine.cancel(on));

    let records = engine.run().unwrap().to_vec();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.outcome == Outcome::Cancelled));
    assert_eq!(engine.equipment().state(), LoadState::Off);
    assert_eq!(engine.equipment().current_power().value, 0.0);
    // nothing left to cancel once handled
    assert!(!engine.cancel(on));
}

#[test]
fn cancelling_after_execution_changes_nothing() {
    let mut engine = Engine::new(common::lamp(), ErrorMode::Abort);
    let on = engine.schedule(Event::switch_on(common::t(1.0))).unwrap();
    engine.run().unwrap();
    let before = engine.records().to_vec();

    assert!(!engine.cancel(on));
    assert_eq!(engine.equipment().state(), LoadState::On);
    assert_eq!(engine.records(), before.as_slice());

    // flagging an already executed event value does not undo it either
    let mut lamp = common::lamp();
    let mut event = Event::switch_on(common::t(0.0));
    event.execute_on(&mut lamp).unwrap();
    event.cancel();
    assert!(event.is_cancelled());
    assert_eq!(lamp.state(), LoadState::On);
    event.execute_on(&mut lamp).unwrap();
    assert_eq!(lamp.state(), LoadState::On);
}

#[test]
fn switch_on_is_illegal_while_heating_or_cooling() {
    for cooling in [false, true] {
        let mut hp = common::standard_heat_pump();
        Event::switch_on(common::t(0.0)).execute_on(&mut hp).unwrap();
        if cooling {
            hp.start_cooling().unwrap();
        } else {
            hp.start_heating().unwrap();
        }
        let mode = hp.state();

        let err = Event::switch_on(common::t(1.0)).execute_on(&mut hp).unwrap_err();
        assert!(matches!(err, EquipError::IllegalStateTransition { .. }));
        assert_eq!(hp.state(), mode);
    }
}

#[test]
fn heat_pump_day_uses_default_and_override_policies() {
    let hp = common::standard_heat_pump();
    let range = *hp.variation();
    let mut engine = Engine::new(hp, ErrorMode::Skip);
    engine
        .schedule_all([
            Event::switch_on(common::t(0.0)),
            Event::set_power(common::t(10.0), 500.0, None, &range).unwrap(),
            Event::set_power(common::t(20.0), 500.0, Some(PolicyKind::Proportional), &range)
                .unwrap(),
            Event::switch_off(common::t(30.0)),
        ])
        .unwrap();
    let records = engine.run().unwrap().to_vec();

    let greedy = records[1].repartition.unwrap();
    assert_eq!((greedy.pump_w, greedy.compressor_w, greedy.sensor_w), (295.0, 200.0, 5.0));

    let proportional = records[2].repartition.unwrap();
    assert!(proportional.compressor_w > 200.0);
    assert!(proportional.pump_w < 295.0);
    assert!((proportional.total_w() - 500.0).abs() < 1e-9);

    let off = &records[3];
    assert_eq!(off.state, "Off");
    assert_eq!(off.repartition.map(|r| r.total_w()), Some(0.0));
}

#[test]
fn infeasible_power_keeps_previous_split() {
    let mut hp = common::standard_heat_pump();
    hp.simulate_switch_on(common::t(0.0)).unwrap();
    hp.set_current_power(1000.0, None).unwrap();
    let before = hp.sub_load_powers();

    // 254 W is below the 255 W minimum sum
    let err = hp.set_current_power(254.0, None).unwrap_err();
    assert!(matches!(err, EquipError::InfeasibleAllocation { .. }));
    assert_eq!(hp.sub_load_powers(), before);
    assert_eq!(hp.current_power().value, 1000.0);
}

#[test]
fn thermal_modes_survive_power_changes_and_end_on_switch_off() {
    let hp = common::standard_heat_pump();
    let range = *hp.variation();
    let mut engine = Engine::new(hp, ErrorMode::Abort);
    engine.schedule(Event::switch_on(common::t(0.0))).unwrap();
    engine.run().unwrap();

    let (mut hp, _) = engine.into_parts();
    hp.start_cooling().unwrap();
    hp.set_target_temperature(16.0).unwrap();
    assert!(matches!(
        hp.set_target_temperature(35.0),
        Err(EquipError::InvalidTemperature { .. })
    ));
    assert_eq!(hp.target_temperature().value, 16.0);

    let mut engine = Engine::new(hp, ErrorMode::Abort);
    engine
        .schedule(Event::set_power(common::t(5.0), 800.0, None, &range).unwrap())
        .unwrap();
    engine.schedule(Event::switch_off(common::t(6.0))).unwrap();
    engine.run_until(common::t(5.0)).unwrap();
    assert_eq!(engine.equipment().state(), HeatPumpState::Cooling);
    engine.run().unwrap();
    assert_eq!(engine.equipment().state(), HeatPumpState::Off);
}

#[test]
fn generated_usage_runs_without_rejections() {
    let lamp = common::lamp();
    let scenario = UsageScenario::new(11, common::t(86_400.0), 8, 3);
    let events = scenario.generate(lamp.variation()).unwrap();

    let mut engine = Engine::new(lamp, ErrorMode::Abort);
    engine.schedule_all(events).unwrap();
    let records = engine.run().unwrap().to_vec();
    assert_eq!(records.len(), 8 * 5);

    let summary = RunSummary::from_records("lamp", &records, common::t(86_400.0));
    assert_eq!(summary.executed, 40);
    assert_eq!(summary.rejected, 0);
    assert_eq!(summary.final_state.as_deref(), Some("Off"));
    assert!(summary.energy_wh > 0.0);
    assert!(summary.peak_power_w <= 100.0);
}

#[test]
fn shared_equipment_serializes_threads_per_equipment() {
    let lamp = SharedEquipment::new(common::lamp());
    let hp = SharedEquipment::new(common::standard_heat_pump());
    let at = common::t(0.0);

    let handles: Vec<_> = (0..4)
        .flat_map(|_| {
            let lamp = lamp.clone();
            let hp = hp.clone();
            [
                thread::spawn(move || lamp.execute(&Event::switch_on(at)).is_ok()),
                thread::spawn(move || hp.execute(&Event::switch_on(at)).is_ok()),
            ]
        })
        .collect();
    let successes = handles
        .into_iter()
        .map(|h| h.join().unwrap_or(false))
        .filter(|ok| *ok)
        .count();

    // one success per equipment
    assert_eq!(successes, 2);
    assert!(lamp.read(|l| l.is_on()));
    assert!(hp.read(|h| h.is_switched_on()));
    assert_eq!(hp.read(|h| h.label().to_string()), "heat_pump");
}
