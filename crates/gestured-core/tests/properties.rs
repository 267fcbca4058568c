//! Property tests for stow classification and power handling.

use gestured_core::detector::{GestureMachine, StowMachine};
use gestured_core::sensor::SensorSample;
use gestured_core::sim::Simulator;
use gestured_core::{
    EngineConfig, GestureKind, SensorChannel, SettingKey, SettingsSnapshot, TraceEvent,
};
use proptest::prelude::*;

const HANDWAVE_MAX: i64 = 1_000_000_000;
const POCKET_MIN: i64 = 5_000_000_000;

fn cover_uncover(handwave: bool, pocket: bool, start: i64, delta: i64) -> Option<GestureKind> {
    let settings = SettingsSnapshot::default()
        .with(SettingKey::IrWakeup, handwave)
        .with(SettingKey::Pocket, pocket);
    let mut machine = StowMachine::default();
    assert!(machine
        .on_sample(&SensorSample::new(start, vec![1.0]), &settings)
        .is_none());
    machine.on_sample(&SensorSample::new(start + delta, vec![0.0]), &settings)
}

#[derive(Debug, Clone)]
enum Op {
    ScreenOn,
    ScreenOff,
    Toggle(usize, bool),
    UpdateState,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::ScreenOn),
        Just(Op::ScreenOff),
        (0..SettingKey::ALL.len(), any::<bool>()).prop_map(|(k, v)| Op::Toggle(k, v)),
        Just(Op::UpdateState),
    ]
}

proptest! {
    #[test]
    fn handwave_only_fires_below_bound(
        start in 0i64..1_000_000_000_000,
        delta in 0i64..10_000_000_000,
    ) {
        let fired = cover_uncover(true, false, start, delta);
        prop_assert_eq!(fired, (delta < HANDWAVE_MAX).then_some(GestureKind::Handwave));
    }

    #[test]
    fn pocket_only_fires_at_or_above_bound(
        start in 0i64..1_000_000_000_000,
        delta in 0i64..10_000_000_000,
    ) {
        let fired = cover_uncover(false, true, start, delta);
        prop_assert_eq!(fired, (delta >= POCKET_MIN).then_some(GestureKind::Pocket));
    }

    #[test]
    fn union_always_fires(start in 0i64..1_000_000_000_000, delta in 0i64..10_000_000_000) {
        prop_assert!(cover_uncover(true, true, start, delta).is_some());
    }

    #[test]
    fn power_edges_never_misuse_wake_lock(ops in prop::collection::vec(op(), 0..64)) {
        let sim = Simulator::new(&EngineConfig::default());
        let mut screen_on = true;

        for op in &ops {
            match op {
                Op::ScreenOn => {
                    sim.apply(&TraceEvent::ScreenOn);
                    screen_on = true;
                }
                Op::ScreenOff => {
                    sim.apply(&TraceEvent::ScreenOff);
                    screen_on = false;
                }
                Op::Toggle(index, value) => {
                    sim.apply(&TraceEvent::Setting {
                        key: SettingKey::ALL[*index].as_str().into(),
                        value: *value,
                    });
                }
                Op::UpdateState => sim.engine().update_state(),
            }

            prop_assert_eq!(sim.wake_lock.violations(), 0);
            prop_assert_eq!(sim.wake_lock.is_held(), screen_on);
            if screen_on {
                prop_assert!(!sim.sensors.is_subscribed(SensorChannel::Stow));
                prop_assert!(!sim.sensors.is_subscribed(SensorChannel::FlatUp));
            }
            prop_assert!(sim.sensors.subscriber_count(SensorChannel::Stow) <= 1);
        }
    }
}
