//! Gesture engine: owns every detector and wires them to the platform.
//!
//! Two listener collections are fixed at construction:
//!
//! - screen listeners, driven through the [`ScreenPowerGate`]: the doze
//!   pulse gate, stow (handwave/pocket) and flat-up (pick-up);
//! - always-on detectors: camera, chop-chop, proximity silencer,
//!   flip-to-mute, lift-to-silence and double-tap.
//!
//! Every settings change swaps the shared snapshot and re-runs
//! [`GestureEngine::update_state`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::detector::{
    DetectorState, DiscreteDetector, DiscreteGestureSpec, FlatUpMachine, ScreenScopedDetector,
    ScreenStateListener, StateListener, StowMachine,
};
use crate::gesture::ActionDispatcher;
use crate::power::{
    PowerMonitor, PulseGate, ScreenPowerGate, ScreenState, WakeLock, WakeLockCoordinator,
};
use crate::sensor::SensorSource;
use crate::settings::{SettingKey, SettingsSnapshot, SettingsStore, SharedSettings};
use crate::storage::EngineConfig;

/// Platform collaborators the engine is built on.
pub struct EngineDeps {
    pub settings: Arc<dyn SettingsStore>,
    pub sensors: Arc<dyn SensorSource>,
    pub dispatcher: Arc<dyn ActionDispatcher>,
    pub wake_lock: Arc<dyn WakeLock>,
    pub power: Arc<dyn PowerMonitor>,
    pub clock: Arc<dyn Clock>,
}

/// Point-in-time view of the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatus {
    /// `None` until the first screen edge has been applied.
    pub screen: Option<ScreenState>,
    pub wake_lock_held: bool,
    pub detectors: BTreeMap<String, DetectorState>,
}

impl EngineStatus {
    pub fn armed(&self) -> impl Iterator<Item = &str> {
        self.detectors
            .iter()
            .filter(|(_, state)| **state == DetectorState::Armed)
            .map(|(name, _)| name.as_str())
    }
}

pub struct GestureEngine {
    store: Arc<dyn SettingsStore>,
    settings: SharedSettings,
    power: Arc<dyn PowerMonitor>,
    gate: ScreenPowerGate,
    always_on: Vec<Arc<dyn StateListener>>,
}

impl GestureEngine {
    /// Build every detector, subscribe to settings changes and apply the
    /// current power state once.
    pub fn new(deps: EngineDeps, config: &EngineConfig) -> Arc<Self> {
        let EngineDeps {
            settings: store,
            sensors,
            dispatcher,
            wake_lock,
            power,
            clock,
        } = deps;

        let settings = SharedSettings::new(SettingsSnapshot::load(store.as_ref()));

        // All triggers go through the pulse gate; only pulses are rate limited.
        let pulse = Arc::new(PulseGate::new(dispatcher, clock, config.timing.pulse_cooldown_ms));
        let action: Arc<dyn ActionDispatcher> = pulse.clone();

        let stow = ScreenScopedDetector::new(
            StowMachine::new(config.timing.stow_timing()),
            settings.clone(),
            sensors.clone(),
            action.clone(),
        );
        let flat_up = ScreenScopedDetector::new(
            FlatUpMachine::default(),
            settings.clone(),
            sensors.clone(),
            action.clone(),
        );
        let screen_listeners = vec![pulse as Arc<dyn ScreenStateListener>, stow, flat_up];

        let always_on: Vec<Arc<dyn StateListener>> =
            DiscreteGestureSpec::catalogue(config.thresholds.proximity_near_cm)
                .into_iter()
                .map(|spec| {
                    DiscreteDetector::new(spec, settings.clone(), sensors.clone(), action.clone())
                        as Arc<dyn StateListener>
                })
                .collect();

        let engine = Arc::new(Self {
            store,
            settings,
            power,
            gate: ScreenPowerGate::new(WakeLockCoordinator::new(wake_lock), screen_listeners),
            always_on,
        });

        let weak: Weak<Self> = Arc::downgrade(&engine);
        engine.store.subscribe(Arc::new(move |key: &str| {
            if let Some(engine) = weak.upgrade() {
                engine.on_setting_changed(key);
            }
        }));

        info!(
            screen_listeners = engine.gate.listeners().len(),
            always_on = engine.always_on.len(),
            "gesture engine started"
        );
        engine.update_state();
        engine
    }

    /// Re-apply the current screen state and re-evaluate every always-on
    /// detector. Idempotent.
    pub fn update_state(&self) {
        self.gate.apply_current(self.power.as_ref());
        for listener in &self.always_on {
            listener.update_state();
        }
    }

    pub fn screen_turned_on(&self) {
        self.gate.screen_turned_on();
    }

    pub fn screen_turned_off(&self) {
        self.gate.screen_turned_off();
    }

    /// Settings store callback. Unknown keys are ignored.
    pub fn on_setting_changed(&self, key: &str) {
        let Some(setting) = SettingKey::parse(key) else {
            debug!(key, "ignoring unknown setting");
            return;
        };
        debug!(%setting, "setting changed");
        self.settings.replace(SettingsSnapshot::load(self.store.as_ref()));
        self.update_state();
    }

    pub fn settings(&self) -> Arc<SettingsSnapshot> {
        self.settings.current()
    }

    pub fn status(&self) -> EngineStatus {
        let screen_detectors = self
            .gate
            .listeners()
            .iter()
            .filter_map(|l| l.detector_state().map(|state| (l.name(), state)));
        let always_on = self
            .always_on
            .iter()
            .map(|l| (l.name(), l.detector_state()));

        EngineStatus {
            screen: self.gate.screen_state(),
            wake_lock_held: self.gate.wake_lock().is_held(),
            detectors: screen_detectors
                .chain(always_on)
                .map(|(name, state)| (name.to_string(), state))
                .collect(),
        }
    }

    /// Unsubscribe every detector and release the wake lock.
    pub fn shutdown(&self) {
        self.gate.shutdown();
        for listener in &self.always_on {
            listener.shutdown();
        }
    }
}

impl Drop for GestureEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::sensor::SensorChannel;
    use crate::sim::{
        FlagWakeLock, ManualPowerMonitor, MemorySensorSource, MemorySettingsStore,
        RecordingDispatcher, SourceCall,
    };

    struct Rig {
        store: Arc<MemorySettingsStore>,
        sensors: Arc<MemorySensorSource>,
        wake_lock: Arc<FlagWakeLock>,
        power: Arc<ManualPowerMonitor>,
        engine: Arc<GestureEngine>,
    }

    fn rig(snapshot: SettingsSnapshot, interactive: bool) -> Rig {
        let store = Arc::new(MemorySettingsStore::from_snapshot(snapshot));
        let sensors = Arc::new(MemorySensorSource::new());
        let wake_lock = Arc::new(FlagWakeLock::default());
        let power = Arc::new(ManualPowerMonitor::new(interactive));
        let engine = GestureEngine::new(
            EngineDeps {
                settings: store.clone(),
                sensors: sensors.clone(),
                dispatcher: Arc::new(RecordingDispatcher::default()),
                wake_lock: wake_lock.clone(),
                power: power.clone(),
                clock: Arc::new(ManualClock::new(0)),
            },
            &EngineConfig::default(),
        );
        Rig {
            store,
            sensors,
            wake_lock,
            power,
            engine,
        }
    }

    #[test]
    fn test_startup_applies_power_state() {
        let on = rig(SettingsSnapshot::default(), true);
        assert!(on.wake_lock.is_held());
        assert!(!on.sensors.is_subscribed(SensorChannel::Stow));
        assert_eq!(on.engine.status().screen, Some(ScreenState::On));

        let off = rig(SettingsSnapshot::default(), false);
        assert!(!off.wake_lock.is_held());
        assert!(off.sensors.is_subscribed(SensorChannel::Stow));
        assert!(off.sensors.is_subscribed(SensorChannel::FlatUp));
    }

    #[test]
    fn test_default_always_on_detectors() {
        let r = rig(SettingsSnapshot::default(), true);
        let status = r.engine.status();
        let armed: Vec<_> = status.armed().collect();
        assert_eq!(armed, vec!["camera_activation", "chop_chop"]);
        assert_eq!(status.detectors.len(), 8);
    }

    #[test]
    fn test_update_state_is_idempotent() {
        let r = rig(SettingsSnapshot::default(), false);
        let before = r.sensors.calls();
        r.engine.update_state();
        r.engine.update_state();
        assert_eq!(r.sensors.calls(), before);
        assert_eq!(r.wake_lock.violations(), 0);
    }

    #[test]
    fn test_setting_change_reloads_snapshot() {
        let r = rig(SettingsSnapshot::default(), false);
        r.store.set(SettingKey::DoubleTap.as_str(), true);
        assert!(r.engine.settings().double_tap);
        assert!(r.sensors.is_subscribed(SensorChannel::DoubleTap));

        r.store.set(SettingKey::DozeEnable.as_str(), false);
        assert!(!r.sensors.is_subscribed(SensorChannel::Stow));
        assert!(!r.sensors.is_subscribed(SensorChannel::FlatUp));
    }

    #[test]
    fn test_unknown_setting_is_a_no_op() {
        let r = rig(SettingsSnapshot::default(), false);
        let before = r.sensors.calls();
        r.store.set("font_scale", true);
        assert_eq!(r.sensors.calls(), before);
    }

    #[test]
    fn test_power_monitor_drives_update_state() {
        let r = rig(SettingsSnapshot::default(), true);
        r.power.set_interactive(false);
        r.engine.update_state();
        assert!(r.sensors.is_subscribed(SensorChannel::Stow));
        assert!(!r.wake_lock.is_held());
    }

    #[test]
    fn test_drop_unsubscribes_everything() {
        let r = rig(SettingsSnapshot::default(), false);
        let Rig {
            sensors, engine, ..
        } = r;
        drop(engine);

        for channel in [SensorChannel::Stow, SensorChannel::FlatUp, SensorChannel::ChopChop] {
            assert!(!sensors.is_subscribed(channel));
        }
        assert!(sensors
            .calls()
            .contains(&SourceCall::Unsubscribe(SensorChannel::Stow)));
    }
}
