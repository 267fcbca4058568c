use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};

use super::{SettingKey, SettingScope, SettingsStore};

/// Point-in-time copy of every setting the engine reads.
///
/// Also used as the `[defaults]` table of the engine configuration, hence
/// the per-field serde defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    #[serde(default = "default_true")]
    pub chop_chop: bool,
    #[serde(default = "default_true")]
    pub camera_activation: bool,
    #[serde(default)]
    pub double_tap: bool,
    #[serde(default)]
    pub ir_silencer: bool,
    #[serde(default)]
    pub flip_to_mute: bool,
    #[serde(default)]
    pub lift_to_silence: bool,
    #[serde(default = "default_true")]
    pub ir_wakeup: bool,
    #[serde(default = "default_true")]
    pub pick_up: bool,
    #[serde(default = "default_true")]
    pub pocket: bool,
    #[serde(default = "default_true")]
    pub doze_enabled: bool,
    #[serde(default)]
    pub always_on_enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        let mut snapshot = Self {
            chop_chop: false,
            camera_activation: false,
            double_tap: false,
            ir_silencer: false,
            flip_to_mute: false,
            lift_to_silence: false,
            ir_wakeup: false,
            pick_up: false,
            pocket: false,
            doze_enabled: false,
            always_on_enabled: false,
        };
        for key in SettingKey::ALL {
            snapshot.set(key, key.default_value());
        }
        snapshot
    }
}

impl SettingsSnapshot {
    /// Read every key from the store.
    pub fn load(store: &dyn SettingsStore) -> Self {
        let mut snapshot = Self::default();
        for key in SettingKey::ALL {
            snapshot.set(key, store.get(key));
        }
        snapshot
    }

    /// Builder-style copy with one flag changed.
    pub fn with(mut self, key: SettingKey, value: bool) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: SettingKey, value: bool) {
        *self.slot(key) = value;
    }

    /// Stored flag, without doze gating.
    pub fn raw(&self, key: SettingKey) -> bool {
        match key {
            SettingKey::ChopChop => self.chop_chop,
            SettingKey::CameraActivation => self.camera_activation,
            SettingKey::DoubleTap => self.double_tap,
            SettingKey::IrSilencer => self.ir_silencer,
            SettingKey::FlipToMute => self.flip_to_mute,
            SettingKey::LiftToSilence => self.lift_to_silence,
            SettingKey::IrWakeup => self.ir_wakeup,
            SettingKey::PickUp => self.pick_up,
            SettingKey::Pocket => self.pocket,
            SettingKey::DozeEnable => self.doze_enabled,
            SettingKey::AlwaysOnDisplay => self.always_on_enabled,
        }
    }

    /// Effective enablement: doze-scoped gestures additionally require doze
    /// on and the always-on display off.
    pub fn is_enabled(&self, key: SettingKey) -> bool {
        match key.scope() {
            SettingScope::Doze => self.raw(key) && self.doze_gestures_allowed(),
            SettingScope::AlwaysOn | SettingScope::System => self.raw(key),
        }
    }

    pub fn doze_gestures_allowed(&self) -> bool {
        self.doze_enabled && !self.always_on_enabled
    }

    pub fn is_ir_wakeup_enabled(&self) -> bool {
        self.is_enabled(SettingKey::IrWakeup)
    }

    pub fn is_pocket_enabled(&self) -> bool {
        self.is_enabled(SettingKey::Pocket)
    }

    pub fn is_pick_up_enabled(&self) -> bool {
        self.is_enabled(SettingKey::PickUp)
    }

    fn slot(&mut self, key: SettingKey) -> &mut bool {
        match key {
            SettingKey::ChopChop => &mut self.chop_chop,
            SettingKey::CameraActivation => &mut self.camera_activation,
            SettingKey::DoubleTap => &mut self.double_tap,
            SettingKey::IrSilencer => &mut self.ir_silencer,
            SettingKey::FlipToMute => &mut self.flip_to_mute,
            SettingKey::LiftToSilence => &mut self.lift_to_silence,
            SettingKey::IrWakeup => &mut self.ir_wakeup,
            SettingKey::PickUp => &mut self.pick_up,
            SettingKey::Pocket => &mut self.pocket,
            SettingKey::DozeEnable => &mut self.doze_enabled,
            SettingKey::AlwaysOnDisplay => &mut self.always_on_enabled,
        }
    }
}

/// The engine-wide snapshot, replaced atomically on every change.
///
/// Readers get an `Arc` to an immutable snapshot and never observe a
/// half-applied update.
#[derive(Debug, Clone, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<Arc<SettingsSnapshot>>>,
}

impl SharedSettings {
    pub fn new(snapshot: SettingsSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    pub fn current(&self) -> Arc<SettingsSnapshot> {
        Arc::clone(&self.inner.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn replace(&self, snapshot: SettingsSnapshot) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
    }
}
