//! User and system settings that gate the gestures.
//!
//! The settings store itself is an external collaborator: a boolean
//! key-value store with a change callback. The engine keeps a
//! [`SettingsSnapshot`] of every key it cares about and swaps it whole on
//! each change notification.

mod snapshot;

pub use snapshot::{SettingsSnapshot, SharedSettings};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Change callback, invoked with the raw key that changed.
///
/// Keys the engine does not recognise are passed through as-is and ignored
/// by the receiver.
pub type SettingsCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Boolean key-value settings store.
pub trait SettingsStore: Send + Sync {
    /// Current value, falling back to the key's default when unset.
    fn get(&self, key: SettingKey) -> bool;

    fn subscribe(&self, callback: SettingsCallback);
}

/// How a setting participates in effective enablement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingScope {
    /// Raw flag alone decides.
    AlwaysOn,
    /// Raw flag AND doze enabled AND NOT always-on display.
    Doze,
    /// System-level flags gating the doze scope.
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    ChopChop,
    CameraActivation,
    DoubleTap,
    IrSilencer,
    FlipToMute,
    LiftToSilence,
    /// Handwave pulse.
    IrWakeup,
    PickUp,
    Pocket,
    DozeEnable,
    AlwaysOnDisplay,
}

impl SettingKey {
    pub const ALL: [SettingKey; 11] = [
        SettingKey::ChopChop,
        SettingKey::CameraActivation,
        SettingKey::DoubleTap,
        SettingKey::IrSilencer,
        SettingKey::FlipToMute,
        SettingKey::LiftToSilence,
        SettingKey::IrWakeup,
        SettingKey::PickUp,
        SettingKey::Pocket,
        SettingKey::DozeEnable,
        SettingKey::AlwaysOnDisplay,
    ];

    /// Store key string.
    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::ChopChop => "gesture_chop_chop",
            SettingKey::CameraActivation => "gesture_camera_action",
            SettingKey::DoubleTap => "gesture_double_tap",
            SettingKey::IrSilencer => "gesture_ir_silencer",
            SettingKey::FlipToMute => "gesture_flip_to_mute",
            SettingKey::LiftToSilence => "gesture_lift_to_silence",
            SettingKey::IrWakeup => "gesture_hand_wave",
            SettingKey::PickUp => "gesture_pick_up",
            SettingKey::Pocket => "gesture_pocket",
            SettingKey::DozeEnable => "doze_enable",
            SettingKey::AlwaysOnDisplay => "always_on_display",
        }
    }

    /// Resolve a store key string. Unknown keys yield `None`.
    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }

    pub fn default_value(self) -> bool {
        match self {
            SettingKey::ChopChop
            | SettingKey::CameraActivation
            | SettingKey::IrWakeup
            | SettingKey::PickUp
            | SettingKey::Pocket
            | SettingKey::DozeEnable => true,
            SettingKey::DoubleTap
            | SettingKey::IrSilencer
            | SettingKey::FlipToMute
            | SettingKey::LiftToSilence
            | SettingKey::AlwaysOnDisplay => false,
        }
    }

    pub fn scope(self) -> SettingScope {
        match self {
            SettingKey::IrWakeup | SettingKey::PickUp | SettingKey::Pocket => SettingScope::Doze,
            SettingKey::DozeEnable | SettingKey::AlwaysOnDisplay => SettingScope::System,
            _ => SettingScope::AlwaysOn,
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
