//! Gesture catalogue.
//!
//! Every detector emits exactly one [`GestureKind`] per trigger, and every
//! gesture maps to exactly one physical [`ActionKind`]. Executing the action
//! is the job of an external [`ActionDispatcher`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::events::Trigger;

/// Semantic gestures recognised by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureKind {
    /// Short cover-then-uncover of the proximity sensor.
    Handwave,
    /// Long cover-then-uncover (device taken out of a pocket).
    Pocket,
    /// Device lifted from a flat face-up position.
    PickUp,
    DoubleTap,
    ChopChop,
    CameraActivation,
    FlipToMute,
    LiftToSilence,
    ProximitySilencer,
}

impl GestureKind {
    pub const ALL: [GestureKind; 9] = [
        GestureKind::Handwave,
        GestureKind::Pocket,
        GestureKind::PickUp,
        GestureKind::DoubleTap,
        GestureKind::ChopChop,
        GestureKind::CameraActivation,
        GestureKind::FlipToMute,
        GestureKind::LiftToSilence,
        GestureKind::ProximitySilencer,
    ];

    /// The physical action this gesture performs.
    pub fn action(self) -> ActionKind {
        match self {
            GestureKind::Handwave | GestureKind::Pocket | GestureKind::PickUp => {
                ActionKind::DozePulse
            }
            GestureKind::DoubleTap => ActionKind::WakeScreen,
            GestureKind::ChopChop => ActionKind::ToggleTorch,
            GestureKind::CameraActivation => ActionKind::LaunchCamera,
            GestureKind::FlipToMute => ActionKind::Mute,
            GestureKind::LiftToSilence | GestureKind::ProximitySilencer => {
                ActionKind::SilenceRinger
            }
        }
    }

    /// Pulse gestures are subject to doze pulse rate limiting.
    pub fn is_pulse(self) -> bool {
        self.action() == ActionKind::DozePulse
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GestureKind::Handwave => "handwave",
            GestureKind::Pocket => "pocket",
            GestureKind::PickUp => "pick_up",
            GestureKind::DoubleTap => "double_tap",
            GestureKind::ChopChop => "chop_chop",
            GestureKind::CameraActivation => "camera_activation",
            GestureKind::FlipToMute => "flip_to_mute",
            GestureKind::LiftToSilence => "lift_to_silence",
            GestureKind::ProximitySilencer => "proximity_silencer",
        }
    }
}

impl fmt::Display for GestureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque side-effecting commands executed outside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    DozePulse,
    WakeScreen,
    ToggleTorch,
    LaunchCamera,
    Mute,
    SilenceRinger,
}

/// Executes the physical action for a trigger.
///
/// Dispatch is fire-and-forget: implementations must not block and the
/// engine never inspects an outcome. Each trigger is delivered once.
pub trait ActionDispatcher: Send + Sync {
    fn dispatch(&self, trigger: &Trigger);
}
