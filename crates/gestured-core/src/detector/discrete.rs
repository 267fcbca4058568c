use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::debug;

use super::{DetectorState, Registration, StateListener};
use crate::events::Trigger;
use crate::gesture::{ActionDispatcher, GestureKind};
use crate::sensor::{SensorChannel, SensorHandler, SensorSample, SensorSource, WeakHandler};
use crate::settings::{SettingKey, SharedSettings};

/// Proximity reading below which the IR silencer treats a hand as near.
pub const DEFAULT_PROXIMITY_NEAR_CM: f32 = 5.0;

/// Single-axis trigger test on `values[0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TriggerPredicate {
    /// Any non-zero reading.
    NonZero,
    /// Reading strictly below the bound.
    Below(f32),
}

impl TriggerPredicate {
    pub fn matches(self, sample: &SensorSample) -> bool {
        match (self, sample.leading_value()) {
            (TriggerPredicate::NonZero, Some(value)) => value != 0.0,
            (TriggerPredicate::Below(bound), Some(value)) => value >= 0.0 && value < bound,
            (_, None) => false,
        }
    }
}

/// Static description of an always-on gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscreteGestureSpec {
    pub gesture: GestureKind,
    pub channel: SensorChannel,
    pub setting: SettingKey,
    pub predicate: TriggerPredicate,
}

impl DiscreteGestureSpec {
    /// The always-on gestures, in registration order.
    pub fn catalogue(proximity_near_cm: f32) -> [DiscreteGestureSpec; 6] {
        [
            Self::spec(
                GestureKind::CameraActivation,
                SensorChannel::CameraActivation,
                SettingKey::CameraActivation,
                TriggerPredicate::NonZero,
            ),
            Self::spec(
                GestureKind::ChopChop,
                SensorChannel::ChopChop,
                SettingKey::ChopChop,
                TriggerPredicate::NonZero,
            ),
            Self::spec(
                GestureKind::ProximitySilencer,
                SensorChannel::IrProximity,
                SettingKey::IrSilencer,
                TriggerPredicate::Below(proximity_near_cm),
            ),
            Self::spec(
                GestureKind::FlipToMute,
                SensorChannel::FlatDown,
                SettingKey::FlipToMute,
                TriggerPredicate::NonZero,
            ),
            Self::spec(
                GestureKind::LiftToSilence,
                SensorChannel::Lift,
                SettingKey::LiftToSilence,
                TriggerPredicate::NonZero,
            ),
            Self::spec(
                GestureKind::DoubleTap,
                SensorChannel::DoubleTap,
                SettingKey::DoubleTap,
                TriggerPredicate::NonZero,
            ),
        ]
    }

    const fn spec(
        gesture: GestureKind,
        channel: SensorChannel,
        setting: SettingKey,
        predicate: TriggerPredicate,
    ) -> Self {
        Self {
            gesture,
            channel,
            setting,
            predicate,
        }
    }
}

/// Always-on detector: armed iff its own setting is on, fires on every
/// sample matching its predicate.
pub struct DiscreteDetector {
    me: Weak<Self>,
    spec: DiscreteGestureSpec,
    settings: SharedSettings,
    source: Arc<dyn SensorSource>,
    action: Arc<dyn ActionDispatcher>,
    registration: Mutex<Registration>,
}

impl DiscreteDetector {
    pub fn new(
        spec: DiscreteGestureSpec,
        settings: SharedSettings,
        source: Arc<dyn SensorSource>,
        action: Arc<dyn ActionDispatcher>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            spec,
            settings,
            source,
            action,
            registration: Mutex::new(Registration::default()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Registration> {
        self.registration
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl SensorHandler for DiscreteDetector {
    fn on_sample(&self, sample: &SensorSample) {
        let fire = {
            let registration = self.lock();
            registration.is_active() && self.spec.predicate.matches(sample)
        };
        if fire {
            debug!(gesture = %self.spec.gesture, "triggered");
            self.action
                .dispatch(&Trigger::new(self.spec.gesture, sample.timestamp_nanos));
        }
    }
}

impl StateListener for DiscreteDetector {
    fn name(&self) -> &'static str {
        self.spec.gesture.as_str()
    }

    fn update_state(&self) {
        let enabled = self.settings.current().is_enabled(self.spec.setting);
        let mut registration = self.lock();
        if enabled && !registration.is_active() {
            let handler: Arc<dyn SensorHandler> = Arc::new(WeakHandler(self.me.clone()));
            registration.enable(self.source.as_ref(), self.spec.channel, handler, self.name());
        } else if !enabled {
            registration.disable(self.source.as_ref(), self.name());
        }
    }

    fn detector_state(&self) -> DetectorState {
        self.lock().state()
    }

    fn shutdown(&self) {
        self.lock().disable(self.source.as_ref(), self.name());
    }
}
