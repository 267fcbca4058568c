//! Gesture detectors.
//!
//! Two families:
//!
//! - **Screen-scoped** ([`ScreenScopedDetector`]): doze gestures that only
//!   listen while the screen is off. Stow (handwave/pocket) and flat-up
//!   (pick-up) are state machines plugged into the shared wrapper through
//!   [`GestureMachine`].
//! - **Always-on** ([`DiscreteDetector`]): one-shot gestures armed whenever
//!   their own setting is on, regardless of screen state.
//!
//! Every detector owns a mutex around its subscription and transient state,
//! so a sample, a re-evaluation and a screen transition touching the same
//! detector never interleave.

mod discrete;
mod flat_up;
mod screen;
mod stow;

pub use discrete::{
    DiscreteDetector, DiscreteGestureSpec, TriggerPredicate, DEFAULT_PROXIMITY_NEAR_CM,
};
pub use flat_up::FlatUpMachine;
pub use screen::ScreenScopedDetector;
pub use stow::{classify_uncover, CoverState, StowMachine, StowTiming};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::gesture::GestureKind;
use crate::sensor::{SensorChannel, SensorHandler, SensorSample, SensorSource, SubscriptionId};
use crate::settings::SettingsSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorState {
    Disabled,
    Armed,
}

/// Listener notified of screen power edges.
pub trait ScreenStateListener: Send + Sync {
    fn name(&self) -> &'static str;

    fn screen_turned_on(&self);

    fn screen_turned_off(&self);

    /// `None` for listeners that are not detectors.
    fn detector_state(&self) -> Option<DetectorState> {
        None
    }

    /// Drop any sensor subscription ahead of engine teardown.
    fn shutdown(&self) {}
}

/// Listener re-evaluated on every settings change.
pub trait StateListener: Send + Sync {
    fn name(&self) -> &'static str;

    fn update_state(&self);

    fn detector_state(&self) -> DetectorState;

    fn shutdown(&self);
}

/// Per-sensor gesture state machine driven by [`ScreenScopedDetector`].
pub trait GestureMachine: Send + 'static {
    const NAME: &'static str;

    fn channel(&self) -> SensorChannel;

    /// Whether the settings call for this detector while the screen is off.
    fn wanted(&self, settings: &SettingsSnapshot) -> bool;

    /// Feed one sample. Malformed samples must be ignored.
    fn on_sample(
        &mut self,
        sample: &SensorSample,
        settings: &SettingsSnapshot,
    ) -> Option<GestureKind>;

    /// Return to the neutral transient state.
    fn reset(&mut self);
}

/// Idempotent subscription bookkeeping shared by all detectors.
///
/// A failed subscribe leaves the registration inactive for good: missing
/// hardware is not retried. A failed unsubscribe still clears it. Both are
/// logged, never propagated.
#[derive(Debug, Default)]
pub(crate) struct Registration {
    id: Option<SubscriptionId>,
    unsupported: bool,
}

impl Registration {
    pub(crate) fn is_active(&self) -> bool {
        self.id.is_some()
    }

    pub(crate) fn state(&self) -> DetectorState {
        if self.is_active() {
            DetectorState::Armed
        } else {
            DetectorState::Disabled
        }
    }

    /// Subscribe unless already subscribed. Returns `true` when now active.
    pub(crate) fn enable(
        &mut self,
        source: &dyn SensorSource,
        channel: SensorChannel,
        handler: Arc<dyn SensorHandler>,
        detector: &'static str,
    ) -> bool {
        if self.id.is_some() {
            return true;
        }
        if self.unsupported {
            return false;
        }
        match source.subscribe(channel, handler) {
            Ok(id) => {
                debug!(detector, %channel, "enabling");
                self.id = Some(id);
                true
            }
            Err(err) => {
                warn!(detector, %channel, error = %err, "subscribe failed, detector disabled");
                self.unsupported = true;
                false
            }
        }
    }

    /// Unsubscribe if subscribed. Returns `true` when a subscription was dropped.
    pub(crate) fn disable(&mut self, source: &dyn SensorSource, detector: &'static str) -> bool {
        let Some(id) = self.id.take() else {
            return false;
        };
        debug!(detector, "disabling");
        if let Err(err) = source.unsubscribe(id) {
            warn!(detector, error = %err, "unsubscribe failed");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{MemorySensorSource, SourceCall};

    struct Nop;
    impl SensorHandler for Nop {
        fn on_sample(&self, _sample: &SensorSample) {}
    }

    #[test]
    fn test_registration_is_idempotent() {
        let source = MemorySensorSource::new();
        let mut registration = Registration::default();

        assert!(registration.enable(&source, SensorChannel::Stow, Arc::new(Nop), "test"));
        assert!(registration.enable(&source, SensorChannel::Stow, Arc::new(Nop), "test"));
        assert_eq!(registration.state(), DetectorState::Armed);

        assert!(registration.disable(&source, "test"));
        assert!(!registration.disable(&source, "test"));
        assert_eq!(registration.state(), DetectorState::Disabled);

        assert_eq!(
            source.calls(),
            vec![
                SourceCall::Subscribe(SensorChannel::Stow),
                SourceCall::Unsubscribe(SensorChannel::Stow),
            ]
        );
    }

    #[test]
    fn test_registration_stays_disabled_on_unavailable_channel() {
        let source = MemorySensorSource::new();
        source.mark_unavailable(SensorChannel::ChopChop);
        let mut registration = Registration::default();

        assert!(!registration.enable(&source, SensorChannel::ChopChop, Arc::new(Nop), "test"));
        assert_eq!(registration.state(), DetectorState::Disabled);
        assert!(!registration.disable(&source, "test"));

        // Missing hardware is permanent: no second subscribe attempt.
        assert!(!registration.enable(&source, SensorChannel::ChopChop, Arc::new(Nop), "test"));
        assert_eq!(source.failed_subscribes(), 1);
    }
}
