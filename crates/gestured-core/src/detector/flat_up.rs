use tracing::debug;

use super::GestureMachine;
use crate::gesture::GestureKind;
use crate::sensor::{SensorChannel, SensorSample};
use crate::settings::SettingsSnapshot;

/// Pick-up detection: fires when a device lying flat face-up stops being
/// flat.
#[derive(Debug, Clone, Default)]
pub struct FlatUpMachine {
    last_flat_up: bool,
}

impl FlatUpMachine {
    pub fn is_flat_up(&self) -> bool {
        self.last_flat_up
    }
}

impl GestureMachine for FlatUpMachine {
    const NAME: &'static str = "flat_up";

    fn channel(&self) -> SensorChannel {
        SensorChannel::FlatUp
    }

    fn wanted(&self, settings: &SettingsSnapshot) -> bool {
        settings.is_pick_up_enabled()
    }

    fn on_sample(
        &mut self,
        sample: &SensorSample,
        _settings: &SettingsSnapshot,
    ) -> Option<GestureKind> {
        let Some(flat_up) = sample.flag() else {
            debug!(detector = Self::NAME, "discarding malformed sample");
            return None;
        };
        let picked_up = self.last_flat_up && !flat_up;
        self.last_flat_up = flat_up;
        picked_up.then_some(GestureKind::PickUp)
    }

    fn reset(&mut self) {
        self.last_flat_up = false;
    }
}
