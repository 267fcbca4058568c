//! Handwave / pocket detection on the stow (proximity cover) channel.
//!
//! Both gestures come from the same cover-then-uncover signal and are told
//! apart only by how long the sensor stayed covered:
//!
//! ```text
//!   delta = uncover_ts - cover_ts
//!
//!   0 ........ 1s ................ 5s ..........>
//!   [handwave )[     neither      )[  pocket
//! ```
//!
//! With both gestures enabled every uncover fires (union policy); the
//! trigger is reported as a handwave below the handwave bound and as a
//! pocket otherwise.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::GestureMachine;
use crate::gesture::GestureKind;
use crate::sensor::{SensorChannel, SensorSample};
use crate::settings::SettingsSnapshot;

/// Maximum time for a hand to cover the sensor: 1s.
pub const HANDWAVE_MAX_DELTA_NS: i64 = 1_000_000_000;

/// Minimum time until the device counts as having been in a pocket: 5s.
pub const POCKET_MIN_DELTA_NS: i64 = 5_000_000_000;

/// Dwell-time bounds for the stow detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StowTiming {
    pub handwave_max_delta_ns: i64,
    pub pocket_min_delta_ns: i64,
}

impl Default for StowTiming {
    fn default() -> Self {
        Self {
            handwave_max_delta_ns: HANDWAVE_MAX_DELTA_NS,
            pocket_min_delta_ns: POCKET_MIN_DELTA_NS,
        }
    }
}

/// Decide what an uncover after `delta_ns` of cover means.
pub fn classify_uncover(
    delta_ns: i64,
    handwave_enabled: bool,
    pocket_enabled: bool,
    timing: &StowTiming,
) -> Option<GestureKind> {
    let short = delta_ns < timing.handwave_max_delta_ns;
    match (handwave_enabled, pocket_enabled) {
        (true, true) if short => Some(GestureKind::Handwave),
        (true, true) => Some(GestureKind::Pocket),
        (true, false) if short => Some(GestureKind::Handwave),
        (false, true) if delta_ns >= timing.pocket_min_delta_ns => Some(GestureKind::Pocket),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverState {
    Idle,
    Covered { since_nanos: i64 },
}

#[derive(Debug, Clone)]
pub struct StowMachine {
    state: CoverState,
    timing: StowTiming,
}

impl StowMachine {
    pub fn new(timing: StowTiming) -> Self {
        Self {
            state: CoverState::Idle,
            timing,
        }
    }

    pub fn state(&self) -> CoverState {
        self.state
    }

    /// Advance on a cover/uncover reading. Returns the cover duration when
    /// this sample completes a cover-then-uncover.
    ///
    /// Any uncover while covered returns to idle. A negative or overflowing
    /// duration yields `None`.
    pub fn observe(&mut self, timestamp_nanos: i64, covered: bool) -> Option<i64> {
        match (self.state, covered) {
            (_, true) => {
                self.state = CoverState::Covered {
                    since_nanos: timestamp_nanos,
                };
                None
            }
            (CoverState::Covered { since_nanos }, false) => {
                self.state = CoverState::Idle;
                match timestamp_nanos.checked_sub(since_nanos) {
                    Some(delta_ns) if delta_ns >= 0 => Some(delta_ns),
                    _ => {
                        debug!(timestamp_nanos, since_nanos, "unusable cover duration, dropped");
                        None
                    }
                }
            }
            (CoverState::Idle, false) => None,
        }
    }
}

impl Default for StowMachine {
    fn default() -> Self {
        Self::new(StowTiming::default())
    }
}

impl GestureMachine for StowMachine {
    const NAME: &'static str = "stow";

    fn channel(&self) -> SensorChannel {
        SensorChannel::Stow
    }

    fn wanted(&self, settings: &SettingsSnapshot) -> bool {
        settings.is_pocket_enabled() || settings.is_ir_wakeup_enabled()
    }

    fn on_sample(
        &mut self,
        sample: &SensorSample,
        settings: &SettingsSnapshot,
    ) -> Option<GestureKind> {
        let Some(covered) = sample.flag() else {
            debug!(detector = Self::NAME, "discarding malformed sample");
            return None;
        };
        let delta_ns = self.observe(sample.timestamp_nanos, covered)?;
        let gesture = classify_uncover(
            delta_ns,
            settings.is_ir_wakeup_enabled(),
            settings.is_pocket_enabled(),
            &self.timing,
        );
        debug!(detector = Self::NAME, delta_ns, ?gesture, "uncovered");
        gesture
    }

    fn reset(&mut self) {
        self.state = CoverState::Idle;
    }
}
