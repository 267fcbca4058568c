//! Doze pulse rate limiting.
//!
//! Pulse gestures (handwave, pocket, pick-up) wake the ambient display.
//! Bursts of them are collapsed: after a pulse, or after the screen goes
//! off, further pulses are denied until the cooldown has elapsed.

use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::clock::Clock;
use crate::detector::ScreenStateListener;
use crate::events::Trigger;
use crate::gesture::ActionDispatcher;

/// Default minimum spacing between pulses: 1.5s.
pub const DEFAULT_PULSE_COOLDOWN_MS: i64 = 1_500;

/// Rate-limiting decorator in front of the real dispatcher.
///
/// Non-pulse triggers pass straight through.
pub struct PulseGate {
    downstream: Arc<dyn ActionDispatcher>,
    clock: Arc<dyn Clock>,
    cooldown_ms: i64,
    last_pulse_ms: Mutex<Option<i64>>,
}

impl PulseGate {
    pub fn new(
        downstream: Arc<dyn ActionDispatcher>,
        clock: Arc<dyn Clock>,
        cooldown_ms: i64,
    ) -> Self {
        Self {
            downstream,
            clock,
            cooldown_ms,
            last_pulse_ms: Mutex::new(None),
        }
    }

    /// Claim a pulse slot. Stamps the clock when granted.
    pub fn may_pulse(&self) -> bool {
        let now = self.clock.now_ms();
        let mut last = self
            .last_pulse_ms
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match *last {
            Some(previous) if now - previous <= self.cooldown_ms => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

impl ActionDispatcher for PulseGate {
    fn dispatch(&self, trigger: &Trigger) {
        if trigger.gesture.is_pulse() && !self.may_pulse() {
            debug!(gesture = %trigger.gesture, "denying doze pulse");
            return;
        }
        self.downstream.dispatch(trigger);
    }
}

impl ScreenStateListener for PulseGate {
    fn name(&self) -> &'static str {
        "pulse_gate"
    }

    fn screen_turned_on(&self) {}

    fn screen_turned_off(&self) {
        *self
            .last_pulse_ms
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(self.clock.now_ms());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::gesture::GestureKind;
    use crate::sim::RecordingDispatcher;

    fn gate() -> (PulseGate, Arc<ManualClock>, Arc<RecordingDispatcher>) {
        let clock = Arc::new(ManualClock::new(10_000));
        let sink = Arc::new(RecordingDispatcher::default());
        let gate = PulseGate::new(sink.clone(), clock.clone(), DEFAULT_PULSE_COOLDOWN_MS);
        (gate, clock, sink)
    }

    #[test]
    fn test_first_pulse_is_allowed() {
        let (gate, _, sink) = gate();
        gate.dispatch(&Trigger::new(GestureKind::Pocket, 0));
        assert_eq!(sink.triggers().len(), 1);
    }

    #[test]
    fn test_pulses_within_cooldown_are_denied() {
        let (gate, clock, sink) = gate();
        gate.dispatch(&Trigger::new(GestureKind::Handwave, 0));
        clock.advance_ms(1_500);
        gate.dispatch(&Trigger::new(GestureKind::Handwave, 1));
        clock.advance_ms(1);
        gate.dispatch(&Trigger::new(GestureKind::PickUp, 2));

        let stamps: Vec<_> = sink.triggers().iter().map(|t| t.timestamp_nanos).collect();
        assert_eq!(stamps, vec![0, 2]);
    }

    #[test]
    fn test_screen_off_starts_cooldown() {
        let (gate, clock, sink) = gate();
        gate.screen_turned_off();
        gate.dispatch(&Trigger::new(GestureKind::Pocket, 0));
        assert!(sink.triggers().is_empty());

        clock.advance_ms(2_000);
        gate.dispatch(&Trigger::new(GestureKind::Pocket, 1));
        assert_eq!(sink.triggers().len(), 1);
    }

    #[test]
    fn test_non_pulse_triggers_bypass_cooldown() {
        let (gate, _, sink) = gate();
        gate.screen_turned_off();
        gate.dispatch(&Trigger::new(GestureKind::ChopChop, 0));
        gate.dispatch(&Trigger::new(GestureKind::ChopChop, 1));
        assert_eq!(sink.triggers().len(), 2);
    }
}
