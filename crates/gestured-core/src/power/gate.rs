use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::info;

use super::wake_lock::WakeLockCoordinator;
use super::PowerMonitor;
use crate::detector::ScreenStateListener;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenState {
    On,
    Off,
}

/// Applies screen power edges: wake lock first, then fan-out.
///
/// Transitions are serialised; the listener list is fixed at construction.
/// Repeated edges are harmless: the wake lock is guarded by its held flag
/// and every listener is idempotent, so a second `screen_turned_off` only
/// re-evaluates the detectors.
pub struct ScreenPowerGate {
    wake_lock: WakeLockCoordinator,
    listeners: Vec<Arc<dyn ScreenStateListener>>,
    screen: Mutex<Option<ScreenState>>,
}

impl ScreenPowerGate {
    pub fn new(
        wake_lock: WakeLockCoordinator,
        listeners: Vec<Arc<dyn ScreenStateListener>>,
    ) -> Self {
        Self {
            wake_lock,
            listeners,
            screen: Mutex::new(None),
        }
    }

    pub fn screen_turned_on(&self) {
        let mut screen = self.lock_screen();
        self.turn_on(&mut screen);
    }

    pub fn screen_turned_off(&self) {
        let mut screen = self.lock_screen();
        self.turn_off(&mut screen);
    }

    /// Poll `power` and apply the matching edge in one step, so an edge
    /// arriving concurrently is applied after this one and never undone.
    pub fn apply_current(&self, power: &dyn PowerMonitor) {
        let mut screen = self.lock_screen();
        if power.is_interactive() {
            self.turn_on(&mut screen);
        } else {
            self.turn_off(&mut screen);
        }
    }

    fn lock_screen(&self) -> MutexGuard<'_, Option<ScreenState>> {
        self.screen.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn turn_on(&self, screen: &mut Option<ScreenState>) {
        if *screen != Some(ScreenState::On) {
            info!("screen turned on");
        }
        self.wake_lock.acquire();
        for listener in &self.listeners {
            listener.screen_turned_on();
        }
        *screen = Some(ScreenState::On);
    }

    fn turn_off(&self, screen: &mut Option<ScreenState>) {
        if *screen != Some(ScreenState::Off) {
            info!("screen turned off");
        }
        self.wake_lock.release();
        for listener in &self.listeners {
            listener.screen_turned_off();
        }
        *screen = Some(ScreenState::Off);
    }

    /// Last applied edge, `None` before the first one.
    pub fn screen_state(&self) -> Option<ScreenState> {
        *self.lock_screen()
    }

    pub fn wake_lock(&self) -> &WakeLockCoordinator {
        &self.wake_lock
    }

    pub fn listeners(&self) -> &[Arc<dyn ScreenStateListener>] {
        &self.listeners
    }

    pub(crate) fn shutdown(&self) {
        let _screen = self.lock_screen();
        for listener in &self.listeners {
            listener.shutdown();
        }
        self.wake_lock.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::FlagWakeLock;

    /// Records the wake lock state each listener observes during fan-out.
    struct Probe {
        lock: Arc<FlagWakeLock>,
        seen: Mutex<Vec<(&'static str, bool)>>,
    }

    impl ScreenStateListener for Probe {
        fn name(&self) -> &'static str {
            "probe"
        }

        fn screen_turned_on(&self) {
            self.seen.lock().unwrap().push(("on", self.lock.is_held()));
        }

        fn screen_turned_off(&self) {
            self.seen.lock().unwrap().push(("off", self.lock.is_held()));
        }
    }

    fn gate() -> (ScreenPowerGate, Arc<FlagWakeLock>, Arc<Probe>) {
        let lock = Arc::new(FlagWakeLock::default());
        let probe = Arc::new(Probe {
            lock: lock.clone(),
            seen: Mutex::new(Vec::new()),
        });
        let gate = ScreenPowerGate::new(
            WakeLockCoordinator::new(lock.clone()),
            vec![probe.clone() as Arc<dyn ScreenStateListener>],
        );
        (gate, lock, probe)
    }

    #[test]
    fn test_wake_lock_moves_before_fan_out() {
        let (gate, _, probe) = gate();
        gate.screen_turned_on();
        gate.screen_turned_off();
        assert_eq!(*probe.seen.lock().unwrap(), vec![("on", true), ("off", false)]);
    }

    #[test]
    fn test_repeated_edges_do_not_double_count() {
        let (gate, lock, probe) = gate();
        gate.screen_turned_on();
        gate.screen_turned_on();
        gate.screen_turned_off();
        gate.screen_turned_off();

        assert_eq!(lock.acquire_count(), 1);
        assert_eq!(lock.release_count(), 1);
        assert_eq!(lock.violations(), 0);
        assert_eq!(probe.seen.lock().unwrap().len(), 4);
        assert_eq!(gate.screen_state(), Some(ScreenState::Off));
    }

    /// Reports "off", but lets a screen-on edge race the answer.
    struct RacingMonitor {
        gate: Arc<ScreenPowerGate>,
        edge: Mutex<Option<std::thread::JoinHandle<()>>>,
    }

    impl PowerMonitor for RacingMonitor {
        fn is_interactive(&self) -> bool {
            let gate = self.gate.clone();
            let (done_tx, done_rx) = std::sync::mpsc::channel();
            let handle = std::thread::spawn(move || {
                gate.screen_turned_on();
                let _ = done_tx.send(());
            });
            // The edge must wait for the gate; give it the chance to slip in.
            let _ = done_rx.recv_timeout(std::time::Duration::from_millis(50));
            *self.edge.lock().unwrap() = Some(handle);
            false
        }
    }

    #[test]
    fn test_concurrent_edge_is_not_undone_by_stale_poll() {
        let lock = Arc::new(FlagWakeLock::default());
        let gate = Arc::new(ScreenPowerGate::new(
            WakeLockCoordinator::new(lock.clone()),
            Vec::new(),
        ));
        let monitor = RacingMonitor {
            gate: gate.clone(),
            edge: Mutex::new(None),
        };

        gate.apply_current(&monitor);
        monitor.edge.lock().unwrap().take().unwrap().join().unwrap();

        assert_eq!(gate.screen_state(), Some(ScreenState::On));
        assert!(lock.is_held());
        assert_eq!(lock.violations(), 0);
    }

    #[test]
    fn test_shutdown_releases_held_lock() {
        let (gate, lock, _) = gate();
        assert_eq!(gate.screen_state(), None);
        gate.screen_turned_on();
        gate.shutdown();
        assert!(!lock.is_held());
        assert!(!gate.wake_lock().is_held());
    }
}
