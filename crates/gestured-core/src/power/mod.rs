//! Screen power handling: wake lock coordination, screen edge fan-out and
//! doze pulse rate limiting.

mod gate;
mod pulse;
mod wake_lock;

pub use gate::{ScreenPowerGate, ScreenState};
pub use pulse::{PulseGate, DEFAULT_PULSE_COOLDOWN_MS};
pub use wake_lock::{WakeLock, WakeLockCoordinator};

/// Reports whether the device is currently interactive (screen on).
pub trait PowerMonitor: Send + Sync {
    fn is_interactive(&self) -> bool;
}
