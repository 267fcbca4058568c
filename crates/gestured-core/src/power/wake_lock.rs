use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Platform wake lock primitive.
///
/// The underlying primitive may be reference counted, so callers must never
/// acquire twice or release without holding. [`WakeLockCoordinator`] is the
/// only code that calls into it.
pub trait WakeLock: Send + Sync {
    fn acquire(&self);
    fn release(&self);
}

/// Guards the single engine-wide wake lock with a held flag.
pub struct WakeLockCoordinator {
    lock: Arc<dyn WakeLock>,
    held: Mutex<bool>,
}

impl WakeLockCoordinator {
    pub fn new(lock: Arc<dyn WakeLock>) -> Self {
        Self {
            lock,
            held: Mutex::new(false),
        }
    }

    /// Acquire unless already held. Returns `true` if the lock was taken now.
    pub fn acquire(&self) -> bool {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if *held {
            return false;
        }
        debug!("acquiring wake lock");
        self.lock.acquire();
        *held = true;
        true
    }

    /// Release if held. Returns `true` if the lock was released now.
    pub fn release(&self) -> bool {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if !*held {
            return false;
        }
        debug!("releasing wake lock");
        self.lock.release();
        *held = false;
        true
    }

    pub fn is_held(&self) -> bool {
        *self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
