use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::debug;

use super::{DetectorState, GestureMachine, Registration, ScreenStateListener};
use crate::events::Trigger;
use crate::gesture::ActionDispatcher;
use crate::sensor::{SensorHandler, SensorSample, SensorSource, WeakHandler};
use crate::settings::{SettingsSnapshot, SharedSettings};

/// A doze detector that is only subscribed while the screen is off.
///
/// Enable rule: subscribed iff the screen is off and the machine's settings
/// ask for it. Moving from armed to disabled resets the machine, so a cover
/// in flight when the screen turns on never fires later.
pub struct ScreenScopedDetector<M: GestureMachine> {
    me: Weak<Self>,
    settings: SharedSettings,
    source: Arc<dyn SensorSource>,
    action: Arc<dyn ActionDispatcher>,
    inner: Mutex<Inner<M>>,
}

struct Inner<M> {
    screen_on: bool,
    registration: Registration,
    machine: M,
}

impl<M: GestureMachine> ScreenScopedDetector<M> {
    /// The detector starts as if the screen were on, i.e. disabled, until the
    /// first screen-off edge.
    pub fn new(
        machine: M,
        settings: SharedSettings,
        source: Arc<dyn SensorSource>,
        action: Arc<dyn ActionDispatcher>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            settings,
            source,
            action,
            inner: Mutex::new(Inner {
                screen_on: true,
                registration: Registration::default(),
                machine,
            }),
        })
    }

    pub fn on_screen_on(&self) {
        let settings = self.settings.current();
        let mut inner = self.lock();
        inner.screen_on = true;
        self.apply(&mut inner, &settings);
    }

    pub fn on_screen_off(&self) {
        let settings = self.settings.current();
        let mut inner = self.lock();
        inner.screen_on = false;
        self.apply(&mut inner, &settings);
    }

    /// Re-check the enable rule against `settings` at the current screen state.
    pub fn reevaluate(&self, settings: &SettingsSnapshot) {
        let mut inner = self.lock();
        self.apply(&mut inner, settings);
    }

    pub fn state(&self) -> DetectorState {
        self.lock().registration.state()
    }

    /// Inspect the machine under the detector lock.
    pub fn with_machine<R>(&self, f: impl FnOnce(&M) -> R) -> R {
        f(&self.lock().machine)
    }

    fn lock(&self) -> MutexGuard<'_, Inner<M>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(&self, inner: &mut Inner<M>, settings: &SettingsSnapshot) {
        let wanted = !inner.screen_on && inner.machine.wanted(settings);
        if wanted {
            if !inner.registration.is_active() {
                let handler: Arc<dyn SensorHandler> = Arc::new(WeakHandler(self.me.clone()));
                let channel = inner.machine.channel();
                inner
                    .registration
                    .enable(self.source.as_ref(), channel, handler, M::NAME);
            }
        } else if inner.registration.disable(self.source.as_ref(), M::NAME) {
            inner.machine.reset();
        }
    }
}

impl<M: GestureMachine> SensorHandler for ScreenScopedDetector<M> {
    fn on_sample(&self, sample: &SensorSample) {
        let settings = self.settings.current();
        let gesture = {
            let mut inner = self.lock();
            if !inner.registration.is_active() {
                debug!(detector = M::NAME, "sample after unsubscribe, dropped");
                return;
            }
            inner.machine.on_sample(sample, &settings)
        };
        if let Some(gesture) = gesture {
            debug!(detector = M::NAME, %gesture, "triggered");
            self.action
                .dispatch(&Trigger::new(gesture, sample.timestamp_nanos));
        }
    }
}

impl<M: GestureMachine> ScreenStateListener for ScreenScopedDetector<M> {
    fn name(&self) -> &'static str {
        M::NAME
    }

    fn screen_turned_on(&self) {
        self.on_screen_on();
    }

    fn screen_turned_off(&self) {
        self.on_screen_off();
    }

    fn detector_state(&self) -> Option<DetectorState> {
        Some(self.state())
    }

    fn shutdown(&self) {
        let mut inner = self.lock();
        if inner.registration.disable(self.source.as_ref(), M::NAME) {
            inner.machine.reset();
        }
    }
}
