//! In-memory collaborators.
//!
//! Deterministic stand-ins for the platform services the engine talks to.
//! They back trace replay in the CLI and the test suites.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::clock::ManualClock;
use crate::engine::{EngineDeps, EngineStatus, GestureEngine};
use crate::error::SensorError;
use crate::events::{TraceEvent, Trigger};
use crate::gesture::ActionDispatcher;
use crate::power::{PowerMonitor, WakeLock};
use crate::sensor::{SensorChannel, SensorHandler, SensorSample, SensorSource, SubscriptionId};
use crate::settings::{SettingKey, SettingsCallback, SettingsSnapshot, SettingsStore};
use crate::storage::EngineConfig;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Settings store backed by a snapshot.
#[derive(Default)]
pub struct MemorySettingsStore {
    values: Mutex<SettingsSnapshot>,
    callbacks: Mutex<Vec<SettingsCallback>>,
}

impl MemorySettingsStore {
    pub fn from_snapshot(snapshot: SettingsSnapshot) -> Self {
        Self {
            values: Mutex::new(snapshot),
            callbacks: Mutex::new(Vec::new()),
        }
    }

    /// Write `key` and notify every subscriber.
    ///
    /// Unknown keys are not stored but are still announced, the way a
    /// platform store reports keys written by other components.
    pub fn set(&self, key: &str, value: bool) {
        if let Some(known) = SettingKey::parse(key) {
            lock(&self.values).set(known, value);
        }
        let callbacks = lock(&self.callbacks).clone();
        for callback in callbacks {
            callback(key);
        }
    }

    pub fn snapshot(&self) -> SettingsSnapshot {
        *lock(&self.values)
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: SettingKey) -> bool {
        lock(&self.values).raw(key)
    }

    fn subscribe(&self, callback: SettingsCallback) {
        lock(&self.callbacks).push(callback);
    }
}

/// A call made against [`MemorySensorSource`]. Failed subscribes are not recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceCall {
    Subscribe(SensorChannel),
    Unsubscribe(SensorChannel),
}

struct Subscription {
    channel: SensorChannel,
    handler: Arc<dyn SensorHandler>,
}

#[derive(Default)]
struct SourceState {
    next_id: u64,
    subscriptions: BTreeMap<SubscriptionId, Subscription>,
    unavailable: BTreeSet<SensorChannel>,
    calls: Vec<SourceCall>,
    failed_subscribes: usize,
}

/// Sensor source that routes injected samples to subscribed handlers.
#[derive(Default)]
pub struct MemorySensorSource {
    state: Mutex<SourceState>,
}

impl MemorySensorSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later subscribe to `channel` fail.
    pub fn mark_unavailable(&self, channel: SensorChannel) {
        lock(&self.state).unavailable.insert(channel);
    }

    /// Deliver `sample` to every handler subscribed to `channel`.
    ///
    /// Handlers run outside the source lock, so they may subscribe or
    /// unsubscribe re-entrantly.
    pub fn inject(&self, channel: SensorChannel, sample: SensorSample) {
        let handlers: Vec<_> = lock(&self.state)
            .subscriptions
            .values()
            .filter(|s| s.channel == channel)
            .map(|s| Arc::clone(&s.handler))
            .collect();
        for handler in handlers {
            handler.on_sample(&sample);
        }
    }

    pub fn calls(&self) -> Vec<SourceCall> {
        lock(&self.state).calls.clone()
    }

    pub fn is_subscribed(&self, channel: SensorChannel) -> bool {
        self.subscriber_count(channel) > 0
    }

    pub fn subscriber_count(&self, channel: SensorChannel) -> usize {
        lock(&self.state)
            .subscriptions
            .values()
            .filter(|s| s.channel == channel)
            .count()
    }

    pub fn failed_subscribes(&self) -> usize {
        lock(&self.state).failed_subscribes
    }
}

impl SensorSource for MemorySensorSource {
    fn subscribe(
        &self,
        channel: SensorChannel,
        handler: Arc<dyn SensorHandler>,
    ) -> Result<SubscriptionId, SensorError> {
        let mut state = lock(&self.state);
        if state.unavailable.contains(&channel) {
            state.failed_subscribes += 1;
            return Err(SensorError::ChannelUnavailable { channel });
        }
        state.next_id += 1;
        let id = SubscriptionId(state.next_id);
        state.subscriptions.insert(id, Subscription { channel, handler });
        state.calls.push(SourceCall::Subscribe(channel));
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<(), SensorError> {
        let mut state = lock(&self.state);
        let subscription = state
            .subscriptions
            .remove(&id)
            .ok_or(SensorError::UnknownSubscription(id))?;
        state.calls.push(SourceCall::Unsubscribe(subscription.channel));
        Ok(())
    }
}

/// Dispatcher that keeps every trigger it receives.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    triggers: Mutex<Vec<Trigger>>,
}

impl RecordingDispatcher {
    pub fn triggers(&self) -> Vec<Trigger> {
        lock(&self.triggers).clone()
    }

    /// Drain the recorded triggers.
    pub fn take(&self) -> Vec<Trigger> {
        std::mem::take(&mut *lock(&self.triggers))
    }
}

impl ActionDispatcher for RecordingDispatcher {
    fn dispatch(&self, trigger: &Trigger) {
        lock(&self.triggers).push(*trigger);
    }
}

#[derive(Debug, Default)]
struct FlagState {
    held: bool,
    acquires: usize,
    releases: usize,
    violations: usize,
}

/// Non-reentrant wake lock that counts misuse instead of panicking.
///
/// A violation is an acquire while held or a release while not held.
#[derive(Debug, Default)]
pub struct FlagWakeLock {
    state: Mutex<FlagState>,
}

impl FlagWakeLock {
    pub fn is_held(&self) -> bool {
        lock(&self.state).held
    }

    pub fn acquire_count(&self) -> usize {
        lock(&self.state).acquires
    }

    pub fn release_count(&self) -> usize {
        lock(&self.state).releases
    }

    pub fn violations(&self) -> usize {
        lock(&self.state).violations
    }
}

impl WakeLock for FlagWakeLock {
    fn acquire(&self) {
        let mut state = lock(&self.state);
        if state.held {
            state.violations += 1;
        }
        state.held = true;
        state.acquires += 1;
    }

    fn release(&self) {
        let mut state = lock(&self.state);
        if !state.held {
            state.violations += 1;
        }
        state.held = false;
        state.releases += 1;
    }
}

/// Power monitor whose answer is set by hand.
#[derive(Debug, Default)]
pub struct ManualPowerMonitor {
    interactive: AtomicBool,
}

impl ManualPowerMonitor {
    pub fn new(interactive: bool) -> Self {
        Self {
            interactive: AtomicBool::new(interactive),
        }
    }

    pub fn set_interactive(&self, interactive: bool) {
        self.interactive.store(interactive, Ordering::SeqCst);
    }
}

impl PowerMonitor for ManualPowerMonitor {
    fn is_interactive(&self) -> bool {
        self.interactive.load(Ordering::SeqCst)
    }
}

/// A [`GestureEngine`] wired to in-memory collaborators.
///
/// The device starts interactive with the clock at zero.
pub struct Simulator {
    pub settings: Arc<MemorySettingsStore>,
    pub sensors: Arc<MemorySensorSource>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub wake_lock: Arc<FlagWakeLock>,
    pub power: Arc<ManualPowerMonitor>,
    pub clock: Arc<ManualClock>,
    engine: Arc<GestureEngine>,
}

impl Simulator {
    pub fn new(config: &EngineConfig) -> Self {
        let settings = Arc::new(MemorySettingsStore::from_snapshot(config.defaults));
        let sensors = Arc::new(MemorySensorSource::new());
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let wake_lock = Arc::new(FlagWakeLock::default());
        let power = Arc::new(ManualPowerMonitor::new(true));
        let clock = Arc::new(ManualClock::new(0));

        let engine = GestureEngine::new(
            EngineDeps {
                settings: settings.clone(),
                sensors: sensors.clone(),
                dispatcher: dispatcher.clone(),
                wake_lock: wake_lock.clone(),
                power: power.clone(),
                clock: clock.clone(),
            },
            config,
        );

        Self {
            settings,
            sensors,
            dispatcher,
            wake_lock,
            power,
            clock,
            engine,
        }
    }

    pub fn engine(&self) -> &Arc<GestureEngine> {
        &self.engine
    }

    pub fn status(&self) -> EngineStatus {
        self.engine.status()
    }

    /// Apply one event and return the triggers it produced.
    pub fn apply(&self, event: &TraceEvent) -> Vec<Trigger> {
        match event {
            TraceEvent::Setting { key, value } => self.settings.set(key, *value),
            TraceEvent::ScreenOn => {
                self.power.set_interactive(true);
                self.engine.screen_turned_on();
            }
            TraceEvent::ScreenOff => {
                self.power.set_interactive(false);
                self.engine.screen_turned_off();
            }
            TraceEvent::Sample {
                channel,
                timestamp_nanos,
                values,
            } => self
                .sensors
                .inject(*channel, SensorSample::new(*timestamp_nanos, values.clone())),
            TraceEvent::AdvanceClock { millis } => self.clock.advance_ms(*millis),
        }
        self.dispatcher.take()
    }

    pub fn replay<'a>(&self, events: impl IntoIterator<Item = &'a TraceEvent>) -> Vec<Trigger> {
        events.into_iter().flat_map(|event| self.apply(event)).collect()
    }
}
