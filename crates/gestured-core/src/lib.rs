//! # gestured Core Library
//!
//! Device-side gesture engine. Sensor samples come in, semantic gesture
//! triggers go out, and the set of active sensor subscriptions follows the
//! screen power state and user settings.
//!
//! ## Architecture
//!
//! - **Detectors**: per-gesture state machines. Doze gestures (handwave,
//!   pocket, pick-up) listen only while the screen is off; always-on gestures
//!   listen whenever their own setting is on
//! - **Power**: screen edge fan-out, the engine-wide wake lock and doze pulse
//!   rate limiting
//! - **Settings**: boolean store keys folded into one atomically swapped
//!   snapshot
//! - **Storage**: TOML configuration for timing and threshold tunables
//!
//! ## Key Components
//!
//! - [`GestureEngine`]: Root orchestrator owning every detector
//! - [`ScreenPowerGate`]: Wake lock plus screen edge fan-out
//! - [`StowMachine`]: Handwave/pocket cover-uncover classifier
//! - [`EngineConfig`]: Engine configuration management
//! - [`sim`]: In-memory collaborators for replay and tests

pub mod clock;
pub mod detector;
pub mod engine;
pub mod error;
pub mod events;
pub mod gesture;
pub mod power;
pub mod sensor;
pub mod settings;
pub mod sim;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use detector::{DetectorState, StowMachine, StowTiming};
pub use engine::{EngineDeps, EngineStatus, GestureEngine};
pub use error::{ConfigError, CoreError, SensorError};
pub use events::{load_trace, parse_trace, TraceEvent, Trigger};
pub use gesture::{ActionDispatcher, ActionKind, GestureKind};
pub use power::{PowerMonitor, ScreenPowerGate, ScreenState, WakeLock};
pub use sensor::{SensorChannel, SensorHandler, SensorSample, SensorSource, SubscriptionId};
pub use settings::{SettingKey, SettingsSnapshot, SettingsStore};
pub use storage::EngineConfig;
