use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::gesture::{ActionKind, GestureKind};
use crate::sensor::SensorChannel;

/// A recognised gesture, handed to the action dispatcher exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub gesture: GestureKind,
    pub action: ActionKind,
    /// Timestamp of the sample that completed the gesture.
    pub timestamp_nanos: i64,
}

impl Trigger {
    pub fn new(gesture: GestureKind, timestamp_nanos: i64) -> Self {
        Self {
            gesture,
            action: gesture.action(),
            timestamp_nanos,
        }
    }
}

/// One input to the engine, as recorded in a replay trace.
///
/// Traces are JSON lines; each line is one tagged event:
///
/// ```text
/// {"type":"setting","key":"gesture_pocket","value":true}
/// {"type":"screen_off"}
/// {"type":"advance_clock","millis":2000}
/// {"type":"sample","channel":"stow","timestamp_nanos":0,"values":[1.0]}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceEvent {
    /// A settings store write followed by its change notification.
    Setting { key: String, value: bool },
    ScreenOn,
    ScreenOff,
    Sample {
        channel: SensorChannel,
        timestamp_nanos: i64,
        values: Vec<f32>,
    },
    /// Moves the wall clock used for pulse rate limiting.
    AdvanceClock { millis: i64 },
}

/// Parse a JSON-lines trace. Blank lines and `#` comments are skipped.
///
/// # Errors
///
/// Returns [`CoreError::Trace`] with the 1-based line number of the first
/// line that does not decode.
pub fn parse_trace(input: &str) -> Result<Vec<TraceEvent>> {
    let mut events = Vec::new();
    for (index, raw) in input.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event = serde_json::from_str(line).map_err(|source| CoreError::Trace {
            line: index + 1,
            source,
        })?;
        events.push(event);
    }
    Ok(events)
}

/// Read and parse a trace file.
///
/// # Errors
///
/// Returns [`CoreError::Io`] if the file cannot be read, or the
/// [`parse_trace`] error for a bad line.
pub fn load_trace(path: &Path) -> Result<Vec<TraceEvent>> {
    let content = std::fs::read_to_string(path)?;
    parse_trace(&content)
}
