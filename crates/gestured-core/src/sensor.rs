//! Sensor source abstraction.
//!
//! The hardware layer is an external collaborator exposing named channels.
//! Detectors subscribe a [`SensorHandler`] to a channel and receive samples
//! asynchronously, usually on a delivery thread of the source's choosing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Weak};

use crate::error::SensorError;

/// Named sensor channels used by the detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorChannel {
    /// Proximity cover ("stowed") state, `values[0] != 0` when covered.
    Stow,
    /// Face-up flat state, `values[0] != 0` while lying flat.
    FlatUp,
    DoubleTap,
    ChopChop,
    CameraActivation,
    /// Face-down flat state.
    FlatDown,
    /// Lift detection while ringing.
    Lift,
    /// IR proximity distance in centimetres.
    IrProximity,
}

impl SensorChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            SensorChannel::Stow => "stow",
            SensorChannel::FlatUp => "flat_up",
            SensorChannel::DoubleTap => "double_tap",
            SensorChannel::ChopChop => "chop_chop",
            SensorChannel::CameraActivation => "camera_activation",
            SensorChannel::FlatDown => "flat_down",
            SensorChannel::Lift => "lift",
            SensorChannel::IrProximity => "ir_proximity",
        }
    }
}

impl fmt::Display for SensorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reading delivered by the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub timestamp_nanos: i64,
    pub values: Vec<f32>,
}

impl SensorSample {
    pub fn new(timestamp_nanos: i64, values: Vec<f32>) -> Self {
        Self {
            timestamp_nanos,
            values,
        }
    }

    /// The leading axis value, or `None` when the sample is malformed
    /// (no values, or a non-finite reading).
    pub fn leading_value(&self) -> Option<f32> {
        self.values.first().copied().filter(|v| v.is_finite())
    }

    /// Boolean interpretation used by binary channels (stow, flat-up, ...).
    pub fn flag(&self) -> Option<bool> {
        self.leading_value().map(|v| v != 0.0)
    }
}

/// Receives samples for a subscribed channel.
pub trait SensorHandler: Send + Sync {
    fn on_sample(&self, sample: &SensorSample);
}

/// Opaque handle returned by [`SensorSource::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

/// Hardware sensor source.
///
/// Implementations must not deliver samples synchronously from inside
/// `subscribe`/`unsubscribe`: detectors hold their own lock across both calls.
pub trait SensorSource: Send + Sync {
    fn subscribe(
        &self,
        channel: SensorChannel,
        handler: Arc<dyn SensorHandler>,
    ) -> Result<SubscriptionId, SensorError>;

    fn unsubscribe(&self, id: SubscriptionId) -> Result<(), SensorError>;
}

/// Handler that forwards to a detector without keeping it alive, so a
/// source holding on to a subscription never extends a detector's lifetime.
pub(crate) struct WeakHandler<T>(pub(crate) Weak<T>);

impl<T: SensorHandler> SensorHandler for WeakHandler<T> {
    fn on_sample(&self, sample: &SensorSample) {
        if let Some(target) = self.0.upgrade() {
            target.on_sample(sample);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_reads_leading_axis() {
        assert_eq!(SensorSample::new(0, vec![1.0, 0.0]).flag(), Some(true));
        assert_eq!(SensorSample::new(0, vec![0.0]).flag(), Some(false));
    }

    #[test]
    fn test_malformed_samples_have_no_value() {
        assert_eq!(SensorSample::new(0, vec![]).leading_value(), None);
        assert_eq!(SensorSample::new(0, vec![f32::NAN]).flag(), None);
        assert_eq!(SensorSample::new(0, vec![f32::INFINITY]).flag(), None);
    }

    #[test]
    fn test_weak_handler_drops_after_target() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct Counter(AtomicUsize);
        impl SensorHandler for Counter {
            fn on_sample(&self, _sample: &SensorSample) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let target = Arc::new(Counter(AtomicUsize::new(0)));
        let handler = WeakHandler(Arc::downgrade(&target));
        handler.on_sample(&SensorSample::new(0, vec![1.0]));
        assert_eq!(target.0.load(Ordering::SeqCst), 1);

        drop(target);
        // No panic, nothing to forward to.
        handler.on_sample(&SensorSample::new(1, vec![1.0]));
    }
}
