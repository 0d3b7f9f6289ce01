//! Latest device readings, shared across tasks

use std::sync::Arc;

use flowbridge_protocol::BridgeEvent;
use tokio::sync::RwLock;

/// Snapshot of the most recent device readings.
///
/// Written only by the serial reader task (and zeroed by the calibration
/// engine on reset); read by everyone else. `millis` and `pulses` always
/// change together under one write guard so no reader ever observes a
/// half-applied frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Telemetry {
    /// Device-reported clock, resets to 0 with the device counter
    pub millis: u64,
    /// Cumulative pulse count since the last device-side reset
    pub pulses: u64,
    /// Latest scale reading; absent until the first valid weight field
    pub weight: Option<f64>,
}

pub type SharedTelemetry = Arc<RwLock<Telemetry>>;

impl Telemetry {
    /// Apply one parsed data frame. A frame without a weight field leaves
    /// the previous weight in place.
    pub fn apply_frame(&mut self, millis: u64, pulses: u64, weight: Option<f64>) {
        self.millis = millis;
        self.pulses = pulses;
        if weight.is_some() {
            self.weight = weight;
        }
    }

    /// Return to the process-start state (counter reset).
    pub fn zero(&mut self) {
        *self = Self::default();
    }

    /// Build the `live` event for this snapshot.
    pub fn live_event(&self) -> BridgeEvent {
        BridgeEvent::Live {
            millis: self.millis,
            pulses: self.pulses,
            weight: self.weight,
        }
    }
}
