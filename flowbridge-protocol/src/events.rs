//! Outbound event types sent to browser clients

use serde::{Deserialize, Serialize};

/// Result of one calibration session, carried inside a `cal` event.
///
/// Flow sessions come in two projections of the same delta/elapsed pair:
/// volume-style runs report pulses-per-litre against the requested volume,
/// pulse- or time-armed runs report pulses-per-second. Scale sessions report
/// grams-per-second.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum CalResult {
    /// Flow run against a known volume.
    Volume {
        delta: u64,
        elapsed: f64,
        volume: f64,
        ppl: f64,
    },
    /// Flow run armed on pulses or seconds.
    Rate { delta: u64, elapsed: f64, pps: f64 },
    /// Scale run.
    Scale { delta: f64, elapsed: f64, rate: f64 },
}

/// Event types broadcast to connected clients
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum BridgeEvent {
    /// Queued system status line
    #[serde(rename = "status")]
    Status { msg: String },

    /// Latest telemetry snapshot, sent on every broadcast tick
    #[serde(rename = "live")]
    Live {
        millis: u64,
        pulses: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        weight: Option<f64>,
    },

    /// Command acknowledgement, unicast to the issuing client
    #[serde(rename = "ack")]
    Ack { status: String },

    /// Calibration result, broadcast to every client
    #[serde(rename = "cal")]
    Cal(CalResult),
}

impl BridgeEvent {
    pub fn status(msg: impl Into<String>) -> Self {
        Self::Status { msg: msg.into() }
    }

    pub fn ack(status: impl Into<String>) -> Self {
        Self::Ack {
            status: status.into(),
        }
    }

    /// Encode as one JSON text frame
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
