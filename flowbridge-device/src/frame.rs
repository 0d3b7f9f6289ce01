//! Device line parsing
//!
//! The firmware emits one line per sample: `millis,pulses` with an optional
//! third weight field when a scale is wired in, plus a handful of control
//! tokens acknowledging commands. Everything else on the wire (boot banner,
//! partial frames, line noise) is dropped.

/// One recognized line from the device.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceLine {
    /// Telemetry sample: device clock, cumulative pulse count, and the scale
    /// reading when present.
    Frame {
        millis: u64,
        pulses: u64,
        weight: Option<f64>,
    },
    /// Counter reset confirmation
    ResetAck,
    /// Valve state notifications
    ValveOpen,
    ValveClosed,
}

impl DeviceLine {
    /// Parse one raw line. `None` means the line is noise to discard.
    ///
    /// A frame needs at least two integer fields. A third field that fails
    /// to parse as a float does not invalidate the frame; the weight is
    /// simply not updated for that sample.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "reset-ack" => return Some(Self::ResetAck),
            "valve-open" => return Some(Self::ValveOpen),
            "valve-closed" => return Some(Self::ValveClosed),
            _ => {}
        }

        let mut fields = line.trim().split(',');
        let millis = fields.next()?.trim().parse::<u64>().ok()?;
        let pulses = fields.next()?.trim().parse::<u64>().ok()?;
        let weight = fields
            .next()
            .and_then(|f| f.trim().parse::<f64>().ok())
            .filter(|w| w.is_finite());

        Some(Self::Frame {
            millis,
            pulses,
            weight,
        })
    }
}
