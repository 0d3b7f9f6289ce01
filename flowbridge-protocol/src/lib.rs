//! Wire protocol for the flowbridge daemon
//!
//! This crate defines the text protocol spoken between the daemon and its
//! browser clients, and nothing else. Both directions travel as JSON text
//! frames over one persistent connection.
//!
//! # Inbound
//!
//! Commands arrive as `{"cmd": "start", ...}` objects. A frame that does not
//! decode as JSON is retried as a bare command name (`"start"`, `"stop"`,
//! `"reset"`), so hand-typed test messages keep working. Command names are
//! case-insensitive; anything unknown decodes to
//! [`ClientCommand::Unrecognized`].
//!
//! # Outbound
//!
//! - `status` - queued system status lines (`serial-open`, `counter-reset`)
//! - `live` - latest telemetry snapshot, sent on every broadcast tick
//! - `ack` - command acknowledgement for the issuing client
//! - `cal` - calibration result, broadcast to every client

pub mod command;
pub mod events;

pub use command::{ClientCommand, SensorMode, StartParams};
pub use events::{BridgeEvent, CalResult};
