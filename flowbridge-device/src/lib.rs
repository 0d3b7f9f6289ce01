//! Serial transport for the flowbridge daemon
//!
//! Talks to the pulse-counter hardware over a serial port: newline-delimited
//! text frames in, single-byte commands out.
//!
//! ## Architecture
//!
//! ```text
//! Serial device (serialport, blocking)
//!   │
//!   ├─> reader thread ──> tokio unbounded channel of text lines
//!   │
//!   └─> SerialControl (try_clone'd write half, `r`/`o`/`c` commands)
//! ```
//!
//! The port is blocking I/O, so reading lives on a dedicated std thread and
//! hands complete lines to the async side over a channel. The channel closing
//! is the disconnect signal; there is no reconnection.

pub mod error;
pub mod frame;
pub mod port;

pub use error::{DeviceError, Result};
pub use frame::DeviceLine;
pub use port::{list_ports, DeviceControl, DevicePort, SerialControl};
pub use serialport::{SerialPortInfo, SerialPortType};

/// Default baud rate for the pulse counter firmware
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Command byte: reset the pulse counter
pub const CMD_RESET: u8 = b'r';

/// Command byte: open the valve
pub const CMD_OPEN_VALVE: u8 = b'o';

/// Command byte: close the valve
pub const CMD_CLOSE_VALVE: u8 = b'c';
