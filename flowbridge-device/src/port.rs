//! Serial port handling: open, enumerate, read lines, write commands

use std::io::{Read, Write};
use std::sync::Mutex;
use std::time::Duration;

use serialport::{SerialPort, SerialPortInfo};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::error::{DeviceError, Result};
use crate::{CMD_CLOSE_VALVE, CMD_OPEN_VALVE, CMD_RESET};

/// Read timeout for the blocking reader thread. Short enough that the thread
/// notices a dropped receiver reasonably quickly.
const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Command sink for the calibration engine.
///
/// Abstracted behind a trait so the engine can be exercised in tests with a
/// recording fake instead of real hardware.
pub trait DeviceControl: Send + Sync {
    /// Reset the device's pulse counter (`r`)
    fn send_reset(&self) -> Result<()>;
    /// Open the valve (`o`)
    fn open_valve(&self) -> Result<()>;
    /// Close the valve (`c`)
    fn close_valve(&self) -> Result<()>;
}

/// Write half of an open serial port.
pub struct SerialControl {
    port: Mutex<Box<dyn SerialPort>>,
}

impl SerialControl {
    fn send_byte(&self, byte: u8) -> Result<()> {
        let mut port = self
            .port
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        port.write_all(&[byte])?;
        port.flush()?;
        debug!("Sent device command {:?}", byte as char);
        Ok(())
    }
}

impl DeviceControl for SerialControl {
    fn send_reset(&self) -> Result<()> {
        self.send_byte(CMD_RESET)
    }

    fn open_valve(&self) -> Result<()> {
        self.send_byte(CMD_OPEN_VALVE)
    }

    fn close_valve(&self) -> Result<()> {
        self.send_byte(CMD_CLOSE_VALVE)
    }
}

/// An open serial connection to the pulse counter.
pub struct DevicePort {
    reader: Box<dyn SerialPort>,
    writer: Box<dyn SerialPort>,
}

impl DevicePort {
    /// Open `path` at `baud` with explicit 8N1 framing.
    pub fn open(path: &str, baud: u32) -> Result<Self> {
        info!("Opening {} @ {} baud", path, baud);

        let builder = serialport::new(path, baud)
            .timeout(READ_TIMEOUT)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None);

        let mut reader = builder.open()?;

        // Assert DTR so boards that reset on port-open (classic Arduino
        // behaviour) come up and start streaming.
        let _ = reader.write_data_terminal_ready(true);

        let writer = reader.try_clone()?;

        Ok(Self { reader, writer })
    }

    /// Split into the line stream and the command half.
    ///
    /// The returned receiver yields every complete line the device sends,
    /// already trimmed. The reader thread exits when the device goes away or
    /// the receiver is dropped; the channel closing is the caller's
    /// disconnect signal.
    pub fn split(self) -> (mpsc::UnboundedReceiver<String>, SerialControl) {
        let rx = spawn_line_reader(self.reader);
        let control = SerialControl {
            port: Mutex::new(self.writer),
        };
        (rx, control)
    }
}

/// Run the blocking read loop on a dedicated thread, emitting complete lines.
fn spawn_line_reader(mut port: Box<dyn SerialPort>) -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        let mut pending: Vec<u8> = Vec::with_capacity(256);
        let mut chunk = [0u8; 256];

        loop {
            match port.read(&mut chunk) {
                Ok(0) => {
                    error!("Serial device closed the connection");
                    break;
                }
                Ok(n) => {
                    pending.extend_from_slice(&chunk[..n]);
                    while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                        let raw: Vec<u8> = pending.drain(..=pos).collect();
                        let line = String::from_utf8_lossy(&raw).trim().to_string();
                        if tx.send(line).is_err() {
                            // Receiver gone, daemon is shutting down.
                            return;
                        }
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    if tx.is_closed() {
                        return;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => {
                    error!("Serial read failed: {}", e);
                    break;
                }
            }
        }
    });

    rx
}

/// Enumerate candidate serial devices for the selection prompt.
pub fn list_ports() -> Result<Vec<SerialPortInfo>> {
    let ports = serialport::available_ports()?;
    if ports.is_empty() {
        return Err(DeviceError::NoPortsFound);
    }
    Ok(ports)
}
