//! Serial device selection prompt

use std::io::Write;

use anyhow::{bail, Context, Result};
use flowbridge_device::{SerialPortInfo, SerialPortType};

/// Pick the serial port to open.
///
/// An explicit choice (CLI flag or config file) wins. Otherwise candidate
/// devices are listed on stdout and the user picks one by number, with the
/// first entry as the default.
pub fn select_port(explicit: Option<String>) -> Result<String> {
    if let Some(port) = explicit {
        return Ok(port);
    }

    let ports = flowbridge_device::list_ports().context("No serial devices detected")?;

    println!("\nAvailable serial devices:\n");
    for (i, port) in ports.iter().enumerate() {
        println!(" {}: {:<15} {}", i, port.port_name, describe(port));
    }

    print!("\nSelect port [0-{}] (default 0): ", ports.len() - 1);
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .context("Failed to read selection")?;

    let input = input.trim();
    let index = if input.is_empty() {
        0
    } else {
        match input.parse::<usize>() {
            Ok(i) if i < ports.len() => i,
            _ => bail!("Invalid selection: {:?}", input),
        }
    };

    Ok(ports[index].port_name.clone())
}

fn describe(port: &SerialPortInfo) -> String {
    match &port.port_type {
        SerialPortType::UsbPort(usb) => usb
            .product
            .clone()
            .unwrap_or_else(|| "USB serial device".to_string()),
        SerialPortType::BluetoothPort => "Bluetooth serial device".to_string(),
        SerialPortType::PciPort => "PCI serial device".to_string(),
        SerialPortType::Unknown => String::new(),
    }
}
