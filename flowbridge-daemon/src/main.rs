//! Flowbridge Daemon - serial flow sensor to WebSocket bridge
//!
//! Relays telemetry frames from a pulse-counter device to browser clients
//! and runs calibration sessions against it. One serial device in, any
//! number of WebSocket clients out.

use std::future::IntoFuture;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use flowbridge_daemon::{
    config::BridgeConfig, discovery, reader, server, state::BridgeRuntime, tick,
};
use flowbridge_device::DevicePort;
use flowbridge_protocol::BridgeEvent;

#[derive(Parser, Debug)]
#[command(name = "flowbridge-daemon", version, about = "WebSocket bridge for a serial flow sensor")]
struct Args {
    /// Serial port (e.g. COM3, /dev/ttyACM0); prompts if omitted
    #[arg(short, long)]
    port: Option<String>,

    /// Serial baud rate override
    #[arg(long)]
    baud: Option<u32>,

    /// Listen address override (host:port)
    #[arg(long)]
    listen: Option<String>,

    /// Live broadcast period override in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let args = Args::parse();

    let mut config = match args.config {
        Some(path) => BridgeConfig::load_from(path),
        None => BridgeConfig::load(),
    }
    .context("Failed to load configuration")?;

    if let Some(baud) = args.baud {
        config.baud_rate = baud;
    }
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }
    if let Some(interval) = args.interval_ms {
        config.live_interval_ms = interval;
    }

    info!("🌊 Starting flowbridge daemon v{}", env!("CARGO_PKG_VERSION"));
    info!("📋 Configuration loaded from {}", config.config_path.display());

    let port_name = discovery::select_port(args.port.or_else(|| config.serial_port.clone()))?;

    let device = DevicePort::open(&port_name, config.baud_rate)
        .with_context(|| format!("Failed to open serial port {}", port_name))?;
    let (lines, control) = device.split();
    info!("🔗 Serial connection open on {}", port_name);

    let runtime = BridgeRuntime::new(config.clone(), Arc::new(control));

    // Queued before anyone can have connected; the first client drains it.
    runtime.backlog.push(BridgeEvent::status("serial-open")).await;

    let serial_task = tokio::spawn(reader::run(lines, runtime.clone()));
    tokio::spawn(tick::run(runtime.clone()));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!("🚀 Listening on ws://{}/ws", config.listen_addr);

    tokio::select! {
        result = axum::serve(listener, server::router(runtime.clone())).into_future() => {
            result.context("WebSocket server failed")?;
        }
        _ = serial_task => {
            anyhow::bail!("Serial connection lost");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("🛑 Received shutdown signal");
        }
    }

    Ok(())
}
