//! Flowbridge daemon library
//!
//! This module re-exports the daemon's modules for integration testing.
//! The binary in `main.rs` is a thin wiring layer over these.

pub mod calibration;
pub mod config;
pub mod discovery;
pub mod reader;
pub mod server;
pub mod state;
pub mod telemetry;
pub mod tick;

pub use calibration::CalibrationEngine;
pub use config::BridgeConfig;
pub use state::BridgeRuntime;
pub use telemetry::{SharedTelemetry, Telemetry};
