//! Shared runtime context

use std::sync::Arc;

use flowbridge_broadcaster::{ClientManager, StatusBacklog};
use flowbridge_device::DeviceControl;
use tokio::sync::RwLock;

use crate::calibration::CalibrationEngine;
use crate::config::BridgeConfig;
use crate::telemetry::{SharedTelemetry, Telemetry};

/// Everything the daemon's tasks share, owned by `main` and passed around
/// as one `Arc`. No globals.
pub struct BridgeRuntime {
    pub config: BridgeConfig,
    pub telemetry: SharedTelemetry,
    pub engine: CalibrationEngine,
    pub clients: ClientManager,
    pub backlog: StatusBacklog,
}

impl BridgeRuntime {
    pub fn new(config: BridgeConfig, device: Arc<dyn DeviceControl>) -> Arc<Self> {
        let telemetry: SharedTelemetry = Arc::new(RwLock::new(Telemetry::default()));

        Arc::new(Self {
            config,
            engine: CalibrationEngine::new(device, telemetry.clone()),
            telemetry,
            clients: ClientManager::new(),
            backlog: StatusBacklog::new(),
        })
    }
}
