//! Serial ingest task

use std::sync::Arc;

use flowbridge_device::DeviceLine;
use flowbridge_protocol::BridgeEvent;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::state::BridgeRuntime;

/// Consume the device's line stream until it ends.
///
/// Data frames update the shared telemetry (both counters under one write
/// guard), `reset-ack` queues a status line for the next client to connect,
/// valve notifications are informational, and anything else is noise.
///
/// Returning means the line channel closed, i.e. the device went away.
/// There is no reconnection; the caller treats this as fatal.
pub async fn run(mut lines: mpsc::UnboundedReceiver<String>, runtime: Arc<BridgeRuntime>) {
    while let Some(line) = lines.recv().await {
        match DeviceLine::parse(&line) {
            Some(DeviceLine::Frame {
                millis,
                pulses,
                weight,
            }) => {
                runtime
                    .telemetry
                    .write()
                    .await
                    .apply_frame(millis, pulses, weight);
            }
            Some(DeviceLine::ResetAck) => {
                debug!("Device confirmed counter reset");
                runtime
                    .backlog
                    .push(BridgeEvent::status("counter-reset"))
                    .await;
            }
            Some(DeviceLine::ValveOpen) => debug!("Device reports valve open"),
            Some(DeviceLine::ValveClosed) => debug!("Device reports valve closed"),
            None => trace!("Discarding line: {:?}", line),
        }
    }
}
