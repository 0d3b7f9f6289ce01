//! Periodic broadcast + auto-stop loop

use std::sync::Arc;
use std::time::Duration;

use flowbridge_protocol::BridgeEvent;
use tracing::error;

use crate::state::BridgeRuntime;

/// One broadcast tick: push the live snapshot to every client, then run the
/// automatic stop check.
///
/// The order matters: the last `live` update a client sees before a `cal`
/// result reflects the reading that triggered the stop. Broadcast failures
/// never escape the tick; a dead client is the registry's problem.
pub async fn broadcast_tick(runtime: &BridgeRuntime) {
    if runtime.clients.client_count().await > 0 {
        let snapshot = *runtime.telemetry.read().await;
        if let Err(e) = runtime.clients.broadcast(&snapshot.live_event()).await {
            error!("Failed to encode live event: {}", e);
        }
    }

    match runtime.engine.evaluate().await {
        Ok(Some(result)) => {
            if let Err(e) = runtime.clients.broadcast(&BridgeEvent::Cal(result)).await {
                error!("Failed to encode calibration result: {}", e);
            }
        }
        Ok(None) => {}
        Err(e) => error!("Device command failed during auto-stop: {}", e),
    }
}

/// Run ticks forever at the configured live interval.
///
/// The interval is also the system's calibration-stop latency bound: an
/// automatic stop fires on the first tick after its target is reached.
pub async fn run(runtime: Arc<BridgeRuntime>) {
    let period = Duration::from_millis(runtime.config.live_interval_ms);
    let mut ticker = tokio::time::interval(period);

    loop {
        ticker.tick().await;
        broadcast_tick(&runtime).await;
    }
}
