//! WebSocket endpoint and per-client session handling

use std::sync::Arc;

use axum::{
    extract::ws::{Message, WebSocket},
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
    Router,
};
use flowbridge_broadcaster::ClientId;
use flowbridge_protocol::{BridgeEvent, ClientCommand};
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info};

use crate::state::BridgeRuntime;

/// Build the daemon's router: one WebSocket route.
pub fn router(runtime: Arc<BridgeRuntime>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(runtime)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(runtime): State<Arc<BridgeRuntime>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| client_session(socket, runtime))
}

/// Per-connection actor: register, catch up, pump, dispatch, deregister.
async fn client_session(socket: WebSocket, runtime: Arc<BridgeRuntime>) {
    let (mut sink, mut stream) = socket.split();
    let (id, mut outbound) = runtime.clients.register().await;

    // One-time catch-up: pop queued status lines until the backlog is empty.
    // Entries queued while we drain are delivered in this same pass; entries
    // queued after it are for the next client.
    while let Some(event) = runtime.backlog.pop().await {
        if let Err(e) = runtime.clients.send_to(id, &event).await {
            error!("Failed to encode backlog entry: {}", e);
        }
    }

    // Everything queued for this client flows through its channel into the
    // socket from here, so a slow socket only ever delays this one client.
    let pump = tokio::spawn(async move {
        while let Some(text) = outbound.recv().await {
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => dispatch_command(&runtime, id, &text).await,
            Message::Close(_) => break,
            _ => {}
        }
    }

    // Unconditional cleanup, however the loop ended.
    pump.abort();
    runtime.clients.deregister(id).await;
    info!("Client {} session ended", id);
}

/// Decode one inbound message and run it against the calibration engine.
///
/// Acks go back to the issuing client only; calibration results go to every
/// client. Unrecognized commands and commands invalid in the current state
/// (start while running, stop while idle) are dropped without a reply.
pub async fn dispatch_command(runtime: &BridgeRuntime, id: ClientId, text: &str) {
    match ClientCommand::decode(text) {
        ClientCommand::Start(params) => match runtime.engine.start(params).await {
            Ok(Some(ack)) => {
                let _ = runtime.clients.send_to(id, &ack).await;
            }
            Ok(None) => {}
            Err(e) => error!("Device command failed on start: {}", e),
        },
        ClientCommand::Stop => match runtime.engine.stop().await {
            Ok(Some(result)) => {
                let _ = runtime.clients.send_to(id, &BridgeEvent::ack("stopped")).await;
                let _ = runtime.clients.broadcast(&BridgeEvent::Cal(result)).await;
            }
            Ok(None) => {}
            Err(e) => error!("Device command failed on stop: {}", e),
        },
        ClientCommand::Reset => match runtime.engine.reset().await {
            Ok(ack) => {
                let _ = runtime.clients.send_to(id, &ack).await;
            }
            Err(e) => error!("Device command failed on reset: {}", e),
        },
        ClientCommand::Unrecognized => {
            debug!("Ignoring unrecognized command: {:?}", text);
        }
    }
}
