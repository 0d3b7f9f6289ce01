//! Connected client registry

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use flowbridge_protocol::BridgeEvent;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use crate::error::Result;

pub type ClientId = u64;

/// One connected client: an id plus its outbound message channel.
///
/// The socket itself lives with the per-connection task; the registry only
/// holds the sending half, so pushing an event here can never block on a
/// slow peer.
struct Client {
    id: ClientId,
    tx: mpsc::UnboundedSender<String>,
}

/// Thread-safe registry of connected clients.
#[derive(Clone, Default)]
pub struct ClientManager {
    clients: Arc<Mutex<Vec<Client>>>,
    next_id: Arc<AtomicU64>,
}

impl ClientManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new client.
    ///
    /// Returns the client's id and the receiving half of its outbound
    /// channel, which the connection task must drain into the socket.
    pub async fn register(&self) -> (ClientId, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut clients = self.clients.lock().await;
        clients.push(Client { id, tx });
        info!("Client {} connected. Total clients: {}", id, clients.len());

        (id, rx)
    }

    /// Remove a client. Safe to call for an already-pruned id.
    pub async fn deregister(&self, id: ClientId) {
        let mut clients = self.clients.lock().await;
        clients.retain(|c| c.id != id);
        info!("Client {} disconnected. Remaining: {}", id, clients.len());
    }

    /// Broadcast an event to all clients, pruning dead ones.
    ///
    /// A failed send means the receiving task dropped its channel; that
    /// client is removed and delivery to the others continues.
    pub async fn broadcast(&self, event: &BridgeEvent) -> Result<()> {
        let text = event.to_json()?;
        let mut clients = self.clients.lock().await;

        clients.retain(|client| {
            let alive = client.tx.send(text.clone()).is_ok();
            if !alive {
                debug!("Pruning dead client {}", client.id);
            }
            alive
        });

        Ok(())
    }

    /// Send an event to a single client. A dead or unknown id is ignored.
    pub async fn send_to(&self, id: ClientId, event: &BridgeEvent) -> Result<()> {
        let text = event.to_json()?;
        let clients = self.clients.lock().await;

        if let Some(client) = clients.iter().find(|c| c.id == id) {
            let _ = client.tx.send(text);
        }

        Ok(())
    }

    /// Current number of registered clients.
    pub async fn client_count(&self) -> usize {
        self.clients.lock().await.len()
    }
}
