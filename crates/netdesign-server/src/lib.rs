//! HTTP + WebSocket surface for the network designer

pub mod router;
pub mod handlers;
pub mod websocket;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use netdesign_core::{LayerId, NetworkGraph};
use tokio::sync::{broadcast, RwLock};

use websocket::{ChangeEvent, WsMessage};

/// Capacity of the change broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Where the server listens.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl From<&netdesign_core::config::ServerSettings> for ServerConfig {
    fn from(settings: &netdesign_core::config::ServerSettings) -> Self {
        ServerConfig {
            host: settings.host.clone(),
            port: settings.port,
        }
    }
}

/// State shared by every handler. The lock makes each request one atomic
/// store operation.
pub struct ServerState {
    pub network: RwLock<NetworkGraph>,
    pub events_tx: broadcast::Sender<String>,
    sequence: AtomicU64,
}

impl ServerState {
    pub fn new(network: NetworkGraph) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        ServerState {
            network: RwLock::new(network),
            events_tx,
            sequence: AtomicU64::new(0),
        }
    }

    /// Send a raw message to every subscribed WebSocket client.
    pub fn broadcast(&self, msg: String) -> Result<usize, broadcast::error::SendError<String>> {
        self.events_tx.send(msg)
    }

    /// Announce an applied mutation. Having no subscribers is not an error.
    pub fn notify(&self, operation: &str, layer_ids: Vec<LayerId>) -> u64 {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let msg = WsMessage::NetworkChanged {
            event: ChangeEvent {
                sequence,
                operation: operation.to_string(),
                layer_ids,
            },
        };
        match serde_json::to_string(&msg) {
            Ok(json) => {
                let _ = self.broadcast(json);
            }
            Err(e) => tracing::warn!("Failed to serialize change event: {}", e),
        }
        sequence
    }

    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

/// The designer server: owns the shared state and runs the router.
pub struct NetDesignServer {
    state: Arc<ServerState>,
    config: ServerConfig,
}

impl NetDesignServer {
    pub fn new(network: NetworkGraph, config: ServerConfig) -> Self {
        NetDesignServer {
            state: Arc::new(ServerState::new(network)),
            config,
        }
    }

    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    pub async fn start(self) -> anyhow::Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let app = router::create_router(self.state);
        let listener = tokio::net::TcpListener::bind(addr).await?;

        tracing::info!("Listening on http://{}", listener.local_addr()?);
        axum::serve(listener, app).await?;
        Ok(())
    }
}
