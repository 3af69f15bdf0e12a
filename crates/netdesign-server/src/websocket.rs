//! WebSocket handling for live network updates

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use netdesign_core::{LayerId, NetworkDocument};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::ServerState;

/// WebSocket message types for client-server communication
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsMessage {
    /// Client requests the full network
    #[serde(rename = "request_full_network")]
    RequestFullNetwork,
    /// Server sends the full network
    #[serde(rename = "full_network")]
    FullNetwork { network: NetworkDocument, sequence: u64 },
    /// Server announces an applied mutation
    #[serde(rename = "network_changed")]
    NetworkChanged { event: ChangeEvent },
    /// Ping/pong for keepalive
    #[serde(rename = "ping")]
    Ping,
    #[serde(rename = "pong")]
    Pong,
    /// Error message
    #[serde(rename = "error")]
    Error { message: String },
}

/// One applied store mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Monotonically increasing per server.
    pub sequence: u64,
    pub operation: String,
    /// Layers the mutation touched; empty for whole-network imports.
    pub layer_ids: Vec<LayerId>,
}

/// Snapshot plus the sequence number of the last mutation it contains.
async fn full_network_message(state: &ServerState) -> WsMessage {
    let network = state.network.read().await;
    WsMessage::FullNetwork {
        network: network.export_network(),
        sequence: state.sequence(),
    }
}

/// Handle WebSocket upgrade requests
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<ServerState>) {
    info!("New WebSocket connection established");

    let (mut sender, mut receiver) = socket.split();
    let mut events_rx = state.events_tx.subscribe();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<String>();

    // Send the full network immediately after connecting
    let initial = full_network_message(&state).await;
    match serde_json::to_string(&initial) {
        Ok(json) => {
            if sender.send(Message::Text(json)).await.is_err() {
                warn!("Failed to send initial network to WebSocket client");
                return;
            }
        }
        Err(e) => warn!("Failed to serialize full network message: {}", e),
    }

    let state_clone = Arc::clone(&state);
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    debug!("Received WebSocket message: {}", text);
                    let reply = match serde_json::from_str::<WsMessage>(&text) {
                        Ok(ws_msg) => handle_client_message(ws_msg, &state_clone).await,
                        Err(e) => {
                            warn!("Failed to parse WebSocket message: {}", e);
                            Some(WsMessage::Error {
                                message: format!("unrecognised message: {}", e),
                            })
                        }
                    };
                    if let Some(reply) = reply {
                        if let Ok(json) = serde_json::to_string(&reply) {
                            if reply_tx.send(json).is_err() {
                                break;
                            }
                        }
                    }
                }
                Message::Close(_) => {
                    debug!("WebSocket client disconnected");
                    break;
                }
                _ => {}
            }
        }
    });

    let mut send_task = tokio::spawn(async move {
        loop {
            let outgoing = tokio::select! {
                event = events_rx.recv() => match event {
                    Ok(msg) => msg,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("WebSocket client lagged behind by {} events", skipped);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                reply = reply_rx.recv() => match reply {
                    Some(msg) => msg,
                    None => break,
                },
            };
            if sender.send(Message::Text(outgoing)).await.is_err() {
                debug!("Failed to send message to WebSocket client");
                break;
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }

    info!("WebSocket connection closed");
}

/// Answer a client message; `None` means nothing to send back.
async fn handle_client_message(msg: WsMessage, state: &ServerState) -> Option<WsMessage> {
    match msg {
        WsMessage::RequestFullNetwork => {
            debug!("Client requested full network");
            Some(full_network_message(state).await)
        }
        WsMessage::Ping => Some(WsMessage::Pong),
        other => {
            debug!("Ignoring client message: {:?}", other);
            None
        }
    }
}
