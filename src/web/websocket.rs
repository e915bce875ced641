//! WebSocket handler for streaming dashboard snapshots.

use crate::dashboard::DashboardSnapshot;
use crate::web::AppState;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::time::SystemTime;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
struct Client {
    connected_at: SystemTime,
}

/// Connected WebSocket clients, keyed by id.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<String, Client>,
}

impl ClientRegistry {
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Register a client unless `max` are already connected.
    pub fn try_register(&mut self, id: &str, max: usize) -> bool {
        if self.clients.len() >= max {
            return false;
        }
        self.clients.insert(
            id.to_string(),
            Client {
                connected_at: SystemTime::now(),
            },
        );
        true
    }

    pub fn remove(&mut self, id: &str) {
        self.clients.remove(id);
    }

    /// Summary of connected clients.
    pub fn describe(&self) -> Vec<serde_json::Value> {
        self.clients
            .iter()
            .map(|(id, client)| {
                serde_json::json!({
                    "id": id,
                    "connected_at": client.connected_at
                        .duration_since(std::time::UNIX_EPOCH)
                        .unwrap_or_default()
                        .as_secs(),
                    "connected_duration_seconds": client.connected_at.elapsed().unwrap_or_default().as_secs()
                })
            })
            .collect()
    }
}

/// WebSocket upgrade handler.
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let max = state.config.max_websocket_connections;
    if state.clients.read().await.len() >= max {
        warn!("Rejecting WebSocket client: {} connections already open", max);
        return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
    }

    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Stream snapshots to one client until either side goes away.
async fn handle_websocket(socket: WebSocket, state: AppState) {
    let client_id = uuid::Uuid::new_v4().to_string();
    let max = state.config.max_websocket_connections;
    if !state.clients.write().await.try_register(&client_id, max) {
        warn!("Dropping WebSocket client {}: limit of {} reached", client_id, max);
        return;
    }
    info!("WebSocket client connected: {}", client_id);

    let (mut sender, mut receiver) = socket.split();

    // Yields the current snapshot first, then every change.
    let mut snapshots = WatchStream::new(state.snapshots.clone());

    let client_id_recv = client_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => {
                    debug!("WebSocket client {} sent close", client_id_recv);
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket error for client {}: {}", client_id_recv, e);
                    break;
                }
            }
        }
    });

    let client_id_send = client_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(snapshot) = snapshots.next().await {
            let json = match encode(&snapshot) {
                Some(json) => json,
                None => continue,
            };
            if let Err(e) = sender.send(Message::Text(json)).await {
                debug!("Failed to send to client {}: {}", client_id_send, e);
                break;
            }
        }
    });

    // Wait for either task to complete, then stop the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    }

    state.clients.write().await.remove(&client_id);
    info!("WebSocket client disconnected: {}", client_id);
}

fn encode(snapshot: &DashboardSnapshot) -> Option<String> {
    match serde_json::to_string(snapshot) {
        Ok(json) => Some(json),
        Err(e) => {
            error!("Failed to serialize snapshot: {}", e);
            None
        }
    }
}
