use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use crate::models::{CommandLogEntry, OntRecord, ScanOrigin};

/// Event types for WebSocket messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Connection,
    Command,
    OntRegistered,
    ScanCompleted,
}

/// WebSocket event message
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub payload: serde_json::Value,
}

/// Payload for connect/disconnect events
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionPayload {
    pub device_id: String,
    pub is_connected: bool,
    pub message: String,
}

/// Payload for scan completion
#[derive(Debug, Clone, Serialize)]
pub struct ScanCompletedPayload {
    pub device_id: String,
    pub origin: ScanOrigin,
    pub detected_count: usize,
}

/// WebSocket hub manages connections and broadcasts events
pub struct Hub {
    tx: broadcast::Sender<String>,
    client_count: Arc<RwLock<usize>>,
}

impl Hub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            tx,
            client_count: Arc::new(RwLock::new(0)),
        }
    }

    /// Broadcast an event to all connected clients
    pub async fn broadcast_event(&self, event: Event) {
        let data = match serde_json::to_string(&event) {
            Ok(data) => data,
            Err(e) => {
                tracing::error!("Error serializing WebSocket event: {}", e);
                return;
            }
        };

        let count = *self.client_count.read().await;
        if count > 0 {
            if let Err(e) = self.tx.send(data) {
                tracing::warn!("Error broadcasting WebSocket event: {}", e);
            } else {
                tracing::debug!("Broadcasting {:?} to {} clients", event.event_type, count);
            }
        }
    }

    async fn broadcast<T: Serialize>(&self, event_type: EventType, payload: &T) {
        self.broadcast_event(Event {
            event_type,
            payload: serde_json::to_value(payload).unwrap_or_default(),
        })
        .await;
    }

    pub async fn broadcast_connection(&self, device_id: &str, is_connected: bool, message: &str) {
        self.broadcast(
            EventType::Connection,
            &ConnectionPayload {
                device_id: device_id.to_string(),
                is_connected,
                message: message.to_string(),
            },
        )
        .await;
    }

    pub async fn broadcast_command(&self, entry: &CommandLogEntry) {
        self.broadcast(EventType::Command, entry).await;
    }

    pub async fn broadcast_ont_registered(&self, ont: &OntRecord) {
        self.broadcast(EventType::OntRegistered, ont).await;
    }

    pub async fn broadcast_scan_completed(&self, device_id: &str, origin: ScanOrigin, detected_count: usize) {
        self.broadcast(
            EventType::ScanCompleted,
            &ScanCompletedPayload {
                device_id: device_id.to_string(),
                origin,
                detected_count,
            },
        )
        .await;
    }

    #[cfg(test)]
    pub async fn client_count(&self) -> usize {
        *self.client_count.read().await
    }

    /// Subscribe to events
    fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    async fn increment_clients(&self) {
        let mut count = self.client_count.write().await;
        *count += 1;
        tracing::info!("WebSocket client connected. Total clients: {}", *count);
    }

    async fn decrement_clients(&self) {
        let mut count = self.client_count.write().await;
        *count = count.saturating_sub(1);
        tracing::info!("WebSocket client disconnected. Total clients: {}", *count);
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

/// WebSocket handler for axum
pub async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<Arc<Hub>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

async fn handle_socket(socket: WebSocket, hub: Arc<Hub>) {
    let (mut sender, mut receiver) = socket.split();

    hub.increment_clients().await;
    let mut rx = hub.subscribe();

    let send_task = tokio::spawn(async move {
        while let Ok(msg) = rx.recv().await {
            if sender.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    // Inbound frames are ignored; reading keeps the connection alive
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            if msg.is_err() {
                break;
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    hub.decrement_clients().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_shape() {
        let event = Event {
            event_type: EventType::ScanCompleted,
            payload: serde_json::to_value(ScanCompletedPayload {
                device_id: "olt-1".into(),
                origin: ScanOrigin::Simulated,
                detected_count: 3,
            })
            .unwrap(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "scan_completed");
        assert_eq!(json["payload"]["origin"], "simulated");
    }

    #[tokio::test]
    async fn test_broadcast_reaches_subscribers() {
        let hub = Hub::new();
        let mut rx = hub.subscribe();
        hub.increment_clients().await;
        hub.broadcast_connection("olt-1", true, "connected").await;
        let msg = rx.recv().await.unwrap();
        assert!(msg.contains("\"type\":\"connection\""));
        assert!(msg.contains("\"is_connected\":true"));
        hub.decrement_clients().await;
        assert_eq!(hub.client_count().await, 0);
    }
}
