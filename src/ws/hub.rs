use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use crate::model::UserNotification;

pub type ConnectionId = u64;

struct Client {
    id: ConnectionId,
    session_id: String,
    tx: mpsc::UnboundedSender<String>,
}

/// Server -> client push messages
#[derive(Debug, Serialize)]
#[serde(tag = "action")]
pub enum PushMessage<'a> {
    #[serde(rename = "UPDATE_NOTIFICATION")]
    UpdateNotification { notification: &'a UserNotification },
}

/// In-memory registry of live WebSocket connections keyed by user id.
///
/// Broadcasting never waits on a peer: each connection drains its own channel,
/// and a connection whose channel is closed is dropped from the registry.
#[derive(Default)]
pub struct WsHub {
    clients: RwLock<HashMap<String, Vec<Client>>>,
    next_id: AtomicU64,
}

impl WsHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for `user_id` authenticated by `session_id`; the receiver
    /// yields serialized frames to write and ends when the connection is dropped here
    pub async fn register(&self, user_id: &str, session_id: &str) -> (ConnectionId, mpsc::UnboundedReceiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::unbounded_channel();
        self.clients
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .push(Client {
                id,
                session_id: session_id.to_string(),
                tx,
            });
        debug!(user_id, connection_id = id, "websocket client registered");
        (id, rx)
    }

    pub async fn unregister(&self, user_id: &str, connection_id: ConnectionId) {
        let mut clients = self.clients.write().await;
        if let Some(list) = clients.get_mut(user_id) {
            list.retain(|c| c.id != connection_id);
            if list.is_empty() {
                clients.remove(user_id);
            }
        }
        debug!(user_id, connection_id, "websocket client unregistered");
    }

    /// Drop every connection opened with `session_id`, e.g. on logout
    pub async fn disconnect_session(&self, session_id: &str) -> usize {
        let mut clients = self.clients.write().await;
        let mut dropped = 0;
        clients.retain(|_, list| {
            let before = list.len();
            list.retain(|c| c.session_id != session_id);
            dropped += before - list.len();
            !list.is_empty()
        });
        if dropped > 0 {
            debug!(session_id, dropped, "websocket clients disconnected with their session");
        }
        dropped
    }

    /// Drop every connection of `user_id`, e.g. when the account is deleted
    pub async fn disconnect_user(&self, user_id: &str) -> usize {
        let dropped = self.clients.write().await.remove(user_id).map_or(0, |list| list.len());
        if dropped > 0 {
            debug!(user_id, dropped, "websocket clients disconnected with their user");
        }
        dropped
    }

    pub async fn connection_count(&self, user_id: &str) -> usize {
        self.clients.read().await.get(user_id).map_or(0, Vec::len)
    }

    /// Best-effort send to every live connection of `user_id`. Returns how many
    /// connections accepted the frame; an offline user simply gets nothing.
    pub async fn send_to_user<T: Serialize>(&self, user_id: &str, message: &T) -> usize {
        let frame = match serde_json::to_string(message) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(user_id, "dropping unserializable websocket message: {}", e);
                return 0;
            }
        };

        let mut clients = self.clients.write().await;
        let Some(list) = clients.get_mut(user_id) else {
            return 0;
        };

        let before = list.len();
        list.retain(|c| c.tx.send(frame.clone()).is_ok());
        let delivered = list.len();
        if delivered < before {
            debug!(user_id, dropped = before - delivered, "dropped dead websocket clients");
        }
        if list.is_empty() {
            clients.remove(user_id);
        }
        delivered
    }

    pub async fn broadcast_user_notification(&self, notification: &UserNotification) -> usize {
        let message = PushMessage::UpdateNotification { notification };
        self.send_to_user(&notification.target_user_id, &message).await
    }
}
