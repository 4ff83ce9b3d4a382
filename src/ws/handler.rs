use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::app::users::AuthSession;
use crate::app::SharedApp;
use crate::utils::now_millis;

/// Client -> server messages
#[derive(Debug, Deserialize)]
#[serde(tag = "action")]
enum ClientMessage {
    #[serde(rename = "AUTH")]
    Auth { token: String },
}

/// GET /ws - upgrade, then expect an AUTH message before anything is pushed
pub async fn ws_handler(State(app): State<SharedApp>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(app, socket))
}

async fn handle_socket(app: SharedApp, mut socket: WebSocket) {
    let timeout = Duration::from_secs(app.config().websocket.auth_timeout_secs);

    let auth = match tokio::time::timeout(timeout, authenticate(&app, &mut socket)).await {
        Ok(Some(auth)) => auth,
        Ok(None) => {
            let _ = socket
                .send(Message::Text(json!({"action": "AUTH", "success": false}).to_string()))
                .await;
            let _ = socket.close().await;
            return;
        }
        Err(_) => {
            debug!("websocket closed: no AUTH within {:?}", timeout);
            let _ = socket.close().await;
            return;
        }
    };

    // Registered before the reply so no push after the client sees success is missed
    let user_id = auth.user.id.clone();
    let (connection_id, mut frames) = app.hub().register(&user_id, &auth.session.id).await;

    if socket
        .send(Message::Text(json!({"action": "AUTH", "success": true}).to_string()))
        .await
        .is_err()
    {
        app.hub().unregister(&user_id, connection_id).await;
        return;
    }
    info!(user_id = %user_id, connection_id, "websocket client authenticated");

    let (mut sink, mut stream) = socket.split();
    let (control_tx, mut control_rx) = mpsc::unbounded_channel::<Message>();

    // Writer: pushes from the hub plus control replies from the reader
    let mut writer = tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                frame = frames.recv() => match frame {
                    Some(frame) => Message::Text(frame),
                    None => break,
                },
                control = control_rx.recv() => match control {
                    Some(message) => message,
                    None => break,
                },
            };
            if sink.send(message).await.is_err() {
                return;
            }
        }
        // The hub dropped this connection (logout, expiry, account removal)
        let _ = sink.send(Message::Close(None)).await;
    });

    let mut reader = tokio::spawn(async move {
        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Ping(payload)) => {
                    if control_tx.send(Message::Pong(payload)).is_err() {
                        break;
                    }
                }
                Ok(Message::Close(_)) => break,
                Ok(Message::Text(text)) => debug!("ignoring websocket message after AUTH: {}", text),
                Ok(_) => {}
                Err(e) => {
                    debug!("websocket read error: {}", e);
                    break;
                }
            }
        }
    });

    let ttl_ms = app.config().security.session_expiry_hours as i64 * 60 * 60 * 1000;
    let remaining_ms = (auth.session.create_at + ttl_ms - now_millis()).max(0) as u64;
    let session_expiry = tokio::time::sleep(Duration::from_millis(remaining_ms));

    // Either side finishing, or the session running out, ends the connection
    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
        _ = session_expiry => {
            debug!(user_id = %user_id, connection_id, "websocket session expired");
            app.hub().disconnect_session(&auth.session.id).await;
            let _ = (&mut writer).await;
            reader.abort();
        }
    }

    app.hub().unregister(&user_id, connection_id).await;
}

/// Read messages until a valid AUTH arrives. `None` means the token was rejected
/// or the socket went away first.
async fn authenticate(app: &SharedApp, socket: &mut WebSocket) -> Option<AuthSession> {
    while let Some(message) = socket.recv().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Ping(payload)) => {
                if socket.send(Message::Pong(payload)).await.is_err() {
                    return None;
                }
                continue;
            }
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        };

        match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::Auth { token }) => {
                return match app.authenticate(&token).await {
                    Ok(auth) => Some(auth),
                    Err(e) => {
                        warn!("websocket AUTH rejected: {}", e);
                        None
                    }
                };
            }
            Err(e) => debug!("ignoring websocket message before AUTH: {}", e),
        }
    }
    None
}
