#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};

use board_api::config::AppConfig;
use board_api::database::MemoryStore;
use board_api::server;

/// An in-process server over a fresh in-memory store. Each test gets its own.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
}

pub type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// A registered account and its bearer token
pub struct TestUser {
    pub id: String,
    pub username: String,
    pub token: String,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        Self::start_with(AppConfig::development()).await
    }

    pub async fn start_with(mut config: AppConfig) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        config.server.host = "127.0.0.1".to_string();
        config.server.port = port;
        config.security.enable_audit_logging = false;

        let app = server::build_app(Arc::new(MemoryStore::new()), Arc::new(config));
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test port")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, server::router(app)).await;
        });

        let server = Self {
            port,
            base_url: format!("http://127.0.0.1:{}", port),
            client: reqwest::Client::new(),
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request under `/api/v2` and return status plus decoded JSON body
    pub async fn call(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut request = self.client.request(method, self.url(&format!("/api/v2{}", path)));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    pub async fn get(&self, path: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.call(Method::GET, path, Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.call(Method::POST, path, Some(token), Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.call(Method::DELETE, path, Some(token), None).await
    }

    /// Register `username` (password "password123") and log in
    pub async fn signup(&self, username: &str) -> Result<TestUser> {
        let password = "password123";
        let (status, body) = self
            .call(
                Method::POST,
                "/register",
                None,
                Some(json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": password
                })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "register {} failed: {} {}", username, status, body);
        let id = body["data"]["id"].as_str().context("missing user id")?.to_string();

        let (status, body) = self
            .call(
                Method::POST,
                "/login",
                None,
                Some(json!({"username": username, "password": password})),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "login {} failed: {} {}", username, status, body);
        let token = body["data"]["token"].as_str().context("missing token")?.to_string();

        Ok(TestUser {
            id,
            username: username.to_string(),
            token,
        })
    }

    pub async fn ws_connect(&self) -> Result<WsClient> {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://127.0.0.1:{}/ws", self.port))
            .await
            .context("websocket connect failed")?;
        Ok(ws)
    }

    /// Connect and complete the AUTH handshake, returning the server's reply
    pub async fn ws_auth(&self, token: &str) -> Result<(WsClient, Value)> {
        let mut ws = self.ws_connect().await?;
        ws.send(Message::Text(json!({"action": "AUTH", "token": token}).to_string()))
            .await?;
        let reply = ws_next_json(&mut ws).await?.context("socket closed before AUTH reply")?;
        Ok((ws, reply))
    }
}

/// Next JSON text frame, or `None` once the server closes the socket
pub async fn ws_next_json(ws: &mut WsClient) -> Result<Option<Value>> {
    let deadline = Duration::from_secs(5);
    loop {
        let message = tokio::time::timeout(deadline, ws.next())
            .await
            .context("timed out waiting for websocket frame")?;
        match message {
            Some(Ok(Message::Text(text))) => return Ok(Some(serde_json::from_str(&text)?)),
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return Ok(None),
            Some(Ok(_)) => continue,
        }
    }
}
