//! Application layer: a thin pass-through over the store that also owns the
//! websocket fan-out and the card-membership notification rule.

pub mod boards;
pub mod cards;
pub mod notifications;
pub mod users;

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::AppConfig;
use crate::database::{Store, StoreError};
use crate::permissions::PermissionService;
use crate::ws::WsHub;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type AppResult<T> = Result<T, AppError>;

/// Router state shared by every handler
pub type SharedApp = Arc<App>;

/// Build/version information reported by `/ping`
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMetadata {
    pub version: String,
    pub edition: String,
    pub db_type: String,
}

pub struct App {
    store: Arc<dyn Store>,
    hub: Arc<WsHub>,
    permissions: PermissionService,
    config: Arc<AppConfig>,
    /// Held across the user count and the insert while registration is closed
    bootstrap: Mutex<()>,
}

impl App {
    pub fn new(store: Arc<dyn Store>, hub: Arc<WsHub>, config: Arc<AppConfig>) -> Self {
        let permissions = PermissionService::new(store.clone());
        Self {
            store,
            hub,
            permissions,
            config,
            bootstrap: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn permissions(&self) -> &PermissionService {
        &self.permissions
    }

    pub fn hub(&self) -> &Arc<WsHub> {
        &self.hub
    }

    pub async fn health_check(&self) -> Result<(), StoreError> {
        self.store.health_check().await
    }

    pub fn server_metadata(&self) -> ServerMetadata {
        ServerMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            edition: "standalone".to_string(),
            db_type: self.store.kind().to_string(),
        }
    }
}
