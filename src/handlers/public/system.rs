use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::app::{SharedApp, ServerMetadata};
use crate::middleware::{ApiResponse, ApiResult};

/// GET /hello - plain-text greeting
pub async fn hello_get() -> &'static str {
    "Hello"
}

/// GET /ping - build and backend metadata
pub async fn ping_get(State(app): State<SharedApp>) -> ApiResult<ServerMetadata> {
    Ok(ApiResponse::success(app.server_metadata()))
}

/// GET /health - store reachability
pub async fn health_get(State(app): State<SharedApp>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match app.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
