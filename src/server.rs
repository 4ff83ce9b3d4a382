//! Router assembly and the HTTP server loop.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    map_response_body::MapResponseBodyLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::app::{App, SharedApp};
use crate::config::AppConfig;
use crate::database::Store;
use crate::handlers::{elevated, protected, public};
use crate::middleware::session_required;
use crate::ws::{ws_handler, WsHub};

/// Wire a store and configuration into the shared application state
pub fn build_app(store: Arc<dyn Store>, config: Arc<AppConfig>) -> SharedApp {
    Arc::new(App::new(store, Arc::new(WsHub::new()), config))
}

pub fn router(app: SharedApp) -> Router {
    let max_body = app.config().api.max_request_size_bytes;
    let cors = cors_layer(&app.config().security.cors_origins);

    Router::new()
        .route("/hello", get(public::hello_get))
        .route("/ping", get(public::ping_get))
        .route("/health", get(public::health_get))
        .route("/ws", get(ws_handler))
        .nest("/api/v2", api_routes(app.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(MapResponseBodyLayer::new(axum::body::Body::new))
                .layer(RequestBodyLimitLayer::new(max_body)),
        )
        .layer(DefaultBodyLimit::max(max_body))
        .with_state(app)
}

fn api_routes(app: SharedApp) -> Router<SharedApp> {
    Router::new()
        .route("/register", post(public::register_post))
        .route("/login", post(public::login_post))
        .merge(protected_routes(app))
}

fn protected_routes(app: SharedApp) -> Router<SharedApp> {
    use elevated::users as admin;
    use protected::{boards, cards, notifications, users};

    Router::new()
        // Session
        .route("/logout", post(users::logout_post))
        .route("/users/me", get(users::me_get))
        .route("/users/:user_id", get(users::user_get))
        // Notifications
        .route(
            "/notifications",
            get(notifications::notifications_get).post(notifications::notification_post),
        )
        .route("/notifications/unread-count", get(notifications::unread_count_get))
        .route("/notifications/read-all", post(notifications::mark_all_read_post))
        .route("/notifications/:notification_id/read", post(notifications::mark_read_post))
        .route("/notifications/:notification_id", delete(notifications::notification_delete))
        // Boards and members
        .route("/boards", get(boards::boards_get).post(boards::board_post))
        .route(
            "/boards/:board_id",
            get(boards::board_get)
                .patch(boards::board_patch)
                .delete(boards::board_delete),
        )
        .route(
            "/boards/:board_id/members",
            get(boards::members_get).post(boards::member_post),
        )
        .route("/boards/:board_id/members/:user_id", delete(boards::member_delete))
        // Cards
        .route("/boards/:board_id/cards", get(cards::cards_get).post(cards::card_post))
        .route(
            "/cards/:card_id",
            get(cards::card_get).patch(cards::card_patch).delete(cards::card_delete),
        )
        .route(
            "/cards/:card_id/assignees/:user_id",
            post(cards::assignee_post).delete(cards::assignee_delete),
        )
        // System administration
        .route("/admin/users", get(admin::users_get))
        .route(
            "/admin/users/:user_id",
            get(admin::user_get).put(admin::user_put).delete(admin::user_delete),
        )
        .route_layer(from_fn_with_state(app, session_required))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Bind and serve until Ctrl-C
pub async fn serve(app: SharedApp) -> anyhow::Result<()> {
    let server = &app.config().server;
    let bind_addr = format!("{}:{}", server.host, server.port);
    let addr: SocketAddr = bind_addr
        .parse()
        .with_context(|| format!("invalid listen address {}", bind_addr))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("board-api listening on http://{}", addr);

    axum::serve(listener, router(app))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_router() -> Router {
        let app = build_app(Arc::new(MemoryStore::new()), Arc::new(AppConfig::development()));
        router(app)
    }

    #[tokio::test]
    async fn hello_is_public() {
        let response = test_router()
            .oneshot(Request::builder().uri("/hello").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_routes_need_a_token() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/api/v2/notifications")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v2/login")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
