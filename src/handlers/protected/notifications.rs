//! Notification inbox of the calling user. Every read or write is scoped to
//! the caller; ids belonging to someone else behave like missing rows.

use axum::{extract::State, Extension};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app::users::AuthSession;
use crate::app::SharedApp;
use crate::audit::{AuditLevel, AuditRecord};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, Empty};
use crate::model::UserNotification;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Kept as text so an unparsable value falls back to the default
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub count: i64,
}

fn resolve_limit(raw: Option<&str>, default: i64) -> i64 {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => default,
        Some(s) => s.parse::<i64>().unwrap_or(default),
    }
}

/// GET /api/v2/notifications?limit=N
pub async fn notifications_get(
    State(app): State<SharedApp>,
    Extension(auth): Extension<AuthSession>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Vec<UserNotification>> {
    let limit = resolve_limit(query.limit.as_deref(), app.config().api.default_notification_limit);

    let mut audit = AuditRecord::new(
        app.config().security.enable_audit_logging,
        AuditLevel::Read,
        "getNotifications",
        auth.user_id(),
    );
    audit.add_meta("limit", limit.to_string());

    let notifications = app.get_user_notifications(auth.user_id(), limit).await?;
    debug!(user_id = auth.user_id(), count = notifications.len(), "GetUserNotifications");

    audit.success();
    Ok(ApiResponse::success(notifications))
}

/// GET /api/v2/notifications/unread-count
pub async fn unread_count_get(
    State(app): State<SharedApp>,
    Extension(auth): Extension<AuthSession>,
) -> ApiResult<UnreadCount> {
    let count = app.get_unread_notification_count(auth.user_id()).await?;
    Ok(ApiResponse::success(UnreadCount { count }))
}

/// POST /api/v2/notifications
///
/// The actor is always the caller; `actorName` falls back to the caller's
/// username. The stored row is pushed to the target's live connections.
pub async fn notification_post(
    State(app): State<SharedApp>,
    Extension(auth): Extension<AuthSession>,
    ApiJson(mut notification): ApiJson<UserNotification>,
) -> ApiResult<UserNotification> {
    let mut audit = AuditRecord::new(
        app.config().security.enable_audit_logging,
        AuditLevel::Modify,
        "createNotification",
        auth.user_id(),
    );

    let missing = notification.missing_fields();
    if !missing.is_empty() {
        return Err(ApiError::validation_error(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }

    notification.actor_user_id = auth.user.id.clone();
    if notification.actor_name.trim().is_empty() {
        notification.actor_name = auth.user.username.clone();
    }

    let created = app.create_and_broadcast_notification(notification).await?;

    audit.add_meta("notification_id", created.id.clone());
    audit.add_meta("target_user_id", created.target_user_id.clone());
    audit.success();
    Ok(ApiResponse::success(created))
}

/// POST /api/v2/notifications/:id/read
pub async fn mark_read_post(
    State(app): State<SharedApp>,
    Extension(auth): Extension<AuthSession>,
    ApiPath(notification_id): ApiPath<String>,
) -> ApiResult<Empty> {
    let mut audit = AuditRecord::new(
        app.config().security.enable_audit_logging,
        AuditLevel::Modify,
        "markNotificationAsRead",
        auth.user_id(),
    );
    audit.add_meta("notification_id", notification_id.clone());

    app.mark_notification_as_read(&notification_id, auth.user_id()).await?;

    audit.success();
    Ok(ApiResponse::ok())
}

/// POST /api/v2/notifications/read-all
pub async fn mark_all_read_post(
    State(app): State<SharedApp>,
    Extension(auth): Extension<AuthSession>,
) -> ApiResult<Empty> {
    let mut audit = AuditRecord::new(
        app.config().security.enable_audit_logging,
        AuditLevel::Modify,
        "markAllNotificationsAsRead",
        auth.user_id(),
    );

    let updated = app.mark_all_notifications_as_read(auth.user_id()).await?;

    audit.add_meta("updated", updated.to_string());
    audit.success();
    Ok(ApiResponse::ok())
}

/// DELETE /api/v2/notifications/:id
pub async fn notification_delete(
    State(app): State<SharedApp>,
    Extension(auth): Extension<AuthSession>,
    ApiPath(notification_id): ApiPath<String>,
) -> ApiResult<Empty> {
    let mut audit = AuditRecord::new(
        app.config().security.enable_audit_logging,
        AuditLevel::Modify,
        "deleteNotification",
        auth.user_id(),
    );
    audit.add_meta("notification_id", notification_id.clone());

    app.delete_user_notification(&notification_id, auth.user_id()).await?;

    audit.success();
    Ok(ApiResponse::ok())
}

#[cfg(test)]
mod tests {
    use super::resolve_limit;

    #[test]
    fn limit_parsing() {
        assert_eq!(resolve_limit(None, 50), 50);
        assert_eq!(resolve_limit(Some(""), 50), 50);
        assert_eq!(resolve_limit(Some("abc"), 50), 50);
        assert_eq!(resolve_limit(Some("10"), 50), 10);
        assert_eq!(resolve_limit(Some("0"), 50), 0);
        assert_eq!(resolve_limit(Some("-1"), 50), -1);
    }
}
