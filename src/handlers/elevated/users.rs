use axum::{body::Bytes, extract::State, Extension};

use super::require_system_admin;
use crate::app::users::{AuthSession, UserUpdate};
use crate::app::SharedApp;
use crate::audit::{AuditLevel, AuditRecord};
use crate::error::ApiError;
use crate::middleware::{ApiPath, ApiResponse, ApiResult, Empty};
use crate::model::User;

/// GET /api/v2/admin/users
pub async fn users_get(
    State(app): State<SharedApp>,
    Extension(auth): Extension<AuthSession>,
) -> ApiResult<Vec<User>> {
    let audit_enabled = app.config().security.enable_audit_logging;
    let mut audit = AuditRecord::new(audit_enabled, AuditLevel::Read, "adminGetUsers", auth.user_id());

    require_system_admin(&app, &auth).await?;
    let users = app.get_all_users().await?;

    audit.add_meta("count", users.len().to_string());
    audit.success();
    Ok(ApiResponse::success(users))
}

/// GET /api/v2/admin/users/:id
pub async fn user_get(
    State(app): State<SharedApp>,
    Extension(auth): Extension<AuthSession>,
    ApiPath(user_id): ApiPath<String>,
) -> ApiResult<User> {
    let audit_enabled = app.config().security.enable_audit_logging;
    let mut audit = AuditRecord::new(audit_enabled, AuditLevel::Read, "adminGetUser", auth.user_id());
    audit.add_meta("target_user_id", user_id.clone());

    require_system_admin(&app, &auth).await?;
    let user = app.get_user(&user_id).await?;

    audit.success();
    Ok(ApiResponse::success(user))
}

/// PUT /api/v2/admin/users/:id
///
/// The body is taken raw and parsed only after the capability check, so a
/// non-admin gets 403 whatever they send.
pub async fn user_put(
    State(app): State<SharedApp>,
    Extension(auth): Extension<AuthSession>,
    ApiPath(user_id): ApiPath<String>,
    body: Bytes,
) -> ApiResult<User> {
    let audit_enabled = app.config().security.enable_audit_logging;
    let mut audit = AuditRecord::new(audit_enabled, AuditLevel::Modify, "adminUpdateUser", auth.user_id());
    audit.add_meta("target_user_id", user_id.clone());

    require_system_admin(&app, &auth).await?;

    let update: UserUpdate =
        serde_json::from_slice(&body).map_err(|e| ApiError::invalid_json(format!("Invalid JSON: {}", e)))?;
    let user = app.update_user(&user_id, update).await?;

    audit.success();
    Ok(ApiResponse::success(user))
}

/// DELETE /api/v2/admin/users/:id - an admin cannot delete their own account
pub async fn user_delete(
    State(app): State<SharedApp>,
    Extension(auth): Extension<AuthSession>,
    ApiPath(user_id): ApiPath<String>,
) -> ApiResult<Empty> {
    let audit_enabled = app.config().security.enable_audit_logging;
    let mut audit = AuditRecord::new(audit_enabled, AuditLevel::Modify, "adminDeleteUser", auth.user_id());
    audit.add_meta("target_user_id", user_id.clone());

    require_system_admin(&app, &auth).await?;

    if user_id == auth.user_id() {
        return Err(ApiError::bad_request("cannot delete your own account"));
    }
    app.delete_user(&user_id).await?;

    audit.success();
    Ok(ApiResponse::ok())
}
