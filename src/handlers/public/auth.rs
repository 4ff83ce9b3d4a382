use axum::extract::State;
use serde::Serialize;

use crate::app::users::{LoginRequest, RegisterRequest};
use crate::app::SharedApp;
use crate::audit::{AuditLevel, AuditRecord};
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::model::User;

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// POST /api/v2/register - create an account
///
/// Open when public registration is enabled; otherwise only the very first
/// account (the future system admin) may be created this way.
pub async fn register_post(
    State(app): State<SharedApp>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<User> {
    let mut audit = AuditRecord::new(
        app.config().security.enable_audit_logging,
        AuditLevel::Auth,
        "register",
        "",
    );
    audit.add_meta("username", request.username.clone());

    let user = app.register_user(request).await?;

    audit.add_meta("user_id", user.id.clone());
    audit.success();
    Ok(ApiResponse::created(user))
}

/// POST /api/v2/login - exchange credentials for a bearer token
pub async fn login_post(
    State(app): State<SharedApp>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let mut audit = AuditRecord::new(
        app.config().security.enable_audit_logging,
        AuditLevel::Auth,
        "login",
        "",
    );
    audit.add_meta("username", request.username.clone());

    let (token, user) = app.login(request).await?;

    audit.add_meta("user_id", user.id.clone());
    audit.success();
    Ok(ApiResponse::success(LoginResponse { token, user }))
}
