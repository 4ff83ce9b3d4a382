use axum::{extract::State, Extension};

use crate::app::users::AuthSession;
use crate::app::SharedApp;
use crate::audit::{AuditLevel, AuditRecord};
use crate::middleware::{ApiPath, ApiResponse, ApiResult, Empty};
use crate::model::User;

/// GET /api/v2/users/me
pub async fn me_get(Extension(auth): Extension<AuthSession>) -> ApiResult<User> {
    Ok(ApiResponse::success(auth.user))
}

/// GET /api/v2/users/:id
pub async fn user_get(
    State(app): State<SharedApp>,
    Extension(_auth): Extension<AuthSession>,
    ApiPath(user_id): ApiPath<String>,
) -> ApiResult<User> {
    Ok(ApiResponse::success(app.get_user(&user_id).await?))
}

/// POST /api/v2/logout - ends the session behind the presented token
pub async fn logout_post(
    State(app): State<SharedApp>,
    Extension(auth): Extension<AuthSession>,
) -> ApiResult<Empty> {
    let mut audit = AuditRecord::new(
        app.config().security.enable_audit_logging,
        AuditLevel::Auth,
        "logout",
        auth.user_id(),
    );
    audit.add_meta("session_id", auth.session.id.clone());

    app.logout(&auth.session.id).await?;

    audit.success();
    Ok(ApiResponse::ok())
}
