// Elevated handlers: session auth plus the system-wide ManageSystem capability.

pub mod users;

use crate::app::users::AuthSession;
use crate::app::SharedApp;
use crate::error::ApiError;
use crate::permissions::Permission;

/// 403 unless the caller administers the system
pub(crate) async fn require_system_admin(app: &SharedApp, auth: &AuthSession) -> Result<(), ApiError> {
    if app
        .permissions()
        .has_permission_to(auth.user_id(), Permission::ManageSystem)
        .await
    {
        Ok(())
    } else {
        Err(ApiError::forbidden("permission denied"))
    }
}
