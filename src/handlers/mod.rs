// Handlers grouped by security tier:
// public (no auth) -> protected (session auth) -> elevated (session auth + ManageSystem)

pub mod elevated;
pub mod protected;
pub mod public;

use crate::app::SharedApp;
use crate::error::ApiError;
use crate::permissions::Permission;

/// 403 unless `user_id` holds `permission` on the board
pub(crate) async fn require_board_permission(
    app: &SharedApp,
    user_id: &str,
    board_id: &str,
    permission: Permission,
) -> Result<(), ApiError> {
    if app
        .permissions()
        .has_permission_to_board(user_id, board_id, permission)
        .await
    {
        Ok(())
    } else {
        Err(ApiError::forbidden("access denied to board"))
    }
}
