use axum::{extract::State, Extension};

use crate::handlers::require_board_permission;
use crate::app::boards::{CreateBoardRequest, MemberRequest};
use crate::app::users::AuthSession;
use crate::app::SharedApp;
use crate::audit::{AuditLevel, AuditRecord};
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult, Empty};
use crate::model::{Board, BoardMember, BoardPatch};
use crate::permissions::Permission;

/// GET /api/v2/boards - boards the caller is a member of
pub async fn boards_get(
    State(app): State<SharedApp>,
    Extension(auth): Extension<AuthSession>,
) -> ApiResult<Vec<Board>> {
    Ok(ApiResponse::success(app.get_boards_for_user(auth.user_id()).await?))
}

/// POST /api/v2/boards - the creator becomes the board's admin
pub async fn board_post(
    State(app): State<SharedApp>,
    Extension(auth): Extension<AuthSession>,
    ApiJson(request): ApiJson<CreateBoardRequest>,
) -> ApiResult<Board> {
    let mut audit = AuditRecord::new(
        app.config().security.enable_audit_logging,
        AuditLevel::Modify,
        "createBoard",
        auth.user_id(),
    );

    let board = app.create_board(request, auth.user_id()).await?;

    audit.add_meta("board_id", board.id.clone());
    audit.success();
    Ok(ApiResponse::created(board))
}

/// GET /api/v2/boards/:board_id
pub async fn board_get(
    State(app): State<SharedApp>,
    Extension(auth): Extension<AuthSession>,
    ApiPath(board_id): ApiPath<String>,
) -> ApiResult<Board> {
    require_board_permission(&app, auth.user_id(), &board_id, Permission::ViewBoard).await?;
    Ok(ApiResponse::success(app.get_board(&board_id).await?))
}

/// PATCH /api/v2/boards/:board_id
pub async fn board_patch(
    State(app): State<SharedApp>,
    Extension(auth): Extension<AuthSession>,
    ApiPath(board_id): ApiPath<String>,
    ApiJson(patch): ApiJson<BoardPatch>,
) -> ApiResult<Board> {
    require_board_permission(&app, auth.user_id(), &board_id, Permission::ManageBoardProperties).await?;

    let mut audit = AuditRecord::new(
        app.config().security.enable_audit_logging,
        AuditLevel::Modify,
        "patchBoard",
        auth.user_id(),
    );
    audit.add_meta("board_id", board_id.clone());

    let board = app.patch_board(&board_id, patch).await?;

    audit.success();
    Ok(ApiResponse::success(board))
}

/// DELETE /api/v2/boards/:board_id - removes members and cards with it
pub async fn board_delete(
    State(app): State<SharedApp>,
    Extension(auth): Extension<AuthSession>,
    ApiPath(board_id): ApiPath<String>,
) -> ApiResult<Empty> {
    require_board_permission(&app, auth.user_id(), &board_id, Permission::DeleteBoard).await?;

    let mut audit = AuditRecord::new(
        app.config().security.enable_audit_logging,
        AuditLevel::Modify,
        "deleteBoard",
        auth.user_id(),
    );
    audit.add_meta("board_id", board_id.clone());

    app.delete_board(&board_id).await?;

    audit.success();
    Ok(ApiResponse::ok())
}

/// GET /api/v2/boards/:board_id/members
pub async fn members_get(
    State(app): State<SharedApp>,
    Extension(auth): Extension<AuthSession>,
    ApiPath(board_id): ApiPath<String>,
) -> ApiResult<Vec<BoardMember>> {
    require_board_permission(&app, auth.user_id(), &board_id, Permission::ViewBoard).await?;
    Ok(ApiResponse::success(app.get_members_for_board(&board_id).await?))
}

/// POST /api/v2/boards/:board_id/members - add a member or change their role
pub async fn member_post(
    State(app): State<SharedApp>,
    Extension(auth): Extension<AuthSession>,
    ApiPath(board_id): ApiPath<String>,
    ApiJson(request): ApiJson<MemberRequest>,
) -> ApiResult<BoardMember> {
    require_board_permission(&app, auth.user_id(), &board_id, Permission::ManageBoardRoles).await?;

    let mut audit = AuditRecord::new(
        app.config().security.enable_audit_logging,
        AuditLevel::Modify,
        "saveMember",
        auth.user_id(),
    );
    audit.add_meta("board_id", board_id.clone());
    audit.add_meta("member_id", request.user_id.clone());
    audit.add_meta("role", request.role.as_str());

    let member = app.save_member(&board_id, request).await?;

    audit.success();
    Ok(ApiResponse::success(member))
}

/// DELETE /api/v2/boards/:board_id/members/:user_id
pub async fn member_delete(
    State(app): State<SharedApp>,
    Extension(auth): Extension<AuthSession>,
    ApiPath((board_id, user_id)): ApiPath<(String, String)>,
) -> ApiResult<Empty> {
    require_board_permission(&app, auth.user_id(), &board_id, Permission::ManageBoardRoles).await?;

    let mut audit = AuditRecord::new(
        app.config().security.enable_audit_logging,
        AuditLevel::Modify,
        "deleteMember",
        auth.user_id(),
    );
    audit.add_meta("board_id", board_id.clone());
    audit.add_meta("member_id", user_id.clone());

    app.delete_member(&board_id, &user_id).await?;

    audit.success();
    Ok(ApiResponse::ok())
}
