use axum::{extract::State, Extension};

use crate::handlers::require_board_permission;
use crate::app::users::AuthSession;
use crate::app::SharedApp;
use crate::audit::{AuditLevel, AuditRecord};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult, Empty};
use crate::model::{Card, CardPatch};
use crate::permissions::Permission;

/// Load a card and check the caller's capability on its board
async fn load_card(app: &SharedApp, user_id: &str, card_id: &str, permission: Permission) -> Result<Card, ApiError> {
    let card = app.get_card(card_id).await?;
    require_board_permission(app, user_id, &card.board_id, permission).await?;
    Ok(card)
}

/// GET /api/v2/boards/:board_id/cards
pub async fn cards_get(
    State(app): State<SharedApp>,
    Extension(auth): Extension<AuthSession>,
    ApiPath(board_id): ApiPath<String>,
) -> ApiResult<Vec<Card>> {
    require_board_permission(&app, auth.user_id(), &board_id, Permission::ViewBoard).await?;
    Ok(ApiResponse::success(app.get_cards_for_board(&board_id).await?))
}

/// POST /api/v2/boards/:board_id/cards
pub async fn card_post(
    State(app): State<SharedApp>,
    Extension(auth): Extension<AuthSession>,
    ApiPath(board_id): ApiPath<String>,
    ApiJson(draft): ApiJson<CardPatch>,
) -> ApiResult<Card> {
    require_board_permission(&app, auth.user_id(), &board_id, Permission::ManageBoardCards).await?;

    let mut audit = AuditRecord::new(
        app.config().security.enable_audit_logging,
        AuditLevel::Modify,
        "createCard",
        auth.user_id(),
    );
    audit.add_meta("board_id", board_id.clone());

    let card = app.create_card(&board_id, draft, &auth.user).await?;

    audit.add_meta("card_id", card.id.clone());
    audit.success();
    Ok(ApiResponse::created(card))
}

/// GET /api/v2/cards/:card_id
pub async fn card_get(
    State(app): State<SharedApp>,
    Extension(auth): Extension<AuthSession>,
    ApiPath(card_id): ApiPath<String>,
) -> ApiResult<Card> {
    let card = load_card(&app, auth.user_id(), &card_id, Permission::ViewBoard).await?;
    Ok(ApiResponse::success(card))
}

/// PATCH /api/v2/cards/:card_id
pub async fn card_patch(
    State(app): State<SharedApp>,
    Extension(auth): Extension<AuthSession>,
    ApiPath(card_id): ApiPath<String>,
    ApiJson(patch): ApiJson<CardPatch>,
) -> ApiResult<Card> {
    let card = load_card(&app, auth.user_id(), &card_id, Permission::ManageBoardCards).await?;

    let mut audit = AuditRecord::new(
        app.config().security.enable_audit_logging,
        AuditLevel::Modify,
        "patchCard",
        auth.user_id(),
    );
    audit.add_meta("card_id", card_id);

    let card = app.patch_card(card, patch, &auth.user).await?;

    audit.success();
    Ok(ApiResponse::success(card))
}

/// DELETE /api/v2/cards/:card_id
pub async fn card_delete(
    State(app): State<SharedApp>,
    Extension(auth): Extension<AuthSession>,
    ApiPath(card_id): ApiPath<String>,
) -> ApiResult<Empty> {
    load_card(&app, auth.user_id(), &card_id, Permission::ManageBoardCards).await?;

    let mut audit = AuditRecord::new(
        app.config().security.enable_audit_logging,
        AuditLevel::Modify,
        "deleteCard",
        auth.user_id(),
    );
    audit.add_meta("card_id", card_id.clone());

    app.delete_card(&card_id).await?;

    audit.success();
    Ok(ApiResponse::ok())
}

/// POST /api/v2/cards/:card_id/assignees/:user_id
pub async fn assignee_post(
    State(app): State<SharedApp>,
    Extension(auth): Extension<AuthSession>,
    ApiPath((card_id, user_id)): ApiPath<(String, String)>,
) -> ApiResult<Card> {
    let card = load_card(&app, auth.user_id(), &card_id, Permission::ManageBoardCards).await?;

    let mut audit = AuditRecord::new(
        app.config().security.enable_audit_logging,
        AuditLevel::Modify,
        "assignCard",
        auth.user_id(),
    );
    audit.add_meta("card_id", card_id);
    audit.add_meta("assignee_id", user_id.clone());

    let card = app.assign_card(card, &user_id, &auth.user).await?;

    audit.success();
    Ok(ApiResponse::success(card))
}

/// DELETE /api/v2/cards/:card_id/assignees/:user_id
pub async fn assignee_delete(
    State(app): State<SharedApp>,
    Extension(auth): Extension<AuthSession>,
    ApiPath((card_id, user_id)): ApiPath<(String, String)>,
) -> ApiResult<Card> {
    let card = load_card(&app, auth.user_id(), &card_id, Permission::ManageBoardCards).await?;

    let mut audit = AuditRecord::new(
        app.config().security.enable_audit_logging,
        AuditLevel::Modify,
        "unassignCard",
        auth.user_id(),
    );
    audit.add_meta("card_id", card_id);
    audit.add_meta("assignee_id", user_id.clone());

    let card = app.unassign_card(card, &user_id, &auth.user).await?;

    audit.success();
    Ok(ApiResponse::success(card))
}
