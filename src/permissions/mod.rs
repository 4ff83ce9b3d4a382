use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::error;

use crate::database::Store;
use crate::model::BoardRole;

/// Capabilities checked by route handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ManageSystem,
    ViewBoard,
    CommentBoardCards,
    ManageBoardCards,
    ManageBoardProperties,
    ManageBoardRoles,
    DeleteBoard,
}

impl Permission {
    /// Whether a member holding `role` has this board capability
    pub fn granted_to(self, role: BoardRole) -> bool {
        use BoardRole::*;
        match self {
            Permission::ManageBoardRoles | Permission::DeleteBoard => role == Admin,
            Permission::ManageBoardCards | Permission::ManageBoardProperties => matches!(role, Admin | Editor),
            Permission::CommentBoardCards => matches!(role, Admin | Editor | Commenter),
            Permission::ViewBoard => true,
            Permission::ManageSystem => false,
        }
    }
}

/// Standalone permission policy: the first registered user administers the system,
/// board capabilities follow the caller's membership role.
pub struct PermissionService {
    store: Arc<dyn Store>,
    first_user_id: RwLock<Option<String>>,
}

impl PermissionService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            first_user_id: RwLock::new(None),
        }
    }

    pub async fn has_permission_to(&self, user_id: &str, permission: Permission) -> bool {
        if permission != Permission::ManageSystem || user_id.is_empty() {
            return false;
        }
        match self.first_user_id().await {
            Some(first) => first == user_id,
            None => false,
        }
    }

    pub async fn has_permission_to_board(&self, user_id: &str, board_id: &str, permission: Permission) -> bool {
        if user_id.is_empty() || board_id.is_empty() {
            return false;
        }

        match self.store.get_member_for_board(board_id, user_id).await {
            Ok(Some(member)) => permission.granted_to(member.role),
            Ok(None) => false,
            Err(e) => {
                error!(board_id, user_id, "error getting member for board: {}", e);
                false
            }
        }
    }

    /// Cached once an account exists; an empty system is re-checked on every call
    async fn first_user_id(&self) -> Option<String> {
        if let Some(id) = self.first_user_id.read().await.as_ref() {
            return Some(id.clone());
        }

        let first = match self.store.get_first_user().await {
            Ok(first) => first?,
            Err(e) => {
                error!("error loading first user: {}", e);
                return None;
            }
        };

        let mut cached = self.first_user_id.write().await;
        Some(cached.get_or_insert(first.id).clone())
    }

    /// Forget the cached admin, e.g. after that account is removed
    pub async fn reset(&self) {
        *self.first_user_id.write().await = None;
    }
}
