use serde::Deserialize;

use super::{App, AppError, AppResult};
use crate::model::{Board, BoardMember, BoardPatch, BoardRole};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBoardRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRequest {
    pub user_id: String,
    pub role: BoardRole,
}

impl App {
    /// Create a board with the caller as its admin member
    pub async fn create_board(&self, request: CreateBoardRequest, user_id: &str) -> AppResult<Board> {
        if request.title.trim().is_empty() {
            return Err(AppError::BadRequest("title is required".to_string()));
        }

        let board = Board::new(request.title.trim(), request.description, user_id);
        self.store.create_board(&board).await?;
        self.store
            .save_member(&BoardMember {
                board_id: board.id.clone(),
                user_id: user_id.to_string(),
                role: BoardRole::Admin,
            })
            .await?;
        Ok(board)
    }

    pub async fn get_board(&self, board_id: &str) -> AppResult<Board> {
        Ok(self.store.get_board(board_id).await?)
    }

    pub async fn get_boards_for_user(&self, user_id: &str) -> AppResult<Vec<Board>> {
        Ok(self.store.get_boards_for_user(user_id).await?)
    }

    pub async fn patch_board(&self, board_id: &str, patch: BoardPatch) -> AppResult<Board> {
        if matches!(&patch.title, Some(t) if t.trim().is_empty()) {
            return Err(AppError::BadRequest("title cannot be empty".to_string()));
        }
        let mut board = self.store.get_board(board_id).await?;
        board.apply(patch);
        self.store.update_board(&board).await?;
        Ok(board)
    }

    pub async fn delete_board(&self, board_id: &str) -> AppResult<()> {
        Ok(self.store.delete_board(board_id).await?)
    }

    pub async fn get_members_for_board(&self, board_id: &str) -> AppResult<Vec<BoardMember>> {
        Ok(self.store.get_members_for_board(board_id).await?)
    }

    pub async fn save_member(&self, board_id: &str, request: MemberRequest) -> AppResult<BoardMember> {
        let member = BoardMember {
            board_id: board_id.to_string(),
            user_id: request.user_id,
            role: request.role,
        };
        self.store.get_user(&member.user_id).await?;
        if member.role != BoardRole::Admin {
            self.ensure_other_admin(board_id, &member.user_id).await?;
        }
        self.store.save_member(&member).await?;
        Ok(member)
    }

    /// Remove a member; a board always keeps at least one admin
    pub async fn delete_member(&self, board_id: &str, user_id: &str) -> AppResult<u64> {
        self.ensure_other_admin(board_id, user_id).await?;
        Ok(self.store.delete_member(board_id, user_id).await?)
    }

    /// Fails when `user_id` is the board's only admin
    async fn ensure_other_admin(&self, board_id: &str, user_id: &str) -> AppResult<()> {
        let members = self.store.get_members_for_board(board_id).await?;
        let is_admin = members
            .iter()
            .any(|m| m.user_id == user_id && m.role == BoardRole::Admin);
        let admins = members.iter().filter(|m| m.role == BoardRole::Admin).count();
        if is_admin && admins == 1 {
            return Err(AppError::BadRequest("a board must keep at least one admin".to_string()));
        }
        Ok(())
    }
}
