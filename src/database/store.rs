use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Board, BoardMember, Card, Session, User, UserNotification};

/// Errors from the data-access layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        StoreError::NotFound(what.into())
    }
}

/// Persistence seam for every entity. Each method is one logical statement;
/// mutations scoped to an owner report the number of rows they touched.
#[async_trait]
pub trait Store: Send + Sync {
    /// Short backend name reported by `/ping`
    fn kind(&self) -> &'static str;

    async fn health_check(&self) -> Result<(), StoreError>;

    // Users
    async fn create_user(&self, user: &User) -> Result<(), StoreError>;
    async fn get_user(&self, user_id: &str) -> Result<User, StoreError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn get_all_users(&self) -> Result<Vec<User>, StoreError>;
    /// Oldest account by creation time
    async fn get_first_user(&self) -> Result<Option<User>, StoreError>;
    async fn user_count(&self) -> Result<i64, StoreError>;
    async fn update_user(&self, user: &User) -> Result<(), StoreError>;
    async fn update_user_password(&self, user_id: &str, password_hash: &str, update_at: i64) -> Result<(), StoreError>;
    async fn delete_user(&self, user_id: &str) -> Result<(), StoreError>;

    // Sessions
    async fn create_session(&self, session: &Session) -> Result<(), StoreError>;
    async fn get_session(&self, session_id: &str) -> Result<Option<Session>, StoreError>;
    async fn delete_session(&self, session_id: &str) -> Result<(), StoreError>;

    // Boards and membership
    async fn create_board(&self, board: &Board) -> Result<(), StoreError>;
    async fn get_board(&self, board_id: &str) -> Result<Board, StoreError>;
    async fn get_boards_for_user(&self, user_id: &str) -> Result<Vec<Board>, StoreError>;
    async fn update_board(&self, board: &Board) -> Result<(), StoreError>;
    async fn delete_board(&self, board_id: &str) -> Result<(), StoreError>;
    /// Insert or replace the member's role
    async fn save_member(&self, member: &BoardMember) -> Result<(), StoreError>;
    async fn get_member_for_board(&self, board_id: &str, user_id: &str) -> Result<Option<BoardMember>, StoreError>;
    async fn get_members_for_board(&self, board_id: &str) -> Result<Vec<BoardMember>, StoreError>;
    async fn delete_member(&self, board_id: &str, user_id: &str) -> Result<u64, StoreError>;

    // Cards
    async fn create_card(&self, card: &Card) -> Result<(), StoreError>;
    async fn get_card(&self, card_id: &str) -> Result<Card, StoreError>;
    async fn get_cards_for_board(&self, board_id: &str) -> Result<Vec<Card>, StoreError>;
    async fn update_card(&self, card: &Card) -> Result<(), StoreError>;
    async fn delete_card(&self, card_id: &str) -> Result<(), StoreError>;

    // User notifications
    /// Assigns a fresh id and timestamps, clears the read flag, inserts, returns the stored row
    async fn create_user_notification(&self, notification: UserNotification) -> Result<UserNotification, StoreError>;
    /// Newest first; `limit <= 0` means no limit
    async fn get_user_notifications(&self, user_id: &str, limit: i64) -> Result<Vec<UserNotification>, StoreError>;
    async fn get_unread_notification_count(&self, user_id: &str) -> Result<i64, StoreError>;
    async fn mark_notification_as_read(&self, notification_id: &str, user_id: &str) -> Result<u64, StoreError>;
    async fn mark_all_notifications_as_read(&self, user_id: &str) -> Result<u64, StoreError>;
    async fn delete_user_notification(&self, notification_id: &str, user_id: &str) -> Result<u64, StoreError>;
}
