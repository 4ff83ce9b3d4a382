use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{postgres::PgRow, types::Json, PgPool, Row};
use tracing::{error, warn};

use super::store::{Store, StoreError};
use crate::model::{Board, BoardMember, BoardRole, Card, NotificationType, Session, User, UserNotification};

const USER_COLUMNS: &str = "id, username, email, password_hash, create_at, update_at";
const BOARD_COLUMNS: &str = "id, title, description, created_by, create_at, update_at";
const CARD_COLUMNS: &str =
    "id, board_id, title, description, properties, assignees, created_by, create_at, update_at";
const NOTIFICATION_COLUMNS: &str = "id, target_user_id, actor_user_id, actor_name, type, card_id, \
     card_title, board_id, is_read, create_at, update_at";

/// Postgres-backed store
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Translate constraint violations into domain errors
fn map_write_error(err: sqlx::Error, what: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::Conflict(what.to_string());
        }
        if db.is_foreign_key_violation() {
            return StoreError::NotFound(format!("{} references a missing record", what));
        }
    }
    StoreError::Sqlx(err)
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        create_at: row.try_get("create_at")?,
        update_at: row.try_get("update_at")?,
    })
}

fn board_from_row(row: &PgRow) -> Result<Board, sqlx::Error> {
    Ok(Board {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        created_by: row.try_get("created_by")?,
        create_at: row.try_get("create_at")?,
        update_at: row.try_get("update_at")?,
    })
}

fn member_from_row(row: &PgRow) -> Result<BoardMember, sqlx::Error> {
    let role: String = row.try_get("role")?;
    Ok(BoardMember {
        board_id: row.try_get("board_id")?,
        user_id: row.try_get("user_id")?,
        role: role.parse::<BoardRole>().map_err(|e| sqlx::Error::Decode(e.into()))?,
    })
}

fn card_from_row(row: &PgRow) -> Result<Card, sqlx::Error> {
    let Json(properties): Json<Map<String, Value>> = row.try_get("properties")?;
    Ok(Card {
        id: row.try_get("id")?,
        board_id: row.try_get("board_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        properties,
        assignees: row.try_get("assignees")?,
        created_by: row.try_get("created_by")?,
        create_at: row.try_get("create_at")?,
        update_at: row.try_get("update_at")?,
    })
}

fn notification_from_row(row: &PgRow) -> Result<UserNotification, sqlx::Error> {
    let kind: String = row.try_get("type")?;
    Ok(UserNotification {
        id: row.try_get("id")?,
        target_user_id: row.try_get("target_user_id")?,
        actor_user_id: row.try_get("actor_user_id")?,
        actor_name: row.try_get("actor_name")?,
        notification_type: kind.parse::<NotificationType>().map_err(|e| sqlx::Error::Decode(e.into()))?,
        card_id: row.try_get("card_id")?,
        card_title: row.try_get("card_title")?,
        board_id: row.try_get("board_id")?,
        read: row.try_get("is_read")?,
        create_at: row.try_get("create_at")?,
        update_at: row.try_get("update_at")?,
    })
}

#[async_trait]
impl Store for PgStore {
    fn kind(&self) -> &'static str {
        "postgres"
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, create_at, update_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.create_at)
        .bind(user.update_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "username"))?;
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<User, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query(&sql).bind(user_id).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => Ok(user_from_row(&row)?),
            None => Err(StoreError::not_found(format!("user {}", user_id))),
        }
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        let row = sqlx::query(&sql).bind(username).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn get_all_users(&self) -> Result<Vec<User>, StoreError> {
        let sql = format!("SELECT {} FROM users ORDER BY create_at ASC", USER_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(user_from_row).collect::<Result<_, _>>()?)
    }

    async fn get_first_user(&self) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users ORDER BY create_at ASC, id ASC LIMIT 1", USER_COLUMNS);
        let row = sqlx::query(&sql).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn user_count(&self) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users").fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET username = $2, email = $3, update_at = $4 WHERE id = $1")
            .bind(&user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(user.update_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "username"))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!("user {}", user.id)));
        }
        Ok(())
    }

    async fn update_user_password(&self, user_id: &str, password_hash: &str, update_at: i64) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET password_hash = $2, update_at = $3 WHERE id = $1")
            .bind(user_id)
            .bind(password_hash)
            .bind(update_at)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!("user {}", user_id)));
        }
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!("user {}", user_id)));
        }
        Ok(())
    }

    async fn create_session(&self, session: &Session) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO sessions (id, user_id, create_at, update_at) VALUES ($1, $2, $3, $4)")
            .bind(&session.id)
            .bind(&session.user_id)
            .bind(session.create_at)
            .bind(session.update_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "session"))?;
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        let row = sqlx::query("SELECT id, user_id, create_at, update_at FROM sessions WHERE id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;
        let session = match row {
            Some(row) => Some(Session {
                id: row.try_get("id")?,
                user_id: row.try_get("user_id")?,
                create_at: row.try_get("create_at")?,
                update_at: row.try_get("update_at")?,
            }),
            None => None,
        };
        Ok(session)
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_board(&self, board: &Board) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO boards (id, title, description, created_by, create_at, update_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&board.id)
        .bind(&board.title)
        .bind(&board.description)
        .bind(&board.created_by)
        .bind(board.create_at)
        .bind(board.update_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "board"))?;
        Ok(())
    }

    async fn get_board(&self, board_id: &str) -> Result<Board, StoreError> {
        let sql = format!("SELECT {} FROM boards WHERE id = $1", BOARD_COLUMNS);
        let row = sqlx::query(&sql).bind(board_id).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => Ok(board_from_row(&row)?),
            None => Err(StoreError::not_found(format!("board {}", board_id))),
        }
    }

    async fn get_boards_for_user(&self, user_id: &str) -> Result<Vec<Board>, StoreError> {
        let sql = format!(
            "SELECT {} FROM boards WHERE id IN (SELECT board_id FROM board_members WHERE user_id = $1) \
             ORDER BY create_at ASC",
            BOARD_COLUMNS
        );
        let rows = sqlx::query(&sql).bind(user_id).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(board_from_row).collect::<Result<_, _>>()?)
    }

    async fn update_board(&self, board: &Board) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE boards SET title = $2, description = $3, update_at = $4 WHERE id = $1")
            .bind(&board.id)
            .bind(&board.title)
            .bind(&board.description)
            .bind(board.update_at)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!("board {}", board.id)));
        }
        Ok(())
    }

    async fn delete_board(&self, board_id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM boards WHERE id = $1")
            .bind(board_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!("board {}", board_id)));
        }
        Ok(())
    }

    async fn save_member(&self, member: &BoardMember) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO board_members (board_id, user_id, role) VALUES ($1, $2, $3) \
             ON CONFLICT (board_id, user_id) DO UPDATE SET role = EXCLUDED.role",
        )
        .bind(&member.board_id)
        .bind(&member.user_id)
        .bind(member.role.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "board member"))?;
        Ok(())
    }

    async fn get_member_for_board(&self, board_id: &str, user_id: &str) -> Result<Option<BoardMember>, StoreError> {
        let row = sqlx::query("SELECT board_id, user_id, role FROM board_members WHERE board_id = $1 AND user_id = $2")
            .bind(board_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(member_from_row).transpose()?)
    }

    async fn get_members_for_board(&self, board_id: &str) -> Result<Vec<BoardMember>, StoreError> {
        let rows = sqlx::query("SELECT board_id, user_id, role FROM board_members WHERE board_id = $1 ORDER BY user_id")
            .bind(board_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(member_from_row).collect::<Result<_, _>>()?)
    }

    async fn delete_member(&self, board_id: &str, user_id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM board_members WHERE board_id = $1 AND user_id = $2")
            .bind(board_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn create_card(&self, card: &Card) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO cards (id, board_id, title, description, properties, assignees, created_by, create_at, update_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(&card.id)
        .bind(&card.board_id)
        .bind(&card.title)
        .bind(&card.description)
        .bind(Json(&card.properties))
        .bind(&card.assignees)
        .bind(&card.created_by)
        .bind(card.create_at)
        .bind(card.update_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "card"))?;
        Ok(())
    }

    async fn get_card(&self, card_id: &str) -> Result<Card, StoreError> {
        let sql = format!("SELECT {} FROM cards WHERE id = $1", CARD_COLUMNS);
        let row = sqlx::query(&sql).bind(card_id).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => Ok(card_from_row(&row)?),
            None => Err(StoreError::not_found(format!("card {}", card_id))),
        }
    }

    async fn get_cards_for_board(&self, board_id: &str) -> Result<Vec<Card>, StoreError> {
        let sql = format!("SELECT {} FROM cards WHERE board_id = $1 ORDER BY create_at ASC", CARD_COLUMNS);
        let rows = sqlx::query(&sql).bind(board_id).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(card_from_row).collect::<Result<_, _>>()?)
    }

    async fn update_card(&self, card: &Card) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE cards SET title = $2, description = $3, properties = $4, assignees = $5, update_at = $6 \
             WHERE id = $1",
        )
        .bind(&card.id)
        .bind(&card.title)
        .bind(&card.description)
        .bind(Json(&card.properties))
        .bind(&card.assignees)
        .bind(card.update_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!("card {}", card.id)));
        }
        Ok(())
    }

    async fn delete_card(&self, card_id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM cards WHERE id = $1")
            .bind(card_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!("card {}", card_id)));
        }
        Ok(())
    }

    async fn create_user_notification(&self, mut notification: UserNotification) -> Result<UserNotification, StoreError> {
        notification.stamp();

        let sql = format!(
            "INSERT INTO user_notifications ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            NOTIFICATION_COLUMNS
        );
        sqlx::query(&sql)
            .bind(&notification.id)
            .bind(&notification.target_user_id)
            .bind(&notification.actor_user_id)
            .bind(&notification.actor_name)
            .bind(notification.notification_type.as_str())
            .bind(&notification.card_id)
            .bind(&notification.card_title)
            .bind(&notification.board_id)
            .bind(notification.read)
            .bind(notification.create_at)
            .bind(notification.update_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!(target_user_id = %notification.target_user_id, "Cannot create user notification: {}", e);
                map_write_error(e, "notification")
            })?;

        Ok(notification)
    }

    async fn get_user_notifications(&self, user_id: &str, limit: i64) -> Result<Vec<UserNotification>, StoreError> {
        let rows = if limit > 0 {
            let sql = format!(
                "SELECT {} FROM user_notifications WHERE target_user_id = $1 ORDER BY create_at DESC LIMIT $2",
                NOTIFICATION_COLUMNS
            );
            sqlx::query(&sql).bind(user_id).bind(limit).fetch_all(&self.pool).await?
        } else {
            let sql = format!(
                "SELECT {} FROM user_notifications WHERE target_user_id = $1 ORDER BY create_at DESC",
                NOTIFICATION_COLUMNS
            );
            sqlx::query(&sql).bind(user_id).fetch_all(&self.pool).await?
        };
        Ok(rows.iter().map(notification_from_row).collect::<Result<_, _>>()?)
    }

    async fn get_unread_notification_count(&self, user_id: &str) -> Result<i64, StoreError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM user_notifications WHERE target_user_id = $1 AND is_read = FALSE")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn mark_notification_as_read(&self, notification_id: &str, user_id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE user_notifications SET is_read = TRUE, update_at = $3 WHERE id = $1 AND target_user_id = $2",
        )
        .bind(notification_id)
        .bind(user_id)
        .bind(crate::utils::now_millis())
        .execute(&self.pool)
        .await?;

        let count = result.rows_affected();
        if count == 0 {
            warn!(notification_id, user_id, "notification not found or already read");
        }
        Ok(count)
    }

    async fn mark_all_notifications_as_read(&self, user_id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE user_notifications SET is_read = TRUE, update_at = $2 WHERE target_user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .bind(crate::utils::now_millis())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_user_notification(&self, notification_id: &str, user_id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM user_notifications WHERE id = $1 AND target_user_id = $2")
            .bind(notification_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
