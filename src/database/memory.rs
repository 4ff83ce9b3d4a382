use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::warn;

use super::store::{Store, StoreError};
use crate::model::{Board, BoardMember, Card, Session, User, UserNotification};
use crate::utils::now_millis;

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    sessions: HashMap<String, Session>,
    boards: HashMap<String, Board>,
    members: HashMap<(String, String), BoardMember>,
    cards: HashMap<String, Card>,
    notifications: HashMap<String, UserNotification>,
}

/// Process-local store with the same observable semantics as `PgStore`,
/// including cascading deletes. Used by tests and `serve --in-memory`.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        if t.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict("username".to_string()));
        }
        t.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<User, StoreError> {
        let t = self.tables.read().await;
        t.users
            .get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("user {}", user_id)))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let t = self.tables.read().await;
        Ok(t.users.values().find(|u| u.username == username).cloned())
    }

    async fn get_all_users(&self) -> Result<Vec<User>, StoreError> {
        let t = self.tables.read().await;
        let mut users: Vec<User> = t.users.values().cloned().collect();
        users.sort_by(|a, b| a.create_at.cmp(&b.create_at).then_with(|| a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn get_first_user(&self) -> Result<Option<User>, StoreError> {
        Ok(self.get_all_users().await?.into_iter().next())
    }

    async fn user_count(&self) -> Result<i64, StoreError> {
        Ok(self.tables.read().await.users.len() as i64)
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        if t.users.values().any(|u| u.username == user.username && u.id != user.id) {
            return Err(StoreError::Conflict("username".to_string()));
        }
        let stored = t
            .users
            .get_mut(&user.id)
            .ok_or_else(|| StoreError::not_found(format!("user {}", user.id)))?;
        stored.username = user.username.clone();
        stored.email = user.email.clone();
        stored.update_at = user.update_at;
        Ok(())
    }

    async fn update_user_password(&self, user_id: &str, password_hash: &str, update_at: i64) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        let stored = t
            .users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::not_found(format!("user {}", user_id)))?;
        stored.password_hash = password_hash.to_string();
        stored.update_at = update_at;
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        if t.users.remove(user_id).is_none() {
            return Err(StoreError::not_found(format!("user {}", user_id)));
        }
        t.sessions.retain(|_, s| s.user_id != user_id);
        t.members.retain(|(_, member), _| member != user_id);
        t.notifications.retain(|_, n| n.target_user_id != user_id);
        Ok(())
    }

    async fn create_session(&self, session: &Session) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        if !t.users.contains_key(&session.user_id) {
            return Err(StoreError::not_found("session references a missing record"));
        }
        t.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.tables.read().await.sessions.get(session_id).cloned())
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), StoreError> {
        self.tables.write().await.sessions.remove(session_id);
        Ok(())
    }

    async fn create_board(&self, board: &Board) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        if t.boards.contains_key(&board.id) {
            return Err(StoreError::Conflict("board".to_string()));
        }
        t.boards.insert(board.id.clone(), board.clone());
        Ok(())
    }

    async fn get_board(&self, board_id: &str) -> Result<Board, StoreError> {
        let t = self.tables.read().await;
        t.boards
            .get(board_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("board {}", board_id)))
    }

    async fn get_boards_for_user(&self, user_id: &str) -> Result<Vec<Board>, StoreError> {
        let t = self.tables.read().await;
        let mut boards: Vec<Board> = t
            .members
            .values()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| t.boards.get(&m.board_id).cloned())
            .collect();
        boards.sort_by_key(|b| b.create_at);
        Ok(boards)
    }

    async fn update_board(&self, board: &Board) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        let stored = t
            .boards
            .get_mut(&board.id)
            .ok_or_else(|| StoreError::not_found(format!("board {}", board.id)))?;
        stored.title = board.title.clone();
        stored.description = board.description.clone();
        stored.update_at = board.update_at;
        Ok(())
    }

    async fn delete_board(&self, board_id: &str) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        if t.boards.remove(board_id).is_none() {
            return Err(StoreError::not_found(format!("board {}", board_id)));
        }
        t.members.retain(|(board, _), _| board != board_id);
        t.cards.retain(|_, c| c.board_id != board_id);
        Ok(())
    }

    async fn save_member(&self, member: &BoardMember) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        if !t.boards.contains_key(&member.board_id) || !t.users.contains_key(&member.user_id) {
            return Err(StoreError::not_found("board member references a missing record"));
        }
        t.members
            .insert((member.board_id.clone(), member.user_id.clone()), member.clone());
        Ok(())
    }

    async fn get_member_for_board(&self, board_id: &str, user_id: &str) -> Result<Option<BoardMember>, StoreError> {
        let t = self.tables.read().await;
        Ok(t.members.get(&(board_id.to_string(), user_id.to_string())).cloned())
    }

    async fn get_members_for_board(&self, board_id: &str) -> Result<Vec<BoardMember>, StoreError> {
        let t = self.tables.read().await;
        let mut members: Vec<BoardMember> = t.members.values().filter(|m| m.board_id == board_id).cloned().collect();
        members.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(members)
    }

    async fn delete_member(&self, board_id: &str, user_id: &str) -> Result<u64, StoreError> {
        let mut t = self.tables.write().await;
        let removed = t.members.remove(&(board_id.to_string(), user_id.to_string()));
        Ok(removed.map_or(0, |_| 1))
    }

    async fn create_card(&self, card: &Card) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        if !t.boards.contains_key(&card.board_id) {
            return Err(StoreError::not_found("card references a missing record"));
        }
        t.cards.insert(card.id.clone(), card.clone());
        Ok(())
    }

    async fn get_card(&self, card_id: &str) -> Result<Card, StoreError> {
        let t = self.tables.read().await;
        t.cards
            .get(card_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("card {}", card_id)))
    }

    async fn get_cards_for_board(&self, board_id: &str) -> Result<Vec<Card>, StoreError> {
        let t = self.tables.read().await;
        let mut cards: Vec<Card> = t.cards.values().filter(|c| c.board_id == board_id).cloned().collect();
        cards.sort_by_key(|c| c.create_at);
        Ok(cards)
    }

    async fn update_card(&self, card: &Card) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        match t.cards.get_mut(&card.id) {
            Some(stored) => {
                *stored = card.clone();
                Ok(())
            }
            None => Err(StoreError::not_found(format!("card {}", card.id))),
        }
    }

    async fn delete_card(&self, card_id: &str) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        match t.cards.remove(card_id) {
            Some(_) => Ok(()),
            None => Err(StoreError::not_found(format!("card {}", card_id))),
        }
    }

    async fn create_user_notification(&self, mut notification: UserNotification) -> Result<UserNotification, StoreError> {
        notification.stamp();
        let mut t = self.tables.write().await;
        if !t.users.contains_key(&notification.target_user_id) {
            return Err(StoreError::not_found("notification references a missing record"));
        }
        t.notifications.insert(notification.id.clone(), notification.clone());
        Ok(notification)
    }

    async fn get_user_notifications(&self, user_id: &str, limit: i64) -> Result<Vec<UserNotification>, StoreError> {
        let t = self.tables.read().await;
        let mut rows: Vec<UserNotification> = t
            .notifications
            .values()
            .filter(|n| n.target_user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.create_at.cmp(&a.create_at));
        if limit > 0 {
            rows.truncate(limit as usize);
        }
        Ok(rows)
    }

    async fn get_unread_notification_count(&self, user_id: &str) -> Result<i64, StoreError> {
        let t = self.tables.read().await;
        Ok(t.notifications
            .values()
            .filter(|n| n.target_user_id == user_id && !n.read)
            .count() as i64)
    }

    async fn mark_notification_as_read(&self, notification_id: &str, user_id: &str) -> Result<u64, StoreError> {
        let mut t = self.tables.write().await;
        match t.notifications.get_mut(notification_id) {
            Some(n) if n.target_user_id == user_id => {
                n.read = true;
                n.update_at = now_millis();
                Ok(1)
            }
            _ => {
                warn!(notification_id, user_id, "notification not found or already read");
                Ok(0)
            }
        }
    }

    async fn mark_all_notifications_as_read(&self, user_id: &str) -> Result<u64, StoreError> {
        let mut t = self.tables.write().await;
        let now = now_millis();
        let mut count = 0;
        for n in t.notifications.values_mut() {
            if n.target_user_id == user_id && !n.read {
                n.read = true;
                n.update_at = now;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn delete_user_notification(&self, notification_id: &str, user_id: &str) -> Result<u64, StoreError> {
        let mut t = self.tables.write().await;
        let owned = t
            .notifications
            .get(notification_id)
            .map_or(false, |n| n.target_user_id == user_id);
        if owned {
            t.notifications.remove(notification_id);
            return Ok(1);
        }
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NotificationType;

    async fn store_with_users(names: &[&str]) -> (MemoryStore, Vec<User>) {
        let store = MemoryStore::new();
        let mut users = Vec::new();
        for name in names {
            let user = User::new(*name, format!("{}@example.com", name), "hash");
            store.create_user(&user).await.unwrap();
            users.push(user);
        }
        (store, users)
    }

    fn notification_for(target: &str) -> UserNotification {
        UserNotification::new(target, "actor", "Actor", NotificationType::Assigned, "c1", "Card", "b1")
    }

    #[tokio::test]
    async fn created_notifications_get_unique_ids() {
        let (store, users) = store_with_users(&["bob"]).await;
        let a = store.create_user_notification(notification_for(&users[0].id)).await.unwrap();
        let b = store.create_user_notification(notification_for(&users[0].id)).await.unwrap();
        assert!(!a.id.is_empty());
        assert_ne!(a.id, b.id);
        assert!(!a.read);
    }

    #[tokio::test]
    async fn mark_read_on_missing_notification_is_a_noop() {
        let (store, users) = store_with_users(&["bob"]).await;
        let affected = store.mark_notification_as_read("nope", &users[0].id).await.unwrap();
        assert_eq!(affected, 0);
    }

    #[tokio::test]
    async fn mark_all_read_only_touches_owner_rows() {
        let (store, users) = store_with_users(&["bob", "carol"]).await;
        let (bob, carol) = (&users[0].id, &users[1].id);
        for _ in 0..3 {
            store.create_user_notification(notification_for(bob)).await.unwrap();
        }
        store.create_user_notification(notification_for(carol)).await.unwrap();

        assert_eq!(store.mark_all_notifications_as_read(bob).await.unwrap(), 3);
        assert_eq!(store.get_unread_notification_count(bob).await.unwrap(), 0);
        assert_eq!(store.get_unread_notification_count(carol).await.unwrap(), 1);
        assert!(store.get_user_notifications(bob, 0).await.unwrap().iter().all(|n| n.read));
    }

    #[tokio::test]
    async fn delete_is_scoped_to_owner() {
        let (store, users) = store_with_users(&["bob", "carol"]).await;
        let n = store.create_user_notification(notification_for(&users[0].id)).await.unwrap();

        assert_eq!(store.delete_user_notification(&n.id, &users[1].id).await.unwrap(), 0);
        assert_eq!(store.get_user_notifications(&users[0].id, 0).await.unwrap().len(), 1);

        assert_eq!(store.delete_user_notification(&n.id, &users[0].id).await.unwrap(), 1);
        assert!(store.get_user_notifications(&users[0].id, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_user_cascades() {
        let (store, users) = store_with_users(&["bob"]).await;
        let bob = &users[0];
        let session = Session::new(&bob.id);
        store.create_session(&session).await.unwrap();
        store.create_user_notification(notification_for(&bob.id)).await.unwrap();

        store.delete_user(&bob.id).await.unwrap();
        assert!(store.get_session(&session.id).await.unwrap().is_none());
        assert_eq!(store.get_unread_notification_count(&bob.id).await.unwrap(), 0);
        assert!(matches!(store.delete_user(&bob.id).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let (store, _) = store_with_users(&["bob"]).await;
        let again = User::new("bob", "other@example.com", "hash");
        assert!(matches!(store.create_user(&again).await, Err(StoreError::Conflict(_))));
    }
}
