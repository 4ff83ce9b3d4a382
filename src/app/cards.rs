use tracing::{debug, warn};

use super::{App, AppError, AppResult};
use crate::model::card::mention_candidates;
use crate::model::{Card, CardPatch, NotificationType, User, UserNotification};

impl App {
    pub async fn create_card(&self, board_id: &str, draft: CardPatch, actor: &User) -> AppResult<Card> {
        let card = Card::new(board_id, &actor.id, draft);
        self.store.create_card(&card).await?;
        self.notify_mentions(&card, &[], actor).await;
        Ok(card)
    }

    pub async fn get_card(&self, card_id: &str) -> AppResult<Card> {
        Ok(self.store.get_card(card_id).await?)
    }

    pub async fn get_cards_for_board(&self, board_id: &str) -> AppResult<Vec<Card>> {
        Ok(self.store.get_cards_for_board(board_id).await?)
    }

    pub async fn patch_card(&self, mut card: Card, patch: CardPatch, actor: &User) -> AppResult<Card> {
        let previous_mentions = card.mentions();
        card.apply(patch);
        self.store.update_card(&card).await?;
        self.notify_mentions(&card, &previous_mentions, actor).await;
        Ok(card)
    }

    pub async fn delete_card(&self, card_id: &str) -> AppResult<()> {
        Ok(self.store.delete_card(card_id).await?)
    }

    /// Add `user_id` to the card's assignees and notify them. Re-assigning is a no-op.
    pub async fn assign_card(&self, mut card: Card, user_id: &str, actor: &User) -> AppResult<Card> {
        if self.store.get_member_for_board(&card.board_id, user_id).await?.is_none() {
            return Err(AppError::BadRequest("assignee must be a member of the board".to_string()));
        }
        if card.assignees.iter().any(|a| a == user_id) {
            return Ok(card);
        }

        card.assignees.push(user_id.to_string());
        card.update_at = crate::utils::now_millis();
        self.store.update_card(&card).await?;
        self.notify_card_member(&card, user_id, NotificationType::Assigned, actor).await;
        Ok(card)
    }

    /// Remove `user_id` from the card's assignees and notify them. Not assigned is a no-op.
    pub async fn unassign_card(&self, mut card: Card, user_id: &str, actor: &User) -> AppResult<Card> {
        let before = card.assignees.len();
        card.assignees.retain(|a| a != user_id);
        if card.assignees.len() == before {
            return Ok(card);
        }

        card.update_at = crate::utils::now_millis();
        self.store.update_card(&card).await?;
        self.notify_card_member(&card, user_id, NotificationType::Unassigned, actor).await;
        Ok(card)
    }

    /// Notification side effects never fail the card mutation that caused them
    async fn notify_card_member(&self, card: &Card, target_user_id: &str, kind: NotificationType, actor: &User) {
        if target_user_id == actor.id {
            return;
        }

        let notification = UserNotification::new(
            target_user_id,
            &actor.id,
            &actor.username,
            kind,
            &card.id,
            &card.title,
            &card.board_id,
        );
        if let Err(e) = self.create_and_broadcast_notification(notification).await {
            warn!(card_id = %card.id, target_user_id, "failed to create {} notification: {}", kind, e);
        }
    }

    /// Notify board members newly `@mentioned` in the card text
    async fn notify_mentions(&self, card: &Card, previous: &[String], actor: &User) {
        let mut notified: Vec<String> = Vec::new();

        for token in card.mentions().into_iter().filter(|t| !previous.contains(t)) {
            let Some(user) = self.resolve_mention(&token).await else {
                continue;
            };
            if user.id == actor.id || notified.contains(&user.id) {
                continue;
            }
            match self.store.get_member_for_board(&card.board_id, &user.id).await {
                Ok(Some(_)) => {
                    self.notify_card_member(card, &user.id, NotificationType::Mentioned, actor)
                        .await;
                    notified.push(user.id);
                }
                Ok(None) => debug!(username = %user.username, board_id = %card.board_id, "mentioned user is not a board member"),
                Err(e) => warn!(username = %user.username, "membership lookup failed: {}", e),
            }
        }
    }

    /// The exact username wins over the form with trailing punctuation stripped
    async fn resolve_mention(&self, token: &str) -> Option<User> {
        for username in mention_candidates(token) {
            match self.store.get_user_by_username(username).await {
                Ok(Some(user)) => return Some(user),
                Ok(None) => {}
                Err(e) => {
                    warn!(username, "mention lookup failed: {}", e);
                    return None;
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::app::boards::CreateBoardRequest;
    use crate::config::AppConfig;
    use crate::database::{MemoryStore, Store};
    use crate::model::{BoardMember, BoardRole};
    use crate::ws::WsHub;

    struct Fixture {
        app: App,
        store: Arc<MemoryStore>,
        hub: Arc<WsHub>,
        alice: User,
        bob: User,
        board_id: String,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let hub = Arc::new(WsHub::new());
        let app = App::new(store.clone(), hub.clone(), Arc::new(AppConfig::development()));

        let alice = User::new("alice", "alice@example.com", "h");
        let bob = User::new("bob", "bob@example.com", "h");
        store.create_user(&alice).await.unwrap();
        store.create_user(&bob).await.unwrap();

        let board = app
            .create_board(CreateBoardRequest { title: "BRD1".into(), description: String::new() }, &alice.id)
            .await
            .unwrap();
        store
            .save_member(&BoardMember { board_id: board.id.clone(), user_id: bob.id.clone(), role: BoardRole::Editor })
            .await
            .unwrap();

        Fixture { app, store, hub, alice, bob, board_id: board.id }
    }

    fn titled(title: &str) -> CardPatch {
        CardPatch { title: Some(title.to_string()), ..Default::default() }
    }

    #[tokio::test]
    async fn assigning_creates_and_pushes_notification() {
        let f = fixture().await;
        let (_, mut rx) = f.hub.register(&f.bob.id, "s-bob").await;
        let card = f.app.create_card(&f.board_id, titled("C1"), &f.alice).await.unwrap();

        let card = f.app.assign_card(card, &f.bob.id, &f.alice).await.unwrap();
        assert_eq!(card.assignees, vec![f.bob.id.clone()]);

        let rows = f.store.get_user_notifications(&f.bob.id, 0).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].notification_type, NotificationType::Assigned);
        assert_eq!(rows[0].card_id, card.id);
        assert_eq!(rows[0].board_id, f.board_id);
        assert_eq!(rows[0].actor_name, "alice");
        assert!(!rows[0].read);

        let frame: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(frame["notification"]["id"], rows[0].id.as_str());

        // Assigning again changes nothing
        f.app.assign_card(card, &f.bob.id, &f.alice).await.unwrap();
        assert_eq!(f.store.get_unread_notification_count(&f.bob.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unassign_notifies_only_on_change() {
        let f = fixture().await;
        let card = f.app.create_card(&f.board_id, titled("C1"), &f.alice).await.unwrap();
        let card = f.app.unassign_card(card, &f.bob.id, &f.alice).await.unwrap();
        assert_eq!(f.store.get_unread_notification_count(&f.bob.id).await.unwrap(), 0);

        let card = f.app.assign_card(card, &f.bob.id, &f.alice).await.unwrap();
        let card = f.app.unassign_card(card, &f.bob.id, &f.alice).await.unwrap();
        assert!(card.assignees.is_empty());
        let kinds: Vec<NotificationType> = f
            .store
            .get_user_notifications(&f.bob.id, 0)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.notification_type)
            .collect();
        assert!(kinds.contains(&NotificationType::Unassigned));
        assert_eq!(kinds.len(), 2);
    }

    #[tokio::test]
    async fn self_assignment_is_silent() {
        let f = fixture().await;
        let card = f.app.create_card(&f.board_id, titled("C1"), &f.alice).await.unwrap();
        f.app.assign_card(card, &f.alice.id, &f.alice).await.unwrap();
        assert_eq!(f.store.get_unread_notification_count(&f.alice.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn non_member_cannot_be_assigned() {
        let f = fixture().await;
        let outsider = User::new("zed", "zed@example.com", "h");
        f.store.create_user(&outsider).await.unwrap();
        let card = f.app.create_card(&f.board_id, titled("C1"), &f.alice).await.unwrap();
        assert!(matches!(
            f.app.assign_card(card, &outsider.id, &f.alice).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn only_new_mentions_of_members_notify() {
        let f = fixture().await;
        let outsider = User::new("zed", "zed@example.com", "h");
        f.store.create_user(&outsider).await.unwrap();

        let card = f.app.create_card(&f.board_id, titled("ask @bob and @zed, cc @alice"), &f.alice).await.unwrap();
        assert_eq!(f.store.get_unread_notification_count(&f.bob.id).await.unwrap(), 1);
        assert_eq!(f.store.get_unread_notification_count(&outsider.id).await.unwrap(), 0);
        assert_eq!(f.store.get_unread_notification_count(&f.alice.id).await.unwrap(), 0);

        let patch = CardPatch { description: Some("still @bob".into()), ..Default::default() };
        f.app.patch_card(card, patch, &f.alice).await.unwrap();
        assert_eq!(f.store.get_unread_notification_count(&f.bob.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn mention_prefers_exact_username_with_trailing_dash() {
        let f = fixture().await;
        let bob_dash = User::new("bob-", "bob-dash@example.com", "h");
        f.store.create_user(&bob_dash).await.unwrap();
        f.store
            .save_member(&BoardMember { board_id: f.board_id.clone(), user_id: bob_dash.id.clone(), role: BoardRole::Editor })
            .await
            .unwrap();

        f.app.create_card(&f.board_id, titled("ping @bob-"), &f.alice).await.unwrap();
        assert_eq!(f.store.get_unread_notification_count(&bob_dash.id).await.unwrap(), 1);
        assert_eq!(f.store.get_unread_notification_count(&f.bob.id).await.unwrap(), 0);

        // Sentence punctuation still reaches the plain username
        f.app.create_card(&f.board_id, titled("thanks @bob."), &f.alice).await.unwrap();
        assert_eq!(f.store.get_unread_notification_count(&f.bob.id).await.unwrap(), 1);
    }
}
