use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::utils::{new_id, now_millis, IdType};

/// What happened to the target user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Assigned,
    Unassigned,
    Mentioned,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Assigned => "assigned",
            NotificationType::Unassigned => "unassigned",
            NotificationType::Mentioned => "mentioned",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assigned" => Ok(NotificationType::Assigned),
            "unassigned" => Ok(NotificationType::Unassigned),
            "mentioned" => Ok(NotificationType::Mentioned),
            other => Err(format!("unknown notification type '{}'", other)),
        }
    }
}

/// A notification addressed to one user about an action another user took on a card.
///
/// Owned exclusively by `target_user_id`; only the read flag changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNotification {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub target_user_id: String,
    #[serde(default)]
    pub actor_user_id: String,
    #[serde(default)]
    pub actor_name: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    #[serde(default)]
    pub card_id: String,
    #[serde(default)]
    pub card_title: String,
    #[serde(default)]
    pub board_id: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub create_at: i64,
    #[serde(default)]
    pub update_at: i64,
}

impl UserNotification {
    pub fn new(
        target_user_id: impl Into<String>,
        actor_user_id: impl Into<String>,
        actor_name: impl Into<String>,
        notification_type: NotificationType,
        card_id: impl Into<String>,
        card_title: impl Into<String>,
        board_id: impl Into<String>,
    ) -> Self {
        let now = now_millis();
        Self {
            id: new_id(IdType::None),
            target_user_id: target_user_id.into(),
            actor_user_id: actor_user_id.into(),
            actor_name: actor_name.into(),
            notification_type,
            card_id: card_id.into(),
            card_title: card_title.into(),
            board_id: board_id.into(),
            read: false,
            create_at: now,
            update_at: now,
        }
    }

    /// Reset server-owned fields before insert
    pub fn stamp(&mut self) {
        let now = now_millis();
        self.id = new_id(IdType::None);
        self.read = false;
        self.create_at = now;
        self.update_at = now;
    }

    /// Names of required fields that are empty
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.target_user_id.trim().is_empty() {
            missing.push("targetUserId");
        }
        if self.card_id.trim().is_empty() {
            missing.push("cardId");
        }
        if self.board_id.trim().is_empty() {
            missing.push("boardId");
        }
        missing
    }
}
