use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::utils::{new_id, now_millis, IdType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub created_by: String,
    pub create_at: i64,
    pub update_at: i64,
}

impl Board {
    pub fn new(title: impl Into<String>, description: impl Into<String>, created_by: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: new_id(IdType::Board),
            title: title.into(),
            description: description.into(),
            created_by: created_by.into(),
            create_at: now,
            update_at: now,
        }
    }

    pub fn apply(&mut self, patch: BoardPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        self.update_at = now_millis();
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Membership role, ordered from most to least privileged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardRole {
    Admin,
    Editor,
    Commenter,
    Viewer,
}

impl BoardRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoardRole::Admin => "admin",
            BoardRole::Editor => "editor",
            BoardRole::Commenter => "commenter",
            BoardRole::Viewer => "viewer",
        }
    }
}

impl fmt::Display for BoardRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoardRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(BoardRole::Admin),
            "editor" => Ok(BoardRole::Editor),
            "commenter" => Ok(BoardRole::Commenter),
            "viewer" => Ok(BoardRole::Viewer),
            other => Err(format!("unknown board role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardMember {
    pub board_id: String,
    pub user_id: String,
    pub role: BoardRole,
}
