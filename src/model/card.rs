use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils::{new_id, now_millis, IdType};

/// A work item on a board. `properties` holds the card's typed property values keyed by property id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub board_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub assignees: Vec<String>,
    pub created_by: String,
    pub create_at: i64,
    pub update_at: i64,
}

impl Card {
    pub fn new(board_id: impl Into<String>, created_by: impl Into<String>, draft: CardPatch) -> Self {
        let now = now_millis();
        Self {
            id: new_id(IdType::Card),
            board_id: board_id.into(),
            title: draft.title.unwrap_or_default(),
            description: draft.description.unwrap_or_default(),
            properties: draft.properties.unwrap_or_default(),
            assignees: Vec::new(),
            created_by: created_by.into(),
            create_at: now,
            update_at: now,
        }
    }

    pub fn apply(&mut self, patch: CardPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(properties) = patch.properties {
            for (key, value) in properties {
                if value.is_null() {
                    self.properties.remove(&key);
                } else {
                    self.properties.insert(key, value);
                }
            }
        }
        self.update_at = now_millis();
    }

    /// Usernames referenced as `@name` in the title or description
    pub fn mentions(&self) -> Vec<String> {
        let mut names = extract_mentions(&self.title);
        for name in extract_mentions(&self.description) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

/// Partial card used for both create and patch bodies.
/// A `null` property value in a patch removes that property.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub properties: Option<Map<String, Value>>,
}

/// Pull `@username` tokens out of free text. A mention must start the text or follow
/// a non-word character, so email addresses are not picked up.
///
/// Tokens are returned as written, trailing punctuation included; see
/// [`mention_candidates`] for resolving them to a username.
pub fn extract_mentions(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let boundary = i == 0 || !(chars[i - 1].is_alphanumeric() || chars[i - 1] == '_');
        if chars[i] == '@' && boundary {
            let start = i + 1;
            let mut end = start;
            while end < chars.len() && (chars[end].is_ascii_alphanumeric() || matches!(chars[end], '.' | '_' | '-')) {
                end += 1;
            }
            let name: String = chars[start..end].iter().collect();
            if !name.trim_end_matches(['.', '-']).is_empty() && !out.contains(&name) {
                out.push(name);
            }
            i = end.max(start);
        } else {
            i += 1;
        }
    }
    out
}

/// Usernames a mention token may refer to, most specific first. `.` and `-` are
/// legal in usernames, so `@bob-` means `bob-` when that account exists and
/// `bob` followed by punctuation otherwise.
pub fn mention_candidates(token: &str) -> Vec<&str> {
    let trimmed = token.trim_end_matches(['.', '-']);
    if trimmed.is_empty() || trimmed == token {
        vec![token]
    } else {
        vec![token, trimmed]
    }
}
