use serde::{Deserialize, Serialize};

use crate::utils::{new_id, now_millis, IdType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub create_at: i64,
    pub update_at: i64,
}

impl User {
    pub fn new(username: impl Into<String>, email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: new_id(IdType::User),
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            create_at: now,
            update_at: now,
        }
    }
}

/// Username rules: 1..=64 chars of `[A-Za-z0-9._-]`
pub fn is_valid_username(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

pub fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_never_serialized() {
        let u = User::new("alice", "alice@example.com", "$argon2id$secret");
        let v = serde_json::to_value(&u).unwrap();
        assert!(v.get("passwordHash").is_none());
        assert_eq!(v["username"], "alice");
    }

    #[test]
    fn validates_usernames_and_emails() {
        assert!(is_valid_username("bob.smith-2"));
        assert!(!is_valid_username(""));
        assert!(!is_valid_username("bob smith"));
        assert!(is_valid_email("a@b.c"));
        assert!(!is_valid_email("nobody"));
        assert!(!is_valid_email("@x"));
    }
}
