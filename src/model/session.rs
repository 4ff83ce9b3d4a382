use serde::{Deserialize, Serialize};

use crate::utils::{new_id, now_millis, IdType};

/// Server-side login session; a bearer token is only honored while its session row exists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub create_at: i64,
    pub update_at: i64,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: new_id(IdType::Session),
            user_id: user_id.into(),
            create_at: now,
            update_at: now,
        }
    }

    pub fn is_expired(&self, expiry_hours: u64, now_ms: i64) -> bool {
        let ttl_ms = expiry_hours as i64 * 60 * 60 * 1000;
        self.create_at + ttl_ms <= now_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_measured_from_creation() {
        let s = Session::new("u1");
        assert!(!s.is_expired(1, s.create_at + 1000));
        assert!(s.is_expired(1, s.create_at + 60 * 60 * 1000));
    }
}
