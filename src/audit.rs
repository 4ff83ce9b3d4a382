//! Audit trail for API mutations and admin reads.
//!
//! A record starts out failed and is written when dropped, so every early
//! return from a handler still leaves an entry. Call [`AuditRecord::success`]
//! once the operation has completed.

use std::collections::BTreeMap;

use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditLevel {
    Read,
    Modify,
    Auth,
}

impl AuditLevel {
    fn as_str(self) -> &'static str {
        match self {
            AuditLevel::Read => "read",
            AuditLevel::Modify => "modify",
            AuditLevel::Auth => "auth",
        }
    }
}

#[derive(Debug)]
pub struct AuditRecord {
    enabled: bool,
    level: AuditLevel,
    event: &'static str,
    user_id: String,
    meta: BTreeMap<&'static str, String>,
    success: bool,
}

impl AuditRecord {
    pub fn new(enabled: bool, level: AuditLevel, event: &'static str, user_id: impl Into<String>) -> Self {
        Self {
            enabled,
            level,
            event,
            user_id: user_id.into(),
            meta: BTreeMap::new(),
            success: false,
        }
    }

    pub fn add_meta(&mut self, key: &'static str, value: impl Into<String>) {
        self.meta.insert(key, value.into());
    }

    pub fn success(&mut self) {
        self.success = true;
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

impl Drop for AuditRecord {
    fn drop(&mut self) {
        if !self.enabled {
            return;
        }
        let status = if self.success { "success" } else { "fail" };
        info!(
            target: "audit",
            audit_level = self.level.as_str(),
            event = self.event,
            user_id = %self.user_id,
            meta = ?self.meta,
            status,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_start_failed() {
        let mut rec = AuditRecord::new(false, AuditLevel::Modify, "deleteNotification", "u1");
        assert!(!rec.is_success());
        rec.add_meta("notificationID", "n1");
        rec.success();
        assert!(rec.is_success());
    }
}
