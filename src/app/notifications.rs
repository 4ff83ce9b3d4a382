use tracing::debug;

use super::{App, AppResult};
use crate::model::UserNotification;

impl App {
    pub async fn get_user_notifications(&self, user_id: &str, limit: i64) -> AppResult<Vec<UserNotification>> {
        Ok(self.store.get_user_notifications(user_id, limit).await?)
    }

    pub async fn get_unread_notification_count(&self, user_id: &str) -> AppResult<i64> {
        Ok(self.store.get_unread_notification_count(user_id).await?)
    }

    pub async fn mark_notification_as_read(&self, notification_id: &str, user_id: &str) -> AppResult<u64> {
        Ok(self.store.mark_notification_as_read(notification_id, user_id).await?)
    }

    pub async fn mark_all_notifications_as_read(&self, user_id: &str) -> AppResult<u64> {
        Ok(self.store.mark_all_notifications_as_read(user_id).await?)
    }

    pub async fn delete_user_notification(&self, notification_id: &str, user_id: &str) -> AppResult<u64> {
        Ok(self.store.delete_user_notification(notification_id, user_id).await?)
    }

    /// Insert, then push to the target's live connections. Push failures are not errors.
    pub async fn create_and_broadcast_notification(&self, notification: UserNotification) -> AppResult<UserNotification> {
        let created = self.store.create_user_notification(notification).await?;

        let delivered = self.hub.broadcast_user_notification(&created).await;
        debug!(
            notification_id = %created.id,
            target_user_id = %created.target_user_id,
            delivered,
            "notification broadcast"
        );

        Ok(created)
    }
}
