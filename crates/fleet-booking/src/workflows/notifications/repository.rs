use super::domain::{
    NewNotification, Notification, NotificationId, NotificationSource, NotificationTemplate,
    NotifyType,
};
use crate::store::RepositoryError;

/// Reference data lookup for message templates.
pub trait NotificationTemplateRepository: Send + Sync {
    /// Non-deleted templates matching the status code and flow.
    fn templates_for(
        &self,
        status_code: &str,
        notify_type: NotifyType,
    ) -> Result<Vec<NotificationTemplate>, RepositoryError>;
}

/// Inbox storage for created notifications.
pub trait NotificationRepository: Send + Sync {
    /// Stores the notification under a fresh id that no existing row uses.
    fn create(&self, notification: NewNotification) -> Result<Notification, RepositoryError>;
    /// Flags the notification as read. Returns `false` when it was already read.
    fn mark_read(&self, id: &NotificationId) -> Result<bool, RepositoryError>;
    fn unread_for(&self, emp_id: &str) -> Result<Vec<Notification>, RepositoryError>;
}

/// Resolves the record a dispatch call is about.
pub trait NotificationSourceRepository: Send + Sync {
    fn fetch_source(
        &self,
        source_id: &str,
        notify_type: NotifyType,
    ) -> Result<Option<NotificationSource>, RepositoryError>;
}
