use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::domain::{NewNotification, Notification, NotificationId, NotifyType, TemplateId};
use super::repository::{
    NotificationRepository, NotificationSourceRepository, NotificationTemplateRepository,
};
use crate::clock::Clock;
use crate::store::RepositoryError;

/// Hook the booking lifecycle calls after a status change.
pub trait StatusChangeNotifier: Send + Sync {
    fn notify(
        &self,
        source_id: &str,
        notify_type: NotifyType,
    ) -> Result<DispatchReport, NotificationError>;
}

/// Outcome of one dispatch call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub created: Vec<NotificationId>,
    /// Templates whose role resolved to no recipient on this source.
    pub skipped: Vec<TemplateId>,
    pub failed: Vec<FailedTemplate>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedTemplate {
    pub template_id: TemplateId,
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("failed to load notification source: {0}")]
    Source(#[source] RepositoryError),
    #[error("failed to load notification templates: {0}")]
    Templates(#[source] RepositoryError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Creates one notification per matching template and resolved recipient.
pub struct NotificationDispatcher<T, N, S> {
    templates: Arc<T>,
    notifications: Arc<N>,
    sources: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<T, N, S> NotificationDispatcher<T, N, S>
where
    T: NotificationTemplateRepository,
    N: NotificationRepository,
    S: NotificationSourceRepository,
{
    pub fn new(
        templates: Arc<T>,
        notifications: Arc<N>,
        sources: Arc<S>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            templates,
            notifications,
            sources,
            clock,
        }
    }

    /// Fans the source's current status out to every matching template.
    ///
    /// A missing source is a silent no-op. A failed insert is recorded against its template
    /// and the remaining templates are still processed.
    pub fn dispatch(
        &self,
        source_id: &str,
        notify_type: NotifyType,
    ) -> Result<DispatchReport, NotificationError> {
        let mut report = DispatchReport::default();

        let Some(source) = self
            .sources
            .fetch_source(source_id, notify_type)
            .map_err(NotificationError::Source)?
        else {
            debug!(source_id, %notify_type, "notification source not found");
            return Ok(report);
        };

        let templates = self
            .templates
            .templates_for(&source.status_code, notify_type)
            .map_err(NotificationError::Templates)?;

        for template in templates.into_iter().filter(|template| !template.is_deleted) {
            let Some(recipient) = source.recipient(template.notify_role) else {
                warn!(
                    template_id = %template.id.0,
                    role = %template.notify_role,
                    source_id,
                    "template role has no recipient on this request"
                );
                report.skipped.push(template.id);
                continue;
            };

            let notification = NewNotification {
                template_id: template.id.clone(),
                recipient_emp_id: recipient.to_string(),
                notify_type,
                source_id: source.source_id.clone(),
                title: template.title.clone(),
                message: template.render(&source.request_no),
                created_at: self.clock.now(),
            };

            match self.notifications.create(notification) {
                Ok(stored) => report.created.push(stored.id),
                Err(err) => {
                    warn!(
                        template_id = %template.id.0,
                        source_id,
                        error = %err,
                        "notification insert failed"
                    );
                    report.failed.push(FailedTemplate {
                        template_id: template.id,
                        error: err.to_string(),
                    });
                }
            }
        }

        debug!(
            source_id,
            status_code = %source.status_code,
            created = report.created.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "notifications dispatched"
        );

        Ok(report)
    }

    pub fn mark_read(&self, id: &NotificationId) -> Result<bool, NotificationError> {
        Ok(self.notifications.mark_read(id)?)
    }

    pub fn unread_for(&self, emp_id: &str) -> Result<Vec<Notification>, NotificationError> {
        Ok(self.notifications.unread_for(emp_id)?)
    }
}

impl<T, N, S> StatusChangeNotifier for NotificationDispatcher<T, N, S>
where
    T: NotificationTemplateRepository,
    N: NotificationRepository,
    S: NotificationSourceRepository,
{
    fn notify(
        &self,
        source_id: &str,
        notify_type: NotifyType,
    ) -> Result<DispatchReport, NotificationError> {
        self.dispatch(source_id, notify_type)
    }
}
