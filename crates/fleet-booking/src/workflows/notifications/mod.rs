//! Status-driven notification fan-out for booking and annual-license requests.

mod dispatcher;
pub mod domain;
pub mod repository;
mod templates;


pub use dispatcher::{
    DispatchReport, FailedTemplate, NotificationDispatcher, NotificationError,
    StatusChangeNotifier,
};
pub use domain::{
    NewNotification, Notification, NotificationId, NotificationSource, NotificationTemplate,
    NotifyRole, NotifyType, TemplateId, REQUEST_NO_TOKEN,
};
pub use repository::{
    NotificationRepository, NotificationSourceRepository, NotificationTemplateRepository,
};
pub use templates::{TemplateImportError, TemplateImporter};
