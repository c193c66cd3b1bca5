use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Literal token substituted with the source's request number.
pub const REQUEST_NO_TOKEN: &str = "**request_no**";

/// Which request flow a template belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotifyType {
    #[serde(rename = "request-booking")]
    RequestBooking,
    #[serde(rename = "request-annual-driver")]
    RequestAnnualDriver,
}

impl NotifyType {
    pub const fn label(self) -> &'static str {
        match self {
            NotifyType::RequestBooking => "request-booking",
            NotifyType::RequestAnnualDriver => "request-annual-driver",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim() {
            "request-booking" => Some(NotifyType::RequestBooking),
            "request-annual-driver" => Some(NotifyType::RequestAnnualDriver),
            _ => None,
        }
    }
}

impl fmt::Display for NotifyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Recipient-selection key of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotifyRole {
    #[serde(rename = "vehicle-user")]
    VehicleUser,
    #[serde(rename = "driver")]
    Driver,
    #[serde(rename = "level1-approval")]
    Level1Approval,
    #[serde(rename = "final-approval")]
    FinalApproval,
}

impl NotifyRole {
    pub const fn label(self) -> &'static str {
        match self {
            NotifyRole::VehicleUser => "vehicle-user",
            NotifyRole::Driver => "driver",
            NotifyRole::Level1Approval => "level1-approval",
            NotifyRole::FinalApproval => "final-approval",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim() {
            "vehicle-user" => Some(NotifyRole::VehicleUser),
            "driver" => Some(NotifyRole::Driver),
            "level1-approval" => Some(NotifyRole::Level1Approval),
            "final-approval" => Some(NotifyRole::FinalApproval),
            _ => None,
        }
    }
}

impl fmt::Display for NotifyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TemplateId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NotificationId(pub String);

/// Read-only reference row describing one message per (status, flow, role).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationTemplate {
    pub id: TemplateId,
    pub status_code: String,
    pub notify_type: NotifyType,
    pub notify_role: NotifyRole,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub is_deleted: bool,
}

impl NotificationTemplate {
    /// Plain substring replacement; the body is not a templating language.
    pub fn render(&self, request_no: &str) -> String {
        self.message.replace(REQUEST_NO_TOKEN, request_no)
    }
}

/// Message delivered to one employee. Only `is_read` changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub template_id: TemplateId,
    pub recipient_emp_id: String,
    pub notify_type: NotifyType,
    pub source_id: String,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}

/// Notification as composed by the dispatcher. The store assigns its id on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub template_id: TemplateId,
    pub recipient_emp_id: String,
    pub notify_type: NotifyType,
    pub source_id: String,
    pub title: String,
    pub message: String,
    pub created_at: NaiveDateTime,
}

impl NewNotification {
    /// Unread row carrying the store-assigned id.
    pub fn into_notification(self, id: NotificationId) -> Notification {
        Notification {
            id,
            template_id: self.template_id,
            recipient_emp_id: self.recipient_emp_id,
            notify_type: self.notify_type,
            source_id: self.source_id,
            title: self.title,
            message: self.message,
            is_read: false,
            created_at: self.created_at,
        }
    }
}

/// Projection of a booking or annual-license request with the parties a template can address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationSource {
    pub source_id: String,
    pub request_no: String,
    pub status_code: String,
    pub notify_type: NotifyType,
    pub creator: Option<String>,
    pub driver: Option<String>,
    pub confirmer: Option<String>,
    pub approver: Option<String>,
}

type Resolver = fn(&NotificationSource) -> Option<&str>;

fn creator(source: &NotificationSource) -> Option<&str> {
    source.creator.as_deref()
}

fn driver(source: &NotificationSource) -> Option<&str> {
    source.driver.as_deref()
}

fn confirmer(source: &NotificationSource) -> Option<&str> {
    source.confirmer.as_deref()
}

fn approver(source: &NotificationSource) -> Option<&str> {
    source.approver.as_deref()
}

const BOOKING_RESOLVERS: &[(NotifyRole, Resolver)] = &[
    (NotifyRole::VehicleUser, creator),
    (NotifyRole::Driver, driver),
    (NotifyRole::Level1Approval, confirmer),
    (NotifyRole::FinalApproval, approver),
];

// The annual-license flow has no driver party.
const ANNUAL_DRIVER_RESOLVERS: &[(NotifyRole, Resolver)] = &[
    (NotifyRole::VehicleUser, creator),
    (NotifyRole::Level1Approval, confirmer),
    (NotifyRole::FinalApproval, approver),
];

impl NotificationSource {
    fn resolvers(&self) -> &'static [(NotifyRole, Resolver)] {
        match self.notify_type {
            NotifyType::RequestBooking => BOOKING_RESOLVERS,
            NotifyType::RequestAnnualDriver => ANNUAL_DRIVER_RESOLVERS,
        }
    }

    /// Employee id addressed by `role`, if the flow knows the role and the slot is filled.
    pub fn recipient(&self, role: NotifyRole) -> Option<&str> {
        self.resolvers()
            .iter()
            .find(|(candidate, _)| *candidate == role)
            .and_then(|(_, resolve)| resolve(self))
            .map(str::trim)
            .filter(|emp_id| !emp_id.is_empty())
    }
}
