pub mod booking;
pub mod eligibility;
pub mod notifications;
