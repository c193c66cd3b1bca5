//! Booking request intake, approval progression, handoff, and return inspection.

pub mod audit;
pub mod domain;
pub mod registry;
pub mod repository;
mod service;

#[cfg(test)]
mod tests;

pub use audit::{AuditLogRepository, AuditLogger, LogEntry};
pub use domain::{
    ActionStamp, Actor, ActorRole, ActorSnapshot, ApprovalScope, AssignedDriver, BookingRequest,
    BookingView, LifecycleAction, NewBookingRequest, RequestId,
};
pub use registry::{BookingStatus, StatusRegistry, TransitionRejection, TransitionRule};
pub use repository::BookingRepository;
pub use service::{LifecycleError, RequestLifecycle, TransitionCommand, TransitionOutcome};
