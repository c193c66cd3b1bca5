//! Driver eligibility: the pure evaluation, the engine that applies it, and the daily batch.

pub mod domain;
pub mod repository;
pub mod rules;
mod scheduler;
mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    AnnualLicenseRequest, Driver, DriverEligibilityUpdate, DriverLeave, DriverLicense,
    DriverStatusCode, DriverUid, Eligibility,
};
pub use repository::DriverRepository;
pub use rules::{evaluate, EligibilityResult, InactiveReason, ReplacementPromotion};
pub use scheduler::EligibilityScheduler;
pub use service::{
    BatchSummary, DriverEligibilityEngine, EligibilityError, FailedDriver, RecomputeOutcome,
    RecomputeReport, SkipReason,
};
