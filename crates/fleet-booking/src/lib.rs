//! Booking lifecycle, driver eligibility, and status-driven notifications for an
//! organizational vehicle fleet.
//!
//! The crate owns the decision logic only. Persistence is reached through the repository
//! traits declared beside each workflow; [`store::InMemoryFleetStore`] implements all of them
//! for the service binary, demos, and tests.

pub mod clock;
pub mod config;
pub mod error;
pub mod store;
pub mod telemetry;
pub mod workflows;

pub use clock::{Clock, FixedClock, SystemClock};
