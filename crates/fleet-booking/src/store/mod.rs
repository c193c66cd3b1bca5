//! Persistence gateway shared by every workflow.

mod memory;

pub use memory::InMemoryFleetStore;

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record changed since it was read")]
    StaleWrite,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
