use super::domain::{BookingRequest, RequestId};
use super::registry::BookingStatus;
use crate::store::RepositoryError;

/// Storage abstraction so the lifecycle can be exercised in isolation.
pub trait BookingRepository: Send + Sync {
    fn insert(&self, request: BookingRequest) -> Result<BookingRequest, RepositoryError>;
    fn fetch(&self, id: &RequestId) -> Result<Option<BookingRequest>, RepositoryError>;
    /// Replaces the stored request only while it still carries `expected`.
    ///
    /// Returns [`RepositoryError::StaleWrite`] when another writer moved the status first.
    fn update_if_status(
        &self,
        expected: BookingStatus,
        request: BookingRequest,
    ) -> Result<(), RepositoryError>;
}
