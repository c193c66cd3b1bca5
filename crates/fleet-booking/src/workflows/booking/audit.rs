use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::domain::{Actor, ActorRole, RequestId};
use super::registry::BookingStatus;
use crate::clock::Clock;
use crate::store::RepositoryError;

/// Immutable record of one status-changing action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub request_id: RequestId,
    pub status: BookingStatus,
    pub remark: Option<String>,
    pub actor_emp_id: String,
    pub actor_role: ActorRole,
    pub created_at: NaiveDateTime,
}

/// Append-only storage for lifecycle log rows.
pub trait AuditLogRepository: Send + Sync {
    fn append(&self, entry: LogEntry) -> Result<(), RepositoryError>;
    /// Rows for one request in insertion order.
    fn entries_for(&self, request_id: &RequestId) -> Result<Vec<LogEntry>, RepositoryError>;
    /// Most recent row for `request_id` carrying `status`.
    fn latest_with_status(
        &self,
        request_id: &RequestId,
        status: BookingStatus,
    ) -> Result<Option<LogEntry>, RepositoryError>;
}

/// Writes and queries the lifecycle audit trail.
pub struct AuditLogger<L> {
    log: Arc<L>,
    clock: Arc<dyn Clock>,
}

impl<L> AuditLogger<L>
where
    L: AuditLogRepository,
{
    pub fn new(log: Arc<L>, clock: Arc<dyn Clock>) -> Self {
        Self { log, clock }
    }

    pub fn append(
        &self,
        request_id: &RequestId,
        status: BookingStatus,
        remark: Option<String>,
        actor: &Actor,
    ) -> Result<LogEntry, RepositoryError> {
        let entry = LogEntry {
            request_id: request_id.clone(),
            status,
            remark,
            actor_emp_id: actor.emp_id.clone(),
            actor_role: actor.role,
            created_at: self.clock.now(),
        };
        self.log.append(entry.clone())?;
        Ok(entry)
    }

    pub fn history(&self, request_id: &RequestId) -> Result<Vec<LogEntry>, RepositoryError> {
        self.log.entries_for(request_id)
    }

    /// Role that canceled the request, recovered from the latest cancel row.
    pub fn cancel_role(
        &self,
        request_id: &RequestId,
    ) -> Result<Option<ActorRole>, RepositoryError> {
        Ok(self
            .log
            .latest_with_status(request_id, BookingStatus::Canceled)?
            .map(|entry| entry.actor_role))
    }
}
