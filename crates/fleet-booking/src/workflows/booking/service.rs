use std::sync::Arc;

use tracing::{error, info, warn};

use super::audit::{AuditLogRepository, AuditLogger, LogEntry};
use super::domain::{
    ActionStamp, Actor, ActorRole, BookingRequest, BookingView, LifecycleAction,
    NewBookingRequest, RequestId,
};
use super::registry::{BookingStatus, StatusRegistry, TransitionRejection};
use super::repository::BookingRepository;
use crate::clock::Clock;
use crate::store::RepositoryError;
use crate::workflows::notifications::{DispatchReport, NotifyType, StatusChangeNotifier};

/// A lifecycle action requested by an actor.
#[derive(Debug, Clone)]
pub struct TransitionCommand {
    pub request_id: RequestId,
    pub action: LifecycleAction,
    pub actor: Actor,
    pub remark: Option<String>,
}

/// Result of an applied transition.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub request: BookingRequest,
    pub from: BookingStatus,
    pub to: BookingStatus,
    pub log_entry: LogEntry,
    /// `None` when the notifier failed before producing a report.
    pub notifications: Option<DispatchReport>,
}

/// Error raised by the booking lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("malformed {0}: value is empty")]
    InvalidIdentifier(&'static str),
    #[error("booking request {0} not found")]
    NotFound(RequestId),
    #[error("cannot {action} a request at status {from}")]
    InvalidTransition {
        action: LifecycleAction,
        from: BookingStatus,
    },
    #[error("role {role} may not {action} this request")]
    Unauthorized {
        action: LifecycleAction,
        role: ActorRole,
    },
    #[error("booking request {0} already exists")]
    AlreadyExists(RequestId),
    #[error("booking request {0} changed concurrently; reload and retry")]
    Conflict(RequestId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("status persisted but audit log write failed: {0}")]
    Audit(#[source] RepositoryError),
}

impl LifecycleError {
    /// Rejected before any write; the caller sent something the lifecycle does not accept.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LifecycleError::InvalidIdentifier(_)
                | LifecycleError::NotFound(_)
                | LifecycleError::AlreadyExists(_)
                | LifecycleError::InvalidTransition { .. }
                | LifecycleError::Unauthorized { .. }
        )
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, LifecycleError::Conflict(_))
    }
}

/// Validates and applies status transitions on booking requests.
pub struct RequestLifecycle<B, L, N> {
    registry: StatusRegistry,
    bookings: Arc<B>,
    audit: AuditLogger<L>,
    notifier: Arc<N>,
    clock: Arc<dyn Clock>,
}

impl<B, L, N> RequestLifecycle<B, L, N>
where
    B: BookingRepository,
    L: AuditLogRepository,
    N: StatusChangeNotifier,
{
    pub fn new(bookings: Arc<B>, log: Arc<L>, notifier: Arc<N>, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: StatusRegistry,
            bookings,
            audit: AuditLogger::new(log, clock.clone()),
            notifier,
            clock,
        }
    }

    pub fn registry(&self) -> &StatusRegistry {
        &self.registry
    }

    /// Records a new request at pending level-1 approval.
    pub fn submit(
        &self,
        draft: NewBookingRequest,
        creator: &Actor,
    ) -> Result<BookingRequest, LifecycleError> {
        require_identifier("request id", draft.request_id.as_str())?;
        require_identifier("request number", &draft.request_no)?;
        require_identifier("actor id", &creator.emp_id)?;

        let now = self.clock.now();
        let status = BookingStatus::PendingLevel1Approval;
        let request = BookingRequest {
            request_id: draft.request_id,
            request_no: draft.request_no,
            status,
            approval_scope: draft.approval_scope,
            vehicle_id: draft.vehicle_id,
            driver: draft.driver,
            reserved_start: draft.reserved_start,
            reserved_end: draft.reserved_end,
            confirmer: draft.confirmer,
            approver: draft.approver,
            created: ActionStamp {
                actor: creator.snapshot(),
                at: now,
                remark: draft.remark.clone(),
            },
            confirmed: None,
            inspected: None,
            approved: None,
            resubmitted: None,
            key_handover: None,
            picked_up: None,
            returned: None,
            return_inspected: None,
            canceled: None,
            updated_at: now,
        };

        let request_id = request.request_id.clone();
        let stored = self.bookings.insert(request).map_err(|err| match err {
            RepositoryError::Conflict => LifecycleError::AlreadyExists(request_id),
            other => LifecycleError::Repository(other),
        })?;
        self.audit
            .append(&stored.request_id, status, draft.remark, creator)
            .map_err(|err| {
                error!(request_id = %stored.request_id, error = %err, "intake audit write failed");
                LifecycleError::Audit(err)
            })?;

        info!(
            request_id = %stored.request_id,
            request_no = %stored.request_no,
            creator = %creator.emp_id,
            "booking request submitted"
        );
        self.notify_best_effort(&stored.request_id);

        Ok(stored)
    }

    /// Applies `command` if the actor's role may perform the action from the current status.
    pub fn transition(
        &self,
        command: TransitionCommand,
    ) -> Result<TransitionOutcome, LifecycleError> {
        let TransitionCommand {
            request_id,
            action,
            actor,
            remark,
        } = command;

        require_identifier("request id", request_id.as_str())?;
        require_identifier("actor id", &actor.emp_id)?;

        let mut request = self
            .bookings
            .fetch(&request_id)?
            .ok_or_else(|| LifecycleError::NotFound(request_id.clone()))?;
        let from = request.status;

        let to = self
            .registry
            .resolve(action, actor.role, request.approval_scope, from)
            .map_err(|rejection| match rejection {
                TransitionRejection::Unauthorized => LifecycleError::Unauthorized {
                    action,
                    role: actor.role,
                },
                TransitionRejection::InvalidSource => {
                    LifecycleError::InvalidTransition { action, from }
                }
            })?;

        let now = self.clock.now();
        request.status = to;
        request.updated_at = now;
        request.record_action(
            action,
            actor.role,
            ActionStamp {
                actor: actor.snapshot(),
                at: now,
                remark: remark.clone(),
            },
        );

        match self.bookings.update_if_status(from, request.clone()) {
            Ok(()) => {}
            Err(RepositoryError::StaleWrite) => {
                warn!(%request_id, %action, %from, "lost status race");
                return Err(LifecycleError::Conflict(request_id));
            }
            Err(err) => return Err(err.into()),
        }

        let log_entry = self
            .audit
            .append(&request_id, to, remark, &actor)
            .map_err(|err| {
                error!(
                    %request_id,
                    status = %to,
                    error = %err,
                    "audit write failed after status change"
                );
                LifecycleError::Audit(err)
            })?;

        info!(
            %request_id,
            %action,
            role = %actor.role,
            actor = %actor.emp_id,
            %from,
            %to,
            "booking status changed"
        );

        let notifications = self.notify_best_effort(&request_id);

        Ok(TransitionOutcome {
            request,
            from,
            to,
            log_entry,
            notifications,
        })
    }

    /// Read projection with derived display fields for `viewer`.
    pub fn view(
        &self,
        request_id: &RequestId,
        viewer: ActorRole,
    ) -> Result<BookingView, LifecycleError> {
        let request = self
            .bookings
            .fetch(request_id)?
            .ok_or_else(|| LifecycleError::NotFound(request_id.clone()))?;

        let canceled_by_role = if request.status == BookingStatus::Canceled {
            self.audit.cancel_role(request_id)?
        } else {
            None
        };

        let today = self.clock.now().date();
        Ok(BookingView {
            request_id: request.request_id.clone(),
            request_no: request.request_no.clone(),
            status_code: request.status,
            status_name: request.status.display_name(),
            can_cancel_request: request_can_be_canceled(&self.registry, &request, viewer),
            is_use_driver: request.is_use_driver(),
            is_return_overdue: request.is_return_overdue(today),
            canceled_by_role,
        })
    }

    pub fn history(&self, request_id: &RequestId) -> Result<Vec<LogEntry>, LifecycleError> {
        Ok(self.audit.history(request_id)?)
    }

    fn notify_best_effort(&self, request_id: &RequestId) -> Option<DispatchReport> {
        match self
            .notifier
            .notify(request_id.as_str(), NotifyType::RequestBooking)
        {
            Ok(report) => {
                if !report.is_clean() {
                    warn!(
                        %request_id,
                        failed = report.failed.len(),
                        "some status notifications were not created"
                    );
                }
                Some(report)
            }
            Err(err) => {
                warn!(%request_id, error = %err, "status notification dispatch failed");
                None
            }
        }
    }
}

fn request_can_be_canceled(
    registry: &StatusRegistry,
    request: &BookingRequest,
    viewer: ActorRole,
) -> bool {
    viewer.acts_on(request.approval_scope) && registry.can_cancel(viewer, request.status)
}

fn require_identifier(name: &'static str, value: &str) -> Result<(), LifecycleError> {
    if value.trim().is_empty() {
        Err(LifecycleError::InvalidIdentifier(name))
    } else {
        Ok(())
    }
}
