use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::booking::LifecycleError;
use crate::workflows::eligibility::EligibilityError;
use crate::workflows::notifications::{NotificationError, TemplateImportError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

/// Top-level failure of the service binary and its commands.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server error: {0}")]
    Server(#[from] axum::Error),
    #[error("template import error: {0}")]
    TemplateImport(#[from] TemplateImportError),
    #[error("notification error: {0}")]
    Notification(#[from] NotificationError),
    #[error("booking lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),
    #[error("driver eligibility error: {0}")]
    Eligibility(#[from] EligibilityError),
}

impl AppError {
    /// Stale writes and duplicate ids are conflicts; malformed input and import data are the
    /// caller's fault.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Lifecycle(err) if err.is_retryable() => StatusCode::CONFLICT,
            AppError::Lifecycle(LifecycleError::AlreadyExists(_)) => StatusCode::CONFLICT,
            AppError::Lifecycle(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            AppError::Eligibility(EligibilityError::InvalidIdentifier)
            | AppError::TemplateImport(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
