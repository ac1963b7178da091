//! HTTP error mapping for supervisor failures.
//!
//! Every error becomes a consistent JSON body with the failure message
//! and a user-facing recovery hint.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use stackbox_supervisor::SupervisorError;

/// JSON error response body
#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
    pub hint: &'static str,
}

/// A supervisor failure crossing the HTTP boundary.
#[derive(Debug)]
pub struct ApiError(SupervisorError);

impl From<SupervisorError> for ApiError {
    fn from(err: SupervisorError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            SupervisorError::UnknownService { .. }
            | SupervisorError::VersionNotInstalled { .. } => StatusCode::NOT_FOUND,
            SupervisorError::OperationInProgress { .. }
            | SupervisorError::PortConflict { .. } => StatusCode::CONFLICT,
            SupervisorError::BinaryMissing { .. }
            | SupervisorError::ServiceNotRunning { .. } => StatusCode::PRECONDITION_FAILED,
            SupervisorError::StartupTimeout { .. }
            | SupervisorError::ForcedTermination { .. }
            | SupervisorError::UnexpectedExit { .. }
            | SupervisorError::ProcessSpawn { .. }
            | SupervisorError::Filesystem { .. }
            | SupervisorError::BackupArchive { .. }
            | SupervisorError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self.0);
        } else {
            tracing::warn!("{}", self.0);
        }

        let body = ApiErrorBody {
            error: self.0.to_string(),
            hint: self.0.recovery_hint(),
        };
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
