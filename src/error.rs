//! Error types for the OAM server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// A lifecycle rule violation: the entity exists, its version matches, but
/// its current state does not admit the requested operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleViolation {
    AssetNotAvailable,
    AssetNotEditable,
    AssetNotDeletable,
    AssetStateInvalid,
    AssignmentNotUpdatable,
    AssignmentStatusNotUpdatable,
    AssignmentNotDeletable,
    AssignmentNotAccepted,
    ReturnNotUpdatable,
    ReturnAlreadyRequested,
    AssetAlreadyReturned,
    UserHasActiveAssignments,
}

impl RuleViolation {
    /// Machine-readable code sent to API clients
    pub fn code(self) -> &'static str {
        match self {
            RuleViolation::AssetNotAvailable => "ASSET_NOT_AVAILABLE",
            RuleViolation::AssetNotEditable => "ASSET_NOT_EDITABLE",
            RuleViolation::AssetNotDeletable => "ASSET_NOT_DELETABLE",
            RuleViolation::AssetStateInvalid => "ASSET_STATE_INVALID",
            RuleViolation::AssignmentNotUpdatable => "ASSIGNMENT_NOT_UPDATABLE",
            RuleViolation::AssignmentStatusNotUpdatable => "ASSIGNMENT_STATUS_NOT_UPDATABLE",
            RuleViolation::AssignmentNotDeletable => "ASSIGNMENT_NOT_DELETABLE",
            RuleViolation::AssignmentNotAccepted => "ASSIGNMENT_NOT_ACCEPTED",
            RuleViolation::ReturnNotUpdatable => "RETURN_NOT_UPDATABLE",
            RuleViolation::ReturnAlreadyRequested => "RETURN_ALREADY_REQUESTED",
            RuleViolation::AssetAlreadyReturned => "ASSET_ALREADY_RETURNED",
            RuleViolation::UserHasActiveAssignments => "USER_HAS_ACTIVE_ASSIGNMENTS",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            RuleViolation::AssetNotAvailable => "Asset is not available",
            RuleViolation::AssetNotEditable => "Asset cannot be edited while assigned",
            RuleViolation::AssetStateInvalid => "Asset cannot transition to the requested state",
            RuleViolation::AssetNotDeletable => {
                "Asset cannot be deleted because it has assignment history"
            }
            RuleViolation::AssignmentNotUpdatable => {
                "Assignment can only be edited while waiting for acceptance"
            }
            RuleViolation::AssignmentStatusNotUpdatable => {
                "Assignment status can no longer be changed"
            }
            RuleViolation::AssignmentNotDeletable => {
                "Assignment can only be deleted while waiting for acceptance or declined"
            }
            RuleViolation::AssignmentNotAccepted => "Assignment has not been accepted",
            RuleViolation::ReturnNotUpdatable => "Return request is no longer waiting for returning",
            RuleViolation::ReturnAlreadyRequested => {
                "An active return request already exists for this assignment"
            }
            RuleViolation::AssetAlreadyReturned => "Asset has already been returned",
            RuleViolation::UserHasActiveAssignments => {
                "There are valid assignments belonging to this user"
            }
        }
    }
}

impl std::fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// Optimistic lock failure: the row changed under the caller's feet.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{0}")]
    Rule(RuleViolation),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Retryable failure, e.g. code-allocation retry exhaustion under load.
    #[error("Transient error: {0}")]
    Transient(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<RuleViolation> for AppError {
    fn from(rule: RuleViolation) -> Self {
        AppError::Rule(rule)
    }
}

impl AppError {
    /// Standard "being modified" conflict for a stale version
    pub fn being_modified(entity: &str) -> Self {
        AppError::Conflict(format!("{entity} is being modified by another user"))
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Rule(rule) => rule.code(),
            AppError::Validation(_) => "BAD_VALUE",
            AppError::Transient(_) => "TRANSIENT",
            AppError::Database(_) => "DB_FAILURE",
            AppError::Internal(_) => "INTERNAL",
        }
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Rule(rule) => (StatusCode::UNPROCESSABLE_ENTITY, rule.message().to_string()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Transient(msg) => {
                tracing::warn!("Transient error: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
