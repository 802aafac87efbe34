//! Crate-wide error type with sanitized HTTP responses.
//!
//! Database internals are logged via `tracing` and never sent to clients; the
//! response body carries only a user-facing message (plus a field/message map
//! for validation failures).

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use std::fmt;

use crate::validation::ValidationErrors;

/// Error type returned by repositories, criteria parsing, caching, and bulk
/// operations.
#[derive(Debug)]
pub enum RepoError {
    /// 404 - the requested record does not exist.
    NotFound {
        resource: String,
        id: Option<String>,
    },

    /// 400 - malformed request input (bad search syntax, rejected operator,
    /// malformed range value, unknown field in strict mode).
    BadRequest { message: String },

    /// 409 - unique-key or state conflict.
    Conflict { message: String },

    /// 422 - a create/update payload failed its declared rules.
    ValidationFailed { errors: ValidationErrors },

    /// 500 - database error. Details are logged, not exposed.
    Database { message: String, internal: DbErr },

    /// 500 - anything else. Details are logged, not exposed.
    Internal {
        message: String,
        internal: Option<String>,
    },
}

impl RepoError {
    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn validation(errors: ValidationErrors) -> Self {
        Self::ValidationFailed { errors }
    }

    pub fn database(internal: DbErr) -> Self {
        Self::Database {
            message: "A database error occurred".to_string(),
            internal,
        }
    }

    pub fn internal(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            internal,
        }
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::ValidationFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Database { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::NotFound { resource, id } => match id {
                Some(id) => format!("{resource} with ID '{id}' not found"),
                None => format!("{resource} not found"),
            },
            Self::BadRequest { message } | Self::Conflict { message } => message.clone(),
            Self::ValidationFailed { errors } => format!("Validation failed: {errors}"),
            Self::Database { message, .. } | Self::Internal { message, .. } => message.clone(),
        }
    }

    /// Log internal details. Only the sanitized message leaves the process.
    fn log_internal(&self) {
        match self {
            Self::Database { internal, .. } => {
                tracing::error!(error = ?internal, "Database error occurred");
            }
            Self::Internal {
                internal: Some(details),
                ..
            } => {
                tracing::error!(details = %details, "Internal error occurred");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "Repository error"
                );
            }
        }
    }
}

/// Sanitized error body sent to clients.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<ValidationErrors>,
}

impl IntoResponse for RepoError {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        let response = match &self {
            Self::ValidationFailed { errors } => ErrorResponse {
                error: "Validation failed".to_string(),
                details: Some(errors.clone()),
            },
            _ => ErrorResponse {
                error: self.user_message(),
                details: None,
            },
        };

        (status, Json(response)).into_response()
    }
}

impl fmt::Display for RepoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for RepoError {}

/// `DbErr::RecordNotFound` becomes 404; everything else is a sanitized 500.
impl From<DbErr> for RepoError {
    fn from(err: DbErr) -> Self {
        match &err {
            DbErr::RecordNotFound(msg) => {
                let resource = msg.split_whitespace().next().unwrap_or("Resource");
                Self::NotFound {
                    resource: resource.to_string(),
                    id: None,
                }
            }
            _ => Self::database(err),
        }
    }
}

impl From<ValidationErrors> for RepoError {
    fn from(errors: ValidationErrors) -> Self {
        Self::ValidationFailed { errors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationError;

    #[test]
    fn not_found_with_id() {
        let err = RepoError::not_found("Task", Some("123".to_string()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.user_message(), "Task with ID '123' not found");
    }

    #[test]
    fn bad_request_keeps_message() {
        let err = RepoError::bad_request("no search fields accepted");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.user_message(), "no search fields accepted");
    }

    #[test]
    fn validation_maps_to_422() {
        let errors: ValidationErrors = ValidationError::new("name", "required").into();
        let err = RepoError::validation(errors);
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn record_not_found_converts_to_404() {
        let err: RepoError = DbErr::RecordNotFound("Task not found".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn other_db_errors_are_sanitized() {
        let err: RepoError = DbErr::Custom("connection reset by peer".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "A database error occurred");
    }
}
