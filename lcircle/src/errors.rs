use crate::db::errors::DbError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error as ThisError;

/// Stable machine-readable reason codes attached to authentication and
/// authorization failures. Clients branch on these rather than on the
/// human-readable message (e.g. force a re-login only on token failures,
/// not on a role mismatch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthCode {
    NoToken,
    InvalidToken,
    TokenExpired,
    InvalidUser,
    AuthError,
    NoAuth,
    InsufficientRole,
    AccessDenied,
    NoBatchId,
    BatchAccessDenied,
}

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but absent or invalid
    #[error("{message}")]
    Unauthenticated { code: AuthCode, message: String },

    /// Caller is authenticated but lacks the required privilege
    #[error("{message}")]
    Forbidden { code: AuthCode, message: String },

    /// Login rejected. Deliberately carries no reason code and one fixed
    /// message: unknown email, wrong password and deactivated account are
    /// indistinguishable on the wire.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// A resource-scoped guard was invoked without a resource id. A 400 like
    /// BadRequest, but carries a stable reason code clients branch on.
    #[error("{message}")]
    MissingResourceId { code: AuthCode, message: String },

    /// Requested resource not found
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// Request conflicts with existing state (duplicate email, admin already exists)
    #[error("{message}")]
    Conflict { message: String },

    /// Unexpected failure while resolving an authenticated identity (store
    /// unreachable mid-lookup). Distinct from Unauthenticated: the caller's
    /// credentials were never judged, so the response is a 500 with the
    /// stable AUTH_ERROR code.
    #[error("Authentication failed")]
    AuthLookupFailed(#[source] DbError),

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn unauthenticated(code: AuthCode, message: impl Into<String>) -> Self {
        Error::Unauthenticated {
            code,
            message: message.into(),
        }
    }

    pub fn forbidden(code: AuthCode, message: impl Into<String>) -> Self {
        Error::Forbidden {
            code,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } | Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::MissingResourceId { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Conflict { .. } => StatusCode::CONFLICT,
            Error::AuthLookupFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The auth reason code, when one applies.
    pub fn auth_code(&self) -> Option<AuthCode> {
        match self {
            Error::Unauthenticated { code, .. }
            | Error::Forbidden { code, .. }
            | Error::MissingResourceId { code, .. } => Some(*code),
            Error::AuthLookupFailed(_) => Some(AuthCode::AuthError),
            _ => None,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::InvalidCredentials => "Invalid email or password".to_string(),
            Error::Unauthenticated { message, .. } => message.clone(),
            Error::Forbidden { message, .. } => message.clone(),
            Error::BadRequest { message } => message.clone(),
            Error::MissingResourceId { message, .. } => message.clone(),
            Error::NotFound { resource } => format!("{resource} not found"),
            Error::Conflict { message } => message.clone(),
            Error::AuthLookupFailed(_) => "Authentication failed".to_string(),
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation { constraint, table, .. } => match (table.as_deref(), constraint.as_deref()) {
                    (Some("users"), Some(c)) if c.contains("email") => {
                        "An account with this email already exists".to_string()
                    }
                    _ => "Resource already exists".to_string(),
                },
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::CheckViolation { .. } => "Invalid data provided".to_string(),
                DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details server-side, at a level matching severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) | Error::AuthLookupFailed(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) | Error::Conflict { .. } => {
                tracing::warn!("Conflict error: {}", self);
            }
            Error::Unauthenticated { .. } | Error::Forbidden { .. } | Error::InvalidCredentials => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::BadRequest { .. } | Error::MissingResourceId { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();
        let body = match self.auth_code() {
            Some(code) => json!({ "error": self.user_message(), "code": code }),
            None => json!({ "error": self.user_message() }),
        };

        (status, axum::response::Json(body)).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_codes_serialize_to_wire_form() {
        assert_eq!(serde_json::to_value(AuthCode::NoToken).unwrap(), "NO_TOKEN");
        assert_eq!(serde_json::to_value(AuthCode::TokenExpired).unwrap(), "TOKEN_EXPIRED");
        assert_eq!(serde_json::to_value(AuthCode::InsufficientRole).unwrap(), "INSUFFICIENT_ROLE");
        assert_eq!(serde_json::to_value(AuthCode::BatchAccessDenied).unwrap(), "BATCH_ACCESS_DENIED");
    }

    #[test]
    fn test_status_codes() {
        let err = Error::unauthenticated(AuthCode::NoToken, "Access token required");
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.auth_code(), Some(AuthCode::NoToken));

        let err = Error::forbidden(AuthCode::AccessDenied, "Access denied");
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let err = Error::Conflict {
            message: "An admin account already exists".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.auth_code(), None);
    }

    #[test]
    fn test_invalid_credentials_carries_no_code() {
        let err = Error::InvalidCredentials;
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.auth_code(), None);
        assert_eq!(err.user_message(), "Invalid email or password");
    }

    #[test]
    fn test_internal_errors_do_not_leak_details() {
        let err = Error::Internal {
            operation: "sign token: key rotation in progress".to_string(),
        };
        assert_eq!(err.user_message(), "Internal server error");
    }

    #[test]
    fn test_email_unique_violation_maps_to_conflict() {
        let err = Error::Database(DbError::UniqueViolation {
            constraint: Some("users_email_key".to_string()),
            table: Some("users".to_string()),
            message: "duplicate key value".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.user_message(), "An account with this email already exists");
    }
}
