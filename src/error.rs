use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Application error taxonomy. Every fallible operation funnels into one of
/// these variants; the `IntoResponse` impl decides the HTTP status and the
/// user-facing message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    /// Bad credentials or a mismatched one-time code.
    #[error("{0}")]
    Auth(String),

    /// Missing, invalid or expired session token, or a stale token for a
    /// deleted account. Not distinguished further to the caller.
    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Expired(String),

    /// Database or mail outage. Not retried here; surfaced for the caller
    /// to decide on retry policy.
    #[error("upstream dependency failed")]
    Dependency(#[source] anyhow::Error),

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) | AppError::Expired(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Auth(_) | AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Dependency(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            // 23505: unique_violation, the LOWER(email) index
            if db.code().as_deref() == Some("23505") {
                return AppError::Conflict("Email already registered".into());
            }
        }
        AppError::Dependency(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorBody {
            error: String,
        }

        let status = self.status();
        let message = match &self {
            AppError::Dependency(cause) => {
                error!(error = %cause, "dependency failure");
                self.to_string()
            }
            AppError::Internal(cause) => {
                error!(error = ?cause, "internal error");
                self.to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_conflict_expired_map_to_400() {
        assert_eq!(
            AppError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Conflict("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Expired("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn auth_variants_map_to_401() {
        assert_eq!(AppError::Auth("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Unauthenticated("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn remaining_variants_map_per_taxonomy() {
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Forbidden("x".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Dependency(anyhow::anyhow!("down")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("bug")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_message_does_not_leak_cause() {
        let err = AppError::Internal(anyhow::anyhow!("connection string was postgres://secret"));
        assert_eq!(err.to_string(), "internal server error");
    }

    #[test]
    fn row_not_found_becomes_dependency() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::Dependency(_)));
    }
}
