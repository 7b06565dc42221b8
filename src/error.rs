//! Errors returned by the platform's HTTP handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::database::db::queries;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("balance limit exceeded")]
    BalanceLimit,

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type PlatformResult<T> = Result<T, PlatformError>;

/// JSON body of every failed response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl PlatformError {
    pub fn unauthorized() -> Self {
        Self::Unauthorized("not signed in".into())
    }

    pub fn admin_only() -> Self {
        Self::Forbidden("only administrators may do this".into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::InsufficientBalance | Self::BalanceLimit => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Storage(_) | Self::Database(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<sqlx::Error> for PlatformError {
    fn from(err: sqlx::Error) -> Self {
        if queries::is_insufficient_balance(&err) {
            Self::InsufficientBalance
        } else if queries::is_balance_limit(&err) {
            Self::BalanceLimit
        } else {
            Self::Database(err)
        }
    }
}

impl IntoResponse for PlatformError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "request rejected");
        }

        // internals stay in the log
        let message = match &self {
            Self::Storage(_) | Self::Database(_) | Self::Internal(_) => {
                "internal server error".to_string()
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
    fn status_codes() {
        assert_eq!(PlatformError::unauthorized().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(PlatformError::admin_only().status(), StatusCode::FORBIDDEN);
        assert_eq!(
            PlatformError::InsufficientBalance.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            PlatformError::NotFound("expense".into()).to_string(),
            "expense not found"
        );
    }

    #[test]
    fn row_not_found_is_a_database_error() {
        let err: PlatformError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, PlatformError::Database(_)));
    }
}
