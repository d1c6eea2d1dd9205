//! Error types shared across the service.
//!
//! One enum covers the whole surface: store failures collapse into
//! [`Error::Internal`], everything else is a business outcome that the
//! HTTP layer maps straight to a status code. Responses carry only the
//! short kind string, never the underlying source.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Service error kinds.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No sale is currently open, or the requested sale is not current.
    #[error("no active sale")]
    NoActiveSale,

    /// Inventory for the current sale is exhausted.
    #[error("item sold out")]
    SoldOut,

    /// The user already committed the per-sale maximum.
    #[error("purchase limit exceeded")]
    UserLimitExceeded,

    /// The code was never issued, already consumed, or past its TTL.
    #[error("invalid or expired code")]
    InvalidOrExpiredCode,

    /// A required request parameter is missing or malformed.
    #[error("{0}")]
    BadRequest(String),

    /// The per-user request budget for the current minute is spent.
    #[error("rate limit exceeded")]
    RateLimited,

    /// Store transport failure, parse failure, or failed compensation.
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl Error {
    /// HTTP status for this error kind.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NoActiveSale => StatusCode::SERVICE_UNAVAILABLE,
            Self::SoldOut => StatusCode::CONFLICT,
            Self::UserLimitExceeded => StatusCode::FORBIDDEN,
            Self::InvalidOrExpiredCode | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Self::Internal(err.into())
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(err.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(err.into())
    }
}

/// JSON error body returned to clients.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            if let Self::Internal(source) = &self {
                tracing::error!(error = %source, "request failed");
            }
        }

        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
