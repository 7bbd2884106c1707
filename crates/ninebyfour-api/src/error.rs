use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Route-boundary error. Every failure a handler can produce ends up here
/// and is rendered as `{ "message": ... }` with the matching status.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or empty field, self-reference (400)
    #[error("{0}")]
    BadRequest(String),

    /// No usable credentials: missing or expired token (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Bad token, wrong role, not a participant, not mutual followers (403)
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Duplicate row (409)
    #[error("{0}")]
    Conflict(String),

    /// Anything unexpected. The detail is logged, never sent (500)
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ninebyfour_db::Error> for ApiError {
    fn from(err: ninebyfour_db::Error) -> Self {
        use ninebyfour_db::Error as Db;
        match err {
            Db::Validation(msg) => Self::BadRequest(msg),
            Db::PermissionDenied(msg) => Self::Forbidden(msg),
            Db::NotFound(msg) => Self::NotFound(msg),
            Db::Conflict(msg) => Self::Conflict(msg),
            other @ (Db::Pool(_) | Db::Sqlite(_)) => Self::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::Internal(detail) => {
                error!("Internal error: {}", detail);
                "Server error".to_string()
            }
            Self::BadRequest(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg) => msg,
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
