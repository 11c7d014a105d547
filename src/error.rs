use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;
use tracing::error;

use crate::attendance::rules::Rejection;
use crate::attendance::service::AttendanceError;

/// Error returned by every handler. Renders as
/// `{ "success": false, "message": ..., "type": ... }`.
#[derive(Debug, Display)]
pub enum ApiError {
    #[display(fmt = "{}", _0)]
    Rejected(Rejection),

    #[display(fmt = "{}", _0)]
    Validation(String),

    #[display(fmt = "{}", _0)]
    Unauthorized(String),

    #[display(fmt = "{}", _0)]
    Forbidden(String),

    #[display(fmt = "{}", _0)]
    NotFound(String),

    #[display(fmt = "{}", _0)]
    Conflict(String),

    #[display(fmt = "Something went wrong, Contact with system admin")]
    Internal,
}

impl ApiError {
    fn severity(&self) -> &'static str {
        match self {
            ApiError::Rejected(rejection) => rejection.severity(),
            ApiError::Conflict(_) => "warning",
            _ => "error",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Rejected(Rejection::ProfileMissing) => StatusCode::FORBIDDEN,
            ApiError::Rejected(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = json!({
            "success": false,
            "message": self.to_string(),
            "type": self.severity(),
        });
        if let ApiError::Rejected(rejection) = self {
            body["error_kind"] = json!(rejection.kind());
        }
        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<Rejection> for ApiError {
    fn from(rejection: Rejection) -> Self {
        ApiError::Rejected(rejection)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        error!(error = %e, "Database error");
        ApiError::Internal
    }
}

impl From<AttendanceError> for ApiError {
    fn from(e: AttendanceError) -> Self {
        match e {
            AttendanceError::Rejected(rejection) => rejection.into(),
            AttendanceError::Store(e) => e.into(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
