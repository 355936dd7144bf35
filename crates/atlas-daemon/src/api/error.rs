//! JSON error bodies for the HTTP API.
//!
//! Every failure is rendered as `{"code", "error": {"code", "message", "retryable"}}`;
//! the top-level `code` matches the nested one.
//! Messages of 500-class errors stay in the log.

use atlas_types::{AtlasError, ErrorClass};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub error: ErrorDetail,
}

impl From<ErrorDetail> for ErrorBody {
    fn from(error: ErrorDetail) -> Self {
        Self {
            code: error.code.clone(),
            error,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

#[derive(Debug)]
pub enum ApiError {
    Atlas(AtlasError),
    Unauthorized(&'static str),
    RateLimited,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Atlas(e) => StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    fn detail(&self) -> ErrorDetail {
        match self {
            Self::Atlas(e) => {
                let message = if e.class() == ErrorClass::Internal {
                    "An internal error occurred".to_string()
                } else {
                    e.to_string()
                };
                ErrorDetail {
                    code: e.code().to_string(),
                    message,
                    retryable: e.is_retryable(),
                }
            }
            Self::Unauthorized(reason) => ErrorDetail {
                code: "UNAUTHORIZED".into(),
                message: (*reason).to_string(),
                retryable: false,
            },
            Self::RateLimited => ErrorDetail {
                code: "RATE_LIMITED".into(),
                message: "Too many submissions; slow down".into(),
                retryable: true,
            },
        }
    }
}

impl From<AtlasError> for ApiError {
    fn from(e: AtlasError) -> Self {
        Self::Atlas(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Atlas(AtlasError::Validation(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Atlas(AtlasError::Validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Atlas(AtlasError::Validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Atlas(e) if e.class() == ErrorClass::Internal => {
                error!(code = e.code(), error = %e, "internal error");
            }
            Self::Atlas(e) if e.is_retryable() => {
                warn!(code = e.code(), error = %e, "transient failure");
            }
            _ => {}
        }
        (status, Json(ErrorBody::from(self.detail()))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
