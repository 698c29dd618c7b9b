//! API error responses

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::store::StoreError;

/// Error codes shared by the server and [`crate::client::HttpSink`]
pub mod codes {
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const DUPLICATE_EMAIL: &str = "DUPLICATE_EMAIL";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const PAYLOAD_TOO_LARGE: &str = "PAYLOAD_TOO_LARGE";
    pub const UNSUPPORTED_MEDIA_TYPE: &str = "UNSUPPORTED_MEDIA_TYPE";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Body of every non-2xx response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: String,
    /// Field-path → message for validation failures
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
}

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Validation failed")]
    ValidationFailed(BTreeMap<String, String>),

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("{0}")]
    NotFound(String),

    /// Body refused before it could be parsed (too large, wrong content type)
    #[error("{message}")]
    Unreadable { status: StatusCode, message: String },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => codes::BAD_REQUEST,
            ApiError::ValidationFailed(_) => codes::VALIDATION_FAILED,
            ApiError::DuplicateEmail => codes::DUPLICATE_EMAIL,
            ApiError::NotFound(_) => codes::NOT_FOUND,
            ApiError::Unreadable { status, .. } => match *status {
                StatusCode::PAYLOAD_TOO_LARGE => codes::PAYLOAD_TOO_LARGE,
                StatusCode::UNSUPPORTED_MEDIA_TYPE => codes::UNSUPPORTED_MEDIA_TYPE,
                _ => codes::BAD_REQUEST,
            },
            ApiError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::ValidationFailed(_) | ApiError::DuplicateEmail => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unreadable { status, .. } => *status,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        let errors = match self {
            ApiError::ValidationFailed(errors) => errors.clone(),
            _ => BTreeMap::new(),
        };
        ErrorBody {
            message: self.to_string(),
            code: self.error_code().to_string(),
            errors,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => ApiError::DuplicateEmail,
            StoreError::NotFound { .. } => ApiError::NotFound(err.to_string()),
        }
    }
}

/// Syntax and shape errors stay 400; transport-level refusals keep axum's status
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let status = rejection.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
            ApiError::BadRequest(rejection.body_text())
        } else {
            ApiError::Unreadable {
                status,
                message: rejection.body_text(),
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "Request failed");
        }
        (status, Json(self.body())).into_response()
    }
}
