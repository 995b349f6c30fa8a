use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fabl_session::SessionError;
use fabl_store::StoreError;
use fabl_types::TypeError;
use serde_json::json;
use thiserror::Error;

/// Errors raised while configuring or starting the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// Errors returned from request handlers.
///
/// Rendered as `{"error": <code>, "message": <text>}`. Server-side failures
/// are logged and answered with a generic message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<TypeError> for ApiError {
    fn from(e: TypeError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "invalid_argument"),
            Self::Store(e) => match e {
                StoreError::Format(f) if f.is_format_error() => (StatusCode::BAD_REQUEST, "format"),
                StoreError::InvalidId(_) => (StatusCode::BAD_REQUEST, "invalid_argument"),
                StoreError::ItemNotFound(_) | StoreError::BlobNotFound(_) | StoreError::AccountNotFound(_) => {
                    (StatusCode::NOT_FOUND, "not_found")
                }
                StoreError::Authentication => (StatusCode::UNAUTHORIZED, "unauthenticated"),
                StoreError::Format(_)
                | StoreError::Conflict(_)
                | StoreError::Cancelled
                | StoreError::PasswordHash(_)
                | StoreError::Persistence(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal")
                }
            },
            Self::Session(SessionError::Unauthenticated) => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            Self::Session(_) | Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "internal error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}
