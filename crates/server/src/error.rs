use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use ephemera_lifecycle::LifecycleError;

/// Errors that can occur when running the ephemera server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error (e.g. binding the listener, reading the config file).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A lifecycle error surfaced through the API.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// The upload form was malformed or failed validation.
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}

impl ServerError {
    /// HTTP status and client-facing message.
    ///
    /// Internal failures get a generic message; the detail is logged.
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg.clone()),
            Self::Lifecycle(e) => match e {
                LifecycleError::NotFound => (StatusCode::NOT_FOUND, "Photo not found".into()),
                LifecycleError::Expired => (StatusCode::GONE, "Link has expired".into()),
                LifecycleError::Exhausted => (StatusCode::GONE, "Maximum views reached".into()),
                LifecycleError::PinRequired => (StatusCode::UNAUTHORIZED, "PIN required".into()),
                LifecycleError::PinMismatch => (StatusCode::FORBIDDEN, "Invalid PIN".into()),
                LifecycleError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                LifecycleError::StorageFailure(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to retrieve photo".into(),
                ),
                LifecycleError::Configuration(_) | LifecycleError::Ledger(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into())
                }
            },
            Self::Config(_) | Self::Io(_) | Self::Template(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into())
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}
