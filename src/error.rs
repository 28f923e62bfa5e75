//! Error types for the relay.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Message used when a failure carries no usable text.
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred";

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Everything that can end a relay request before a successful response.
///
/// The `Display` text of each variant is exactly what the caller sees in the
/// `error` field of the JSON body.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Only POST requests are allowed")]
    MethodNotAllowed,

    #[error("Server error: missing API key")]
    MissingApiKey,

    #[error("Invalid JSON in request body")]
    InvalidJson,

    #[error("Missing \"prompt\" or \"model_name\" in request body")]
    MissingFields,

    #[error("Error from OpenRouter: {message}")]
    Upstream { status: StatusCode, message: String },

    #[error(
        "Error proxying to OpenRouter: {}",
        .message.as_deref().unwrap_or(UNKNOWN_ERROR_MESSAGE)
    )]
    Proxy { message: Option<String> },
}

impl RelayError {
    /// Wrap an unexpected failure (transport error, unreadable body, ...).
    pub fn proxy(err: &(dyn std::error::Error + 'static)) -> Self {
        RelayError::Proxy {
            message: failure_message(err),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::MissingApiKey => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::InvalidJson => StatusCode::BAD_REQUEST,
            RelayError::MissingFields => StatusCode::BAD_REQUEST,
            RelayError::Upstream { status, .. } => *status,
            RelayError::Proxy { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Best-effort message for an error of unknown shape.
///
/// Prefers the innermost cause (e.g. "Connection reset by peer") over the
/// wrapper's text, and returns `None` when nothing in the chain says anything.
pub fn failure_message(err: &(dyn std::error::Error + 'static)) -> Option<String> {
    let mut root = err;
    while let Some(source) = root.source() {
        root = source;
    }

    [root.to_string(), err.to_string()]
        .into_iter()
        .find(|message| !message.trim().is_empty())
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
