//! Cross-origin headers attached to every relay response.

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

/// Cross-origin headers and their fixed values.
pub const CORS_HEADERS: [(&str, &str); 4] = [
    ("access-control-allow-origin", "*"),
    ("access-control-allow-methods", "POST, OPTIONS"),
    ("access-control-allow-headers", "Content-Type, Authorization"),
    // One day
    ("access-control-max-age", "86400"),
];

/// Insert the cross-origin headers, replacing any existing values.
pub fn apply_cors_headers(headers: &mut HeaderMap) {
    for (name, value) in CORS_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
}

/// Response-mapping middleware: every response leaves with the CORS headers.
pub async fn with_cors(mut response: Response) -> Response {
    apply_cors_headers(response.headers_mut());
    response
}

/// Answer a pre-flight probe: 204 with an empty body.
pub fn preflight() -> Response {
    StatusCode::NO_CONTENT.into_response()
}
