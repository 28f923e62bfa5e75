//! The relay request handler.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use super::cors;
use super::server::AppState;
use super::stream;
use super::types::{RelayRequest, UpstreamRequest};
use crate::error::{RelayError, Result};

/// Identification header carrying the caller's site URL.
pub const HTTP_REFERER_HEADER: &str = "HTTP-Referer";
/// Identification header carrying the caller's app title.
pub const X_TITLE_HEADER: &str = "X-Title";

/// Longest body excerpt written to the response log.
const LOG_PREVIEW_CHARS: usize = 100;

/// Handle any method on any path.
///
/// Pre-flight probes are answered before anything else runs; every other
/// request is validated, forwarded upstream, and relayed back. The body is
/// taken raw so that it is only buffered once method and credential pass,
/// and its size is never capped by the router.
pub async fn relay(State(state): State<AppState>, request: Request) -> Response {
    let method = request.method().clone();
    if method == Method::OPTIONS {
        return cors::preflight();
    }

    let result = if method == Method::POST {
        execute_request(&state, request.into_body()).await
    } else {
        Err(RelayError::MethodNotAllowed)
    };

    match result {
        Ok(response) => response,
        Err(err) => {
            let message = err.to_string();
            tracing::debug!(
                status = %err.status(),
                content_type = "application/json",
                body = %preview(&message),
                "Responding with error"
            );
            err.into_response()
        }
    }
}

/// Validate, forward, and relay a POST.
async fn execute_request(state: &AppState, body: Body) -> Result<Response> {
    // Checked before the body so a misconfigured deployment fails uniformly.
    let api_key = state
        .config
        .upstream
        .credential()
        .ok_or(RelayError::MissingApiKey)?;

    // A body that cannot be read is as unusable as one that is not JSON.
    let body = axum::body::to_bytes(body, usize::MAX).await.map_err(|e| {
        tracing::warn!(error = %e, "Failed to read request body");
        RelayError::InvalidJson
    })?;
    let request = RelayRequest::parse(&body)?;

    tracing::info!(
        model = %request.model_name,
        stream = request.stream,
        "Received relay request"
    );

    let upstream = &state.config.upstream;
    let upstream_response = state
        .http_client
        .post(&upstream.url)
        .bearer_auth(api_key.expose_secret())
        .header(header::CONTENT_TYPE, "application/json")
        .header(HTTP_REFERER_HEADER, request.referer_or(&upstream.default_referer))
        .header(X_TITLE_HEADER, request.title_or(&upstream.default_title))
        .json(&UpstreamRequest::from(&request))
        .send()
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to reach upstream");
            RelayError::proxy(&e)
        })?;

    let status = upstream_response.status();
    if !status.is_success() {
        let error_body = upstream_response.text().await.map_err(|e| {
            tracing::error!(error = %e, status = %status, "Failed to read upstream error body");
            RelayError::proxy(&e)
        })?;
        tracing::error!(
            status = %status,
            body = %error_body,
            "Upstream returned error"
        );
        return Err(RelayError::Upstream {
            status,
            message: error_body,
        });
    }

    if request.stream {
        tracing::info!(model = %request.model_name, "Starting streaming response");
        let reader = stream::pipe(upstream_response.bytes_stream());
        return Ok(stream::event_stream_response(reader));
    }

    let data: serde_json::Value = upstream_response.json().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to parse upstream response");
        RelayError::proxy(&e)
    })?;

    tracing::info!(model = %request.model_name, "Completed non-streaming request");
    tracing::debug!(
        status = %StatusCode::OK,
        content_type = "application/json",
        body = %preview(&data.to_string()),
        "Responding with upstream body"
    );

    Ok((StatusCode::OK, Json(data)).into_response())
}

/// First [`LOG_PREVIEW_CHARS`] characters of `body`, with an ellipsis if cut.
fn preview(body: &str) -> String {
    let mut chars = body.char_indices();
    match chars.nth(LOG_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
