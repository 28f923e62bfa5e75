//! HTTP server setup and configuration.

use axum::{extract::Request, middleware, middleware::Next, response::Response, Router};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

use super::cors;
use super::handlers;
use crate::config::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub http_client: Client,
    pub config: Arc<Config>,
}

impl AppState {
    /// Build state with an upstream client configured from `config`.
    ///
    /// Only the connect phase is bounded: a streamed completion may run
    /// for as long as the upstream keeps sending.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(config.upstream.connect_timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            config: Arc::new(config),
        })
    }
}

/// Run the request inside a span carrying a fresh correlation id.
async fn assign_request_id(request: Request, next: Next) -> Response {
    let span = tracing::info_span!("relay", request_id = %Uuid::new_v4());
    next.run(request).instrument(span).await
}

/// Create the axum router. Every method on every path reaches the relay.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .fallback(handlers::relay)
        .with_state(state)
        .layer(middleware::map_response(cors::with_cors))
        .layer(middleware::from_fn(assign_request_id))
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let listen_addr = config.server.listen.clone();
    let upstream_url = config.upstream.url.clone();

    let state = AppState::new(config)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, upstream = %upstream_url, "Starting relay server");

    axum::serve(listener, app).await?;

    Ok(())
}
