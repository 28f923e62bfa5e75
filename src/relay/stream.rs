//! Pass-through byte pipe for streamed upstream responses.
//!
//! [`pipe`] splits the relay into a producer task, which drains the upstream
//! body, and a consumer stream, which becomes the caller's response body.
//! Bytes are copied in order and never inspected, so SSE framing, partial
//! events and any upstream error text reach the caller exactly as sent.

use std::io;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::Instrument;

/// Consumer side of the pipe.
pub type PipeReader = UnboundedReceiverStream<Result<Bytes, io::Error>>;

/// Copy every chunk of `upstream` into a new channel and return its read side.
///
/// The producer runs on its own task so the caller's response can start
/// before the upstream body has been read. The channel is unbounded; any
/// backpressure comes from the transports on either side. An upstream error
/// is forwarded as the final item, which aborts the caller's body. If the
/// reader is dropped, the producer stops and drops the upstream body.
pub fn pipe<S, E>(upstream: S) -> PipeReader
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(
        async move {
            let mut upstream = std::pin::pin!(upstream);
            let mut relayed: usize = 0;

            while let Some(chunk) = upstream.next().await {
                match chunk {
                    Ok(bytes) => {
                        relayed += bytes.len();
                        if tx.send(Ok(bytes)).is_err() {
                            tracing::debug!(bytes = relayed, "Caller disconnected mid-stream");
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, bytes = relayed, "Error streaming from upstream");
                        let _ = tx.send(Err(io::Error::other(e)));
                        return;
                    }
                }
            }

            tracing::debug!(bytes = relayed, "Upstream stream finished");
        }
        .in_current_span(),
    );

    UnboundedReceiverStream::new(rx)
}

/// Wrap a pipe reader in a `text/event-stream` response.
pub fn event_stream_response(reader: PipeReader) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Body::from_stream(reader),
    )
        .into_response()
}
