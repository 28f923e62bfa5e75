//! HTTP relay module.
//!
//! Accepts chat-completion requests on any path, forwards them to the
//! configured upstream with the server-held credential, and relays the
//! answer back either buffered or as a live event stream.

pub mod cors;
mod handlers;
mod server;
pub mod stream;
pub mod types;

pub use handlers::{HTTP_REFERER_HEADER, X_TITLE_HEADER};
pub use server::{create_router, run_server, AppState};
pub use stream::{event_stream_response, pipe, PipeReader};
pub use types::{Message, RelayRequest, UpstreamRequest};
