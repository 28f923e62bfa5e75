//! Inbound relay request and the OpenAI-compatible upstream payload.

use serde::Serialize;
use serde_json::Value;

use crate::error::RelayError;

/// Inbound request after validation.
///
/// Parsed from an untyped JSON value so that each field can be judged the
/// way callers expect: wrong types count as missing rather than as bad JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayRequest {
    pub prompt: String,
    pub model_name: String,
    /// Only a JSON `true` enables streaming.
    pub stream: bool,
    pub referer: Option<String>,
    pub title: Option<String>,
}

/// Return the field as text if it is a non-empty JSON string.
fn non_empty_str(body: &Value, field: &str) -> Option<String> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl RelayRequest {
    /// Parse and validate a raw request body.
    pub fn parse(body: &[u8]) -> Result<Self, RelayError> {
        let value: Value = serde_json::from_slice(body).map_err(|_| RelayError::InvalidJson)?;
        Self::from_value(&value)
    }

    /// Validate an already-parsed JSON body.
    pub fn from_value(body: &Value) -> Result<Self, RelayError> {
        let (Some(prompt), Some(model_name)) =
            (non_empty_str(body, "prompt"), non_empty_str(body, "model_name"))
        else {
            return Err(RelayError::MissingFields);
        };

        Ok(Self {
            prompt,
            model_name,
            stream: matches!(body.get("stream"), Some(Value::Bool(true))),
            referer: non_empty_str(body, "referer"),
            title: non_empty_str(body, "title"),
        })
    }

    /// `HTTP-Referer` value: the caller's referer, else the fallback.
    pub fn referer_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.referer.as_deref().unwrap_or(fallback)
    }

    /// `X-Title` value: the caller's title, else the fallback.
    pub fn title_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.title.as_deref().unwrap_or(fallback)
    }
}

/// Chat completion request sent upstream.
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamRequest<'a> {
    pub messages: Vec<Message<'a>>,
    pub model: &'a str,
    pub stream: bool,
}

/// A chat message.
#[derive(Debug, Clone, Serialize)]
pub struct Message<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

impl<'a> From<&'a RelayRequest> for UpstreamRequest<'a> {
    fn from(request: &'a RelayRequest) -> Self {
        Self {
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
            model: &request.model_name,
            stream: request.stream,
        }
    }
}
