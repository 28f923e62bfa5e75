//! openrouter-relay - Minimal chat-completion relay for OpenRouter
//!
//! This library provides the relay handler, its configuration, and the
//! streaming pipe used to pass upstream event streams through untouched.

pub mod config;
pub mod error;
pub mod relay;

pub use config::Config;
pub use error::{RelayError, Result};
