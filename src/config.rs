//! Configuration parsing and validation for the relay.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};
use std::path::Path;

/// Upstream chat-completions endpoint used when none is configured.
pub const DEFAULT_UPSTREAM_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Sent as `HTTP-Referer` when the caller supplies no referer.
pub const DEFAULT_REFERER: &str = "https://llm-proxy.abyzov.workers.dev/";

/// Sent as `X-Title` when the caller supplies no title.
pub const DEFAULT_TITLE: &str = "LLM Proxy Worker";

/// Environment variable consulted when no key is configured explicitly.
pub const CONVENTION_API_KEY_VAR: &str = "OPENROUTER_API_KEY";

/// Root configuration structure.
///
/// Built from [`RawConfig`] once the API key has been resolved.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "127.0.0.1:8787")
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    "127.0.0.1:8787".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

/// API key wrapper that redacts in Debug/Display/Serialize and zeroizes on drop.
///
/// The key is only reachable through `.expose_secret()`, so every place that
/// touches the raw value can be found with a grep.
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Access the raw key value.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }

    fn is_empty(&self) -> bool {
        self.expose_secret().is_empty()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Serialize for ApiKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        ApiKey(SecretString::from(s))
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        ApiKey(SecretString::from(s))
    }
}

/// How the upstream API key was resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum KeySource {
    /// Key was a literal string in config (no ${} references)
    Literal,
    /// Key contained ${VAR} references expanded from environment
    EnvExpanded,
    /// Key was picked up from the convention env var (holds var name)
    Convention(String),
    /// Key referenced an env var that is not set (holds var name)
    UnsetVar(String),
    /// No key available
    None,
}

impl KeySource {
    /// Whether relay requests will fail with a missing-key error.
    pub fn is_missing(&self) -> bool {
        matches!(self, KeySource::UnsetVar(_) | KeySource::None)
    }
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::Literal => write!(f, "config-literal"),
            KeySource::EnvExpanded => write!(f, "env-expanded"),
            KeySource::Convention(var) => write!(f, "convention ({})", var),
            KeySource::UnsetVar(var) => write!(f, "unset ({})", var),
            KeySource::None => write!(f, "none"),
        }
    }
}

/// Upstream (OpenRouter) configuration.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Full URL of the chat-completions endpoint
    pub url: String,
    /// Bearer credential injected into every upstream request
    pub api_key: Option<ApiKey>,
    /// Fallback for the `HTTP-Referer` identification header
    pub default_referer: String,
    /// Fallback for the `X-Title` identification header
    pub default_title: String,
    /// TCP connect timeout for the upstream client, in seconds
    pub connect_timeout_secs: u64,
}

fn default_upstream_url() -> String {
    DEFAULT_UPSTREAM_URL.to_string()
}

fn default_referer() -> String {
    DEFAULT_REFERER.to_string()
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            api_key: None,
            default_referer: default_referer(),
            default_title: default_title(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl UpstreamConfig {
    /// The configured credential, treating an empty value as absent.
    pub fn credential(&self) -> Option<&ApiKey> {
        self.api_key.as_ref().filter(|key| !key.is_empty())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Invalid environment reference '{var}' in upstream api_key: {message}")]
    EnvVar { var: String, message: String },
}

/// Raw upstream config deserialized directly from TOML.
/// api_key is `Option<String>` so it may contain `${VAR}` references not yet expanded.
#[derive(Deserialize)]
pub struct RawUpstreamConfig {
    #[serde(default = "default_upstream_url")]
    url: String,
    api_key: Option<String>,
    #[serde(default = "default_referer")]
    default_referer: String,
    #[serde(default = "default_title")]
    default_title: String,
    #[serde(default = "default_connect_timeout_secs")]
    connect_timeout_secs: u64,
}

impl Default for RawUpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            api_key: None,
            default_referer: default_referer(),
            default_title: default_title(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Raw configuration deserialized directly from TOML.
#[derive(Deserialize, Default)]
pub struct RawConfig {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    upstream: RawUpstreamConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

/// Outcome of expanding `${VAR}` references.
#[derive(Debug, PartialEq)]
enum Expansion {
    Expanded(String),
    /// A referenced variable is not set (holds its name).
    Unset(String),
}

/// Expand all `${VAR}` references in a string using a custom lookup function.
///
/// Supports several references in one string (e.g., `sk-or-${PART1}${PART2}`).
/// An unset variable is reported as [`Expansion::Unset`] rather than an error,
/// since a missing credential must only fail individual requests.
fn expand_env_vars_with<F>(input: &str, lookup: F) -> Result<Expansion, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let end = after.find('}').ok_or_else(|| ConfigError::EnvVar {
            var: "<unclosed>".to_string(),
            message: "Unclosed '${' in config value".to_string(),
        })?;

        let var_name = &after[..end];
        if var_name.is_empty() {
            return Err(ConfigError::EnvVar {
                var: "".to_string(),
                message: "Empty variable name in '${}' reference".to_string(),
            });
        }

        match lookup(var_name) {
            Some(value) => result.push_str(&value),
            None => return Ok(Expansion::Unset(var_name.to_string())),
        }
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    Ok(Expansion::Expanded(result))
}

impl Config {
    /// Defaults plus the convention environment variable, for running without a file.
    pub fn from_env() -> Result<(Self, KeySource), ConfigError> {
        Self::from_raw(RawConfig::default())
    }

    /// Load configuration from a TOML file with environment variable expansion.
    pub fn from_file(path: impl AsRef<Path>) -> Result<(Self, KeySource), ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        Self::parse_str(&content)
    }

    /// Parse configuration from a TOML string with environment variable expansion.
    pub fn parse_str(content: &str) -> Result<(Self, KeySource), ConfigError> {
        let raw: RawConfig = toml::from_str(content)?;
        Self::from_raw(raw)
    }

    /// Convert raw (deserialized) config to final config using real environment variables.
    pub fn from_raw(raw: RawConfig) -> Result<(Self, KeySource), ConfigError> {
        Self::from_raw_with(raw, |name| std::env::var(name).ok())
    }

    /// Convert raw config to final config, resolving the API key:
    /// - `${VAR}` references expand through `lookup`; an unset variable leaves no key
    /// - a literal string is used as-is
    /// - an absent key falls back to `OPENROUTER_API_KEY`
    ///
    /// Empty values count as absent in every case.
    fn from_raw_with<F>(raw: RawConfig, lookup: F) -> Result<(Self, KeySource), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (api_key, source) = match raw.upstream.api_key {
            Some(ref raw_key) if raw_key.contains("${") => {
                match expand_env_vars_with(raw_key, &lookup)? {
                    Expansion::Expanded(value) if value.is_empty() => (None, KeySource::None),
                    Expansion::Expanded(value) => {
                        (Some(ApiKey::from(value)), KeySource::EnvExpanded)
                    }
                    Expansion::Unset(var) => (None, KeySource::UnsetVar(var)),
                }
            }
            Some(ref raw_key) if !raw_key.is_empty() => {
                (Some(ApiKey::from(raw_key.as_str())), KeySource::Literal)
            }
            Some(_) => (None, KeySource::None),
            None => match lookup(CONVENTION_API_KEY_VAR).filter(|v| !v.is_empty()) {
                Some(value) => (
                    Some(ApiKey::from(value)),
                    KeySource::Convention(CONVENTION_API_KEY_VAR.to_string()),
                ),
                None => (None, KeySource::None),
            },
        };

        let config = Config {
            server: raw.server,
            upstream: UpstreamConfig {
                url: raw.upstream.url,
                api_key,
                default_referer: raw.upstream.default_referer,
                default_title: raw.upstream.default_title,
                connect_timeout_secs: raw.upstream.connect_timeout_secs,
            },
            logging: raw.logging,
        };
        config.validate()?;

        Ok((config, source))
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.url.is_empty() {
            return Err(ConfigError::Validation(
                "Upstream URL must not be empty".to_string(),
            ));
        }
        if !self.upstream.url.starts_with("http://") && !self.upstream.url.starts_with("https://")
        {
            return Err(ConfigError::Validation(format!(
                "Upstream URL '{}' must start with http:// or https://",
                self.upstream.url
            )));
        }
        Ok(())
    }
}
