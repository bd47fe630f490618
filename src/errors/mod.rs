//! Error types for the code-scanning client.

mod classify;

pub use classify::{classify_response, extract_message, is_rate_limited, rate_limit_reset, request_id};

use reqwest::StatusCode;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Result type alias for client operations.
pub type GitHubResult<T> = Result<T, GitHubError>;

/// Statuses the request engine treats as transient server failures.
pub const TRANSIENT_STATUSES: [u16; 4] = [500, 502, 503, 504];

/// Error kinds for categorizing client errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GitHubErrorKind {
    // Configuration errors
    /// No credential could be resolved.
    MissingAuth,
    /// Invalid client configuration.
    InvalidConfiguration,
    /// A domain call was given parameters the upstream would reject.
    InvalidParameter,

    // Classified API errors
    /// Authentication failed (401).
    Unauthorized,
    /// Resource not found (404).
    NotFound,
    /// Rate limit exceeded (429, or 403 flagged as rate limited).
    RateLimited,
    /// Any other response with status >= 400.
    Api,

    // Network errors
    /// Request timed out before a response arrived.
    Timeout,
    /// Connection could not be established or was dropped.
    ConnectionFailed,
    /// Other transport failure; not retried.
    Transport,

    // Response errors
    /// A list endpoint returned something other than a JSON array.
    UnexpectedFormat,
    /// Failed to deserialize a response body.
    DeserializationError,
    /// GraphQL payload reported errors.
    GraphQl,
}

impl fmt::Display for GitHubErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MissingAuth => "missing_auth",
            Self::InvalidConfiguration => "invalid_configuration",
            Self::InvalidParameter => "invalid_parameter",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::RateLimited => "rate_limited",
            Self::Api => "api_error",
            Self::Timeout => "timeout",
            Self::ConnectionFailed => "connection_failed",
            Self::Transport => "transport_error",
            Self::UnexpectedFormat => "unexpected_format",
            Self::DeserializationError => "deserialization_error",
            Self::GraphQl => "graphql_error",
        };
        f.write_str(name)
    }
}

/// Client error with the structured data a caller needs to branch on.
///
/// Classified API errors keep the original status, message, raw JSON
/// payload and `X-GitHub-Request-Id`, so callers never have to re-parse
/// the response.
#[derive(Error, Debug)]
pub struct GitHubError {
    kind: GitHubErrorKind,
    message: String,
    status_code: Option<u16>,
    request_id: Option<String>,
    payload: Option<Value>,
    reset_epoch: Option<i64>,
    #[source]
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for GitHubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(code) = self.status_code {
            write!(f, " (HTTP {})", code)?;
        }
        if let Some(ref id) = self.request_id {
            write!(f, " [request_id: {}]", id)?;
        }
        Ok(())
    }
}

impl GitHubError {
    /// Creates a new error.
    pub fn new(kind: GitHubErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
            request_id: None,
            payload: None,
            reset_epoch: None,
            cause: None,
        }
    }

    /// Sets the HTTP status code.
    pub fn with_status(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// Sets the upstream request ID.
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Sets the upstream request ID when one is known.
    pub fn with_request_id_opt(mut self, id: Option<String>) -> Self {
        if id.is_some() {
            self.request_id = id;
        }
        self
    }

    /// Attaches the raw JSON payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Sets the rate-limit reset time (Unix seconds).
    pub fn with_reset_epoch(mut self, epoch: i64) -> Self {
        self.reset_epoch = Some(epoch);
        self
    }

    /// Sets the underlying cause.
    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Gets the error kind.
    pub fn kind(&self) -> GitHubErrorKind {
        self.kind
    }

    /// Gets the message without kind or status decoration.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Gets the HTTP status code.
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// Gets the request ID.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Gets the raw JSON payload of the failing response, if it had one.
    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    /// Gets the disclosed rate-limit reset time (Unix seconds).
    pub fn reset_epoch(&self) -> Option<i64> {
        self.reset_epoch
    }

    /// Returns true for rate-limit errors.
    pub fn is_rate_limit(&self) -> bool {
        self.kind == GitHubErrorKind::RateLimited
    }

    /// Returns true for 500/502/503/504 responses.
    pub fn is_transient_server_error(&self) -> bool {
        self.kind == GitHubErrorKind::Api
            && self
                .status_code
                .map_or(false, |code| TRANSIENT_STATUSES.contains(&code))
    }

    /// Returns true for failures that happened before any response arrived.
    pub fn is_network(&self) -> bool {
        matches!(
            self.kind,
            GitHubErrorKind::Timeout | GitHubErrorKind::ConnectionFailed | GitHubErrorKind::Transport
        )
    }

    /// Returns true if the backoff loop may retry this error.
    ///
    /// Rate limits are not included: they follow their own short-wait rule.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            GitHubErrorKind::Timeout | GitHubErrorKind::ConnectionFailed
        ) || self.is_transient_server_error()
    }

    /// Builds a classified error for a failing response.
    pub fn from_response(
        status: StatusCode,
        message: String,
        payload: Option<Value>,
        request_id: Option<String>,
    ) -> Self {
        let (kind, fallback) = match status.as_u16() {
            401 => (GitHubErrorKind::Unauthorized, "Unauthorized"),
            404 => (GitHubErrorKind::NotFound, "Not Found"),
            _ => (GitHubErrorKind::Api, "Request failed"),
        };
        let message = if message.is_empty() {
            fallback.to_string()
        } else {
            message
        };

        let mut error = Self::new(kind, message).with_status(status.as_u16());
        if let Some(payload) = payload {
            error = error.with_payload(payload);
        }
        if let Some(id) = request_id {
            error = error.with_request_id(id);
        }
        error
    }

    /// Maps a transport failure onto the network error kinds.
    pub fn from_transport(err: reqwest::Error) -> Self {
        let (kind, prefix) = if err.is_timeout() {
            (GitHubErrorKind::Timeout, "Request timed out")
        } else if err.is_connect() || err.is_request() || err.is_body() {
            (GitHubErrorKind::ConnectionFailed, "Connection failed")
        } else {
            (GitHubErrorKind::Transport, "Request failed")
        };
        Self::new(kind, format!("{}: {}", prefix, err)).with_cause(err)
    }

    // Convenience constructors

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::InvalidConfiguration, message)
    }

    /// Creates an invalid parameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::InvalidParameter, message)
    }

    /// Creates a missing credential error.
    pub fn missing_auth(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::MissingAuth, message)
    }

    /// Creates a rate limit error.
    pub fn rate_limit(status: u16, message: impl Into<String>, reset_epoch: Option<i64>) -> Self {
        let mut error = Self::new(GitHubErrorKind::RateLimited, message).with_status(status);
        error.reset_epoch = reset_epoch;
        error
    }

    /// Creates a structural error for a list endpoint that did not return a list.
    pub fn unexpected_format(status: u16, message: impl Into<String>, payload: Value) -> Self {
        Self::new(GitHubErrorKind::UnexpectedFormat, message)
            .with_status(status)
            .with_payload(payload)
    }

    /// Creates a deserialization error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::DeserializationError, message)
    }
}
