//! Configuration types for the code-scanning client.

use crate::errors::{GitHubError, GitHubErrorKind};
use std::time::Duration;

/// Default GitHub API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Default GitHub API version (date-based).
pub const DEFAULT_API_VERSION: &str = "2022-11-28";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default User-Agent header.
pub const DEFAULT_USER_AGENT: &str = "code-scanning-api-wrapper/1.0";

/// Retry configuration for network failures and transient 5xx responses.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt; total attempts are `max_retries + 1`.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on every further retry.
    pub backoff_base: Duration,
    /// Ceiling for a single backoff delay.
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 4,
            backoff_base: Duration::from_millis(800),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// A configuration that never retries.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }
}

/// Rate-limit wait policy.
///
/// A rate-limited response whose reset lies within `short_wait_threshold`
/// is waited out and retried without consuming a retry slot. Longer waits
/// are surfaced to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitConfig {
    /// Longest reset wait the client absorbs on its own.
    pub short_wait_threshold: Duration,
    /// Added on top of the reset wait.
    pub wait_padding: Duration,
    /// Cap on short waits within one logical request; `None` waits as often as needed.
    pub max_short_waits: Option<u32>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            short_wait_threshold: Duration::from_secs(15),
            wait_padding: Duration::from_secs(1),
            max_short_waits: None,
        }
    }
}

/// Client configuration. Immutable once a client is built from it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// API base URL.
    pub base_url: String,
    /// API version header.
    pub api_version: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// User-Agent header.
    pub user_agent: String,
    /// Retry configuration.
    pub retry: RetryConfig,
    /// Rate limit configuration.
    pub rate_limit: RateLimitConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry: RetryConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), GitHubError> {
        if self.base_url.is_empty() {
            return Err(GitHubError::configuration("Base URL cannot be empty"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(GitHubError::new(
                GitHubErrorKind::InvalidConfiguration,
                "Base URL must start with http:// or https://",
            ));
        }

        if self.user_agent.is_empty() {
            return Err(GitHubError::configuration("User-Agent is required by GitHub API"));
        }

        if self.api_version.is_empty() {
            return Err(GitHubError::configuration("API version cannot be empty"));
        }

        if self.timeout.is_zero() {
            return Err(GitHubError::configuration("Timeout must be greater than zero"));
        }

        if self.retry.backoff_base > self.retry.max_backoff {
            return Err(GitHubError::configuration(
                "Backoff base cannot exceed the maximum backoff",
            ));
        }

        Ok(())
    }
}

/// Builder for ClientConfig.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    api_version: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
    retry: Option<RetryConfig>,
    rate_limit: Option<RateLimitConfig>,
}

impl ClientConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the API version.
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the User-Agent header.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Sets the retry configuration.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = Some(config);
        self
    }

    /// Sets the retry count, keeping the other retry settings.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        let retry = self.retry.get_or_insert_with(RetryConfig::default);
        retry.max_retries = max_retries;
        self
    }

    /// Sets the backoff base and ceiling, keeping the retry count.
    pub fn backoff(mut self, base: Duration, max: Duration) -> Self {
        let retry = self.retry.get_or_insert_with(RetryConfig::default);
        retry.backoff_base = base;
        retry.max_backoff = max;
        self
    }

    /// Disables retries.
    pub fn no_retry(mut self) -> Self {
        self.retry = Some(RetryConfig::disabled());
        self
    }

    /// Sets the rate limit configuration.
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = Some(config);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> Result<ClientConfig, GitHubError> {
        let config = ClientConfig {
            base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_version: self.api_version.unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            user_agent: self.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            retry: self.retry.unwrap_or_default(),
            rate_limit: self.rate_limit.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retry.max_retries, 4);
        assert_eq!(config.retry.backoff_base, Duration::from_millis(800));
        assert_eq!(config.retry.max_backoff, Duration::from_secs(10));
        assert_eq!(config.rate_limit.short_wait_threshold, Duration::from_secs(15));
        assert_eq!(config.rate_limit.wait_padding, Duration::from_secs(1));
        assert_eq!(config.rate_limit.max_short_waits, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::builder()
            .base_url("https://github.example.com/api/v3")
            .user_agent("test-client/1.0")
            .timeout(Duration::from_secs(60))
            .max_retries(2)
            .build()
            .unwrap();

        assert_eq!(config.base_url, "https://github.example.com/api/v3");
        assert_eq!(config.user_agent, "test-client/1.0");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.backoff_base, Duration::from_millis(800));
    }

    #[test]
    fn test_invalid_base_url() {
        let result = ClientConfig::builder().base_url("invalid-url").build();
        assert_eq!(result.unwrap_err().kind(), GitHubErrorKind::InvalidConfiguration);
    }

    #[test]
    fn test_backoff_base_above_ceiling_is_rejected() {
        let result = ClientConfig::builder()
            .backoff(Duration::from_secs(20), Duration::from_secs(10))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_no_retry() {
        let config = ClientConfig::builder().no_retry().build().unwrap();
        assert_eq!(config.retry.max_retries, 0);
    }
}
