//! Credential resolution for the GitHub API.
//!
//! Tokens come from `GITHUB_TOKEN`, then `GH_TOKEN`, then the local
//! `gh auth token --hostname <host>` helper. Any helper failure is folded
//! into a single "no credential" outcome.

use crate::errors::{GitHubError, GitHubResult};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Primary environment variable holding a token.
pub const PRIMARY_TOKEN_VAR: &str = "GITHUB_TOKEN";

/// Secondary environment variable holding a token.
pub const SECONDARY_TOKEN_VAR: &str = "GH_TOKEN";

/// Hostname passed to the CLI helper by default.
pub const DEFAULT_HOSTNAME: &str = "github.com";

/// Default CLI helper binary.
pub const DEFAULT_HELPER_PROGRAM: &str = "gh";

/// Default bound on the CLI helper's runtime.
pub const DEFAULT_HELPER_TIMEOUT: Duration = Duration::from_secs(10);

/// Message surfaced when no credential source produced a token.
pub const NO_CREDENTIAL_MESSAGE: &str =
    "No GitHub token found. Set GITHUB_TOKEN/GH_TOKEN or authenticate with `gh auth login`.";

/// An opaque access token.
#[derive(Clone)]
pub struct Credential(SecretString);

impl Credential {
    /// Wraps a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::new(token.into()))
    }

    /// Gets the raw token.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Builds the `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.expose())
    }

    /// Gets the token prefix for logging.
    pub fn token_prefix(&self) -> &'static str {
        let exposed = self.expose();
        if exposed.starts_with("ghp_") {
            "ghp_***"
        } else if exposed.starts_with("github_pat_") {
            "github_pat_***"
        } else if exposed.starts_with("gho_") {
            "gho_***"
        } else if exposed.starts_with("ghs_") {
            "ghs_***"
        } else {
            "***"
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.token_prefix())
    }
}

/// External CLI helper that prints a token on stdout.
///
/// Invoked as `<program> <args..> <hostname>`.
#[derive(Debug, Clone)]
pub struct CliTokenHelper {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl Default for CliTokenHelper {
    fn default() -> Self {
        Self::gh()
    }
}

impl CliTokenHelper {
    /// The GitHub CLI: `gh auth token --hostname <host>`.
    pub fn gh() -> Self {
        Self::new(DEFAULT_HELPER_PROGRAM).with_args(["auth", "token", "--hostname"])
    }

    /// A helper running `program` with no leading arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_HELPER_TIMEOUT,
        }
    }

    /// Sets the arguments placed before the hostname.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the runtime bound.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Runs the helper and returns its trimmed stdout.
    ///
    /// Returns `None` on spawn failure, timeout, non-zero exit or empty output.
    pub async fn fetch(&self, hostname: &str) -> Option<String> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(hostname)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::debug!(program = %self.program, error = %e, "Token helper could not be started");
                return None;
            }
            Err(_) => {
                tracing::debug!(
                    program = %self.program,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Token helper timed out"
                );
                return None;
            }
        };

        if !output.status.success() {
            tracing::debug!(
                program = %self.program,
                status = ?output.status.code(),
                "Token helper exited with failure"
            );
            return None;
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    }
}

/// Credential provider trait for dynamic credential resolution.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Resolves a credential or fails with `MissingAuth`.
    async fn credential(&self) -> GitHubResult<Credential>;
}

/// Static credential provider using a fixed token.
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    credential: Credential,
}

impl StaticCredentialProvider {
    /// Creates a new static credential provider.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            credential: Credential::new(token),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn credential(&self) -> GitHubResult<Credential> {
        Ok(self.credential.clone())
    }
}

/// Environment-then-CLI token resolution.
#[derive(Debug, Clone)]
pub struct TokenProvider {
    primary_var: String,
    secondary_var: String,
    hostname: String,
    helper: Option<CliTokenHelper>,
}

impl Default for TokenProvider {
    fn default() -> Self {
        Self {
            primary_var: PRIMARY_TOKEN_VAR.to_string(),
            secondary_var: SECONDARY_TOKEN_VAR.to_string(),
            hostname: DEFAULT_HOSTNAME.to_string(),
            helper: Some(CliTokenHelper::gh()),
        }
    }
}

impl TokenProvider {
    /// Creates a provider with the default variables and the `gh` helper.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the environment variable names.
    pub fn env_vars(mut self, primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        self.primary_var = primary.into();
        self.secondary_var = secondary.into();
        self
    }

    /// Sets the hostname handed to the CLI helper.
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Replaces the CLI helper.
    pub fn helper(mut self, helper: CliTokenHelper) -> Self {
        self.helper = Some(helper);
        self
    }

    /// Disables the CLI fallback.
    pub fn without_helper(mut self) -> Self {
        self.helper = None;
        self
    }

    /// Resolves a credential from the process environment.
    pub async fn resolve(&self) -> GitHubResult<Credential> {
        self.resolve_with(|name| std::env::var(name).ok()).await
    }

    /// Resolves a credential using `lookup` in place of the process environment.
    pub async fn resolve_with<F>(&self, lookup: F) -> GitHubResult<Credential>
    where
        F: Fn(&str) -> Option<String>,
    {
        for var in [&self.primary_var, &self.secondary_var] {
            if let Some(token) = lookup(var.as_str()).filter(|t| !t.is_empty()) {
                tracing::debug!(source = %var, "Resolved GitHub token from environment");
                return Ok(Credential::new(token));
            }
        }

        if let Some(helper) = &self.helper {
            if let Some(token) = helper.fetch(&self.hostname).await {
                tracing::debug!(hostname = %self.hostname, "Resolved GitHub token from CLI helper");
                return Ok(Credential::new(token));
            }
        }

        Err(GitHubError::missing_auth(NO_CREDENTIAL_MESSAGE))
    }
}

#[async_trait]
impl CredentialProvider for TokenProvider {
    async fn credential(&self) -> GitHubResult<Credential> {
        self.resolve().await
    }
}
