//! # GitHub Code Scanning Client
//!
//! A resilient client for GitHub's code-scanning REST surface:
//! - Token resolution from `GITHUB_TOKEN`, `GH_TOKEN` or `gh auth token`
//! - A request engine that retries network failures and 5xx responses
//!   with capped exponential backoff and waits out short rate limits
//! - Lazy `Link`-header pagination
//! - Structured errors carrying status, message, payload and request ID
//! - Thin services for alerts, autofix, default setup, repository
//!   security settings and a GraphQL passthrough
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use integrations_code_scanning::{ClientConfig, GitHubClient, ListAlertsParams, Severity};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GitHubClient::from_env(ClientConfig::default()).await?;
//!
//!     let params = ListAlertsParams::new().severity(Severity::High);
//!     let alerts = client
//!         .code_scanning()
//!         .list_alerts_for_repo("octo-org", "octo-repo", &params)
//!         .await?;
//!     for alert in alerts {
//!         println!("#{} {}", alert["number"], alert["rule"]["id"]);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod config;
pub mod errors;
pub mod types;

// Authentication
pub mod auth;

// Request engine and transport
pub mod client;

// Pagination handling
pub mod pagination;

// API services
pub mod services;

// Retry policy
pub mod resilience;

// Observability
pub mod observability;

// Re-exports for convenience
pub use auth::{Credential, CredentialProvider, StaticCredentialProvider, TokenProvider};
pub use client::{GitHubClient, GitHubClientBuilder, ParamValue, QueryParams, Response};
pub use config::{ClientConfig, ClientConfigBuilder, RateLimitConfig, RetryConfig};
pub use errors::{GitHubError, GitHubErrorKind, GitHubResult};
pub use pagination::{parse_link_header, Page, PaginationLinks, Paginator};
pub use resilience::{Sleeper, TokioSleeper};
pub use services::*;
pub use types::*;
