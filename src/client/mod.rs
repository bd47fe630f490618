//! Request engine and transport.

use crate::auth::{Credential, CredentialProvider, TokenProvider};
use crate::config::ClientConfig;
use crate::errors::{classify_response, request_id, GitHubError, GitHubResult};
use crate::observability::{loggable_url, redact_header, Metrics, MetricsSnapshot, RequestTimer, TracingHooks};
use crate::pagination::{PaginationLinks, Paginator};
use crate::resilience::{AttemptState, RetryDecision, RetryPolicy, Sleeper, TokioSleeper};
use crate::services::*;
use bytes::Bytes;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Media type requested on every call.
pub const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// Header carrying the API version.
pub const API_VERSION_HEADER: &str = "x-github-api-version";

/// A single query parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// A scalar value.
    Scalar(String),
    /// A list, sent as the key repeated once per element.
    List(Vec<String>),
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Scalar(if value { "true" } else { "false" }.to_string())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        Self::List(values)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(values: Vec<&str>) -> Self {
        Self::List(values.into_iter().map(String::from).collect())
    }
}

/// Query parameters for a request, encoded in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(BTreeMap<String, ParamValue>);

impl QueryParams {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, replacing any previous value for `key`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds a parameter when `value` is present.
    pub fn with_opt<V: Into<ParamValue>>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.insert(key, value);
        }
        self
    }

    /// Adds a parameter in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Gets a parameter.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    /// Returns true if no parameters are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flattens into key/value pairs; lists become repeated keys.
    pub fn to_pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs = Vec::new();
        for (key, value) in &self.0 {
            match value {
                ParamValue::Scalar(v) => pairs.push((key.as_str(), v.as_str())),
                ParamValue::List(vs) => pairs.extend(vs.iter().map(|v| (key.as_str(), v.as_str()))),
            }
        }
        pairs
    }

    /// Encodes as an `application/x-www-form-urlencoded` query string.
    pub fn to_query_string(&self) -> GitHubResult<String> {
        serde_urlencoded::to_string(self.to_pairs()).map_err(|e| {
            GitHubError::invalid_parameter(format!("Failed to serialize parameters: {}", e))
        })
    }
}

/// A successful, fully buffered response.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    pub(crate) fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Gets the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Gets the headers. Lookups are case-insensitive.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Gets a header as a string.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Gets the raw body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Gets the body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parses the body as JSON, yielding `None` for empty or non-JSON bodies.
    pub fn json(&self) -> Option<Value> {
        if self.body.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }

    /// Parses the body as JSON. An empty body parses to `Value::Null`.
    pub fn into_json(self) -> GitHubResult<Value> {
        if self.body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&self.body).map_err(|e| {
            GitHubError::deserialization(format!("Failed to deserialize response: {}", e))
                .with_status(self.status.as_u16())
                .with_request_id_opt(request_id(&self.headers))
        })
    }

    /// Deserializes the body into `T`.
    pub fn json_as<T: DeserializeOwned>(&self) -> GitHubResult<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            GitHubError::deserialization(format!("Failed to deserialize response: {}", e))
                .with_status(self.status.as_u16())
                .with_request_id_opt(request_id(&self.headers))
        })
    }

    /// Gets the `X-GitHub-Request-Id` header.
    pub fn request_id(&self) -> Option<String> {
        request_id(&self.headers)
    }

    /// Parses the `Link` header.
    pub fn links(&self) -> PaginationLinks {
        PaginationLinks::from_headers(&self.headers)
    }
}

/// GitHub code-scanning API client.
///
/// Holds one credential and one pooled HTTP transport for its whole
/// lifetime. Each call runs its attempts strictly one after another.
pub struct GitHubClient {
    http: Client,
    config: ClientConfig,
    credential: Credential,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    metrics: Arc<Metrics>,
}

impl fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.config.base_url)
            .field("api_version", &self.config.api_version)
            .field("credential", &self.credential.token_prefix())
            .field("sleeper", &self.sleeper)
            .finish()
    }
}

impl GitHubClient {
    /// Creates a client for `credential`.
    pub fn new(config: ClientConfig, credential: Credential) -> GitHubResult<Self> {
        Self::with_sleeper(config, credential, Arc::new(TokioSleeper))
    }

    /// Creates a client that waits between attempts through `sleeper`.
    pub fn with_sleeper(
        config: ClientConfig,
        credential: Credential,
        sleeper: Arc<dyn Sleeper>,
    ) -> GitHubResult<Self> {
        config.validate()?;
        let http = build_transport(&config, &credential)?;
        let policy = RetryPolicy::new(config.retry.clone(), config.rate_limit.clone());

        Ok(Self {
            http,
            config,
            credential,
            policy,
            sleeper,
            metrics: Arc::new(Metrics::new()),
        })
    }

    /// Creates a client whose credential comes from the environment or `gh`.
    pub async fn from_env(config: ClientConfig) -> GitHubResult<Self> {
        GitHubClientBuilder::new().config(config).build_from_env().await
    }

    /// Creates a new client builder.
    pub fn builder() -> GitHubClientBuilder {
        GitHubClientBuilder::new()
    }

    /// Gets the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Gets the base URL.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Gets a snapshot of the request metrics.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    // Service accessors

    /// Gets the code-scanning alerts service.
    pub fn code_scanning(&self) -> CodeScanningService<'_> {
        CodeScanningService::new(self)
    }

    /// Gets the default-setup service.
    pub fn default_setup(&self) -> DefaultSetupService<'_> {
        DefaultSetupService::new(self)
    }

    /// Gets the repository security settings service.
    pub fn repo_security(&self) -> RepoSecurityService<'_> {
        RepoSecurityService::new(self)
    }

    /// Gets the GraphQL service.
    pub fn graphql(&self) -> GraphQLService<'_> {
        GraphQLService::new(self)
    }

    /// Gets the git data service.
    pub fn git_data(&self) -> GitDataService<'_> {
        GitDataService::new(self)
    }

    // Request engine

    /// Issues one logical request.
    ///
    /// `path_or_url` is either a path resolved against the base URL or an
    /// absolute `http(s)` URL used verbatim. Network failures and
    /// 500/502/503/504 responses are retried with exponential backoff;
    /// rate limits resetting within the short-wait threshold are waited
    /// out without spending retry budget. Every other failure is returned
    /// on its first occurrence.
    pub async fn execute(
        &self,
        method: Method,
        path_or_url: &str,
        params: Option<&QueryParams>,
        body: Option<&Value>,
    ) -> GitHubResult<Response> {
        let url = self.build_url(path_or_url, params)?;
        let log_url = loggable_url(&url);
        let mut state = AttemptState::default();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            TracingHooks::on_request_start(method.as_str(), log_url, attempts);
            let timer = RequestTimer::new(self.metrics.clone());

            let error = match self.send_once(&method, &url, body).await {
                Ok(response) => {
                    let elapsed = timer.success();
                    TracingHooks::on_request_complete(
                        method.as_str(),
                        log_url,
                        response.status().as_u16(),
                        elapsed,
                    );
                    return Ok(response);
                }
                Err(error) => {
                    timer.failure();
                    error
                }
            };

            match self.policy.decide(&error, state, Utc::now().timestamp()) {
                RetryDecision::WaitForReset(delay) => {
                    self.metrics.record_rate_limit_wait();
                    TracingHooks::on_rate_limit_wait(method.as_str(), log_url, error.reset_epoch(), delay);
                    state.short_waits += 1;
                    self.sleeper.sleep(delay).await;
                }
                RetryDecision::Backoff(delay) => {
                    self.metrics.record_retry();
                    state.attempt += 1;
                    TracingHooks::on_retry(method.as_str(), log_url, state.attempt, delay, &error.to_string());
                    self.sleeper.sleep(delay).await;
                }
                RetryDecision::GiveUp => {
                    TracingHooks::on_request_error(method.as_str(), log_url, &error.to_string());
                    return Err(error);
                }
            }
        }
    }

    /// Issues a request and parses the body as JSON.
    pub async fn request_json(
        &self,
        method: Method,
        path_or_url: &str,
        params: Option<&QueryParams>,
        body: Option<&Value>,
    ) -> GitHubResult<Value> {
        self.execute(method, path_or_url, params, body)
            .await?
            .into_json()
    }

    /// Makes a GET request and parses the body as JSON.
    pub async fn get_json(&self, path: &str, params: Option<&QueryParams>) -> GitHubResult<Value> {
        self.request_json(Method::GET, path, params, None).await
    }

    /// Serializes `body` as JSON, sends it and parses the response body.
    pub async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> GitHubResult<Value> {
        let body = serde_json::to_value(body).map_err(|e| {
            GitHubError::invalid_parameter(format!("Failed to serialize request body: {}", e))
        })?;
        self.request_json(method, path, None, Some(&body)).await
    }

    /// Makes a GET request and deserializes the body into `T`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, params: Option<&QueryParams>) -> GitHubResult<T> {
        self.execute(Method::GET, path, params, None).await?.json_as()
    }

    /// Returns a lazy item sequence over a list endpoint.
    pub fn paginate(&self, path: impl Into<String>, params: Option<QueryParams>) -> Paginator<'_> {
        Paginator::new(self, path, params)
    }

    /// Waits through the client's sleeper.
    pub(crate) async fn sleep(&self, duration: Duration) {
        self.sleeper.sleep(duration).await;
    }

    async fn send_once(&self, method: &Method, url: &str, body: Option<&Value>) -> GitHubResult<Response> {
        let mut request = self.http.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(GitHubError::from_transport)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(GitHubError::from_transport)?;

        classify_response(status, &headers, &body)?;
        Ok(Response::new(status, headers, body))
    }

    fn build_url(&self, path_or_url: &str, params: Option<&QueryParams>) -> GitHubResult<String> {
        let mut url = match Url::parse(path_or_url) {
            Ok(absolute) if matches!(absolute.scheme(), "http" | "https") => path_or_url.to_string(),
            _ => {
                let base = self.config.base_url.trim_end_matches('/');
                let path = path_or_url.trim_start_matches('/');
                format!("{}/{}", base, path)
            }
        };

        if let Some(params) = params.filter(|p| !p.is_empty()) {
            let query = params.to_query_string()?;
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&query);
        }

        Ok(url)
    }
}

fn build_transport(config: &ClientConfig, credential: &Credential) -> GitHubResult<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));

    let mut auth = HeaderValue::from_str(&credential.bearer())
        .map_err(|_| GitHubError::configuration("Token contains characters not allowed in a header"))?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);

    headers.insert(
        HeaderName::from_static(API_VERSION_HEADER),
        HeaderValue::from_str(&config.api_version)
            .map_err(|_| GitHubError::configuration("API version is not a valid header value"))?,
    );
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&config.user_agent)
            .map_err(|_| GitHubError::configuration("User-Agent is not a valid header value"))?,
    );

    for (name, value) in &headers {
        tracing::debug!(
            header = %name,
            value = %redact_header(name.as_str(), value.to_str().unwrap_or("<binary>")),
            "Default request header"
        );
    }

    let builder = Client::builder()
        .default_headers(headers)
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout);

    builder.build().map_err(|e| {
        GitHubError::configuration(format!("Failed to create HTTP client: {}", e)).with_cause(e)
    })
}

/// Builder for GitHubClient.
#[derive(Default)]
pub struct GitHubClientBuilder {
    config: ClientConfig,
    credential: Option<Credential>,
    provider: Option<Arc<dyn CredentialProvider>>,
    sleeper: Option<Arc<dyn Sleeper>>,
}

impl GitHubClientBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Sets the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Sets the User-Agent.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    /// Sets the retry count.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.retry.max_retries = max_retries;
        self
    }

    /// Disables retries.
    pub fn no_retry(mut self) -> Self {
        self.config.retry.max_retries = 0;
        self
    }

    /// Uses a fixed token.
    pub fn token(self, token: impl Into<String>) -> Self {
        self.credential(Credential::new(token))
    }

    /// Uses a resolved credential.
    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Uses `provider` when `build_from_env` has no explicit credential.
    pub fn credential_provider(mut self, provider: impl CredentialProvider + 'static) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    /// Replaces the sleeper used between attempts.
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    /// Builds the client from an explicit credential.
    pub fn build(self) -> GitHubResult<GitHubClient> {
        let credential = self.credential.ok_or_else(|| {
            GitHubError::missing_auth("No credential configured; set a token or use build_from_env")
        })?;
        let sleeper = self.sleeper.unwrap_or_else(|| Arc::new(TokioSleeper));
        GitHubClient::with_sleeper(self.config, credential, sleeper)
    }

    /// Builds the client, resolving the credential if none was set.
    ///
    /// Falls back to the configured provider, or to [`TokenProvider`]
    /// (`GITHUB_TOKEN`, `GH_TOKEN`, then `gh auth token`).
    pub async fn build_from_env(mut self) -> GitHubResult<GitHubClient> {
        if self.credential.is_none() {
            let credential = match &self.provider {
                Some(provider) => provider.credential().await?,
                None => TokenProvider::default().resolve().await?,
            };
            self.credential = Some(credential);
        }
        self.build()
    }
}
