//! Code-scanning default-setup operations.

use crate::client::GitHubClient;
use crate::errors::GitHubResult;
use crate::types::{DefaultSetupState, QuerySuite, RunnerType, ThreatModel};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

/// Service for default-setup configuration.
pub struct DefaultSetupService<'a> {
    client: &'a GitHubClient,
}

impl<'a> DefaultSetupService<'a> {
    /// Creates a new default-setup service.
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    /// Gets the default-setup configuration.
    pub async fn get(&self, owner: &str, repo: &str) -> GitHubResult<Value> {
        self.client.get_json(&setup_path(owner, repo), None).await
    }

    /// Turns default setup on with `config`.
    pub async fn configure(
        &self,
        owner: &str,
        repo: &str,
        config: &DefaultSetupConfig,
    ) -> GitHubResult<Value> {
        let request = UpdateDefaultSetupRequest {
            state: DefaultSetupState::Configured,
            query_suite: Some(config.query_suite),
            threat_model: Some(config.threat_model),
            runner_type: Some(config.runner_type),
            runner_label: config.runner_label.as_deref().filter(|l| !l.is_empty()),
            languages: Some(config.languages.as_slice()).filter(|l| !l.is_empty()),
        };
        self.client
            .send_json(Method::PATCH, &setup_path(owner, repo), &request)
            .await
    }

    /// Turns default setup off.
    pub async fn disable(&self, owner: &str, repo: &str) -> GitHubResult<Value> {
        let request = UpdateDefaultSetupRequest {
            state: DefaultSetupState::Disabled,
            query_suite: None,
            threat_model: None,
            runner_type: None,
            runner_label: None,
            languages: None,
        };
        self.client
            .send_json(Method::PATCH, &setup_path(owner, repo), &request)
            .await
    }
}

fn setup_path(owner: &str, repo: &str) -> String {
    format!("/repos/{}/{}/code-scanning/default-setup", owner, repo)
}

/// Default-setup settings.
#[derive(Debug, Clone, Default)]
pub struct DefaultSetupConfig {
    /// Query suite.
    pub query_suite: QuerySuite,
    /// Threat model.
    pub threat_model: ThreatModel,
    /// Runner type.
    pub runner_type: RunnerType,
    /// Runner label for self-hosted runners.
    pub runner_label: Option<String>,
    /// Languages to analyze; empty lets the API pick.
    pub languages: Vec<String>,
}

impl DefaultSetupConfig {
    /// Creates the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the query suite.
    pub fn query_suite(mut self, suite: QuerySuite) -> Self {
        self.query_suite = suite;
        self
    }

    /// Sets the threat model.
    pub fn threat_model(mut self, model: ThreatModel) -> Self {
        self.threat_model = model;
        self
    }

    /// Runs on self-hosted runners carrying `label`.
    pub fn self_hosted(mut self, label: impl Into<String>) -> Self {
        self.runner_type = RunnerType::SelfHosted;
        self.runner_label = Some(label.into());
        self
    }

    /// Sets the languages.
    pub fn languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Serialize)]
struct UpdateDefaultSetupRequest<'a> {
    state: DefaultSetupState,
    #[serde(skip_serializing_if = "Option::is_none")]
    query_suite: Option<QuerySuite>,
    #[serde(skip_serializing_if = "Option::is_none")]
    threat_model: Option<ThreatModel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    runner_type: Option<RunnerType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    runner_label: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    languages: Option<&'a [String]>,
}
