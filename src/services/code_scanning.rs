//! Code-scanning alert and autofix operations.

use crate::client::{GitHubClient, QueryParams};
use crate::errors::{GitHubError, GitHubErrorKind, GitHubResult};
use crate::pagination::Paginator;
use crate::types::{
    AlertState, CodeScanningAlert, Direction, DismissedReason, Severity, SortField, UpdateAlertState,
};
use reqwest::Method;
use serde_json::{json, Map, Value};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Largest page size the alerts endpoints accept.
pub const MAX_PER_PAGE: u32 = 100;

/// Default interval between autofix status polls.
pub const DEFAULT_AUTOFIX_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default bound on waiting for an autofix.
pub const DEFAULT_AUTOFIX_TIMEOUT: Duration = Duration::from_secs(900);

/// Service for code-scanning operations.
pub struct CodeScanningService<'a> {
    client: &'a GitHubClient,
}

impl<'a> CodeScanningService<'a> {
    /// Creates a new code-scanning service.
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    // Alerts

    /// Lazily iterates the alerts of a repository.
    pub fn alerts_for_repo(
        &self,
        owner: &str,
        repo: &str,
        params: &ListAlertsParams,
    ) -> GitHubResult<Paginator<'a>> {
        let query = params.to_query()?;
        Ok(self.client.paginate(
            format!("/repos/{}/{}/code-scanning/alerts", owner, repo),
            Some(query),
        ))
    }

    /// Lists every alert of a repository matching `params`.
    pub async fn list_alerts_for_repo(
        &self,
        owner: &str,
        repo: &str,
        params: &ListAlertsParams,
    ) -> GitHubResult<Vec<Value>> {
        self.alerts_for_repo(owner, repo, params)?.collect_all().await
    }

    /// Lists alerts decoded into [`CodeScanningAlert`].
    pub async fn list_alerts_typed(
        &self,
        owner: &str,
        repo: &str,
        params: &ListAlertsParams,
    ) -> GitHubResult<Vec<CodeScanningAlert>> {
        self.list_alerts_for_repo(owner, repo, params)
            .await?
            .into_iter()
            .map(|item| {
                serde_json::from_value(item).map_err(|e| {
                    GitHubError::deserialization(format!("Failed to deserialize alert: {}", e))
                })
            })
            .collect()
    }

    /// Gets an alert.
    pub async fn get_alert(&self, owner: &str, repo: &str, alert_number: u64) -> GitHubResult<Value> {
        self.client
            .get_json(&alert_path(owner, repo, alert_number), None)
            .await
    }

    /// Updates an alert's state.
    pub async fn update_alert(
        &self,
        owner: &str,
        repo: &str,
        alert_number: u64,
        update: &UpdateAlert,
    ) -> GitHubResult<Value> {
        let body = update.to_body()?;
        self.client
            .request_json(
                Method::PATCH,
                &alert_path(owner, repo, alert_number),
                None,
                Some(&body),
            )
            .await
    }

    /// Dismisses an alert.
    pub async fn dismiss_alert(
        &self,
        owner: &str,
        repo: &str,
        alert_number: u64,
        reason: DismissedReason,
        comment: &str,
        create_request: Option<bool>,
    ) -> GitHubResult<Value> {
        let mut update = UpdateAlert::dismissed(reason).with_comment(comment);
        update.create_request = create_request;
        self.update_alert(owner, repo, alert_number, &update).await
    }

    /// Reopens a dismissed alert.
    pub async fn reopen_alert(&self, owner: &str, repo: &str, alert_number: u64) -> GitHubResult<Value> {
        self.update_alert(owner, repo, alert_number, &UpdateAlert::open())
            .await
    }

    /// Lists the instances of an alert.
    pub async fn list_instances(
        &self,
        owner: &str,
        repo: &str,
        alert_number: u64,
        params: &ListInstancesParams,
    ) -> GitHubResult<Vec<Value>> {
        self.client
            .paginate(
                format!("{}/instances", alert_path(owner, repo, alert_number)),
                Some(params.to_query()),
            )
            .collect_all()
            .await
    }

    // Autofix

    /// Gets the autofix status payload of an alert.
    pub async fn get_autofix_status(
        &self,
        owner: &str,
        repo: &str,
        alert_number: u64,
    ) -> GitHubResult<Value> {
        self.client
            .get_json(&autofix_path(owner, repo, alert_number), None)
            .await
    }

    /// Starts autofix generation. Not every alert is eligible.
    pub async fn create_autofix(&self, owner: &str, repo: &str, alert_number: u64) -> GitHubResult<Value> {
        self.client
            .request_json(Method::POST, &autofix_path(owner, repo, alert_number), None, None)
            .await
    }

    /// Commits a generated autofix to an existing branch.
    pub async fn commit_autofix(
        &self,
        owner: &str,
        repo: &str,
        alert_number: u64,
        target_ref: &str,
        message: Option<&str>,
    ) -> GitHubResult<Value> {
        let mut body = Map::new();
        body.insert("target_ref".to_string(), json!(target_ref));
        if let Some(message) = message.filter(|m| !m.is_empty()) {
            body.insert("message".to_string(), json!(message));
        }
        self.client
            .request_json(
                Method::POST,
                &format!("{}/commits", autofix_path(owner, repo, alert_number)),
                None,
                Some(&Value::Object(body)),
            )
            .await
    }

    /// Polls the autofix status until it settles.
    ///
    /// Returns `true` once the autofix is ready and `false` when it failed,
    /// does not exist (404) or did not settle within `timeout`. Other API
    /// errors are logged and polling continues. Network failures that
    /// survive the engine's retries and unreadable payloads are returned.
    pub async fn wait_for_autofix(
        &self,
        owner: &str,
        repo: &str,
        alert_number: u64,
        poll_interval: Duration,
        timeout: Duration,
    ) -> GitHubResult<bool> {
        if poll_interval.is_zero() {
            return Err(GitHubError::invalid_parameter("Poll interval must be greater than zero"));
        }

        let started = Instant::now();
        let mut waited = Duration::ZERO;

        while waited < timeout && started.elapsed() < timeout {
            match self.get_autofix_status(owner, repo, alert_number).await {
                Ok(payload) => match AutofixStatus::from_payload(&payload) {
                    AutofixStatus::Ready => return Ok(true),
                    AutofixStatus::Failed => return Ok(false),
                    AutofixStatus::Pending => {
                        debug!(owner, repo, alert_number, "Autofix still pending");
                    }
                },
                Err(e) if e.kind() == GitHubErrorKind::NotFound => return Ok(false),
                Err(e)
                    if matches!(
                        e.kind(),
                        GitHubErrorKind::Unauthorized | GitHubErrorKind::RateLimited | GitHubErrorKind::Api
                    ) =>
                {
                    warn!(owner, repo, alert_number, error = %e, "Autofix status error");
                }
                Err(e) => return Err(e),
            }

            self.client.sleep(poll_interval).await;
            waited += poll_interval;
        }

        Ok(false)
    }
}

fn alert_path(owner: &str, repo: &str, alert_number: u64) -> String {
    format!("/repos/{}/{}/code-scanning/alerts/{}", owner, repo, alert_number)
}

fn autofix_path(owner: &str, repo: &str, alert_number: u64) -> String {
    format!("{}/autofix", alert_path(owner, repo, alert_number))
}

fn clamp_per_page(per_page: u32) -> u32 {
    per_page.clamp(1, MAX_PER_PAGE)
}

/// Filters for listing repository alerts.
#[derive(Debug, Clone)]
pub struct ListAlertsParams {
    /// Alert state.
    pub state: AlertState,
    /// Severity filter.
    pub severity: Option<Severity>,
    /// Tool name; exclusive with `tool_guid`.
    pub tool_name: Option<String>,
    /// Tool GUID; exclusive with `tool_name`.
    pub tool_guid: Option<String>,
    /// Git ref to list alerts for.
    pub git_ref: Option<String>,
    /// Pull request number.
    pub pr: Option<u64>,
    /// Sort field.
    pub sort: SortField,
    /// Sort direction.
    pub direction: Direction,
    /// Assignee filter.
    pub assignees: Option<String>,
    /// Page size, clamped to `1..=100`.
    pub per_page: u32,
}

impl Default for ListAlertsParams {
    fn default() -> Self {
        Self {
            state: AlertState::default(),
            severity: None,
            tool_name: None,
            tool_guid: None,
            git_ref: None,
            pr: None,
            sort: SortField::default(),
            direction: Direction::default(),
            assignees: None,
            per_page: MAX_PER_PAGE,
        }
    }
}

impl ListAlertsParams {
    /// Creates the default filter: open alerts, newest first.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the state.
    pub fn state(mut self, state: AlertState) -> Self {
        self.state = state;
        self
    }

    /// Sets the severity.
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Sets the tool name.
    pub fn tool_name(mut self, name: impl Into<String>) -> Self {
        self.tool_name = Some(name.into());
        self
    }

    /// Sets the tool GUID.
    pub fn tool_guid(mut self, guid: impl Into<String>) -> Self {
        self.tool_guid = Some(guid.into());
        self
    }

    /// Sets the git ref.
    pub fn git_ref(mut self, git_ref: impl Into<String>) -> Self {
        self.git_ref = Some(git_ref.into());
        self
    }

    /// Sets the pull request number.
    pub fn pr(mut self, pr: u64) -> Self {
        self.pr = Some(pr);
        self
    }

    /// Sets the page size.
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    /// Builds the query, rejecting combinations the API refuses.
    pub fn to_query(&self) -> GitHubResult<QueryParams> {
        let tool_name = non_empty(&self.tool_name);
        let tool_guid = non_empty(&self.tool_guid);
        if tool_name.is_some() && tool_guid.is_some() {
            return Err(GitHubError::invalid_parameter(
                "Specify only one of tool_name or tool_guid",
            ));
        }

        Ok(QueryParams::new()
            .with("state", self.state.as_str())
            .with("sort", self.sort.as_str())
            .with("direction", self.direction.as_str())
            .with("per_page", clamp_per_page(self.per_page))
            .with_opt("severity", self.severity.map(|s| s.as_str()))
            .with_opt("tool_name", tool_name)
            .with_opt("tool_guid", tool_guid)
            .with_opt("ref", non_empty(&self.git_ref))
            .with_opt("pr", self.pr)
            .with_opt("assignees", non_empty(&self.assignees)))
    }
}

/// Filters for listing alert instances.
#[derive(Debug, Clone)]
pub struct ListInstancesParams {
    /// Git ref.
    pub git_ref: Option<String>,
    /// Pull request number.
    pub pr: Option<u64>,
    /// Page size, clamped to `1..=100`.
    pub per_page: u32,
}

impl Default for ListInstancesParams {
    fn default() -> Self {
        Self {
            git_ref: None,
            pr: None,
            per_page: MAX_PER_PAGE,
        }
    }
}

impl ListInstancesParams {
    fn to_query(&self) -> QueryParams {
        QueryParams::new()
            .with("per_page", clamp_per_page(self.per_page))
            .with_opt("ref", non_empty(&self.git_ref))
            .with_opt("pr", self.pr)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Alert state change.
#[derive(Debug, Clone)]
pub struct UpdateAlert {
    /// Target state.
    pub state: UpdateAlertState,
    /// Required when dismissing.
    pub dismissed_reason: Option<DismissedReason>,
    /// Sent only when dismissing.
    pub dismissed_comment: Option<String>,
    /// Request a dismissal review instead of dismissing directly.
    pub create_request: Option<bool>,
    /// Replaces the assignees.
    pub assignees: Option<Vec<String>>,
}

impl UpdateAlert {
    /// Reopens the alert.
    pub fn open() -> Self {
        Self {
            state: UpdateAlertState::Open,
            dismissed_reason: None,
            dismissed_comment: None,
            create_request: None,
            assignees: None,
        }
    }

    /// Dismisses the alert for `reason`.
    pub fn dismissed(reason: DismissedReason) -> Self {
        Self {
            state: UpdateAlertState::Dismissed,
            dismissed_reason: Some(reason),
            ..Self::open()
        }
    }

    /// Sets the dismissal comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.dismissed_comment = Some(comment.into());
        self
    }

    /// Sets the assignees.
    pub fn with_assignees(mut self, assignees: Vec<String>) -> Self {
        self.assignees = Some(assignees);
        self
    }

    /// Builds the PATCH body.
    pub fn to_body(&self) -> GitHubResult<Value> {
        let mut body = Map::new();
        body.insert("state".to_string(), json!(self.state.as_str()));

        if self.state == UpdateAlertState::Dismissed {
            let reason = self.dismissed_reason.ok_or_else(|| {
                GitHubError::invalid_parameter("dismissed_reason is required when dismissing an alert")
            })?;
            body.insert("dismissed_reason".to_string(), json!(reason.as_str()));
            if let Some(comment) = &self.dismissed_comment {
                body.insert("dismissed_comment".to_string(), json!(comment));
            }
        }

        if let Some(create_request) = self.create_request {
            body.insert("create_request".to_string(), json!(create_request));
        }
        if let Some(assignees) = &self.assignees {
            body.insert("assignees".to_string(), json!(assignees));
        }

        Ok(Value::Object(body))
    }
}

/// Readiness of an autofix job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutofixStatus {
    /// Still generating, or an unrecognized status.
    Pending,
    /// Ready to commit.
    Ready,
    /// Generation failed.
    Failed,
}

impl AutofixStatus {
    /// Reads the status from a payload.
    ///
    /// The field has been published as both `status` and `state`; the first
    /// non-empty one wins.
    pub fn from_payload(payload: &Value) -> Self {
        let raw = ["status", "state"]
            .iter()
            .filter_map(|field| payload.get(*field).and_then(Value::as_str))
            .find(|v| !v.is_empty())
            .unwrap_or_default()
            .to_lowercase();

        match raw.as_str() {
            "ready" | "completed" | "complete" | "succeeded" => Self::Ready,
            "failed" | "error" => Self::Failed,
            _ => Self::Pending,
        }
    }
}
