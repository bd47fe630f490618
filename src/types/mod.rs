//! Core data types for the code-scanning API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Code-scanning alert state, as used by list filters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    /// Open alert.
    #[default]
    Open,
    /// Dismissed by a user.
    Dismissed,
    /// Fixed by a later analysis.
    Fixed,
    /// Closed.
    Closed,
}

impl AlertState {
    /// Wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Dismissed => "dismissed",
            Self::Fixed => "fixed",
            Self::Closed => "closed",
        }
    }
}

/// State an alert can be moved to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UpdateAlertState {
    /// Reopen the alert.
    Open,
    /// Dismiss the alert; requires a reason.
    Dismissed,
}

impl UpdateAlertState {
    /// Wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Dismissed => "dismissed",
        }
    }
}

/// Alert severity filter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Critical security severity.
    Critical,
    /// High security severity.
    High,
    /// Medium security severity.
    Medium,
    /// Low security severity.
    Low,
    /// Rule severity `warning`.
    Warning,
    /// Rule severity `note`.
    Note,
    /// Rule severity `error`.
    Error,
}

impl Severity {
    /// Wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Warning => "warning",
            Self::Note => "note",
            Self::Error => "error",
        }
    }
}

/// Sort field for alert listings.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    /// Creation time.
    #[default]
    Created,
    /// Last update time.
    Updated,
}

impl SortField {
    /// Wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Ascending.
    Asc,
    /// Descending.
    #[default]
    Desc,
}

impl Direction {
    /// Wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Reason for dismissing an alert. The wire values contain spaces.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DismissedReason {
    /// Not a real problem.
    #[serde(rename = "false positive")]
    FalsePositive,
    /// Accepted risk.
    #[serde(rename = "won't fix")]
    WontFix,
    /// Only reachable from test code.
    #[serde(rename = "used in tests")]
    UsedInTests,
}

impl DismissedReason {
    /// Wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FalsePositive => "false positive",
            Self::WontFix => "won't fix",
            Self::UsedInTests => "used in tests",
        }
    }
}

/// Default-setup state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DefaultSetupState {
    /// Default setup is on.
    Configured,
    /// Default setup is off.
    Disabled,
}

/// CodeQL query suite.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuerySuite {
    /// The default suite.
    #[default]
    Default,
    /// The extended suite.
    Extended,
}

/// Threat model used by default setup.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ThreatModel {
    /// Remote sources only.
    Remote,
    /// Remote and local sources.
    #[default]
    RemoteAndLocal,
}

/// Runner type used by default setup.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunnerType {
    /// GitHub-hosted runners.
    #[default]
    Standard,
    /// Self-hosted runners; pair with a runner label.
    SelfHosted,
}

/// Status of a repository security feature.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeatureStatus {
    /// Feature enabled.
    Enabled,
    /// Feature disabled.
    Disabled,
}

impl fmt::Display for AlertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for UpdateAlertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for DismissedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule metadata attached to an alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    /// Rule ID.
    pub id: Option<String>,
    /// Rule name.
    #[serde(default)]
    pub name: Option<String>,
    /// Rule severity (`error`, `warning`, `note`).
    #[serde(default)]
    pub severity: Option<String>,
    /// Security severity (`critical`, `high`, `medium`, `low`).
    #[serde(default)]
    pub security_severity_level: Option<String>,
    /// Short description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Analysis tool that produced an alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertTool {
    /// Tool name.
    pub name: Option<String>,
    /// Tool GUID.
    #[serde(default)]
    pub guid: Option<String>,
    /// Tool version.
    #[serde(default)]
    pub version: Option<String>,
}

/// A code-scanning alert.
///
/// Only the fields callers commonly branch on are typed. Unknown fields are
/// ignored, so payloads from newer API versions still decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeScanningAlert {
    /// Per-repository alert number.
    pub number: u64,
    /// Alert state.
    pub state: AlertState,
    /// Rule metadata.
    pub rule: AlertRule,
    /// Tool metadata.
    #[serde(default)]
    pub tool: Option<AlertTool>,
    /// API URL.
    #[serde(default)]
    pub url: Option<String>,
    /// HTML URL.
    #[serde(default)]
    pub html_url: Option<String>,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Dismissal time.
    #[serde(default)]
    pub dismissed_at: Option<DateTime<Utc>>,
    /// Dismissal reason.
    #[serde(default)]
    pub dismissed_reason: Option<DismissedReason>,
    /// Dismissal comment.
    #[serde(default)]
    pub dismissed_comment: Option<String>,
    /// Most recent instance, kept loosely typed.
    #[serde(default)]
    pub most_recent_instance: Option<serde_json::Value>,
}

impl CodeScanningAlert {
    /// Effective severity: security severity first, then rule severity.
    pub fn severity(&self) -> Option<&str> {
        self.rule
            .security_severity_level
            .as_deref()
            .or(self.rule.severity.as_deref())
    }
}
