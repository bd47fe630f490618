//! Repository security and analysis settings.

use crate::client::GitHubClient;
use crate::errors::GitHubResult;
use crate::types::FeatureStatus;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

/// Service for repository security settings.
pub struct RepoSecurityService<'a> {
    client: &'a GitHubClient,
}

impl<'a> RepoSecurityService<'a> {
    /// Creates a new repository security service.
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    /// Updates the `security_and_analysis` block of a repository.
    ///
    /// Features left unset are not sent and keep their current status.
    pub async fn set_security_and_analysis(
        &self,
        owner: &str,
        repo: &str,
        settings: &SecurityAndAnalysis,
    ) -> GitHubResult<Value> {
        let request = UpdateRepoSecurityRequest {
            security_and_analysis: settings,
        };
        self.client
            .send_json(Method::PATCH, &format!("/repos/{}/{}", owner, repo), &request)
            .await
    }
}

/// Requested status per security feature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SecurityAndAnalysis {
    /// GitHub Advanced Security.
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "status_object")]
    pub advanced_security: Option<FeatureStatus>,
    /// GitHub Code Security.
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "status_object")]
    pub code_security: Option<FeatureStatus>,
    /// Secret scanning.
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "status_object")]
    pub secret_scanning: Option<FeatureStatus>,
    /// Secret scanning push protection.
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "status_object")]
    pub secret_scanning_push_protection: Option<FeatureStatus>,
}

impl SecurityAndAnalysis {
    /// Creates an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets Advanced Security.
    pub fn advanced_security(mut self, status: FeatureStatus) -> Self {
        self.advanced_security = Some(status);
        self
    }

    /// Sets Code Security.
    pub fn code_security(mut self, status: FeatureStatus) -> Self {
        self.code_security = Some(status);
        self
    }

    /// Sets secret scanning.
    pub fn secret_scanning(mut self, status: FeatureStatus) -> Self {
        self.secret_scanning = Some(status);
        self
    }

    /// Sets push protection.
    pub fn secret_scanning_push_protection(mut self, status: FeatureStatus) -> Self {
        self.secret_scanning_push_protection = Some(status);
        self
    }
}

#[derive(Serialize)]
struct UpdateRepoSecurityRequest<'a> {
    security_and_analysis: &'a SecurityAndAnalysis,
}

#[derive(Serialize)]
struct StatusObject {
    status: FeatureStatus,
}

fn status_object<S: serde::Serializer>(
    status: &Option<FeatureStatus>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    status.map(|status| StatusObject { status }).serialize(serializer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_only_set_features_are_sent() {
        let settings = SecurityAndAnalysis::new()
            .secret_scanning(FeatureStatus::Enabled)
            .secret_scanning_push_protection(FeatureStatus::Disabled);
        let body = serde_json::to_value(UpdateRepoSecurityRequest {
            security_and_analysis: &settings,
        })
        .unwrap();

        assert_eq!(
            body,
            json!({
                "security_and_analysis": {
                    "secret_scanning": {"status": "enabled"},
                    "secret_scanning_push_protection": {"status": "disabled"}
                }
            })
        );
    }

    #[test]
    fn test_empty_settings_send_empty_object() {
        let body = serde_json::to_value(SecurityAndAnalysis::new()).unwrap();
        assert_eq!(body, json!({}));
    }
}
