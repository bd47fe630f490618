//! Domain services against a mock upstream.

mod common;

use common::*;
use integrations_code_scanning::{
    DefaultSetupConfig, DismissedReason, FeatureStatus, GitHubErrorKind, ListAlertsParams,
    QuerySuite, SecurityAndAnalysis, Severity, ThreatModel, TreeShaCache,
};
use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

const ALERTS: &str = "/repos/octo-org/octo-repo/code-scanning/alerts";

fn alert(number: u64) -> serde_json::Value {
    json!({
        "number": number,
        "state": "open",
        "created_at": "2024-05-01T12:00:00Z",
        "html_url": format!("https://github.com/octo-org/octo-repo/security/code-scanning/{}", number),
        "rule": {"id": "js/xss", "severity": "error", "security_severity_level": "high"},
        "tool": {"name": "CodeQL", "version": "2.17.0"}
    })
}

// Alerts

#[tokio::test]
async fn test_list_alerts_sends_default_filters() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path(ALERTS))
        .and(query_param("state", "open"))
        .and(query_param("sort", "created"))
        .and(query_param("direction", "desc"))
        .and(query_param("per_page", "100"))
        .and(query_param("severity", "high"))
        .respond_with(success_response(json!([alert(1), alert(2)])))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server, RecordingSleeper::new());

    let params = ListAlertsParams::new().severity(Severity::High);
    let alerts = assert_ok!(
        client
            .code_scanning()
            .list_alerts_for_repo("octo-org", "octo-repo", &params)
            .await
    );

    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[1]["number"], json!(2));
}

#[tokio::test]
async fn test_list_alerts_typed_decodes_alerts() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path(ALERTS))
        .respond_with(success_response(json!([alert(7)])))
        .mount(&server)
        .await;
    let client = client_for(&server, RecordingSleeper::new());

    let alerts = assert_ok!(
        client
            .code_scanning()
            .list_alerts_typed("octo-org", "octo-repo", &ListAlertsParams::new())
            .await
    );

    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].number, 7);
    assert_eq!(alerts[0].severity(), Some("high"));
}

#[tokio::test]
async fn test_tool_name_and_guid_are_rejected_before_sending() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path(ALERTS))
        .respond_with(success_response(json!([])))
        .expect(0)
        .mount(&server)
        .await;
    let client = client_for(&server, RecordingSleeper::new());

    let params = ListAlertsParams::new().tool_name("CodeQL").tool_guid("abc");
    let err = assert_err!(
        client
            .code_scanning()
            .list_alerts_for_repo("octo-org", "octo-repo", &params)
            .await
    );
    assert_eq!(err.kind(), GitHubErrorKind::InvalidParameter);
}

#[tokio::test]
async fn test_dismiss_alert_body() {
    let server = setup_mock_server().await;
    Mock::given(method("PATCH"))
        .and(path(format!("{}/42", ALERTS)))
        .and(body_json(json!({
            "state": "dismissed",
            "dismissed_reason": "false positive",
            "dismissed_comment": "Sanitized upstream",
            "create_request": false
        })))
        .respond_with(success_response(json!({"number": 42, "state": "dismissed"})))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server, RecordingSleeper::new());

    let updated = assert_ok!(
        client
            .code_scanning()
            .dismiss_alert(
                "octo-org",
                "octo-repo",
                42,
                DismissedReason::FalsePositive,
                "Sanitized upstream",
                Some(false),
            )
            .await
    );
    assert_eq!(updated["state"], json!("dismissed"));
}

#[tokio::test]
async fn test_reopen_alert_sends_only_state() {
    let server = setup_mock_server().await;
    Mock::given(method("PATCH"))
        .and(path(format!("{}/42", ALERTS)))
        .and(body_json(json!({"state": "open"})))
        .respond_with(success_response(json!({"number": 42, "state": "open"})))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server, RecordingSleeper::new());

    assert_ok!(client.code_scanning().reopen_alert("octo-org", "octo-repo", 42).await);
}

#[tokio::test]
async fn test_get_alert_not_found() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/9", ALERTS)))
        .respond_with(error_response(404, "No alert found for alert number 9"))
        .mount(&server)
        .await;
    let client = client_for(&server, RecordingSleeper::new());

    let err = assert_err!(client.code_scanning().get_alert("octo-org", "octo-repo", 9).await);
    assert_eq!(err.kind(), GitHubErrorKind::NotFound);
    assert_eq!(err.message(), "No alert found for alert number 9");
}

// Autofix

#[tokio::test]
async fn test_create_autofix_posts_without_body() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/5/autofix", ALERTS)))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"status": "pending"})))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server, RecordingSleeper::new());

    let status = assert_ok!(client.code_scanning().create_autofix("octo-org", "octo-repo", 5).await);
    assert_eq!(status["status"], json!("pending"));

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].body.is_empty());
}

#[tokio::test]
async fn test_commit_autofix_body() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/5/autofix/commits", ALERTS)))
        .and(body_json(json!({"target_ref": "refs/heads/fix-xss", "message": "Fix XSS"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"sha": "abc123"})))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server, RecordingSleeper::new());

    let commit = assert_ok!(
        client
            .code_scanning()
            .commit_autofix("octo-org", "octo-repo", 5, "refs/heads/fix-xss", Some("Fix XSS"))
            .await
    );
    assert_eq!(commit["sha"], json!("abc123"));
}

#[tokio::test]
async fn test_wait_for_autofix_until_ready() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/5/autofix", ALERTS)))
        .respond_with(success_response(json!({"status": "pending"})))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/5/autofix", ALERTS)))
        .respond_with(success_response(json!({"status": "Ready"})))
        .mount(&server)
        .await;
    let sleeper = RecordingSleeper::new();
    let client = client_for(&server, sleeper.clone());

    let ready = assert_ok!(
        client
            .code_scanning()
            .wait_for_autofix("octo-org", "octo-repo", 5, Duration::from_secs(10), Duration::from_secs(900))
            .await
    );

    assert!(ready);
    assert_eq!(sleeper.delays(), vec![Duration::from_secs(10), Duration::from_secs(10)]);
}

#[tokio::test]
async fn test_wait_for_autofix_reads_state_field() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/5/autofix", ALERTS)))
        .respond_with(success_response(json!({"status": "", "state": "failed"})))
        .mount(&server)
        .await;
    let client = client_for(&server, RecordingSleeper::new());

    let ready = assert_ok!(
        client
            .code_scanning()
            .wait_for_autofix("octo-org", "octo-repo", 5, Duration::from_secs(10), Duration::from_secs(900))
            .await
    );
    assert!(!ready);
}

#[tokio::test]
async fn test_wait_for_autofix_missing_job() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/5/autofix", ALERTS)))
        .respond_with(error_response(404, "Not Found"))
        .expect(1)
        .mount(&server)
        .await;
    let sleeper = RecordingSleeper::new();
    let client = client_for(&server, sleeper.clone());

    let ready = assert_ok!(
        client
            .code_scanning()
            .wait_for_autofix("octo-org", "octo-repo", 5, Duration::from_secs(10), Duration::from_secs(900))
            .await
    );
    assert!(!ready);
    assert!(sleeper.delays().is_empty());
}

#[tokio::test]
async fn test_wait_for_autofix_gives_up_after_timeout() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/5/autofix", ALERTS)))
        .respond_with(success_response(json!({"status": "pending"})))
        .expect(3)
        .mount(&server)
        .await;
    let sleeper = RecordingSleeper::new();
    let client = client_for(&server, sleeper.clone());

    let ready = assert_ok!(
        client
            .code_scanning()
            .wait_for_autofix("octo-org", "octo-repo", 5, Duration::from_secs(10), Duration::from_secs(30))
            .await
    );
    assert!(!ready);
    assert_eq!(sleeper.delays().len(), 3);
}

#[tokio::test]
async fn test_wait_for_autofix_keeps_polling_after_api_error() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/5/autofix", ALERTS)))
        .respond_with(error_response(403, "Resource not accessible by integration"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/5/autofix", ALERTS)))
        .respond_with(success_response(json!({"status": "completed"})))
        .mount(&server)
        .await;
    let sleeper = RecordingSleeper::new();
    let client = client_for(&server, sleeper.clone());

    let ready = assert_ok!(
        client
            .code_scanning()
            .wait_for_autofix("octo-org", "octo-repo", 5, Duration::from_secs(5), Duration::from_secs(60))
            .await
    );
    assert!(ready);
    assert_eq!(sleeper.delays(), vec![Duration::from_secs(5)]);
}

#[tokio::test]
async fn test_wait_for_autofix_stops_on_unreadable_status() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/5/autofix", ALERTS)))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>upstream proxy</html>"))
        .expect(1)
        .mount(&server)
        .await;
    let sleeper = RecordingSleeper::new();
    let client = client_for(&server, sleeper.clone());

    let err = assert_err!(
        client
            .code_scanning()
            .wait_for_autofix("octo-org", "octo-repo", 5, Duration::from_secs(10), Duration::from_secs(900))
            .await
    );
    assert_eq!(err.kind(), GitHubErrorKind::DeserializationError);
    assert_eq!(err.status_code(), Some(200));
    assert!(sleeper.delays().is_empty());
}

#[tokio::test]
async fn test_wait_for_autofix_rejects_zero_interval() {
    let server = setup_mock_server().await;
    let client = client_for(&server, RecordingSleeper::new());

    let err = assert_err!(
        client
            .code_scanning()
            .wait_for_autofix("octo-org", "octo-repo", 5, Duration::ZERO, Duration::from_secs(60))
            .await
    );
    assert_eq!(err.kind(), GitHubErrorKind::InvalidParameter);
}

// Default setup

#[tokio::test]
async fn test_configure_default_setup_self_hosted_body() {
    let server = setup_mock_server().await;
    Mock::given(method("PATCH"))
        .and(path("/repos/octo-org/octo-repo/code-scanning/default-setup"))
        .and(body_json(json!({
            "state": "configured",
            "query_suite": "extended",
            "threat_model": "remote",
            "runner_type": "self_hosted",
            "runner_label": "codeql-large",
            "languages": ["python", "javascript-typescript"]
        })))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"run_id": 42})))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server, RecordingSleeper::new());

    let config = DefaultSetupConfig::new()
        .query_suite(QuerySuite::Extended)
        .threat_model(ThreatModel::Remote)
        .self_hosted("codeql-large")
        .languages(["python", "javascript-typescript"]);
    let run = assert_ok!(
        client
            .default_setup()
            .configure("octo-org", "octo-repo", &config)
            .await
    );
    assert_eq!(run["run_id"], json!(42));
}

#[tokio::test]
async fn test_configure_default_setup_omits_empty_fields() {
    let server = setup_mock_server().await;
    Mock::given(method("PATCH"))
        .and(path("/repos/octo-org/octo-repo/code-scanning/default-setup"))
        .and(body_json(json!({
            "state": "configured",
            "query_suite": "default",
            "threat_model": "remote_and_local",
            "runner_type": "standard"
        })))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server, RecordingSleeper::new());

    assert_ok!(
        client
            .default_setup()
            .configure("octo-org", "octo-repo", &DefaultSetupConfig::new())
            .await
    );
}

#[tokio::test]
async fn test_disable_default_setup_body() {
    let server = setup_mock_server().await;
    Mock::given(method("PATCH"))
        .and(path("/repos/octo-org/octo-repo/code-scanning/default-setup"))
        .and(body_json(json!({"state": "disabled"})))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server, RecordingSleeper::new());

    assert_ok!(client.default_setup().disable("octo-org", "octo-repo").await);
}

// Repository security

#[tokio::test]
async fn test_security_and_analysis_body() {
    let server = setup_mock_server().await;
    Mock::given(method("PATCH"))
        .and(path("/repos/octo-org/octo-repo"))
        .and(body_json(json!({
            "security_and_analysis": {
                "advanced_security": {"status": "enabled"},
                "secret_scanning_push_protection": {"status": "disabled"}
            }
        })))
        .respond_with(success_response(json!({"full_name": "octo-org/octo-repo"})))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server, RecordingSleeper::new());

    let settings = SecurityAndAnalysis::new()
        .advanced_security(FeatureStatus::Enabled)
        .secret_scanning_push_protection(FeatureStatus::Disabled);
    assert_ok!(
        client
            .repo_security()
            .set_security_and_analysis("octo-org", "octo-repo", &settings)
            .await
    );
}

// GraphQL

#[derive(Debug, Deserialize, PartialEq)]
struct Viewer {
    login: String,
}

#[derive(Debug, Deserialize, PartialEq)]
struct ViewerData {
    viewer: Viewer,
}

#[tokio::test]
async fn test_graphql_query_returns_data() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_json(json!({"query": "query { viewer { login } }", "variables": {}})))
        .respond_with(success_response(json!({"data": {"viewer": {"login": "octocat"}}})))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server, RecordingSleeper::new());

    let data: ViewerData = assert_ok!(
        client
            .graphql()
            .query("query { viewer { login } }", None)
            .await
    );
    assert_eq!(data.viewer.login, "octocat");
}

#[tokio::test]
async fn test_graphql_errors_are_raised_with_payload() {
    let server = setup_mock_server().await;
    let payload = json!({
        "data": null,
        "errors": [{"type": "NOT_FOUND", "message": "Could not resolve to a Repository"}]
    });
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(success_response(payload.clone()))
        .mount(&server)
        .await;
    let client = client_for(&server, RecordingSleeper::new());

    let err = assert_err!(
        client
            .graphql()
            .execute(
                "query($o: String!, $r: String!) { repository(owner: $o, name: $r) { id } }",
                Some(json!({"o": "octo-org", "r": "gone"})),
            )
            .await
    );

    assert_eq!(err.kind(), GitHubErrorKind::GraphQl);
    assert_eq!(err.status_code(), Some(400));
    assert!(err.message().contains("Could not resolve to a Repository"));
    assert_eq!(err.payload(), Some(&payload));
}

#[tokio::test]
async fn test_graphql_non_object_payload() {
    let server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(success_response(json!(["unexpected"])))
        .mount(&server)
        .await;
    let client = client_for(&server, RecordingSleeper::new());

    let err = assert_err!(client.graphql().execute("{ viewer { login } }", None).await);
    assert_eq!(err.kind(), GitHubErrorKind::UnexpectedFormat);
}

// Tree SHA cache

fn tree_response() -> ResponseTemplate {
    success_response(json!({
        "sha": "root",
        "truncated": false,
        "tree": [
            {"path": "src", "mode": "040000", "type": "tree", "sha": "t1"},
            {"path": "src/app.js", "mode": "100644", "type": "blob", "sha": "blob-app"},
            {"path": "README.md", "mode": "100644", "type": "blob", "sha": "blob-readme"}
        ]
    }))
}

#[tokio::test]
async fn test_get_tree_decodes_entries() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo-org/octo-repo/git/trees/abc123"))
        .respond_with(tree_response())
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server, RecordingSleeper::new());

    let tree = assert_ok!(
        client
            .git_data()
            .get_tree("octo-org", "octo-repo", "abc123", false)
            .await
    );

    assert_eq!(tree.sha, "root");
    assert_eq!(tree.tree.len(), 3);
    assert!(!tree.truncated);
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].url.query(), None);
}

#[tokio::test]
async fn test_tree_cache_fetches_once_per_ref() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo-org/octo-repo/git/trees/main"))
        .and(query_param("recursive", "1"))
        .respond_with(tree_response())
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server, RecordingSleeper::new());
    let mut cache = TreeShaCache::new();

    let app = assert_ok!(cache.file_sha(&client, "octo-org", "octo-repo", "main", "/src/app.js").await);
    let readme = assert_ok!(cache.file_sha(&client, "octo-org", "octo-repo", "main", "README.md").await);
    let missing = assert_ok!(cache.file_sha(&client, "octo-org", "octo-repo", "main", "src").await);

    assert_eq!(app.as_deref(), Some("blob-app"));
    assert_eq!(readme.as_deref(), Some("blob-readme"));
    assert_eq!(missing, None);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_tree_cache_refetches_after_invalidate() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo-org/octo-repo/git/trees/main"))
        .respond_with(tree_response())
        .expect(2)
        .mount(&server)
        .await;
    let client = client_for(&server, RecordingSleeper::new());
    let mut cache = TreeShaCache::new();

    assert_ok!(cache.get_or_fetch(&client, "octo-org", "octo-repo", "main").await);
    assert!(cache.invalidate("octo-org", "octo-repo", "main"));
    assert_ok!(cache.get_or_fetch(&client, "octo-org", "octo-repo", "main").await);
}
