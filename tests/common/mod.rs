//! Shared helpers for the WireMock-backed integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use integrations_code_scanning::{ClientConfig, GitHubClient, Sleeper};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::{MockServer, ResponseTemplate};

/// Token every test client sends.
pub const TEST_TOKEN: &str = "ghp_testtoken";

/// Sleeper that records requested delays and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/// Starts a mock upstream.
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Builds a client against `server` with default retry settings.
pub fn client_for(server: &MockServer, sleeper: Arc<RecordingSleeper>) -> GitHubClient {
    client_with(server, ClientConfig::default(), sleeper)
}

/// Builds a client against `server` from `config`, overriding its base URL.
pub fn client_with(server: &MockServer, config: ClientConfig, sleeper: Arc<RecordingSleeper>) -> GitHubClient {
    GitHubClient::builder()
        .config(config)
        .base_url(server.uri())
        .token(TEST_TOKEN)
        .sleeper(sleeper)
        .build()
        .unwrap()
}

/// Current Unix time in seconds.
pub fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}

/// JSON error response in GitHub's shape.
pub fn error_response(status: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(serde_json::json!({
        "message": message,
        "documentation_url": "https://docs.github.com/rest"
    }))
}

/// 200 response with a JSON body.
pub fn success_response(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}
