//! Thin passthrough to GitHub's GraphQL API.

use crate::client::GitHubClient;
use crate::errors::{GitHubError, GitHubErrorKind, GitHubResult};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// GraphQL passthrough over the request engine.
///
/// Requests go through the same retry and rate-limit handling as REST calls.
pub struct GraphQLService<'a> {
    client: &'a GitHubClient,
}

impl<'a> GraphQLService<'a> {
    /// Creates a new GraphQL service.
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    /// Executes a query or mutation and returns the whole payload object.
    ///
    /// A payload that is not an object fails with `UnexpectedFormat`; a
    /// non-empty `errors` array fails with `GraphQl`. Both carry the payload.
    pub async fn execute(&self, query: &str, variables: Option<Value>) -> GitHubResult<Value> {
        let request = GraphQLRequest {
            query,
            variables: variables.unwrap_or_else(|| Value::Object(Default::default())),
        };
        let body = serde_json::to_value(&request).map_err(|e| {
            GitHubError::invalid_parameter(format!("Failed to serialize GraphQL request: {}", e))
        })?;
        let response = self
            .client
            .execute(Method::POST, "/graphql", None, Some(&body))
            .await?;

        let request_id = response.request_id();
        let payload = response.json().unwrap_or(Value::Null);
        check_payload(payload).map_err(|e| e.with_request_id_opt(request_id))
    }

    /// Executes a query and returns its `data` member.
    pub async fn data(&self, query: &str, variables: Option<Value>) -> GitHubResult<Value> {
        let mut payload = self.execute(query, variables).await?;
        Ok(payload
            .get_mut("data")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }

    /// Executes a query and deserializes its `data` member into `T`.
    pub async fn query<T: DeserializeOwned>(&self, query: &str, variables: Option<Value>) -> GitHubResult<T> {
        let data = self.data(query, variables).await?;
        serde_json::from_value(data).map_err(|e| {
            GitHubError::deserialization(format!("Failed to deserialize GraphQL data: {}", e))
        })
    }
}

fn check_payload(payload: Value) -> GitHubResult<Value> {
    if !payload.is_object() {
        return Err(GitHubError::unexpected_format(
            400,
            "Unexpected GraphQL payload",
            payload,
        ));
    }

    let errors = graphql_errors(&payload);
    if !errors.is_empty() {
        let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
        return Err(GitHubError::new(
            GitHubErrorKind::GraphQl,
            format!("GraphQL error: {}", messages.join("; ")),
        )
        .with_status(400)
        .with_payload(payload));
    }

    Ok(payload)
}

/// Extracts the `errors` array of a GraphQL payload.
///
/// Entries that do not decode keep a placeholder message so they still count.
pub fn graphql_errors(payload: &Value) -> Vec<GraphQLError> {
    payload
        .get("errors")
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .map(|raw| {
                    serde_json::from_value(raw.clone()).unwrap_or_else(|_| GraphQLError {
                        message: raw.to_string(),
                        error_type: None,
                        path: None,
                        extensions: None,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Serialize)]
struct GraphQLRequest<'q> {
    query: &'q str,
    variables: Value,
}

/// A GraphQL error entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Error type (e.g. `NOT_FOUND`, `FORBIDDEN`).
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    /// Path to the failing field.
    #[serde(default)]
    pub path: Option<Vec<Value>>,
    /// Additional error extensions.
    #[serde(default)]
    pub extensions: Option<HashMap<String, Value>>,
}
