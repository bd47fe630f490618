//! Response classification, kept free of any retry or sleep mechanics.

use super::{GitHubError, GitHubResult};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde_json::Value;

/// Header carrying the upstream request ID.
pub const REQUEST_ID_HEADER: &str = "x-github-request-id";
/// Header carrying the remaining request budget.
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";
/// Header carrying the budget reset time in Unix seconds.
pub const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";

const MESSAGE_PREVIEW_CHARS: usize = 200;

/// Classifies a raw response.
///
/// Returns `Ok(())` for any status below 400. Failing statuses map to
/// exactly one error kind: rate limited (429, or 403 with a rate-limit
/// signal), unauthorized (401), not found (404), or a generic API error.
pub fn classify_response(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> GitHubResult<()> {
    if status.as_u16() < 400 {
        return Ok(());
    }

    let payload = parse_json(body);
    let request_id = request_id(headers);

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(rate_limit_error(status, "Rate limit hit (429).", headers, payload, request_id));
    }

    if status == StatusCode::FORBIDDEN && is_rate_limited(headers, payload.as_ref()) {
        return Err(rate_limit_error(status, "Rate limit exceeded (403).", headers, payload, request_id));
    }

    let message = extract_message(payload.as_ref(), body);
    Err(GitHubError::from_response(status, message, payload, request_id))
}

/// Returns true when a 403 response signals an exhausted rate limit.
///
/// Either `X-RateLimit-Remaining` is `0`, or the JSON body's `message`
/// mentions "rate limit" in any casing.
pub fn is_rate_limited(headers: &HeaderMap, payload: Option<&Value>) -> bool {
    let exhausted = header_str(headers, RATE_LIMIT_REMAINING_HEADER)
        .filter(|v| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(false, |remaining| remaining == 0);
    if exhausted {
        return true;
    }

    payload
        .and_then(Value::as_object)
        .and_then(|obj| obj.get("message"))
        .map_or(false, |msg| {
            value_to_text(msg).to_lowercase().contains("rate limit")
        })
}

/// Reads `X-RateLimit-Reset` when it is a plain non-negative integer.
pub fn rate_limit_reset(headers: &HeaderMap) -> Option<i64> {
    header_str(headers, RATE_LIMIT_RESET_HEADER)
        .filter(|v| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|v| v.parse().ok())
}

/// Reads `X-GitHub-Request-Id`.
pub fn request_id(headers: &HeaderMap) -> Option<String> {
    header_str(headers, REQUEST_ID_HEADER).map(String::from)
}

/// Picks the human-readable message of a failing response.
///
/// Prefers the `message` member of a JSON object body, otherwise the first
/// 200 characters of the raw body text.
pub fn extract_message(payload: Option<&Value>, body: &[u8]) -> String {
    if let Some(msg) = payload
        .and_then(Value::as_object)
        .and_then(|obj| obj.get("message"))
    {
        return value_to_text(msg);
    }
    String::from_utf8_lossy(body)
        .chars()
        .take(MESSAGE_PREVIEW_CHARS)
        .collect()
}

fn rate_limit_error(
    status: StatusCode,
    message: &str,
    headers: &HeaderMap,
    payload: Option<Value>,
    request_id: Option<String>,
) -> GitHubError {
    let mut error = GitHubError::rate_limit(status.as_u16(), message, rate_limit_reset(headers));
    if let Some(payload) = payload {
        error = error.with_payload(payload);
    }
    if let Some(id) = request_id {
        error = error.with_request_id(id);
    }
    error
}

fn parse_json(body: &[u8]) -> Option<Value> {
    serde_json::from_slice(body).ok()
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
