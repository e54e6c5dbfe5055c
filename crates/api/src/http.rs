//! HTTP execution helpers shared by the registry and job endpoints.
//!
//! This module centralizes sending a request, mapping the status code into an
//! [`ApiError`], and parsing the JSON body. Response bodies are redacted before
//! they end up in logs or error messages.

use std::time::Instant;

use once_cell::sync::Lazy;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{ApiError, WfApiClient};

/// Wrapper keys probed, in order, when a list endpoint returns an object.
const RESPONSE_ARRAY_PRIORITY_KEYS: &[&str] = &["items", "results", "data", "workflows", "jobs"];

/// Maximum number of characters of a response body kept in error messages.
const ERROR_BODY_LIMIT: usize = 160;

static SENSITIVE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(authorization:[ \t]+)([^\s]+(?:[ \t]+[^\s]+)*)",
        r"(?i)((?:^|\b)Bearer\s+)([A-Za-z0-9\-._~+/]+=*)",
        r"(?i)((?:^|\b)Basic\s+)([A-Za-z0-9+/]+=*)",
        r"(?i)([A-Z0-9_]*?(?:KEY|TOKEN|SECRET|PASSWORD)=)([^\s]+)",
        r#"(?i)("(?:api_key|token|secret|password)"\s*:\s*)"[^"]*""#,
    ]
    .into_iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

impl WfApiClient {
    /// Send a prepared request and parse the JSON response.
    ///
    /// # Returns
    /// The parsed JSON payload for a successful response, or `Value::Null` for an
    /// empty body.
    ///
    /// # Errors
    /// - [`ApiError::Transport`] when the request cannot be sent or the body cannot be read
    /// - [`ApiError::NotFound`] for HTTP 404
    /// - [`ApiError::Status`] for any other non-success status
    /// - [`ApiError::Decode`] when the body is not valid JSON
    pub async fn execute_json(&self, request_builder: RequestBuilder, method: &Method, request_path: &str) -> Result<Value, ApiError> {
        let start = Instant::now();
        debug!(method = %method, path = %request_path, "http request started");

        let response = request_builder.send().await.map_err(|source| {
            warn!(
                method = %method,
                path = %request_path,
                error = %source,
                duration_ms = start.elapsed().as_millis(),
                "http request failed"
            );
            ApiError::Transport {
                method: method.to_string(),
                path: request_path.to_string(),
                source,
            }
        })?;

        let status = response.status();
        let body_text = response.text().await.map_err(|source| ApiError::Transport {
            method: method.to_string(),
            path: request_path.to_string(),
            source,
        })?;

        if !status.is_success() {
            let body = truncate_for_summary(&redact_sensitive(&body_text), ERROR_BODY_LIMIT);
            warn!(
                method = %method,
                path = %request_path,
                status = %status,
                body = %body,
                duration_ms = start.elapsed().as_millis(),
                "http request returned an error status"
            );
            if status == StatusCode::NOT_FOUND {
                return Err(ApiError::NotFound {
                    path: request_path.to_string(),
                });
            }
            return Err(ApiError::Status {
                method: method.to_string(),
                path: request_path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        if body_text.trim().is_empty() {
            debug!(
                method = %method,
                path = %request_path,
                status = %status,
                duration_ms = start.elapsed().as_millis(),
                "http request completed with empty response"
            );
            return Ok(Value::Null);
        }

        let parsed = serde_json::from_str::<Value>(&body_text).map_err(|source| {
            warn!(
                method = %method,
                path = %request_path,
                status = %status,
                body_len = body_text.len(),
                error = %source,
                "http response JSON parse failed"
            );
            ApiError::Decode {
                path: request_path.to_string(),
                source,
            }
        })?;
        debug!(
            method = %method,
            path = %request_path,
            status = %status,
            duration_ms = start.elapsed().as_millis(),
            "http request completed"
        );
        Ok(parsed)
    }
}

/// Decode a JSON payload into a typed value, attributing failures to `path`.
pub fn decode<T: DeserializeOwned>(payload: Value, path: &str) -> Result<T, ApiError> {
    serde_json::from_value(payload).map_err(|source| ApiError::Decode {
        path: path.to_string(),
        source,
    })
}

/// Replace `{key}` placeholders in a path template with percent-encoded values.
pub fn build_path(template: &str, variables: &[(&str, &str)]) -> String {
    let mut path = template.to_string();
    for (key, value) in variables {
        let encoded = utf8_percent_encode(value, NON_ALPHANUMERIC).to_string();
        path = path.replace(&format!("{{{}}}", key), &encoded);
    }
    path
}

/// Extract list items from a list endpoint payload.
///
/// Accepts a top-level array, or an object wrapping the array under one of the
/// well-known keys. Returns `None` when no list shape is found.
pub fn extract_collection_items(payload: Value) -> Option<Vec<Value>> {
    match payload {
        Value::Array(items) => Some(items),
        Value::Null => Some(Vec::new()),
        Value::Object(mut map) => RESPONSE_ARRAY_PRIORITY_KEYS.iter().find_map(|key| match map.remove(*key) {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        }),
        _ => None,
    }
}

/// Read the server-assigned identifier (`identifier`, or the legacy `uuid`) from a payload.
pub fn identifier_from(payload: &Value) -> Option<String> {
    ["identifier", "uuid"]
        .iter()
        .filter_map(|key| payload.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|identifier| !identifier.is_empty())
        .map(str::to_string)
}

/// Redacts values that look like secrets in a string.
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for pattern in SENSITIVE_PATTERNS.iter() {
        redacted = pattern
            .replace_all(&redacted, |caps: &regex::Captures| {
                let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                format!("{}<redacted>", prefix)
            })
            .to_string();
    }
    redacted
}

fn truncate_for_summary(text: &str, max_len: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_len {
        return trimmed.to_string();
    }

    // Reserve space for the trailing ellipsis ("...").
    let target_len = max_len.saturating_sub(3);
    let truncated: String = trimmed.chars().take(target_len).collect();
    format!("{}...", truncated.trim_end())
}
