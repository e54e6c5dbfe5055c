//! Workflow service API client.
//!
//! This crate provides a lightweight client for the workflow service REST API.
//! It focuses on:
//!
//! - Constructing an HTTP client with sensible defaults
//! - Validating the configured base URL
//! - Building requests with a consistent User-Agent and Accept headers
//! - Typed access to workflow records ([`WorkflowRegistry`]) and jobs ([`JobService`])
//!
//! Every operation is a single request/response exchange. Nothing here retries;
//! retry policy belongs to the caller.
//!
//! # Example
//!
//! ```ignore
//! use wfsync_api::{ClientOptions, WfApiClient, WorkflowRegistry};
//!
//! async fn run() -> Result<(), wfsync_api::ApiError> {
//!     let client = WfApiClient::new(&ClientOptions::new("http://127.0.0.1:8080"))?;
//!     let pong = client.ping().await?;
//!     println!("pong: {pong}");
//!     Ok(())
//! }
//! ```

use std::env;
use std::time::Duration;

use indexmap::IndexMap;
use reqwest::{Client, Method, RequestBuilder, Url, header};
use tracing::debug;

pub mod error;
pub mod http;
pub mod jobs;
pub mod registry;

pub use error::ApiError;
pub use jobs::JobService;
pub use registry::WorkflowRegistry;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings used to build a [`WfApiClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    /// Extra headers attached to every request.
    pub headers: IndexMap<String, String>,
    pub timeout: Duration,
}

impl ClientOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            headers: IndexMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone)]
/// Thin wrapper around a configured `reqwest::Client` for workflow service access.
///
/// The client pre-configures default headers and builds requests against a
/// validated base URL.
pub struct WfApiClient {
    pub base_url: String,
    pub http: Client,
    pub user_agent: String,
}

impl WfApiClient {
    /// Construct a [`WfApiClient`] from options.
    ///
    /// The base URL must use `http` or `https` and include a host. A trailing
    /// slash is dropped so API paths can be appended verbatim.
    pub fn new(options: &ClientOptions) -> Result<Self, ApiError> {
        let base_url = validate_base_url(&options.base_url)?;

        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        for (name, value) in &options.headers {
            let header_name = header::HeaderName::from_bytes(name.as_bytes()).map_err(|error| ApiError::InvalidHeader {
                name: name.clone(),
                reason: error.to_string(),
            })?;
            let header_value = header::HeaderValue::from_str(value).map_err(|error| ApiError::InvalidHeader {
                name: name.clone(),
                reason: error.to_string(),
            })?;
            default_headers.insert(header_name, header_value);
        }

        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(options.timeout)
            .build()
            .map_err(ApiError::Client)?;

        Ok(Self {
            base_url,
            http,
            user_agent: format!("wfsync/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS),
        })
    }

    /// Build a `reqwest::RequestBuilder` for a method and API-relative path.
    ///
    /// The resulting request includes the configured User-Agent and base
    /// headers, and is resolved relative to `self.base_url`.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "building request");

        self.http.request(method, url).header(header::USER_AGENT, &self.user_agent)
    }
}

/// Validate that a base URL is acceptable for use by the client.
///
/// Rules:
/// - the scheme must be `http` or `https`
/// - a host must be present
///
/// Returns the URL with any trailing slash removed.
fn validate_base_url(base: &str) -> Result<String, ApiError> {
    let trimmed = base.trim();
    let parsed_base_url = Url::parse(trimmed).map_err(|error| ApiError::invalid_base_url(base, error.to_string()))?;

    if !matches!(parsed_base_url.scheme(), "http" | "https") {
        return Err(ApiError::invalid_base_url(
            base,
            format!("scheme must be http or https; got '{}://'", parsed_base_url.scheme()),
        ));
    }

    if parsed_base_url.host_str().is_none_or(str::is_empty) {
        return Err(ApiError::invalid_base_url(base, "a host is required"));
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}
