//! Job endpoints.
//!
//! Apart from [`JobService::create_job`], these are pass-through reads and
//! appends; callers interpret the payloads. A job-creation response that is not
//! a well-formed job object is a protocol violation, not a decode failure.

use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::Method;
use serde_json::{Map, Value};
use wfsync_types::Job;

use crate::http::{build_path, decode, extract_collection_items};
use crate::{ApiError, WfApiClient};

const JOBS_PATH: &str = "/jobs";
const JOB_PATH: &str = "/jobs/{identifier}";
const JOB_INFO_PATH: &str = "/jobs/{identifier}/info";

#[async_trait]
pub trait JobService: Send + Sync {
    /// Queue a job. `params` is sent as the body; `headers` are forwarded verbatim.
    async fn create_job(&self, params: &Map<String, Value>, headers: &IndexMap<String, String>) -> Result<Job, ApiError>;

    async fn get_job(&self, identifier: &str) -> Result<Job, ApiError>;

    async fn get_job_info(&self, identifier: &str) -> Result<Value, ApiError>;

    async fn post_job_info(&self, identifier: &str, info: &Value) -> Result<(), ApiError>;

    async fn list_jobs(&self, query: &[(String, String)]) -> Result<Vec<Job>, ApiError>;
}

#[async_trait]
impl JobService for WfApiClient {
    async fn create_job(&self, params: &Map<String, Value>, headers: &IndexMap<String, String>) -> Result<Job, ApiError> {
        let mut builder = self.request(Method::POST, JOBS_PATH).json(params);
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let payload = match self.execute_json(builder, &Method::POST, JOBS_PATH).await {
            Err(ApiError::Decode { source, .. }) => {
                return Err(ApiError::protocol_violation(format!("POST {JOBS_PATH} returned a non-JSON body: {source}")));
            }
            other => other?,
        };
        if !payload.is_object() {
            return Err(ApiError::protocol_violation(format!("POST {JOBS_PATH} returned no job object")));
        }
        serde_json::from_value(payload)
            .map_err(|err| ApiError::protocol_violation(format!("POST {JOBS_PATH} returned a malformed job: {err}")))
    }

    async fn get_job(&self, identifier: &str) -> Result<Job, ApiError> {
        let path = build_path(JOB_PATH, &[("identifier", identifier)]);
        let payload = self.execute_json(self.request(Method::GET, &path), &Method::GET, &path).await?;
        decode(payload, &path)
    }

    async fn get_job_info(&self, identifier: &str) -> Result<Value, ApiError> {
        let path = build_path(JOB_INFO_PATH, &[("identifier", identifier)]);
        self.execute_json(self.request(Method::GET, &path), &Method::GET, &path).await
    }

    async fn post_job_info(&self, identifier: &str, info: &Value) -> Result<(), ApiError> {
        let path = build_path(JOB_INFO_PATH, &[("identifier", identifier)]);
        let builder = self.request(Method::POST, &path).json(info);
        self.execute_json(builder, &Method::POST, &path).await.map(|_| ())
    }

    async fn list_jobs(&self, query: &[(String, String)]) -> Result<Vec<Job>, ApiError> {
        let mut builder = self.request(Method::GET, JOBS_PATH);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        let payload = self.execute_json(builder, &Method::GET, JOBS_PATH).await?;
        let items = extract_collection_items(payload)
            .ok_or_else(|| ApiError::protocol_violation(format!("GET {JOBS_PATH} did not return a list")))?;
        decode(Value::Array(items), JOBS_PATH)
    }
}
