//! Remote workflow registry operations.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use wfsync_types::{CanonicalWorkflow, RemoteWorkflowRecord};

use crate::http::{build_path, decode, extract_collection_items, identifier_from};
use crate::{ApiError, WfApiClient};

const WORKFLOWS_PATH: &str = "/workflows";
const WORKFLOW_PATH: &str = "/workflows/{identifier}";
const PING_PATH: &str = "/ping";

/// Find/get/create/update/delete access to workflow records held by the service.
///
/// Each call is exactly one request/response exchange.
#[async_trait]
pub trait WorkflowRegistry: Send + Sync {
    /// Look up a workflow by exact name. Returns the first exact match.
    async fn find_by_name(&self, name: &str) -> Result<Option<RemoteWorkflowRecord>, ApiError>;

    /// Fetch a workflow by identifier, failing with [`ApiError::NotFound`] when absent.
    async fn get_by_identifier(&self, identifier: &str) -> Result<RemoteWorkflowRecord, ApiError>;

    /// Register a new workflow and return its identifier.
    async fn create(&self, workflow: &CanonicalWorkflow) -> Result<String, ApiError>;

    /// Replace an existing workflow in place and return its (unchanged) identifier.
    async fn update(&self, identifier: &str, workflow: &CanonicalWorkflow) -> Result<String, ApiError>;

    async fn delete(&self, identifier: &str) -> Result<(), ApiError>;

    /// Liveness probe; the payload is opaque.
    async fn ping(&self) -> Result<Value, ApiError>;
}

#[async_trait]
impl WorkflowRegistry for WfApiClient {
    async fn find_by_name(&self, name: &str) -> Result<Option<RemoteWorkflowRecord>, ApiError> {
        let builder = self.request(Method::GET, WORKFLOWS_PATH).query(&[("name", name)]);
        let payload = self.execute_json(builder, &Method::GET, WORKFLOWS_PATH).await?;
        let items = extract_collection_items(payload)
            .ok_or_else(|| ApiError::protocol_violation(format!("GET {WORKFLOWS_PATH} did not return a list")))?;

        // The service may ignore the filter or match loosely; only exact names count.
        let Some(matching) = items
            .into_iter()
            .find(|item| item.get("name").and_then(Value::as_str) == Some(name))
        else {
            debug!(workflow = %name, "no workflow with exact name");
            return Ok(None);
        };

        decode(matching, WORKFLOWS_PATH).map(Some)
    }

    async fn get_by_identifier(&self, identifier: &str) -> Result<RemoteWorkflowRecord, ApiError> {
        let path = build_path(WORKFLOW_PATH, &[("identifier", identifier)]);
        let payload = self.execute_json(self.request(Method::GET, &path), &Method::GET, &path).await?;
        decode(payload, &path)
    }

    async fn create(&self, workflow: &CanonicalWorkflow) -> Result<String, ApiError> {
        let builder = self.request(Method::POST, WORKFLOWS_PATH).json(workflow);
        let payload = self.execute_json(builder, &Method::POST, WORKFLOWS_PATH).await?;
        identifier_from(&payload).ok_or_else(|| {
            ApiError::protocol_violation(format!(
                "POST {WORKFLOWS_PATH} for '{}' returned no workflow identifier",
                workflow.name
            ))
        })
    }

    async fn update(&self, identifier: &str, workflow: &CanonicalWorkflow) -> Result<String, ApiError> {
        let path = build_path(WORKFLOW_PATH, &[("identifier", identifier)]);
        let builder = self.request(Method::PUT, &path).json(workflow);
        let payload = self.execute_json(builder, &Method::PUT, &path).await?;
        let returned = identifier_from(&payload)
            .ok_or_else(|| ApiError::protocol_violation(format!("PUT {path} returned no workflow identifier")))?;
        if returned != identifier {
            return Err(ApiError::protocol_violation(format!(
                "PUT {path} changed the workflow identifier to '{returned}'"
            )));
        }
        Ok(returned)
    }

    async fn delete(&self, identifier: &str) -> Result<(), ApiError> {
        let path = build_path(WORKFLOW_PATH, &[("identifier", identifier)]);
        self.execute_json(self.request(Method::DELETE, &path), &Method::DELETE, &path)
            .await
            .map(|_| ())
    }

    async fn ping(&self) -> Result<Value, ApiError> {
        self.execute_json(self.request(Method::GET, PING_PATH), &Method::GET, PING_PATH)
            .await
    }
}
