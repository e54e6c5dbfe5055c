//! Job request and response types.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Execution state the service must report for a freshly submitted job.
pub const QUEUED_EXECUTION: &str = "queued";

/// Parameter key carrying the mandatory job target.
pub const TARGET_PARAM: &str = "target";

/// Parameter key carrying the resolved workflow identifier.
pub const WORKFLOW_PARAM: &str = "workflow";

/// Request to queue a job against a registered workflow.
///
/// The workflow can be referenced by local name (resolved through the identifier
/// cache) or by an explicit identifier stored in `params["workflow"]`. The explicit
/// identifier wins when both are present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobRequest {
    /// Local workflow name, as configured for synchronization.
    pub workflow: Option<String>,
    /// Job parameters sent as the request body.
    pub params: Map<String, Value>,
    /// Extra headers forwarded verbatim (for example, `x-request-id`).
    pub headers: IndexMap<String, String>,
}

impl JobRequest {
    /// Start a request referencing a workflow by local name.
    pub fn for_workflow(name: impl Into<String>) -> Self {
        Self {
            workflow: Some(name.into()),
            ..Default::default()
        }
    }

    /// Start a request referencing a workflow by explicit identifier.
    pub fn for_identifier(identifier: impl Into<String>) -> Self {
        Self::default().with_workflow_identifier(identifier)
    }

    pub fn with_target(self, target: impl Into<String>) -> Self {
        self.with_param(TARGET_PARAM, Value::String(target.into()))
    }

    pub fn with_workflow_identifier(self, identifier: impl Into<String>) -> Self {
        self.with_param(WORKFLOW_PARAM, Value::String(identifier.into()))
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Non-blank target parameter, if any.
    pub fn target(&self) -> Option<&str> {
        non_blank_str(self.params.get(TARGET_PARAM))
    }

    /// Non-blank explicit workflow identifier, if any.
    pub fn explicit_identifier(&self) -> Option<&str> {
        non_blank_str(self.params.get(WORKFLOW_PARAM))
    }
}

fn non_blank_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|text| !text.trim().is_empty())
}

/// A job as reported by the workflow service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Job {
    #[serde(default, alias = "uuid")]
    pub identifier: String,
    #[serde(default)]
    pub execution: String,
    /// Identifier of the workflow the job runs.
    #[serde(default, alias = "workflow_uuid", skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Remaining fields the service attaches (chain results, timestamps, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Job {
    pub fn is_queued(&self) -> bool {
        self.execution == QUEUED_EXECUTION
    }
}
