//! Service-side representation of registered workflows.

use serde::{Deserialize, Serialize};

use crate::workflow::{CanonicalStep, CanonicalWorkflow};

/// A workflow record as persisted by the workflow service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RemoteWorkflowRecord {
    /// Server-assigned opaque identifier.
    #[serde(alias = "uuid")]
    pub identifier: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub chain: Vec<RemoteStep>,
    #[serde(default, rename = "onerror")]
    pub on_error: Vec<RemoteStep>,
    #[serde(default, rename = "oncancel", deserialize_with = "null_as_empty")]
    pub on_cancel: Vec<RemoteStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

/// A step as returned by the service, possibly carrying its own identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RemoteStep {
    #[serde(default, alias = "identifier", skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(flatten)]
    pub step: CanonicalStep,
}

impl RemoteStep {
    /// Drop the server-assigned identifier, keeping only authored content.
    pub fn strip_identifier(&self) -> CanonicalStep {
        self.step.clone()
    }
}

impl RemoteWorkflowRecord {
    /// Canonical form of the record with every per-step identifier removed.
    ///
    /// Chain, error and cancel steps are stripped alike.
    pub fn to_canonical(&self) -> CanonicalWorkflow {
        CanonicalWorkflow {
            name: self.name.clone(),
            version: self.version.clone(),
            chain: strip_all(&self.chain),
            on_error: strip_all(&self.on_error),
            on_cancel: strip_all(&self.on_cancel),
            timeout: self.timeout,
            max_attempts: self.max_attempts,
        }
    }
}

fn strip_all(steps: &[RemoteStep]) -> Vec<CanonicalStep> {
    steps.iter().map(RemoteStep::strip_identifier).collect()
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<RemoteStep>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<RemoteStep>>::deserialize(deserializer)?.unwrap_or_default())
}
