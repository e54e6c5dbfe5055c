//! Strongly typed workflow definitions shared by the loader, the engine and the API client.
//!
//! A [`WorkflowDefinition`] is the locally authored, authoritative description of a
//! workflow. Step bodies are plain text from the start: either inline source or a
//! reference to a side file that the loader reads verbatim. The [`CanonicalWorkflow`]
//! is the transmittable form sent to the workflow service and hashed for change
//! detection. Its JSON encoding is deterministic: struct fields serialize in
//! declaration order and absent optionals are omitted.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Locally authored workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct WorkflowDefinition {
    /// Base workflow name (for example, `say`).
    #[serde(default)]
    pub name: String,
    /// Optional version string appended to the display name.
    #[serde(default)]
    pub version: Option<String>,
    /// Steps executed on the normal path, in order.
    #[serde(default)]
    pub chain: Vec<WorkflowStep>,
    /// Steps executed when the chain fails.
    #[serde(default, rename = "onerror")]
    pub on_error: Vec<WorkflowStep>,
    /// Steps executed when a job is cancelled. Absent is equivalent to empty.
    #[serde(default, rename = "oncancel", skip_serializing_if = "Option::is_none")]
    pub on_cancel: Option<Vec<WorkflowStep>>,
    /// Overall workflow timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Maximum number of job attempts the service may make.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

impl WorkflowDefinition {
    /// Name used to register and look up the workflow remotely.
    ///
    /// `name-version` when a non-blank version is present, otherwise the bare name.
    pub fn display_name(&self) -> String {
        match self.version.as_deref().map(str::trim) {
            Some(version) if !version.is_empty() => format!("{}-{}", self.name, version),
            _ => self.name.clone(),
        }
    }

    /// Cancel steps, treating an absent list as empty.
    pub fn cancel_steps(&self) -> &[WorkflowStep] {
        self.on_cancel.as_deref().unwrap_or_default()
    }

    /// Iterate over every step in chain, error and cancel order.
    pub fn all_steps(&self) -> impl Iterator<Item = &WorkflowStep> {
        self.chain.iter().chain(self.on_error.iter()).chain(self.cancel_steps().iter())
    }

    /// Iterate mutably over every step in chain, error and cancel order.
    pub fn all_steps_mut(&mut self) -> impl Iterator<Item = &mut WorkflowStep> {
        let cancel = self.on_cancel.iter_mut().flatten();
        self.chain.iter_mut().chain(self.on_error.iter_mut()).chain(cancel)
    }
}

/// A single workflow step as authored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowStep {
    pub name: String,
    /// Step timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Number of retries the service applies to this step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,
    pub body: StepBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<StepBody>,
}

/// Executable step body.
///
/// The variant is the static tag telling whether the body is already text
/// (`Source`) or still needs to be read from disk (`File`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum StepBody {
    /// Exact source text of the body.
    Source(String),
    /// Body stored in a side file, relative to the definitions directory.
    File { file: PathBuf },
}

impl StepBody {
    /// Source text when the body is already textual.
    pub fn as_source(&self) -> Option<&str> {
        match self {
            StepBody::Source(text) => Some(text.as_str()),
            StepBody::File { .. } => None,
        }
    }
}

impl From<&str> for StepBody {
    fn from(value: &str) -> Self {
        StepBody::Source(value.to_string())
    }
}

impl From<String> for StepBody {
    fn from(value: String) -> Self {
        StepBody::Source(value)
    }
}

/// Transmittable, hashable form of a workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CanonicalWorkflow {
    /// Display name (`name-version`).
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub chain: Vec<CanonicalStep>,
    #[serde(default, rename = "onerror")]
    pub on_error: Vec<CanonicalStep>,
    #[serde(default, rename = "oncancel")]
    pub on_cancel: Vec<CanonicalStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

/// Canonical step with a textual body and no server-assigned identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CanonicalStep {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}
