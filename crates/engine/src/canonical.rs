//! Conversion of workflow definitions into their canonical, transmittable form.
//!
//! Bodies are authored as text, so canonicalization is a validation and
//! restructuring pass: source text is carried over byte for byte, the cancel
//! list is normalized to an empty list when absent, and server-assigned step
//! identifiers never appear in the output. Applying it to an already canonical
//! workflow returns an identical value.

use wfsync_types::{CanonicalStep, CanonicalWorkflow, RemoteWorkflowRecord, StepBody, WorkflowDefinition, WorkflowStep};

use crate::SyncError;

/// Types that can be reduced to a [`CanonicalWorkflow`].
pub trait Canonicalize {
    fn canonicalize(&self) -> Result<CanonicalWorkflow, SyncError>;
}

impl Canonicalize for WorkflowDefinition {
    fn canonicalize(&self) -> Result<CanonicalWorkflow, SyncError> {
        let display_name = self.display_name();
        if display_name.trim().is_empty() {
            return Err(SyncError::definition("<unnamed>", "workflow name is required"));
        }

        let steps = |steps: &[WorkflowStep]| -> Result<Vec<CanonicalStep>, SyncError> {
            steps.iter().map(|step| canonical_step(&display_name, step)).collect()
        };

        Ok(CanonicalWorkflow {
            name: display_name.clone(),
            version: self.version.clone(),
            chain: steps(&self.chain)?,
            on_error: steps(&self.on_error)?,
            on_cancel: steps(self.cancel_steps())?,
            timeout: self.timeout,
            max_attempts: self.max_attempts,
        })
    }
}

impl Canonicalize for CanonicalWorkflow {
    fn canonicalize(&self) -> Result<CanonicalWorkflow, SyncError> {
        Ok(self.clone())
    }
}

impl Canonicalize for RemoteWorkflowRecord {
    fn canonicalize(&self) -> Result<CanonicalWorkflow, SyncError> {
        Ok(self.to_canonical())
    }
}

fn canonical_step(workflow: &str, step: &WorkflowStep) -> Result<CanonicalStep, SyncError> {
    if step.name.trim().is_empty() {
        return Err(SyncError::definition(workflow, "every step needs a name"));
    }

    Ok(CanonicalStep {
        name: step.name.clone(),
        timeout: step.timeout,
        retry: step.retry,
        body: body_text(workflow, &step.name, &step.body)?,
        fallback: step
            .fallback
            .as_ref()
            .map(|fallback| body_text(workflow, &step.name, fallback))
            .transpose()?,
    })
}

fn body_text(workflow: &str, step: &str, body: &StepBody) -> Result<String, SyncError> {
    body.as_source().map(str::to_string).ok_or_else(|| SyncError::UnresolvedBody {
        workflow: workflow.to_string(),
        step: step.to_string(),
    })
}
