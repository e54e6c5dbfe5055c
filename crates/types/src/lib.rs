//! Shared type definitions for wfsync.
//!
//! - [`workflow`]: locally authored workflow definitions and their canonical form
//! - [`remote`]: workflow records as persisted by the workflow service
//! - [`job`]: job submission requests and service-reported jobs

pub mod job;
pub mod remote;
pub mod workflow;

pub use job::{Job, JobRequest, QUEUED_EXECUTION, TARGET_PARAM, WORKFLOW_PARAM};
pub use remote::{RemoteStep, RemoteWorkflowRecord};
pub use workflow::{CanonicalStep, CanonicalWorkflow, StepBody, WorkflowDefinition, WorkflowStep};
