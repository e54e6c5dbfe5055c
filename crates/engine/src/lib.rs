//! # wfsync engine
//!
//! Keeps a remote workflow service in step with locally authored workflow
//! definitions, then queues jobs against the synchronized workflows.
//!
//! ## Flow
//!
//! - **Bootstrap**: [`Bootstrapper`] walks the configured workflow names in order
//!   under an exponential backoff envelope.
//! - **Reconcile**: [`Reconciler`] canonicalizes each definition, looks it up by
//!   display name and creates, updates or keeps it, recording the identifier in
//!   the [`IdentifierCache`].
//! - **Compare**: [`digest`] hashes step lists with SHA-256 to decide whether an
//!   existing workflow needs replacing.
//! - **Submit**: [`JobSubmitter`] resolves a workflow reference through the cache
//!   and requires the service to answer with a queued job.
//!
//! [`WorkflowClient`] wires all of these to an HTTP [`wfsync_api::WfApiClient`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use wfsync_engine::{SyncConfig, WorkflowClient};
//! use wfsync_types::JobRequest;
//!
//! # async fn run() -> Result<(), wfsync_engine::SyncError> {
//! let config = SyncConfig::load(None)?;
//! let client = WorkflowClient::from_config(&config)?;
//! client.init_workflows().await?;
//! let job = client
//!     .create_job(JobRequest::for_workflow("say").with_target("say-target"))
//!     .await?;
//! println!("queued {}", job.identifier);
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod bootstrap;
pub mod cache;
pub mod canonical;
pub mod client;
pub mod config;
pub mod digest;
pub mod error;
pub mod jobs;
pub mod loader;
pub mod reconcile;

#[cfg(test)]
pub(crate) mod test_support;

pub use backoff::{AttemptSeverity, Backoff, RetryPolicy};
pub use bootstrap::{BootstrapReport, Bootstrapper};
pub use cache::IdentifierCache;
pub use canonical::Canonicalize;
pub use client::WorkflowClient;
pub use config::SyncConfig;
pub use digest::{WorkflowDigest, is_equivalent};
pub use error::SyncError;
pub use jobs::JobSubmitter;
pub use loader::{DefinitionSource, FsDefinitionSource, parse_definition_file};
pub use reconcile::{ReconcileOutcome, ReconcilePolicy, Reconciler};
