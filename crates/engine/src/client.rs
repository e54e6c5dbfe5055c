//! High-level client combining synchronization and job submission.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;
use wfsync_api::{JobService, WfApiClient, WorkflowRegistry};
use wfsync_types::{Job, JobRequest, RemoteWorkflowRecord};

use crate::bootstrap::{BootstrapReport, Bootstrapper};
use crate::jobs::JobSubmitter;
use crate::reconcile::{ReconcileOutcome, Reconciler};
use crate::{DefinitionSource, FsDefinitionSource, IdentifierCache, SyncConfig, SyncError};

/// One synchronized view of a workflow service.
///
/// Every component shares the same [`IdentifierCache`], so workflows resolved by
/// [`WorkflowClient::init_workflows`] are immediately usable by
/// [`WorkflowClient::create_job`].
#[derive(Clone)]
pub struct WorkflowClient {
    registry: Arc<dyn WorkflowRegistry>,
    source: Arc<dyn DefinitionSource>,
    cache: IdentifierCache,
    reconciler: Reconciler,
    bootstrapper: Bootstrapper,
    submitter: JobSubmitter,
}

impl WorkflowClient {
    /// Build a client that talks HTTP and reads definitions from `definitions_path`.
    pub fn from_config(config: &SyncConfig) -> Result<Self, SyncError> {
        config.validate()?;
        let source = Arc::new(FsDefinitionSource::new(config.definitions_root()?));
        Self::with_source(config, source)
    }

    /// Build an HTTP client with a custom definition source.
    pub fn with_source(config: &SyncConfig, source: Arc<dyn DefinitionSource>) -> Result<Self, SyncError> {
        config.validate()?;
        let api = Arc::new(WfApiClient::new(&config.client_options()?)?);
        Ok(Self::with_services(config, api.clone(), api, source))
    }

    /// Assemble a client from explicit service implementations.
    pub fn with_services(
        config: &SyncConfig,
        registry: Arc<dyn WorkflowRegistry>,
        jobs: Arc<dyn JobService>,
        source: Arc<dyn DefinitionSource>,
    ) -> Self {
        let cache = IdentifierCache::new();
        let reconciler = Reconciler::new(registry.clone(), cache.clone(), config.reconcile_policy());
        let bootstrapper = Bootstrapper::new(reconciler.clone(), source.clone(), config.workflows.clone(), config.retry);
        let submitter = JobSubmitter::new(jobs, cache.clone());
        Self {
            registry,
            source,
            cache,
            reconciler,
            bootstrapper,
            submitter,
        }
    }

    /// Synchronize every configured workflow, retrying transient failures.
    pub async fn init_workflows(&self) -> Result<BootstrapReport, SyncError> {
        info!(workflows = self.bootstrapper.workflows().len(), "synchronizing workflows");
        self.bootstrapper.run().await
    }

    /// Synchronize a single workflow once, without retries.
    pub async fn load_workflow(&self, name: &str) -> Result<ReconcileOutcome, SyncError> {
        let definition = self.source.load(name)?;
        self.reconciler.reconcile(name, &definition).await
    }

    pub async fn find_workflow(&self, display_name: &str) -> Result<Option<RemoteWorkflowRecord>, SyncError> {
        Ok(self.registry.find_by_name(display_name).await?)
    }

    pub async fn get_workflow(&self, identifier: &str) -> Result<RemoteWorkflowRecord, SyncError> {
        Ok(self.registry.get_by_identifier(identifier).await?)
    }

    pub async fn delete_workflow(&self, identifier: &str) -> Result<(), SyncError> {
        Ok(self.registry.delete(identifier).await?)
    }

    pub async fn ping(&self) -> Result<Value, SyncError> {
        Ok(self.registry.ping().await?)
    }

    pub async fn create_job(&self, request: JobRequest) -> Result<Job, SyncError> {
        self.submitter.submit(request).await
    }

    pub async fn get_job(&self, identifier: &str) -> Result<Job, SyncError> {
        self.submitter.get_job(identifier).await
    }

    pub async fn get_job_info(&self, identifier: &str) -> Result<Value, SyncError> {
        self.submitter.get_job_info(identifier).await
    }

    pub async fn post_job_info(&self, identifier: &str, info: &Value) -> Result<(), SyncError> {
        self.submitter.post_job_info(identifier, info).await
    }

    pub async fn list_jobs(&self, query: &[(String, String)]) -> Result<Vec<Job>, SyncError> {
        self.submitter.list_jobs(query).await
    }

    /// Remote identifier a configured workflow resolved to.
    pub async fn identifier_for(&self, name: &str) -> Option<String> {
        self.cache.get(name).await
    }

    pub fn cache(&self) -> &IdentifierCache {
        &self.cache
    }
}
