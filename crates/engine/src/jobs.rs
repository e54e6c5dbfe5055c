//! Job submission against synchronized workflows.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};
use wfsync_api::JobService;
use wfsync_types::{Job, JobRequest, WORKFLOW_PARAM};

use crate::{IdentifierCache, SyncError};

/// Resolves a workflow reference and queues a job for it.
#[derive(Clone)]
pub struct JobSubmitter {
    jobs: Arc<dyn JobService>,
    cache: IdentifierCache,
}

impl JobSubmitter {
    pub fn new(jobs: Arc<dyn JobService>, cache: IdentifierCache) -> Self {
        Self { jobs, cache }
    }

    /// Queue a job.
    ///
    /// The target is checked before anything else, so an invalid request never
    /// reaches the service. An explicit identifier in `params["workflow"]` wins over
    /// the cached identifier for the named workflow; a non-string value there is
    /// rejected rather than overwritten. The service must answer with a job
    /// identifier and the `queued` execution state.
    pub async fn submit(&self, request: JobRequest) -> Result<Job, SyncError> {
        let Some(target) = request.target().map(str::to_string) else {
            return Err(SyncError::invalid_job("a non-empty 'target' parameter is required"));
        };
        if request
            .params
            .get(WORKFLOW_PARAM)
            .is_some_and(|value| !value.is_null() && !value.is_string())
        {
            return Err(SyncError::invalid_job("the 'workflow' parameter must be a string identifier"));
        }
        let explicit = request.explicit_identifier().map(str::to_string);
        let JobRequest {
            workflow,
            mut params,
            headers,
        } = request;

        let identifier = match explicit {
            Some(identifier) => identifier,
            None => self.resolve(workflow.as_deref()).await?,
        };
        params.insert(WORKFLOW_PARAM.to_string(), Value::String(identifier.clone()));

        let job = self.jobs.create_job(&params, &headers).await?;

        if job.identifier.trim().is_empty() {
            warn!(workflow = %identifier, target = %target, "job service returned no job identifier");
            return Err(SyncError::protocol_violation("job service returned no job identifier"));
        }
        if !job.is_queued() {
            warn!(job = %job.identifier, execution = %job.execution, "job was not queued");
            return Err(SyncError::protocol_violation(format!(
                "job {} reported execution '{}' instead of 'queued'",
                job.identifier, job.execution
            )));
        }

        debug!(job = %job.identifier, workflow = %identifier, target = %target, "job queued");
        Ok(job)
    }

    /// Cached identifier for a workflow name. No name at all resolves nothing.
    async fn resolve(&self, workflow: Option<&str>) -> Result<String, SyncError> {
        let Some(name) = workflow.filter(|name| !name.trim().is_empty()) else {
            return Err(SyncError::UnresolvedWorkflow { name: String::new() });
        };
        self.cache
            .get(name)
            .await
            .ok_or_else(|| SyncError::UnresolvedWorkflow { name: name.to_string() })
    }

    pub async fn get_job(&self, identifier: &str) -> Result<Job, SyncError> {
        Ok(self.jobs.get_job(identifier).await?)
    }

    pub async fn get_job_info(&self, identifier: &str) -> Result<Value, SyncError> {
        Ok(self.jobs.get_job_info(identifier).await?)
    }

    pub async fn post_job_info(&self, identifier: &str, info: &Value) -> Result<(), SyncError> {
        Ok(self.jobs.post_job_info(identifier, info).await?)
    }

    pub async fn list_jobs(&self, query: &[(String, String)]) -> Result<Vec<Job>, SyncError> {
        Ok(self.jobs.list_jobs(query).await?)
    }
}
