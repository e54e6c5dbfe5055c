//! In-memory doubles of the workflow service used by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{Map, Value, json};
use wfsync_api::{ApiError, JobService, WorkflowRegistry};
use wfsync_types::{
    CanonicalWorkflow, Job, RemoteStep, RemoteWorkflowRecord, StepBody, WorkflowDefinition, WorkflowStep,
};

use crate::{DefinitionSource, SyncError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Find(String),
    Get(String),
    Create(String),
    Update(String),
    Delete(String),
    Ping,
}

/// Registry double that keeps records in memory and records every call.
#[derive(Debug, Default)]
pub(crate) struct FakeRegistry {
    records: Mutex<Vec<RemoteWorkflowRecord>>,
    calls: Mutex<Vec<Call>>,
    next_identifier: AtomicUsize,
    /// Number of upcoming lookups that fail with HTTP 503.
    lookup_failures: AtomicU32,
    /// Names whose lookups always fail with HTTP 503.
    unavailable: Mutex<HashSet<String>>,
    /// Names whose creation answers without an identifier.
    malformed_create: Mutex<HashSet<String>>,
}

impl FakeRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_record(self, record: RemoteWorkflowRecord) -> Self {
        self.records.lock().expect("records").push(record);
        self
    }

    pub(crate) fn fail_next_lookups(&self, count: u32) {
        self.lookup_failures.store(count, Ordering::SeqCst);
    }

    pub(crate) fn make_unavailable(&self, name: &str) {
        self.unavailable.lock().expect("unavailable").insert(name.to_string());
    }

    pub(crate) fn make_create_malformed(&self, name: &str) {
        self.malformed_create.lock().expect("malformed").insert(name.to_string());
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls").clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.calls.lock().expect("calls").clear();
    }

    pub(crate) fn creates(&self) -> usize {
        self.calls().iter().filter(|call| matches!(call, Call::Create(_))).count()
    }

    pub(crate) fn updates(&self) -> usize {
        self.calls().iter().filter(|call| matches!(call, Call::Update(_))).count()
    }

    pub(crate) fn writes(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Create(_) | Call::Update(_) | Call::Delete(_)))
            .count()
    }

    pub(crate) fn lookups(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Find(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn record_named(&self, name: &str) -> Option<RemoteWorkflowRecord> {
        self.records
            .lock()
            .expect("records")
            .iter()
            .find(|record| record.name == name)
            .cloned()
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("calls").push(call);
    }

    fn store(&self, identifier: &str, workflow: &CanonicalWorkflow) {
        let mut records = self.records.lock().expect("records");
        records.retain(|record| record.identifier != identifier);
        records.push(remote_record(identifier, workflow));
    }
}

fn unavailable_error() -> ApiError {
    ApiError::Status {
        method: "GET".into(),
        path: "/workflows".into(),
        status: 503,
        body: "service unavailable".into(),
    }
}

#[async_trait]
impl WorkflowRegistry for FakeRegistry {
    async fn find_by_name(&self, name: &str) -> Result<Option<RemoteWorkflowRecord>, ApiError> {
        self.record(Call::Find(name.to_string()));
        let pending = self.lookup_failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.lookup_failures.store(pending - 1, Ordering::SeqCst);
            return Err(unavailable_error());
        }
        if self.unavailable.lock().expect("unavailable").contains(name) {
            return Err(unavailable_error());
        }
        Ok(self.record_named(name))
    }

    async fn get_by_identifier(&self, identifier: &str) -> Result<RemoteWorkflowRecord, ApiError> {
        self.record(Call::Get(identifier.to_string()));
        self.records
            .lock()
            .expect("records")
            .iter()
            .find(|record| record.identifier == identifier)
            .cloned()
            .ok_or_else(|| ApiError::NotFound {
                path: format!("/workflows/{identifier}"),
            })
    }

    async fn create(&self, workflow: &CanonicalWorkflow) -> Result<String, ApiError> {
        self.record(Call::Create(workflow.name.clone()));
        if self.malformed_create.lock().expect("malformed").contains(&workflow.name) {
            return Err(ApiError::protocol_violation("POST /workflows returned no workflow identifier"));
        }
        let identifier = format!("wf-{}", self.next_identifier.fetch_add(1, Ordering::SeqCst) + 1);
        self.store(&identifier, workflow);
        Ok(identifier)
    }

    async fn update(&self, identifier: &str, workflow: &CanonicalWorkflow) -> Result<String, ApiError> {
        self.record(Call::Update(identifier.to_string()));
        self.store(identifier, workflow);
        Ok(identifier.to_string())
    }

    async fn delete(&self, identifier: &str) -> Result<(), ApiError> {
        self.record(Call::Delete(identifier.to_string()));
        self.records
            .lock()
            .expect("records")
            .retain(|record| record.identifier != identifier);
        Ok(())
    }

    async fn ping(&self) -> Result<Value, ApiError> {
        self.record(Call::Ping);
        Ok(json!({ "pong": true }))
    }
}

/// Job service double answering with a configurable execution state.
#[derive(Debug)]
pub(crate) struct FakeJobs {
    pub(crate) execution: String,
    pub(crate) identifier: String,
    pub(crate) submitted: Mutex<Vec<(Map<String, Value>, IndexMap<String, String>)>>,
}

impl FakeJobs {
    pub(crate) fn answering(identifier: &str, execution: &str) -> Self {
        Self {
            execution: execution.to_string(),
            identifier: identifier.to_string(),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn submissions(&self) -> Vec<(Map<String, Value>, IndexMap<String, String>)> {
        self.submitted.lock().expect("submitted").clone()
    }
}

#[async_trait]
impl JobService for FakeJobs {
    async fn create_job(&self, params: &Map<String, Value>, headers: &IndexMap<String, String>) -> Result<Job, ApiError> {
        self.submitted
            .lock()
            .expect("submitted")
            .push((params.clone(), headers.clone()));
        Ok(Job {
            identifier: self.identifier.clone(),
            execution: self.execution.clone(),
            workflow: params.get("workflow").and_then(Value::as_str).map(str::to_string),
            target: params.get("target").and_then(Value::as_str).map(str::to_string),
            params: params.clone(),
            ..Default::default()
        })
    }

    async fn get_job(&self, identifier: &str) -> Result<Job, ApiError> {
        Ok(Job {
            identifier: identifier.to_string(),
            execution: self.execution.clone(),
            ..Default::default()
        })
    }

    async fn get_job_info(&self, _identifier: &str) -> Result<Value, ApiError> {
        Ok(json!([]))
    }

    async fn post_job_info(&self, _identifier: &str, _info: &Value) -> Result<(), ApiError> {
        Ok(())
    }

    async fn list_jobs(&self, _query: &[(String, String)]) -> Result<Vec<Job>, ApiError> {
        Ok(Vec::new())
    }
}

/// Definition source backed by a map, used in place of the filesystem.
#[derive(Debug, Default)]
pub(crate) struct StaticDefinitions {
    pub(crate) definitions: Mutex<HashMap<String, WorkflowDefinition>>,
}

impl StaticDefinitions {
    pub(crate) fn with(definitions: impl IntoIterator<Item = WorkflowDefinition>) -> Self {
        let map = definitions
            .into_iter()
            .map(|definition| (definition.name.clone(), definition))
            .collect();
        Self {
            definitions: Mutex::new(map),
        }
    }

    pub(crate) fn replace(&self, definition: WorkflowDefinition) {
        self.definitions
            .lock()
            .expect("definitions")
            .insert(definition.name.clone(), definition);
    }
}

impl DefinitionSource for StaticDefinitions {
    fn load(&self, name: &str) -> Result<WorkflowDefinition, SyncError> {
        self.definitions
            .lock()
            .expect("definitions")
            .get(name)
            .cloned()
            .ok_or_else(|| SyncError::definition(name, "no such workflow definition"))
    }
}

pub(crate) fn step(name: &str, body: &str) -> WorkflowStep {
    WorkflowStep {
        name: name.into(),
        timeout: Some(10),
        retry: Some(1),
        body: StepBody::from(body),
        fallback: None,
    }
}

/// The two-step `say` workflow.
pub(crate) fn say_definition() -> WorkflowDefinition {
    WorkflowDefinition {
        name: "say".into(),
        version: Some("1.0.0".into()),
        chain: vec![
            step("say.hi", "function hi(job, cb) { return cb(null, 'Hi there, ' + job.params.name); }"),
            step("say.hello", "function hello(job, cb) { return cb(null, 'Hello again'); }"),
        ],
        on_error: vec![step("On error", "function (job, cb) { return cb('Error executing job'); }")],
        on_cancel: None,
        timeout: Some(20),
        max_attempts: None,
    }
}

pub(crate) fn named_definition(name: &str) -> WorkflowDefinition {
    WorkflowDefinition {
        name: name.into(),
        version: Some("1.0.0".into()),
        chain: vec![step(&format!("{name}.run"), "function run(job, cb) { return cb(null); }")],
        on_error: vec![step("On error", "function (job, cb) { return cb('failed'); }")],
        ..Default::default()
    }
}

/// Remote record mirroring `workflow`, with server-assigned step identifiers.
pub(crate) fn remote_record(identifier: &str, workflow: &CanonicalWorkflow) -> RemoteWorkflowRecord {
    let with_ids = |steps: &[wfsync_types::CanonicalStep]| {
        steps
            .iter()
            .enumerate()
            .map(|(index, step)| RemoteStep {
                uuid: Some(format!("{identifier}-step-{index}")),
                step: step.clone(),
            })
            .collect::<Vec<_>>()
    };
    RemoteWorkflowRecord {
        identifier: identifier.to_string(),
        name: workflow.name.clone(),
        version: workflow.version.clone(),
        chain: with_ids(&workflow.chain),
        on_error: with_ids(&workflow.on_error),
        on_cancel: with_ids(&workflow.on_cancel),
        timeout: workflow.timeout,
        max_attempts: workflow.max_attempts,
    }
}
