//! Content digests for change detection between local and remote workflows.
//!
//! Step lists are encoded as JSON (struct fields in declaration order, step order
//! preserved) and hashed with SHA-256. Two workflows are equivalent when their
//! chain and error digests match. The cancel digest is computed for diagnostics
//! but does not take part in the equivalence decision.

use sha2::{Digest, Sha256};
use tracing::debug;
use wfsync_types::{CanonicalStep, CanonicalWorkflow, RemoteWorkflowRecord};

use crate::SyncError;

/// Hex-encoded digests of each step list of a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowDigest {
    pub chain: String,
    pub on_error: String,
    pub on_cancel: String,
}

impl WorkflowDigest {
    /// Compute the digests of a canonical workflow.
    pub fn of(workflow: &CanonicalWorkflow) -> Result<Self, SyncError> {
        Ok(Self {
            chain: digest_steps(&workflow.chain)?,
            on_error: digest_steps(&workflow.on_error)?,
            on_cancel: digest_steps(&workflow.on_cancel)?,
        })
    }

    /// Chain and error digests both match.
    pub fn matches(&self, other: &WorkflowDigest) -> bool {
        self.chain == other.chain && self.on_error == other.on_error
    }
}

/// Digest of a single step list.
pub fn digest_steps(steps: &[CanonicalStep]) -> Result<String, SyncError> {
    let encoded = serde_json::to_vec(steps)?;
    Ok(format!("{:x}", Sha256::digest(&encoded)))
}

/// Whether the remote record already holds the local content.
///
/// Per-step server identifiers are stripped from the remote side before hashing.
pub fn is_equivalent(local: &CanonicalWorkflow, remote: &RemoteWorkflowRecord) -> Result<bool, SyncError> {
    let local_digest = WorkflowDigest::of(local)?;
    let remote_digest = WorkflowDigest::of(&remote.to_canonical())?;
    let equivalent = local_digest.matches(&remote_digest);
    debug!(
        workflow = %local.name,
        identifier = %remote.identifier,
        local_chain = %local_digest.chain,
        remote_chain = %remote_digest.chain,
        local_onerror = %local_digest.on_error,
        remote_onerror = %remote_digest.on_error,
        cancel_matches = local_digest.on_cancel == remote_digest.on_cancel,
        equivalent,
        "compared workflow digests"
    );
    Ok(equivalent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wfsync_types::RemoteStep;

    fn step(name: &str, body: &str) -> CanonicalStep {
        CanonicalStep {
            name: name.into(),
            timeout: Some(10),
            retry: Some(1),
            body: body.into(),
            fallback: None,
        }
    }

    fn local() -> CanonicalWorkflow {
        CanonicalWorkflow {
            name: "say-1.0.0".into(),
            version: Some("1.0.0".into()),
            chain: vec![step("say.hi", "function hi() {}"), step("say.hello", "function hello() {}")],
            on_error: vec![step("On error", "function () {}")],
            ..Default::default()
        }
    }

    fn remote_from(workflow: &CanonicalWorkflow) -> RemoteWorkflowRecord {
        let with_ids = |steps: &[CanonicalStep], prefix: &str| {
            steps
                .iter()
                .enumerate()
                .map(|(index, step)| RemoteStep {
                    uuid: Some(format!("{prefix}-{index}")),
                    step: step.clone(),
                })
                .collect::<Vec<_>>()
        };
        RemoteWorkflowRecord {
            identifier: "wf-1".into(),
            name: workflow.name.clone(),
            version: workflow.version.clone(),
            chain: with_ids(&workflow.chain, "chain"),
            on_error: with_ids(&workflow.on_error, "error"),
            on_cancel: with_ids(&workflow.on_cancel, "cancel"),
            timeout: workflow.timeout,
            max_attempts: workflow.max_attempts,
        }
    }

    #[test]
    fn identical_content_with_server_ids_is_equivalent() {
        let local = local();
        let remote = remote_from(&local);
        assert!(is_equivalent(&local, &remote).expect("compare"));
    }

    #[test]
    fn digest_is_deterministic() {
        let first = WorkflowDigest::of(&local()).expect("first");
        let second = WorkflowDigest::of(&local()).expect("second");
        assert_eq!(first, second);
        assert_eq!(first.chain.len(), 64);
    }

    #[test]
    fn reordering_chain_steps_changes_the_digest() {
        let original = local();
        let mut reordered = local();
        reordered.chain.swap(0, 1);

        assert_ne!(
            digest_steps(&original.chain).expect("original"),
            digest_steps(&reordered.chain).expect("reordered")
        );
        assert!(!is_equivalent(&reordered, &remote_from(&original)).expect("compare"));
    }

    #[test]
    fn error_step_changes_are_detected() {
        let original = local();
        let mut changed = local();
        changed.on_error[0].body = "function (job, cb) { return cb('boom'); }".into();
        assert!(!is_equivalent(&changed, &remote_from(&original)).expect("compare"));
    }

    #[test]
    fn cancel_steps_do_not_affect_equivalence() {
        let original = local();
        let mut with_cancel = local();
        with_cancel.on_cancel = vec![step("On cancel", "function () {}")];

        let local_digest = WorkflowDigest::of(&with_cancel).expect("local");
        let remote_digest = WorkflowDigest::of(&original).expect("remote");
        assert_ne!(local_digest.on_cancel, remote_digest.on_cancel);
        assert!(is_equivalent(&with_cancel, &remote_from(&original)).expect("compare"));
    }
}
