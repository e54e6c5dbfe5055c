//! Per-workflow reconciliation against the remote registry.
//!
//! A single pass per workflow:
//!
//! ```text
//! canonicalize -> find_by_name(display name)
//!   not found                          -> create
//!   found, force_replace               -> update (no digest comparison)
//!   found, force_digest_check, differs -> update
//!   found otherwise                    -> keep
//! ```
//!
//! The identifier cache is written only after the pass succeeds.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use wfsync_api::WorkflowRegistry;
use wfsync_types::WorkflowDefinition;

use crate::{Canonicalize, IdentifierCache, SyncError, digest::is_equivalent};

/// Flags controlling how existing remote workflows are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilePolicy {
    /// Overwrite every existing workflow without comparing content.
    pub force_replace: bool,
    /// Overwrite existing workflows whose content digest differs.
    pub force_digest_check: bool,
}

/// What a successful reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "identifier", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Created(String),
    Updated(String),
    Unchanged(String),
}

impl ReconcileOutcome {
    pub fn identifier(&self) -> &str {
        match self {
            Self::Created(identifier) | Self::Updated(identifier) | Self::Unchanged(identifier) => identifier,
        }
    }

    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Unchanged(_))
    }
}

/// Reconciles local definitions with the registry and records resolved identifiers.
#[derive(Clone)]
pub struct Reconciler {
    registry: Arc<dyn WorkflowRegistry>,
    cache: IdentifierCache,
    policy: ReconcilePolicy,
}

impl Reconciler {
    pub fn new(registry: Arc<dyn WorkflowRegistry>, cache: IdentifierCache, policy: ReconcilePolicy) -> Self {
        Self { registry, cache, policy }
    }

    pub fn policy(&self) -> ReconcilePolicy {
        self.policy
    }

    pub fn cache(&self) -> &IdentifierCache {
        &self.cache
    }

    /// Reconcile one definition, caching its identifier under `key` on success.
    pub async fn reconcile(&self, key: &str, definition: &WorkflowDefinition) -> Result<ReconcileOutcome, SyncError> {
        match self.reconcile_inner(definition).await {
            Ok(outcome) => {
                self.cache.insert(key, outcome.identifier()).await;
                debug!(workflow = %key, outcome = ?outcome, "workflow reconciled");
                Ok(outcome)
            }
            Err(err) => {
                error!(workflow = %key, error = %err, "workflow reconciliation failed");
                Err(err)
            }
        }
    }

    async fn reconcile_inner(&self, definition: &WorkflowDefinition) -> Result<ReconcileOutcome, SyncError> {
        let canonical = definition.canonicalize()?;

        let Some(existing) = self.registry.find_by_name(&canonical.name).await? else {
            let identifier = self.registry.create(&canonical).await?;
            return Ok(ReconcileOutcome::Created(identifier));
        };

        if existing.identifier.trim().is_empty() {
            return Err(SyncError::protocol_violation(format!(
                "workflow '{}' was listed without an identifier",
                canonical.name
            )));
        }

        let replace = if self.policy.force_replace {
            true
        } else if self.policy.force_digest_check {
            !is_equivalent(&canonical, &existing)?
        } else {
            false
        };

        if replace {
            self.registry.update(&existing.identifier, &canonical).await?;
            Ok(ReconcileOutcome::Updated(existing.identifier))
        } else {
            Ok(ReconcileOutcome::Unchanged(existing.identifier))
        }
    }
}
