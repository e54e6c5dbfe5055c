//! Name to remote identifier mapping shared by the reconciler and the job submitter.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

/// Cache of resolved workflow identifiers, keyed by local workflow name.
///
/// Cloning is cheap and every clone sees the same entries. Entries are only
/// written after a successful reconciliation; a failed one leaves its entry as it was.
#[derive(Debug, Clone, Default)]
pub struct IdentifierCache {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl IdentifierCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, name: &str) -> Option<String> {
        self.entries.read().await.get(name).cloned()
    }

    /// Record the identifier a workflow resolved to, returning the previous one.
    pub async fn insert(&self, name: impl Into<String>, identifier: impl Into<String>) -> Option<String> {
        self.entries.write().await.insert(name.into(), identifier.into())
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.entries.read().await.contains_key(name)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Point-in-time copy of every entry.
    pub async fn snapshot(&self) -> HashMap<String, String> {
        self.entries.read().await.clone()
    }
}
