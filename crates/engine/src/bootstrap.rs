//! Startup synchronization of the configured workflow set.
//!
//! One attempt walks the configured names in order and stops at the first
//! failure, so after a failed attempt the identifier cache holds exactly the
//! prefix that succeeded. Retryable failures restart the whole walk after an
//! exponential backoff delay; fatal ones are returned immediately.

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::backoff::{AttemptSeverity, RetryPolicy};
use crate::reconcile::{ReconcileOutcome, Reconciler};
use crate::{DefinitionSource, SyncError};

/// Result of a successful bootstrap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    /// Attempts made, including the successful one. Zero when nothing was configured.
    pub attempts: u32,
    /// Outcome per configured workflow, in configured order.
    pub outcomes: IndexMap<String, ReconcileOutcome>,
}

/// Drives the [`Reconciler`] across the configured workflows under a retry envelope.
#[derive(Clone)]
pub struct Bootstrapper {
    reconciler: Reconciler,
    source: Arc<dyn DefinitionSource>,
    workflows: Vec<String>,
    retry: RetryPolicy,
}

impl Bootstrapper {
    pub fn new(reconciler: Reconciler, source: Arc<dyn DefinitionSource>, workflows: Vec<String>, retry: RetryPolicy) -> Self {
        Self {
            reconciler,
            source,
            workflows,
            retry,
        }
    }

    pub fn workflows(&self) -> &[String] {
        &self.workflows
    }

    pub async fn run(&self) -> Result<BootstrapReport, SyncError> {
        if self.workflows.is_empty() {
            info!("no workflows configured; nothing to synchronize");
            return Ok(BootstrapReport::default());
        }

        let mut backoff = self.retry.backoff();
        loop {
            let attempt = backoff.attempts() + 1;
            match self.run_pass().await {
                Ok(outcomes) => {
                    log_synchronized(attempt, outcomes.len());
                    return Ok(BootstrapReport { attempts: attempt, outcomes });
                }
                Err(err) if !err.is_retryable() => {
                    error!(attempt, error = %err, "bootstrap aborted by a non-retryable error");
                    return Err(err);
                }
                Err(err) => match backoff.record_failure() {
                    Some(delay) => {
                        log_retry(attempt, delay, &err);
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        log_exhausted(backoff.attempts(), &err);
                        return Err(SyncError::ConnectFailed {
                            attempts: backoff.attempts(),
                            source: Box::new(err),
                        });
                    }
                },
            }
        }
    }

    /// One sequential walk over the configured workflows.
    ///
    /// Definitions are loaded on every pass so edits on disk are picked up.
    async fn run_pass(&self) -> Result<IndexMap<String, ReconcileOutcome>, SyncError> {
        let mut outcomes = IndexMap::with_capacity(self.workflows.len());
        for name in &self.workflows {
            let definition = self.source.load(name)?;
            let outcome = self.reconciler.reconcile(name, &definition).await?;
            outcomes.insert(name.clone(), outcome);
        }
        Ok(outcomes)
    }
}

fn log_retry(attempt: u32, delay: Duration, err: &SyncError) {
    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
    match AttemptSeverity::for_attempt(attempt) {
        AttemptSeverity::Info => info!(attempt, delay_ms, error = %err, "bootstrap attempt failed; retrying"),
        AttemptSeverity::Warn => warn!(attempt, delay_ms, error = %err, "bootstrap attempt failed; retrying"),
        AttemptSeverity::Error => error!(attempt, delay_ms, error = %err, "bootstrap attempt failed; retrying"),
    }
}

fn log_synchronized(attempt: u32, workflows: usize) {
    match AttemptSeverity::for_attempt(attempt) {
        AttemptSeverity::Info => info!(attempt, workflows, "workflows synchronized"),
        AttemptSeverity::Warn => warn!(attempt, workflows, "workflows synchronized"),
        AttemptSeverity::Error => error!(attempt, workflows, "workflows synchronized"),
    }
}

fn log_exhausted(attempts: u32, err: &SyncError) {
    match AttemptSeverity::for_attempt(attempts) {
        AttemptSeverity::Info => info!(attempts, error = %err, "bootstrap retry budget exhausted"),
        AttemptSeverity::Warn => warn!(attempts, error = %err, "bootstrap retry budget exhausted"),
        AttemptSeverity::Error => error!(attempts, error = %err, "bootstrap retry budget exhausted"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IdentifierCache;
    use crate::reconcile::ReconcilePolicy;
    use crate::test_support::{FakeRegistry, StaticDefinitions, named_definition, say_definition, step};
    use std::io::Write;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("log buffer").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn install(&self) -> tracing::subscriber::DefaultGuard {
            let writer = self.clone();
            let subscriber = tracing_subscriber::fmt()
                .with_ansi(false)
                .without_time()
                .with_max_level(tracing::Level::INFO)
                .with_writer(move || writer.clone())
                .finish();
            tracing::subscriber::set_default(subscriber)
        }

        fn line_with(&self, message: &str) -> String {
            let bytes = self.0.lock().expect("log buffer").clone();
            String::from_utf8_lossy(&bytes)
                .lines()
                .find(|line| line.contains(message))
                .map(str::to_string)
                .unwrap_or_default()
        }
    }

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            min_delay_ms: 1,
            max_delay_ms: 2,
            max_attempts: Some(max_attempts),
        }
    }

    fn bootstrapper(
        registry: Arc<FakeRegistry>,
        source: Arc<StaticDefinitions>,
        workflows: &[&str],
        policy: ReconcilePolicy,
        retry: RetryPolicy,
    ) -> (Bootstrapper, IdentifierCache) {
        let cache = IdentifierCache::new();
        let reconciler = Reconciler::new(registry, cache.clone(), policy);
        let names = workflows.iter().map(|name| name.to_string()).collect();
        (Bootstrapper::new(reconciler, source, names, retry), cache)
    }

    #[tokio::test]
    async fn empty_workflow_list_succeeds_without_network() {
        let registry = Arc::new(FakeRegistry::new());
        let source = Arc::new(StaticDefinitions::default());
        let (bootstrapper, cache) = bootstrapper(registry.clone(), source, &[], ReconcilePolicy::default(), fast_retry(1));

        let report = bootstrapper.run().await.expect("bootstrap");

        assert_eq!(report.attempts, 0);
        assert!(registry.calls().is_empty());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn workflows_are_reconciled_in_configured_order() {
        let registry = Arc::new(FakeRegistry::new());
        let source = Arc::new(StaticDefinitions::with([named_definition("beta"), named_definition("alpha")]));
        let (bootstrapper, cache) = bootstrapper(
            registry.clone(),
            source,
            &["beta", "alpha"],
            ReconcilePolicy::default(),
            fast_retry(1),
        );

        let report = bootstrapper.run().await.expect("bootstrap");

        assert_eq!(report.attempts, 1);
        assert_eq!(report.outcomes.keys().collect::<Vec<_>>(), vec!["beta", "alpha"]);
        assert_eq!(registry.lookups(), vec!["beta-1.0.0".to_string(), "alpha-1.0.0".to_string()]);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn failed_attempt_caches_only_the_successful_prefix() {
        let registry = Arc::new(FakeRegistry::new());
        registry.make_unavailable("second-1.0.0");
        let source = Arc::new(StaticDefinitions::with(
            ["first", "second", "third"].map(named_definition),
        ));
        let (bootstrapper, cache) = bootstrapper(
            registry.clone(),
            source,
            &["first", "second", "third"],
            ReconcilePolicy::default(),
            fast_retry(2),
        );

        let err = bootstrapper.run().await.expect_err("second is unavailable");

        assert!(matches!(err, SyncError::ConnectFailed { attempts: 2, .. }), "unexpected error: {err}");
        assert!(cache.contains("first").await);
        assert!(!cache.contains("second").await);
        assert!(!cache.contains("third").await);
        assert_eq!(
            registry.lookups(),
            vec!["first-1.0.0", "second-1.0.0", "first-1.0.0", "second-1.0.0"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
        assert_eq!(registry.creates(), 1, "the retried pass reuses the created workflow");
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let registry = Arc::new(FakeRegistry::new());
        registry.fail_next_lookups(2);
        let source = Arc::new(StaticDefinitions::with([say_definition()]));
        let (bootstrapper, cache) = bootstrapper(registry.clone(), source, &["say"], ReconcilePolicy::default(), fast_retry(5));

        let report = bootstrapper.run().await.expect("bootstrap");

        assert_eq!(report.attempts, 3);
        assert!(matches!(report.outcomes["say"], ReconcileOutcome::Created(_)));
        assert_eq!(registry.creates(), 1);
        assert!(cache.contains("say").await);
    }

    #[tokio::test]
    async fn fatal_errors_abort_without_retrying() {
        let registry = Arc::new(FakeRegistry::new());
        registry.make_create_malformed("say-1.0.0");
        let source = Arc::new(StaticDefinitions::with([say_definition()]));
        let (bootstrapper, _cache) = bootstrapper(registry.clone(), source, &["say"], ReconcilePolicy::default(), fast_retry(5));

        let err = bootstrapper.run().await.expect_err("malformed create");

        assert!(err.is_protocol_violation(), "unexpected error: {err}");
        assert_eq!(registry.lookups().len(), 1);
    }

    #[tokio::test]
    async fn missing_definitions_are_fatal() {
        let registry = Arc::new(FakeRegistry::new());
        let source = Arc::new(StaticDefinitions::default());
        let (bootstrapper, _cache) = bootstrapper(registry.clone(), source, &["say"], ReconcilePolicy::default(), fast_retry(5));

        let err = bootstrapper.run().await.expect_err("no definition");

        assert!(matches!(err, SyncError::Definition { .. }));
        assert!(registry.calls().is_empty());
    }

    #[tokio::test]
    async fn second_pass_is_write_free_and_sees_edits_on_disk() {
        let registry = Arc::new(FakeRegistry::new());
        let source = Arc::new(StaticDefinitions::with([say_definition()]));
        let policy = ReconcilePolicy {
            force_digest_check: true,
            ..Default::default()
        };
        let (bootstrapper, _cache) = bootstrapper(registry.clone(), source.clone(), &["say"], policy, fast_retry(1));

        bootstrapper.run().await.expect("first pass");
        registry.clear_calls();

        let report = bootstrapper.run().await.expect("second pass");
        assert!(matches!(report.outcomes["say"], ReconcileOutcome::Unchanged(_)));
        assert_eq!(registry.writes(), 0);

        let mut edited = say_definition();
        edited.chain.push(step("say.bye", "function bye(job, cb) { return cb(null, 'Bye'); }"));
        source.replace(edited);

        let report = bootstrapper.run().await.expect("third pass");
        assert!(matches!(report.outcomes["say"], ReconcileOutcome::Updated(_)));
        assert_eq!(registry.updates(), 1);
    }

    #[tokio::test]
    async fn completion_logs_follow_the_attempt_severity() {
        let logs = CapturedLogs::default();
        let _guard = logs.install();

        let registry = Arc::new(FakeRegistry::new());
        registry.fail_next_lookups(2);
        let source = Arc::new(StaticDefinitions::with([say_definition()]));
        let (late, _cache) = bootstrapper(registry, source, &["say"], ReconcilePolicy::default(), fast_retry(5));
        late.run().await.expect("third attempt succeeds");

        let registry = Arc::new(FakeRegistry::new());
        registry.make_unavailable("say-1.0.0");
        let source = Arc::new(StaticDefinitions::with([say_definition()]));
        let (exhausted, _cache) = bootstrapper(registry, source, &["say"], ReconcilePolicy::default(), fast_retry(2));
        exhausted.run().await.expect_err("budget of two attempts");

        let synchronized = logs.line_with("workflows synchronized");
        assert!(synchronized.contains("WARN"), "unexpected log line: {synchronized}");
        let budget = logs.line_with("retry budget exhausted");
        assert!(budget.contains("WARN"), "unexpected log line: {budget}");
    }
}
