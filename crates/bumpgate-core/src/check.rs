//! The full validation run: resolve, extract manifest diffs, evaluate,
//! aggregate.
//!
//! Per-plugin work runs concurrently, at most [`CheckOptions::jobs`] git
//! queries at a time, each under [`CheckOptions::query_timeout`]. A failure
//! for one plugin is recorded in its report entry and never stops the others.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::discovery::PluginLayout;
use crate::error::BumpGateError;
use crate::git::ChangeSource;
use crate::mapper::manifest_diff;
use crate::policy::assess;
use crate::report::{aggregate, PluginOutcome, Report};
use crate::resolver::resolve;
use crate::types::plugin::PluginName;
use crate::types::request::ChangeSetRequest;

pub const DEFAULT_JOBS: usize = 4;
pub const MAX_JOBS: usize = 32;
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOptions {
    jobs: usize,
    query_timeout: Duration,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            jobs: DEFAULT_JOBS,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }
}

impl CheckOptions {
    /// # Errors
    ///
    /// Returns [`BumpGateError::Configuration`] if `jobs` is outside
    /// `1..=MAX_JOBS` or `query_timeout` is zero.
    pub fn new(jobs: usize, query_timeout: Duration) -> Result<Self, BumpGateError> {
        if !(1..=MAX_JOBS).contains(&jobs) {
            return Err(BumpGateError::Configuration(format!(
                "--jobs must be between 1 and {MAX_JOBS}, got {jobs}"
            )));
        }
        if query_timeout.is_zero() {
            return Err(BumpGateError::Configuration(
                "--timeout must be greater than zero".into(),
            ));
        }
        Ok(Self {
            jobs,
            query_timeout,
        })
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }
}

/// Runs the whole pipeline for `request`.
///
/// # Errors
///
/// Returns an error only when the initial change listing fails (or times
/// out); every later failure is recorded per plugin in the [`Report`].
pub async fn run_check<S>(
    source: Arc<S>,
    layout: &PluginLayout,
    request: &ChangeSetRequest,
    options: &CheckOptions,
) -> Result<Report, BumpGateError>
where
    S: ChangeSource + 'static,
{
    let plugins = with_timeout(
        options.query_timeout,
        "listing changed paths",
        resolve(source.as_ref(), layout, request),
    )
    .await?;

    info!(plugins = plugins.len(), mode = %request.mode(), "resolved changed plugins");

    let semaphore = Arc::new(Semaphore::new(options.jobs));
    let layout = Arc::new(layout.clone());
    let request = Arc::new(request.clone());

    let handles: Vec<(PluginName, tokio::task::JoinHandle<PluginOutcome>)> = plugins
        .into_iter()
        .map(|plugin| {
            let source = Arc::clone(&source);
            let semaphore = Arc::clone(&semaphore);
            let layout = Arc::clone(&layout);
            let request = Arc::clone(&request);
            let timeout = options.query_timeout;
            let task_plugin = plugin.clone();

            let handle = tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return PluginOutcome::from_error(&BumpGateError::query(
                        "manifest diff",
                        "worker pool closed",
                    ));
                };
                check_plugin(source.as_ref(), &layout, &request, &task_plugin, timeout).await
            });
            (plugin, handle)
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for (plugin, handle) in handles {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => PluginOutcome::from_error(&BumpGateError::query(
                "manifest diff",
                format!("worker task failed: {e}"),
            )),
        };
        outcomes.push((plugin, outcome));
    }

    let report = aggregate(outcomes);
    let summary = report.summary();
    info!(
        total = summary.total,
        bump_required = summary.bump_required,
        errors = summary.errors,
        passed = report.passed(),
        "check finished"
    );
    Ok(report)
}

async fn check_plugin<S: ChangeSource>(
    source: &S,
    layout: &PluginLayout,
    request: &ChangeSetRequest,
    plugin: &PluginName,
    timeout: Duration,
) -> PluginOutcome {
    let diff = with_timeout(
        timeout,
        "manifest diff",
        manifest_diff(source, layout, request, plugin),
    )
    .await;

    match diff.and_then(|d| assess(&d)) {
        Ok(assessment) => PluginOutcome::from_assessment(assessment),
        Err(e) => {
            warn!(plugin = %plugin, error = %e, "could not evaluate plugin");
            PluginOutcome::from_error(&e)
        }
    }
}

async fn with_timeout<T, F>(limit: Duration, what: &str, fut: F) -> Result<T, BumpGateError>
where
    F: Future<Output = Result<T, BumpGateError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(BumpGateError::query(
            what,
            format!("timed out after {}s", limit.as_secs_f64()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::discovery::DEFAULT_MANIFEST;
    use crate::error::ErrorKind;
    use crate::git::tests::{git, manifest, setup_repo, write};
    use crate::git::GitCli;
    use crate::types::request::CompareMode;
    use crate::types::verdict::Verdict;

    /// In-memory [`ChangeSource`] with per-path diffs, failures and stalls.
    #[derive(Default)]
    struct FakeSource {
        changed: Vec<String>,
        diffs: HashMap<String, String>,
        failing: HashSet<String>,
        hanging: HashSet<String>,
        delay: Duration,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ChangeSource for FakeSource {
        async fn changed_paths(
            &self,
            _mode: &CompareMode,
            _scope: Option<&str>,
        ) -> Result<Vec<String>, BumpGateError> {
            Ok(self.changed.clone())
        }

        async fn diff_path(&self, _mode: &CompareMode, path: &str) -> Result<String, BumpGateError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            if self.hanging.contains(path) {
                std::future::pending::<()>().await;
            }
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.contains(path) {
                return Err(BumpGateError::query("git diff", "fatal: simulated failure"));
            }
            Ok(self.diffs.get(path).cloned().unwrap_or_default())
        }
    }

    fn manifest_of(plugin: &str) -> String {
        format!("plugins/{plugin}/.claude-plugin/plugin.json")
    }

    fn version_diff(plugin: &str, from: &str, to: &str, extra: &str) -> String {
        let path = manifest_of(plugin);
        let added = if extra.is_empty() { 1 } else { 2 };
        let mut diff = format!(
            "--- a/{path}\n+++ b/{path}\n@@ -1,1 +1,{added} @@\n-  \"version\": \"{from}\",\n+  \"version\": \"{to}\",\n"
        );
        if !extra.is_empty() {
            diff.push_str(&format!("+{extra}\n"));
        }
        diff
    }

    fn layout() -> PluginLayout {
        PluginLayout::new("/repo", "plugins", DEFAULT_MANIFEST).unwrap()
    }

    fn request() -> ChangeSetRequest {
        ChangeSetRequest::new(CompareMode::WorkingTree, None)
    }

    fn verdicts(report: &Report) -> Vec<(&str, Option<Verdict>)> {
        report
            .entries()
            .iter()
            .map(|e| (e.plugin.as_str(), e.outcome.verdict()))
            .collect()
    }

    #[test]
    fn options_validate_ranges() {
        assert!(CheckOptions::new(0, DEFAULT_QUERY_TIMEOUT).is_err());
        assert!(CheckOptions::new(MAX_JOBS + 1, DEFAULT_QUERY_TIMEOUT).is_err());
        assert!(CheckOptions::new(4, Duration::ZERO).is_err());
        assert_eq!(CheckOptions::new(8, DEFAULT_QUERY_TIMEOUT).unwrap().jobs(), 8);
    }

    #[tokio::test]
    async fn no_changes_is_an_empty_passing_report() {
        let source = Arc::new(FakeSource::default());
        let report = run_check(source, &layout(), &request(), &CheckOptions::default())
            .await
            .unwrap();
        assert!(report.is_empty());
        assert!(report.passed());
    }

    #[tokio::test]
    async fn evaluates_every_changed_plugin_in_order() {
        let mut source = FakeSource {
            changed: vec![
                "plugins/gamma/commands/x.md".into(),
                manifest_of("alpha"),
                manifest_of("beta"),
                "README.md".into(),
            ],
            ..FakeSource::default()
        };
        source.diffs.insert(
            manifest_of("alpha"),
            version_diff("alpha", "1.0.0", "1.0.0", "  \"description\": \"new text\","),
        );
        source.diffs.insert(
            manifest_of("beta"),
            version_diff("beta", "1.0.0", "1.0.1", "  \"description\": \"new text\","),
        );

        let report = run_check(Arc::new(source), &layout(), &request(), &CheckOptions::default())
            .await
            .unwrap();

        assert_eq!(
            verdicts(&report),
            vec![
                ("alpha", Some(Verdict::BumpRequired)),
                ("beta", Some(Verdict::NoBumpRequired)),
                ("gamma", Some(Verdict::NoBumpRequired)),
            ]
        );
        assert!(!report.passed());
    }

    #[tokio::test]
    async fn one_failed_query_does_not_drop_other_plugins() {
        let mut source = FakeSource {
            changed: vec![manifest_of("a"), manifest_of("b"), manifest_of("c")],
            ..FakeSource::default()
        };
        source.diffs.insert(manifest_of("a"), version_diff("a", "1.0.0", "1.1.0", ""));
        source.failing.insert(manifest_of("b"));

        let report = run_check(Arc::new(source), &layout(), &request(), &CheckOptions::default())
            .await
            .unwrap();

        assert_eq!(report.entries().len(), 3);
        assert_eq!(report.summary().errors, 1);
        assert_eq!(report.summary().no_bump_required, 2);
        assert!(matches!(
            report.entries()[1].outcome,
            PluginOutcome::Failed { kind: ErrorKind::RepositoryQuery, .. }
        ));
        assert!(!report.passed());
    }

    #[tokio::test]
    async fn malformed_manifest_diff_fails_closed() {
        let mut source = FakeSource {
            changed: vec![manifest_of("a")],
            ..FakeSource::default()
        };
        source.diffs.insert(
            manifest_of("a"),
            format!("--- a/{p}\n+++ b/{p}\n@@ -1,4 +1,4 @@\n-x\n", p = manifest_of("a")),
        );

        let report = run_check(Arc::new(source), &layout(), &request(), &CheckOptions::default())
            .await
            .unwrap();

        assert!(matches!(
            report.entries()[0].outcome,
            PluginOutcome::Failed { kind: ErrorKind::MalformedDiff, .. }
        ));
        assert!(!report.passed());
    }

    #[tokio::test]
    async fn hung_query_times_out_for_that_plugin_only() {
        let mut source = FakeSource {
            changed: vec![manifest_of("stuck"), manifest_of("fine")],
            ..FakeSource::default()
        };
        source.hanging.insert(manifest_of("stuck"));
        source.diffs.insert(manifest_of("fine"), version_diff("fine", "1.0.0", "2.0.0", ""));

        let options = CheckOptions::new(2, Duration::from_millis(100)).unwrap();
        let report = run_check(Arc::new(source), &layout(), &request(), &options)
            .await
            .unwrap();

        assert_eq!(
            verdicts(&report),
            vec![("fine", Some(Verdict::NoBumpRequired)), ("stuck", None)]
        );
        let PluginOutcome::Failed { kind, message } = &report.entries()[1].outcome else {
            panic!("expected a failure for the hung plugin");
        };
        assert_eq!(*kind, ErrorKind::RepositoryQuery);
        assert!(message.contains("timed out"));
    }

    #[tokio::test]
    async fn worker_pool_is_bounded() {
        let source = Arc::new(FakeSource {
            changed: (0..10).map(|i| manifest_of(&format!("p{i}"))).collect(),
            delay: Duration::from_millis(20),
            ..FakeSource::default()
        });

        let options = CheckOptions::new(3, DEFAULT_QUERY_TIMEOUT).unwrap();
        let report = run_check(Arc::clone(&source), &layout(), &request(), &options)
            .await
            .unwrap();

        assert_eq!(report.entries().len(), 10);
        assert!(source.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn end_to_end_against_git() {
        let tmp = setup_repo();
        write(
            tmp.path(),
            "plugins/alpha/.claude-plugin/plugin.json",
            &manifest("alpha", "1.0.0", "a sharper description"),
        );
        write(
            tmp.path(),
            "plugins/beta/.claude-plugin/plugin.json",
            &manifest("beta", "1.1.0", "a sharper description"),
        );
        write(tmp.path(), "plugins/beta/commands/run.md", "# new behaviour\n");
        git(tmp.path(), &["add", "-A"]);

        let source = Arc::new(GitCli::new(tmp.path()));
        let layout = PluginLayout::new(tmp.path(), "plugins", DEFAULT_MANIFEST).unwrap();
        let request = ChangeSetRequest::new(CompareMode::Staged, None);

        let report = run_check(source, &layout, &request, &CheckOptions::default())
            .await
            .unwrap();

        assert_eq!(
            verdicts(&report),
            vec![
                ("alpha", Some(Verdict::BumpRequired)),
                ("beta", Some(Verdict::NoBumpRequired)),
            ]
        );
    }
}
