//! Handler for `bumpgate check`.

use std::sync::Arc;
use std::time::Duration;

use bumpgate_core::check::{run_check, CheckOptions};
use bumpgate_core::git::GitCli;

use crate::cli::CompareArgs;
use crate::commands::{build_request, RepoContext, Status};
use crate::output::Reporter;

/// Runs the full pipeline and reports one verdict per changed plugin.
///
/// Passes when no plugin needs a bump and none failed, including when no
/// plugin changed at all.
pub async fn run_check_command(
    ctx: &RepoContext<'_>,
    compare: &CompareArgs,
    plugin: Option<&str>,
    jobs: usize,
    timeout_secs: u64,
    reporter: &mut Reporter,
) -> Status {
    let request = match build_request(compare, plugin, reporter) {
        Ok(r) => r,
        Err(status) => return status,
    };
    let options = match CheckOptions::new(jobs, Duration::from_secs(timeout_secs)) {
        Ok(o) => o,
        Err(e) => {
            reporter.error(&format!("{e}"));
            return Status::Invalid;
        }
    };
    let layout = match ctx.load_layout(reporter) {
        Ok(l) => l,
        Err(status) => return status,
    };

    reporter.section(&format!("Checking plugin versions ({})", request.mode()));

    let source = Arc::new(GitCli::new(layout.repo_root()));
    let report = match run_check(source, &layout, &request, &options).await {
        Ok(r) => r,
        Err(e) => {
            reporter.error(&format!("Could not determine changed plugins: {e}"));
            return Status::Failed;
        }
    };

    if report.is_empty() {
        reporter.success("No changed plugins to check");
        return Status::Passed;
    }

    reporter.report_check(&report);

    let summary = report.summary();
    reporter.section("Summary");
    reporter.info(&format!(
        "{} plugin(s): {} need a version bump, {} ok, {} could not be verified",
        summary.total, summary.bump_required, summary.no_bump_required, summary.errors
    ));

    if summary.errors > 0 {
        reporter.warning(&format!(
            "{} plugin(s) could not be verified and count as failures",
            summary.errors
        ));
    }

    if report.passed() {
        reporter.success("Version check passed");
        Status::Passed
    } else {
        reporter.error("Version check failed");
        Status::Failed
    }
}
