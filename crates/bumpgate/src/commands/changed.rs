//! Handler for `bumpgate changed`.

use bumpgate_core::git::GitCli;
use bumpgate_core::resolver::{resolve_changes, Resolution};

use crate::cli::CompareArgs;
use crate::commands::{build_request, RepoContext, Status};
use crate::output::Reporter;

/// Lists changed plugins, or prints one plugin's diff when `plugin` is given.
pub async fn run_changed(
    ctx: &RepoContext<'_>,
    compare: &CompareArgs,
    plugin: Option<&str>,
    reporter: &mut Reporter,
) -> Status {
    let request = match build_request(compare, plugin, reporter) {
        Ok(r) => r,
        Err(status) => return status,
    };
    let layout = match ctx.load_layout(reporter) {
        Ok(l) => l,
        Err(status) => return status,
    };

    let source = GitCli::new(layout.repo_root());
    match resolve_changes(&source, &layout, &request).await {
        Ok(Resolution::Plugins(plugins)) => {
            reporter.section(&format!("Changed plugins ({})", request.mode()));
            if plugins.is_empty() {
                reporter.info("No plugins changed");
            }
            for name in &plugins {
                reporter.value("plugin", name.as_str());
            }
            Status::Passed
        }
        Ok(Resolution::PluginDiff { plugin, diff }) => {
            if diff.is_empty() {
                reporter.info(&format!("Plugin {plugin} has no changes"));
            } else {
                reporter.diff(plugin.as_str(), &diff);
            }
            Status::Passed
        }
        Err(e) => {
            reporter.error(&format!("{e}"));
            Status::Failed
        }
    }
}
