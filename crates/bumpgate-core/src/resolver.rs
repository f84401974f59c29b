//! Change-set resolution: which plugins does a request touch?

use std::collections::BTreeSet;

use tracing::debug;

use crate::discovery::PluginLayout;
use crate::error::BumpGateError;
use crate::git::ChangeSource;
use crate::mapper::group_by_plugin;
use crate::types::plugin::PluginName;
use crate::types::request::ChangeSetRequest;

/// What a request resolves to, depending on whether it names a plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Every plugin with at least one changed path.
    Plugins(BTreeSet<PluginName>),
    /// The unified diff of all changed files under one plugin. Empty when the
    /// plugin did not change.
    PluginDiff { plugin: PluginName, diff: String },
}

/// The distinct plugins touched by `request`.
///
/// With a plugin filter the set holds at most that plugin. A failed query is
/// returned as an error, never as an empty set.
///
/// # Errors
///
/// Returns [`BumpGateError::RepositoryQuery`] if the git query fails.
pub async fn resolve<S: ChangeSource>(
    source: &S,
    layout: &PluginLayout,
    request: &ChangeSetRequest,
) -> Result<BTreeSet<PluginName>, BumpGateError> {
    let scope = match request.plugin_filter() {
        Some(plugin) => Some(layout.plugin_dir(plugin)),
        None if layout.plugin_root().is_empty() => None,
        None => Some(layout.plugin_root().to_string()),
    };

    let paths = source.changed_paths(request.mode(), scope.as_deref()).await?;
    debug!(mode = %request.mode(), changed = paths.len(), "listed changed paths");

    let plugins: BTreeSet<PluginName> = group_by_plugin(paths.iter().map(String::as_str), layout.plugin_root())
        .into_keys()
        .filter(|name| request.plugin_filter().map_or(true, |f| f == name))
        .collect();

    Ok(plugins)
}

/// Resolves `request` in list mode, or in single-plugin diff mode when it
/// carries a plugin filter.
///
/// # Errors
///
/// Returns [`BumpGateError::RepositoryQuery`] if a git query fails.
pub async fn resolve_changes<S: ChangeSource>(
    source: &S,
    layout: &PluginLayout,
    request: &ChangeSetRequest,
) -> Result<Resolution, BumpGateError> {
    match request.plugin_filter() {
        None => Ok(Resolution::Plugins(resolve(source, layout, request).await?)),
        Some(plugin) => {
            let diff = source
                .diff_path(request.mode(), &layout.plugin_dir(plugin))
                .await?;
            Ok(Resolution::PluginDiff {
                plugin: plugin.clone(),
                diff,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::DEFAULT_MANIFEST;
    use crate::git::tests::{git, manifest, setup_repo, write};
    use crate::git::GitCli;
    use crate::types::request::CompareMode;

    fn layout(root: &std::path::Path) -> PluginLayout {
        PluginLayout::new(root, "plugins", DEFAULT_MANIFEST).unwrap()
    }

    fn names(set: &BTreeSet<PluginName>) -> Vec<&str> {
        set.iter().map(PluginName::as_str).collect()
    }

    #[tokio::test]
    async fn no_changes_resolve_to_empty_set() {
        let tmp = setup_repo();
        let source = GitCli::new(tmp.path());
        let request = ChangeSetRequest::new(CompareMode::WorkingTree, None);

        let plugins = resolve(&source, &layout(tmp.path()), &request).await.unwrap();
        assert!(plugins.is_empty());
    }

    #[tokio::test]
    async fn lists_each_changed_plugin_once() {
        let tmp = setup_repo();
        write(tmp.path(), "plugins/alpha/commands/run.md", "# a\n");
        write(tmp.path(), "plugins/alpha/.claude-plugin/plugin.json", &manifest("alpha", "1.0.0", "x"));
        write(tmp.path(), "plugins/beta/commands/run.md", "# b\n");
        write(tmp.path(), "README.md", "# root\n");
        let source = GitCli::new(tmp.path());
        let request = ChangeSetRequest::new(CompareMode::WorkingTree, None);

        let plugins = resolve(&source, &layout(tmp.path()), &request).await.unwrap();
        assert_eq!(names(&plugins), vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn resolving_twice_is_stable() {
        let tmp = setup_repo();
        write(tmp.path(), "plugins/beta/commands/run.md", "# b\n");
        let source = GitCli::new(tmp.path());
        let request = ChangeSetRequest::new(CompareMode::WorkingTree, None);

        let first = resolve(&source, &layout(tmp.path()), &request).await.unwrap();
        let second = resolve(&source, &layout(tmp.path()), &request).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn filter_restricts_to_one_plugin() {
        let tmp = setup_repo();
        write(tmp.path(), "plugins/alpha/commands/run.md", "# a\n");
        write(tmp.path(), "plugins/beta/commands/run.md", "# b\n");
        let source = GitCli::new(tmp.path());
        let request = ChangeSetRequest::new(
            CompareMode::WorkingTree,
            Some(PluginName::new("beta").unwrap()),
        );

        let plugins = resolve(&source, &layout(tmp.path()), &request).await.unwrap();
        assert_eq!(names(&plugins), vec!["beta"]);
    }

    #[tokio::test]
    async fn filter_mode_returns_plugin_diff() {
        let tmp = setup_repo();
        write(tmp.path(), "plugins/alpha/commands/run.md", "# changed\n");
        write(tmp.path(), "plugins/beta/commands/run.md", "# other\n");
        let source = GitCli::new(tmp.path());
        let request = ChangeSetRequest::new(
            CompareMode::WorkingTree,
            Some(PluginName::new("alpha").unwrap()),
        );

        let resolution = resolve_changes(&source, &layout(tmp.path()), &request).await.unwrap();
        let Resolution::PluginDiff { plugin, diff } = resolution else {
            panic!("expected a plugin diff");
        };
        assert_eq!(plugin.as_str(), "alpha");
        assert!(diff.contains("+# changed"));
        assert!(!diff.contains("plugins/beta"));
    }

    #[tokio::test]
    async fn staged_mode_ignores_unstaged_plugins() {
        let tmp = setup_repo();
        write(tmp.path(), "plugins/alpha/commands/run.md", "# staged\n");
        git(tmp.path(), &["add", "plugins/alpha/commands/run.md"]);
        write(tmp.path(), "plugins/beta/commands/run.md", "# unstaged\n");
        let source = GitCli::new(tmp.path());
        let request = ChangeSetRequest::new(CompareMode::Staged, None);

        let plugins = resolve(&source, &layout(tmp.path()), &request).await.unwrap();
        assert_eq!(names(&plugins), vec!["alpha"]);
    }

    #[tokio::test]
    async fn bad_ref_is_distinct_from_no_changes() {
        let tmp = setup_repo();
        let source = GitCli::new(tmp.path());
        let request = ChangeSetRequest::new(CompareMode::BranchDiff("missing".into()), None);

        let result = resolve(&source, &layout(tmp.path()), &request).await;
        assert!(matches!(result, Err(BumpGateError::RepositoryQuery { .. })));
    }
}
