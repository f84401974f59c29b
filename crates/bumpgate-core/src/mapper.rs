//! Attribution of changed paths to plugins, and manifest diff extraction.

use std::collections::BTreeMap;

use tracing::debug;

use crate::diff::UnifiedDiff;
use crate::discovery::PluginLayout;
use crate::error::BumpGateError;
use crate::git::ChangeSource;
use crate::types::plugin::PluginName;
use crate::types::request::ChangeSetRequest;

/// The plugin owning `path`: the first segment after `plugin_root`.
///
/// Paths outside the plugins root, and files sitting directly in it, belong
/// to no plugin.
pub fn plugin_name_of(path: &str, plugin_root: &str) -> Option<PluginName> {
    let path = path.trim().trim_start_matches("./");
    let rest = if plugin_root.is_empty() {
        path
    } else {
        path.strip_prefix(plugin_root)?.strip_prefix('/')?
    };

    let (name, remainder) = rest.split_once('/')?;
    if remainder.is_empty() {
        return None;
    }
    PluginName::new(name).ok()
}

/// Groups changed paths by owning plugin, dropping paths owned by none.
pub fn group_by_plugin<'a, I>(paths: I, plugin_root: &str) -> BTreeMap<PluginName, Vec<String>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut groups: BTreeMap<PluginName, Vec<String>> = BTreeMap::new();
    for path in paths {
        if let Some(name) = plugin_name_of(path, plugin_root) {
            let files = groups.entry(name).or_default();
            if !files.iter().any(|p| p == path) {
                files.push(path.to_string());
            }
        }
    }
    groups
}

/// Unified diff of `plugin`'s manifest under the request's comparison.
///
/// Empty text means the manifest itself is unchanged. A non-empty diff is
/// checked to describe only the manifest file.
///
/// # Errors
///
/// Returns [`BumpGateError::RepositoryQuery`] if the git query fails and
/// [`BumpGateError::MalformedDiff`] if the output is not a diff of exactly
/// the manifest.
pub async fn manifest_diff<S: ChangeSource>(
    source: &S,
    layout: &PluginLayout,
    request: &ChangeSetRequest,
    plugin: &PluginName,
) -> Result<String, BumpGateError> {
    let manifest = layout.manifest_path(plugin);
    let diff = source.diff_path(request.mode(), &manifest).await?;
    debug!(plugin = %plugin, manifest = %manifest, bytes = diff.len(), "fetched manifest diff");

    if diff.trim().is_empty() {
        return Ok(String::new());
    }

    let parsed = UnifiedDiff::parse(&diff)?;
    for file in &parsed.files {
        let paths = [file.old_path.as_deref(), file.new_path.as_deref()];
        if let Some(other) = paths.into_iter().flatten().find(|p| *p != manifest) {
            return Err(BumpGateError::malformed(
                file.header_line,
                format!("diff for {manifest} also touches {other}"),
            ));
        }
    }

    Ok(diff)
}
