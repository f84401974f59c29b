//! Repository discovery and plugin layout configuration.
//!
//! A [`PluginLayout`] answers two questions for the rest of the pipeline:
//! under which repository-relative directory do plugins live, and where
//! inside a plugin directory is its manifest. The plugin root comes from an
//! explicit override, else `pluginRoot` in `.claude-plugin/marketplace.json`,
//! else `plugins`.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::BumpGateError;
use crate::types::marketplace::Marketplace;
use crate::types::plugin::PluginName;

pub const DEFAULT_PLUGIN_ROOT: &str = "plugins";
pub const DEFAULT_MANIFEST: &str = ".claude-plugin/plugin.json";

/// Optional overrides supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct LayoutOverrides {
    pub plugin_root: Option<String>,
    pub manifest: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginLayout {
    repo_root: PathBuf,
    plugin_root: String,
    manifest: String,
}

impl PluginLayout {
    /// # Errors
    ///
    /// Returns [`BumpGateError::Configuration`] if either relative path is
    /// absolute or escapes the repository with `..`, or if the manifest path
    /// is empty.
    pub fn new(
        repo_root: impl Into<PathBuf>,
        plugin_root: &str,
        manifest: &str,
    ) -> Result<Self, BumpGateError> {
        let plugin_root = normalize_relative(plugin_root, "plugin root")?;
        let manifest = normalize_relative(manifest, "manifest path")?;
        if manifest.is_empty() {
            return Err(BumpGateError::Configuration(
                "Manifest path cannot be empty".into(),
            ));
        }
        Ok(Self {
            repo_root: repo_root.into(),
            plugin_root,
            manifest,
        })
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Repository-relative plugins root, `/` separated, no leading `./` and no
    /// trailing `/`. Empty when plugins live at the repository root.
    pub fn plugin_root(&self) -> &str {
        &self.plugin_root
    }

    /// Manifest path relative to a plugin directory.
    pub fn manifest(&self) -> &str {
        &self.manifest
    }

    pub fn plugin_dir(&self, plugin: &PluginName) -> String {
        if self.plugin_root.is_empty() {
            plugin.to_string()
        } else {
            format!("{}/{plugin}", self.plugin_root)
        }
    }

    pub fn manifest_path(&self, plugin: &PluginName) -> String {
        format!("{}/{}", self.plugin_dir(plugin), self.manifest)
    }
}

/// Walks up from `start_dir` to the first directory containing `.git`.
///
/// # Errors
///
/// Returns [`BumpGateError::RepositoryNotFound`] if no ancestor is a git
/// working tree.
pub fn discover_repository(start_dir: &Path) -> Result<PathBuf, BumpGateError> {
    let mut current = start_dir.canonicalize()?;

    loop {
        if current.join(".git").exists() {
            return Ok(current);
        }

        match current.parent() {
            Some(parent) if parent != current => {
                current = parent.to_path_buf();
            }
            _ => break,
        }
    }

    Err(BumpGateError::RepositoryNotFound(start_dir.to_path_buf()))
}

/// Builds the layout for a repository, applying `overrides` first and
/// falling back to the marketplace file and then the defaults.
///
/// # Errors
///
/// Returns [`BumpGateError::Json`] if `marketplace.json` exists but cannot be
/// parsed, and [`BumpGateError::Configuration`] for invalid paths.
pub fn load_layout(
    repo_root: &Path,
    overrides: &LayoutOverrides,
) -> Result<PluginLayout, BumpGateError> {
    let plugin_root = match &overrides.plugin_root {
        Some(root) => root.clone(),
        None => read_marketplace_plugin_root(repo_root)?
            .unwrap_or_else(|| DEFAULT_PLUGIN_ROOT.to_string()),
    };
    let manifest = overrides.manifest.as_deref().unwrap_or(DEFAULT_MANIFEST);

    let layout = PluginLayout::new(repo_root, &plugin_root, manifest)?;
    debug!(
        repo = %layout.repo_root.display(),
        plugin_root = %layout.plugin_root,
        manifest = %layout.manifest,
        "resolved plugin layout"
    );
    Ok(layout)
}

fn read_marketplace_plugin_root(repo_root: &Path) -> Result<Option<String>, BumpGateError> {
    let path = repo_root.join(".claude-plugin").join("marketplace.json");
    if !path.is_file() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)?;
    let marketplace: Marketplace = serde_json::from_str(&content)?;
    Ok(marketplace.plugin_root().map(str::to_string))
}

fn normalize_relative(raw: &str, what: &str) -> Result<String, BumpGateError> {
    let unified = raw.trim().replace('\\', "/");
    if unified.starts_with('/') {
        return Err(BumpGateError::Configuration(format!(
            "The {what} must be relative to the repository: '{raw}'"
        )));
    }

    let mut segments = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                return Err(BumpGateError::Configuration(format!(
                    "The {what} cannot leave the repository: '{raw}'"
                )));
            }
            s => segments.push(s),
        }
    }
    Ok(segments.join("/"))
}
