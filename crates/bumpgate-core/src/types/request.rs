use serde::Serialize;

use crate::error::BumpGateError;
use crate::types::plugin::PluginName;

/// Which two trees a run compares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "ref", rename_all = "snake_case")]
pub enum CompareMode {
    /// Uncommitted working tree (staged and unstaged) against `HEAD`.
    WorkingTree,
    /// Index against `HEAD`.
    Staged,
    /// `HEAD` against the merge base with the given ref.
    BranchDiff(String),
}

impl std::fmt::Display for CompareMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompareMode::WorkingTree => write!(f, "working tree vs HEAD"),
            CompareMode::Staged => write!(f, "staged changes vs HEAD"),
            CompareMode::BranchDiff(r) => write!(f, "{r}...HEAD"),
        }
    }
}

/// Immutable input to a run: what to compare and, optionally, which single
/// plugin to look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSetRequest {
    mode: CompareMode,
    plugin_filter: Option<PluginName>,
}

impl ChangeSetRequest {
    pub fn new(mode: CompareMode, plugin_filter: Option<PluginName>) -> Self {
        Self {
            mode,
            plugin_filter,
        }
    }

    /// Builds a request from the CLI flags.
    ///
    /// Neither flag selects [`CompareMode::WorkingTree`].
    ///
    /// # Errors
    ///
    /// Returns [`BumpGateError::Configuration`] if both `staged` and `branch`
    /// are given, if the ref is empty, starts with `-` or contains
    /// whitespace, or if `plugin` is not a valid plugin name.
    pub fn from_flags(
        staged: bool,
        branch: Option<&str>,
        plugin: Option<&str>,
    ) -> Result<Self, BumpGateError> {
        let mode = match (staged, branch) {
            (true, Some(_)) => {
                return Err(BumpGateError::Configuration(
                    "--staged and --branch cannot be used together".into(),
                ));
            }
            (true, None) => CompareMode::Staged,
            (false, Some(r)) => CompareMode::BranchDiff(validate_ref(r)?),
            (false, None) => CompareMode::WorkingTree,
        };

        let plugin_filter = plugin.map(PluginName::new).transpose()?;

        Ok(Self::new(mode, plugin_filter))
    }

    pub fn mode(&self) -> &CompareMode {
        &self.mode
    }

    pub fn plugin_filter(&self) -> Option<&PluginName> {
        self.plugin_filter.as_ref()
    }
}

fn validate_ref(raw: &str) -> Result<String, BumpGateError> {
    let r = raw.trim();
    if r.is_empty() {
        return Err(BumpGateError::Configuration("--branch requires a ref".into()));
    }
    // A leading dash would be read by git as an option.
    if r.starts_with('-') {
        return Err(BumpGateError::Configuration(format!(
            "Invalid ref '{r}': refs cannot start with '-'"
        )));
    }
    if r.chars().any(char::is_whitespace) {
        return Err(BumpGateError::Configuration(format!(
            "Invalid ref '{r}': refs cannot contain whitespace"
        )));
    }
    Ok(r.to_string())
}
