use serde::Serialize;

use crate::types::plugin::PluginName;

/// Outcome of the version policy for one manifest diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    BumpRequired,
    NoBumpRequired,
}

impl Verdict {
    /// The `YES` / `NO` label answering "does the version need a bump?".
    pub fn label(self) -> &'static str {
        match self {
            Verdict::BumpRequired => "YES",
            Verdict::NoBumpRequired => "NO",
        }
    }

    pub fn is_bump_required(self) -> bool {
        self == Verdict::BumpRequired
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A verdict together with the plugin it was rendered for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionVerdict {
    pub plugin: PluginName,
    pub verdict: Verdict,
}
