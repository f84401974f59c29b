//! Aggregation of per-plugin outcomes into a run report.

use serde::Serialize;

use crate::error::{BumpGateError, ErrorKind};
use crate::policy::Assessment;
use crate::types::plugin::PluginName;
use crate::types::verdict::{Verdict, VersionVerdict};

/// What happened for one plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PluginOutcome {
    Evaluated {
        verdict: Verdict,
        #[serde(skip_serializing_if = "Option::is_none")]
        assessment: Option<Assessment>,
    },
    Failed {
        kind: ErrorKind,
        message: String,
    },
}

impl PluginOutcome {
    pub fn from_verdict(verdict: Verdict) -> Self {
        Self::Evaluated {
            verdict,
            assessment: None,
        }
    }

    pub fn from_assessment(assessment: Assessment) -> Self {
        Self::Evaluated {
            verdict: assessment.verdict,
            assessment: Some(assessment),
        }
    }

    pub fn from_error(err: &BumpGateError) -> Self {
        Self::Failed {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            Self::Evaluated { verdict, .. } => Some(*verdict),
            Self::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub plugin: PluginName,
    #[serde(flatten)]
    pub outcome: PluginOutcome,
}

impl ReportEntry {
    pub fn version_verdict(&self) -> Option<VersionVerdict> {
        self.outcome.verdict().map(|verdict| VersionVerdict {
            plugin: self.plugin.clone(),
            verdict,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub bump_required: usize,
    pub no_bump_required: usize,
    pub errors: usize,
}

/// Immutable result of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    entries: Vec<ReportEntry>,
    summary: Summary,
    passed: bool,
}

impl Report {
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn summary(&self) -> Summary {
        self.summary
    }

    /// `true` when no plugin requires a bump and no plugin failed. An empty
    /// report passes.
    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn bump_required(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries
            .iter()
            .filter(|e| e.outcome.verdict().is_some_and(Verdict::is_bump_required))
    }

    pub fn failures(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, PluginOutcome::Failed { .. }))
    }
}

/// Builds a report, keeping the input order.
pub fn aggregate(outcomes: Vec<(PluginName, PluginOutcome)>) -> Report {
    let mut summary = Summary {
        total: outcomes.len(),
        ..Summary::default()
    };

    let entries: Vec<ReportEntry> = outcomes
        .into_iter()
        .map(|(plugin, outcome)| {
            match outcome.verdict() {
                Some(Verdict::BumpRequired) => summary.bump_required += 1,
                Some(Verdict::NoBumpRequired) => summary.no_bump_required += 1,
                None => summary.errors += 1,
            }
            ReportEntry { plugin, outcome }
        })
        .collect();

    Report {
        entries,
        passed: summary.bump_required == 0 && summary.errors == 0,
        summary,
    }
}
