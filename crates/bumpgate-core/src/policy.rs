//! The version policy: does a manifest diff need a version bump?
//!
//! A diff is judged on two axes:
//!
//! - **version changed**: a `version` line was removed and a `version` line
//!   with a different value was added;
//! - **content changed**: some other line changed, ignoring blank lines,
//!   comment lines, and removed/added pairs that only differ in whitespace or
//!   a trailing comma.
//!
//! A bump is required exactly when content changed and the version did not.
//! A `version` line that is only added (or only removed) is neither a version
//! change nor a content change. Created and deleted manifests go through the
//! same two axes; their [`ManifestLifecycle`] is reported for information.
//!
//! A `"version": "..."` pair embedded in a longer line (a minified manifest)
//! counts as a version line, and the rest of that line is compared as content.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::diff::{FileDiff, UnifiedDiff};
use crate::error::BumpGateError;
use crate::types::verdict::Verdict;
use crate::version::{bump_patch, classify_bump, BumpKind};

static VERSION_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*["']?version["']?\s*[:=]\s*["']?([^"',\s]*)["']?\s*,?\s*$"#).unwrap()
});

static INLINE_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""version"\s*:\s*"([^"]*)"\s*,?"#).unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionChange {
    pub from: String,
    pub to: String,
    pub kind: BumpKind,
}

/// Whether the diff creates or deletes the manifest outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestLifecycle {
    Created,
    Deleted,
}

/// A verdict plus the evidence behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assessment {
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_change: Option<VersionChange>,
    /// The unchanged version, when the diff shows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_version: Option<String>,
    /// Next patch version, offered when a bump is required.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_version: Option<String>,
    /// Changed non-version lines, prefixed with `+` or `-`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub functional_changes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle: Option<ManifestLifecycle>,
}

/// Renders the verdict for a manifest diff.
///
/// # Errors
///
/// Returns [`BumpGateError::MalformedDiff`] if `diff` is not a unified diff.
pub fn evaluate(diff: &str) -> Result<Verdict, BumpGateError> {
    assess(diff).map(|a| a.verdict)
}

/// Like [`evaluate`], but also returns what drove the verdict.
///
/// # Errors
///
/// Returns [`BumpGateError::MalformedDiff`] if `diff` is not a unified diff.
pub fn assess(diff: &str) -> Result<Assessment, BumpGateError> {
    let parsed = UnifiedDiff::parse(diff)?;
    Ok(assess_parsed(&parsed))
}

pub fn assess_parsed(diff: &UnifiedDiff) -> Assessment {
    let mut lifecycle = None;
    let mut removed_versions = BTreeSet::new();
    let mut added_versions = BTreeSet::new();
    let mut context_version = None;
    let mut net: BTreeMap<String, i64> = BTreeMap::new();
    let mut changed: Vec<(String, char, String)> = Vec::new();

    for file in &diff.files {
        if let Some(l) = file_lifecycle(file) {
            lifecycle.get_or_insert(l);
        }

        for line in file.removed_lines() {
            let (version, rest) = split_version(line);
            if let Some(v) = version {
                removed_versions.insert(v);
            }
            if let Some(key) = rest.as_deref().and_then(semantic_key) {
                *net.entry(key.clone()).or_default() -= 1;
                changed.push((line.to_string(), '-', key));
            }
        }
        for line in file.added_lines() {
            let (version, rest) = split_version(line);
            if let Some(v) = version {
                added_versions.insert(v);
            }
            if let Some(key) = rest.as_deref().and_then(semantic_key) {
                *net.entry(key.clone()).or_default() += 1;
                changed.push((line.to_string(), '+', key));
            }
        }
        if context_version.is_none() {
            context_version = file.context_lines().find_map(|l| split_version(l).0);
        }
    }

    let version_changed = !removed_versions.is_empty()
        && !added_versions.is_empty()
        && removed_versions != added_versions;

    let functional_changes: Vec<String> = changed
        .into_iter()
        .filter(|(_, _, key)| net.get(key).copied().unwrap_or(0) != 0)
        .map(|(line, sign, _)| format!("{sign}{line}"))
        .collect();

    let content_changed = !functional_changes.is_empty();

    let version_change = version_changed.then(|| {
        let from = removed_versions
            .difference(&added_versions)
            .next()
            .or_else(|| removed_versions.iter().next())
            .cloned()
            .unwrap_or_default();
        let to = added_versions
            .difference(&removed_versions)
            .next()
            .or_else(|| added_versions.iter().next())
            .cloned()
            .unwrap_or_default();
        let kind = classify_bump(&from, &to);
        VersionChange { from, to, kind }
    });

    let current_version = if version_changed {
        None
    } else {
        removed_versions
            .intersection(&added_versions)
            .next()
            .cloned()
            .or(context_version)
    };

    let verdict = if content_changed && !version_changed {
        Verdict::BumpRequired
    } else {
        Verdict::NoBumpRequired
    };

    let suggested_version = match verdict {
        Verdict::BumpRequired => current_version.as_deref().and_then(bump_patch),
        Verdict::NoBumpRequired => None,
    };

    Assessment {
        verdict,
        version_change,
        current_version,
        suggested_version,
        functional_changes,
        lifecycle,
    }
}

fn file_lifecycle(file: &FileDiff) -> Option<ManifestLifecycle> {
    if file.is_new_file {
        Some(ManifestLifecycle::Created)
    } else if file.is_deleted_file {
        Some(ManifestLifecycle::Deleted)
    } else {
        None
    }
}

/// The value of a `version` key/value line, if `line` is one.
fn version_value(line: &str) -> Option<String> {
    VERSION_LINE_RE
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Splits a changed line into the version it declares and the remainder that
/// still has to be compared as content. A whole-line version entry leaves no
/// remainder.
fn split_version(line: &str) -> (Option<String>, Option<String>) {
    if let Some(v) = version_value(line) {
        return (Some(v), None);
    }
    match INLINE_VERSION_RE.captures(line) {
        Some(caps) => {
            let (start, end) = caps.get(0).map_or((0, 0), |m| (m.start(), m.end()));
            let rest = format!("{}{}", &line[..start], &line[end..]);
            (caps.get(1).map(|m| m.as_str().to_string()), Some(rest))
        }
        None => (None, Some(line.to_string())),
    }
}

/// Comparison key for a non-version line; `None` for lines that carry no
/// meaning (blank or comment).
///
/// Whitespace inside double-quoted strings is kept as is. Outside strings, a
/// run of whitespace becomes one space, and is dropped entirely next to
/// punctuation such as `:` or `,`.
fn semantic_key(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || is_comment(trimmed) {
        return None;
    }

    let mut key = String::with_capacity(trimmed.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut pending_space = false;
    for c in trimmed.chars() {
        if in_string {
            key.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !is_punct(c) && key.chars().last().is_some_and(|p| !is_punct(p)) {
            key.push(' ');
        }
        pending_space = false;
        if c == '"' {
            in_string = true;
        }
        key.push(c);
    }

    let key = key.strip_suffix(',').unwrap_or(&key);
    if key.is_empty() {
        return None;
    }
    Some(key.to_string())
}

fn is_punct(c: char) -> bool {
    matches!(c, ':' | ',' | '=' | '[' | ']' | '{' | '}')
}

fn is_comment(trimmed: &str) -> bool {
    ["//", "#", "/*", "*"].iter().any(|p| trimmed.starts_with(p))
}
