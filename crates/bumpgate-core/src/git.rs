//! The change-set source: the only place that talks to git.
//!
//! [`ChangeSource`] exposes exactly two queries, a changed-path listing and a
//! unified diff for one pathspec. [`GitCli`] answers them by running the
//! `git` binary in the repository root.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::error::BumpGateError;
use crate::types::request::CompareMode;

/// Version-control queries the pipeline depends on.
///
/// Implementations must be `Send + Sync` so one source can serve concurrent
/// per-plugin queries.
pub trait ChangeSource: Send + Sync {
    /// Lists repository-relative paths that differ under `mode`, optionally
    /// restricted to the `scope` pathspec. Sorted and deduplicated.
    fn changed_paths(
        &self,
        mode: &CompareMode,
        scope: Option<&str>,
    ) -> impl Future<Output = Result<Vec<String>, BumpGateError>> + Send;

    /// Returns the unified diff of `path` under `mode`. Empty when `path` is
    /// unchanged.
    fn diff_path(
        &self,
        mode: &CompareMode,
        path: &str,
    ) -> impl Future<Output = Result<String, BumpGateError>> + Send;
}

/// [`ChangeSource`] backed by the `git` command line.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_root: PathBuf,
}

impl GitCli {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
        }
    }

    async fn run(&self, args: &[String]) -> Result<Vec<u8>, BumpGateError> {
        let rendered = format!("git {}", args.join(" "));
        debug!(command = %rendered, cwd = %self.repo_root.display(), "running git");

        // Dropping the future (for example on timeout) kills the child.
        let output = Command::new("git")
            .args(["-c", "core.quotepath=off"])
            .args(args)
            .current_dir(&self.repo_root)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| BumpGateError::query(&rendered, format!("Failed to run git: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("git exited with {}", output.status)
            } else {
                stderr
            };
            return Err(BumpGateError::query(rendered, message));
        }

        Ok(output.stdout)
    }
}

/// Common `git diff` arguments for a comparison mode, up to (not including)
/// the `--` pathspec separator.
fn diff_args(mode: &CompareMode) -> Vec<String> {
    let mut args: Vec<String> = ["diff", "--no-color", "--no-ext-diff", "--no-renames"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    match mode {
        CompareMode::WorkingTree => args.push("HEAD".into()),
        CompareMode::Staged => {
            args.push("--cached".into());
            args.push("HEAD".into());
        }
        CompareMode::BranchDiff(r) => args.push(format!("{r}...HEAD")),
    }
    args
}

impl ChangeSource for GitCli {
    async fn changed_paths(
        &self,
        mode: &CompareMode,
        scope: Option<&str>,
    ) -> Result<Vec<String>, BumpGateError> {
        let mut args = diff_args(mode);
        args.push("--name-only".into());
        args.push("-z".into());
        args.push("--".into());
        if let Some(scope) = scope {
            args.push(scope.to_string());
        }

        let stdout = self.run(&args).await?;
        let stdout = String::from_utf8_lossy(&stdout);

        let mut paths: Vec<String> = stdout
            .split('\0')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        paths.sort();
        paths.dedup();

        Ok(paths)
    }

    async fn diff_path(&self, mode: &CompareMode, path: &str) -> Result<String, BumpGateError> {
        let mut args = diff_args(mode);
        args.push("--".into());
        args.push(path.to_string());

        let stdout = self.run(&args).await?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}
