pub mod changed;
pub mod check;
pub mod evaluate;

use std::path::PathBuf;

use bumpgate_core::discovery::{discover_repository, load_layout, LayoutOverrides, PluginLayout};
use bumpgate_core::{BumpGateError, ChangeSetRequest};
use tracing::debug;

use crate::cli::CompareArgs;
use crate::output::Reporter;

/// How a command ended; maps to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Passed,
    Failed,
    /// Bad flags or unusable input, detected before any real work.
    Invalid,
}

impl Status {
    pub fn exit_code(self) -> i32 {
        match self {
            Status::Passed => 0,
            Status::Failed => 1,
            Status::Invalid => 2,
        }
    }
}

/// Everything a repository-backed command needs, resolved once at startup.
pub struct RepoContext<'a> {
    pub repo_override: Option<&'a str>,
    pub overrides: LayoutOverrides,
}

impl RepoContext<'_> {
    /// Finds the repository and its plugin layout, reporting failures.
    pub fn load_layout(&self, reporter: &mut Reporter) -> Result<PluginLayout, Status> {
        let start = match self.repo_override {
            Some(path) => PathBuf::from(path),
            None => match std::env::current_dir() {
                Ok(c) => c,
                Err(e) => {
                    reporter.error(&format!("Cannot get current directory: {e}"));
                    return Err(Status::Failed);
                }
            },
        };

        let repo_root = match discover_repository(&start) {
            Ok(root) => root,
            Err(e) => {
                reporter.error(&format!("{e}"));
                return Err(Status::Failed);
            }
        };

        debug!(repo = %repo_root.display(), "repository found");
        load_layout(&repo_root, &self.overrides).map_err(|e| {
            reporter.error(&format!("Failed to load plugin layout: {e}"));
            status_for(&e)
        })
    }
}

/// Builds the change-set request from the comparison flags.
pub fn build_request(
    compare: &CompareArgs,
    plugin: Option<&str>,
    reporter: &mut Reporter,
) -> Result<ChangeSetRequest, Status> {
    ChangeSetRequest::from_flags(compare.staged, compare.branch.as_deref(), plugin).map_err(|e| {
        reporter.error(&format!("{e}"));
        Status::Invalid
    })
}

pub fn status_for(err: &BumpGateError) -> Status {
    match err {
        BumpGateError::Configuration(_) | BumpGateError::Json(_) => Status::Invalid,
        _ => Status::Failed,
    }
}
