use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BumpGateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Repository query failed ({command}): {message}")]
    RepositoryQuery { command: String, message: String },

    #[error("Malformed diff at line {line}: {reason}")]
    MalformedDiff { line: usize, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not inside a git repository: {}", .0.display())]
    RepositoryNotFound(PathBuf),
}

impl BumpGateError {
    pub(crate) fn query(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RepositoryQuery {
            command: command.into(),
            message: message.into(),
        }
    }

    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedDiff {
            line,
            reason: reason.into(),
        }
    }

    /// Classifies the error for per-plugin report entries.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RepositoryQuery { .. } | Self::RepositoryNotFound(_) | Self::Io(_) => {
                ErrorKind::RepositoryQuery
            }
            Self::MalformedDiff { .. } => ErrorKind::MalformedDiff,
            Self::Configuration(_) | Self::Json(_) => ErrorKind::Configuration,
        }
    }
}

/// Coarse error class recorded in a [`crate::report::Report`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    RepositoryQuery,
    MalformedDiff,
    Configuration,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::RepositoryQuery => write!(f, "repository query error"),
            ErrorKind::MalformedDiff => write!(f, "malformed diff"),
            ErrorKind::Configuration => write!(f, "configuration error"),
        }
    }
}
