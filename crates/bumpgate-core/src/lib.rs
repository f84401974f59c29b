//! Change detection and version-bump policy for plugin monorepos.
//!
//! The pipeline runs once per invocation:
//! [`resolver::resolve`] finds the plugins touched by a
//! [`ChangeSetRequest`], [`mapper::manifest_diff`] extracts each plugin's
//! manifest diff, [`policy::evaluate`] decides whether the version must be
//! bumped, and [`report::aggregate`] collects the outcomes.
//! [`check::run_check`] wires the steps together.

pub mod check;
pub mod diff;
pub mod discovery;
pub mod error;
pub mod git;
pub mod mapper;
pub mod policy;
pub mod report;
pub mod resolver;
pub mod types;
pub mod version;

pub use error::{BumpGateError, ErrorKind};
pub use types::*;
