//! Handler for `bumpgate evaluate`: the YES/NO answer for a single diff.

use std::io::Read;

use bumpgate_core::policy::evaluate;

use crate::commands::Status;
use crate::output::Reporter;

/// Reads a manifest diff from `file` or stdin and prints `YES` if the
/// version must be bumped, `NO` otherwise.
///
/// Both answers exit successfully; only unreadable or malformed input fails.
pub fn run_evaluate(file: Option<&str>, reporter: &mut Reporter) -> Status {
    let input = match file {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).map(|_| buf)
        }
    };

    let diff = match input {
        Ok(d) => d,
        Err(e) => {
            reporter.error(&format!("Cannot read diff: {e}"));
            return Status::Failed;
        }
    };

    match evaluate(&diff) {
        Ok(verdict) => {
            reporter.value("verdict", verdict.label());
            Status::Passed
        }
        Err(e) => {
            reporter.error(&format!("{e}"));
            Status::Invalid
        }
    }
}
