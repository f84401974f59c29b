use colored::*;
use serde::Serialize;
use bumpgate_core::policy::{Assessment, ManifestLifecycle};
use bumpgate_core::report::{PluginOutcome, Report, ReportEntry};
use bumpgate_core::Verdict;

/// Output mode for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
    Quiet,
}

/// Accumulated JSON result entry.
#[derive(Debug, Serialize, Clone)]
pub struct JsonResultEntry {
    #[serde(rename = "type")]
    pub result_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Accumulated JSON output.
#[derive(Debug, Serialize)]
pub struct JsonOutput {
    pub results: Vec<JsonResultEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<Report>,
}

/// Reporter handles all output formatting.
pub struct Reporter {
    mode: OutputMode,
    json_results: Vec<JsonResultEntry>,
    json_report: Option<Report>,
}

impl Reporter {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            json_results: Vec::new(),
            json_report: None,
        }
    }

    fn push_json(&mut self, result_type: &str, message: &str, details: Option<String>) {
        self.json_results.push(JsonResultEntry {
            result_type: result_type.to_string(),
            message: message.to_string(),
            details,
        });
    }

    pub fn error(&mut self, message: &str) {
        match self.mode {
            OutputMode::Human | OutputMode::Quiet => {
                eprintln!("{} {}", "ERROR:".red(), message);
            }
            OutputMode::Json => self.push_json("error", message, None),
        }
    }

    pub fn warning(&mut self, message: &str) {
        match self.mode {
            OutputMode::Human => {
                eprintln!("{} {}", "WARNING:".yellow(), message);
            }
            OutputMode::Json => self.push_json("warning", message, None),
            OutputMode::Quiet => {}
        }
    }

    pub fn success(&mut self, message: &str) {
        match self.mode {
            OutputMode::Human => {
                println!("{} {}", "✓".green(), message);
            }
            OutputMode::Json => self.push_json("success", message, None),
            OutputMode::Quiet => {}
        }
    }

    pub fn info(&mut self, message: &str) {
        match self.mode {
            OutputMode::Human => {
                println!("{} {}", "INFO:".blue(), message);
            }
            OutputMode::Json => self.push_json("info", message, None),
            OutputMode::Quiet => {}
        }
    }

    pub fn section(&mut self, title: &str) {
        if self.mode == OutputMode::Human {
            println!("{}", format!("=== {title} ===").cyan());
        }
    }

    /// Prints a bare value (a plugin name, a `YES`/`NO` answer). Shown in
    /// quiet mode too, since it is the command's actual output.
    pub fn value(&mut self, result_type: &str, value: &str) {
        match self.mode {
            OutputMode::Human | OutputMode::Quiet => println!("{value}"),
            OutputMode::Json => self.push_json(result_type, value, None),
        }
    }

    /// Prints raw diff text unchanged.
    pub fn diff(&mut self, label: &str, text: &str) {
        match self.mode {
            OutputMode::Human | OutputMode::Quiet => print!("{text}"),
            OutputMode::Json => self.push_json("diff", label, Some(text.to_string())),
        }
    }

    pub fn report_check(&mut self, report: &Report) {
        if self.mode == OutputMode::Json {
            self.json_report = Some(report.clone());
        }
        for entry in report.entries() {
            self.report_entry(entry);
        }
    }

    fn report_entry(&mut self, entry: &ReportEntry) {
        let plugin = entry.plugin.as_str();
        match &entry.outcome {
            PluginOutcome::Evaluated {
                verdict: Verdict::NoBumpRequired,
                assessment,
            } => {
                let note = assessment.as_ref().map(no_bump_note).unwrap_or_default();
                self.success(&format!("{plugin}: NO version bump needed{note}"));
            }
            PluginOutcome::Evaluated {
                verdict: Verdict::BumpRequired,
                assessment,
            } => {
                let note = assessment.as_ref().map(lifecycle_note).unwrap_or_default();
                let mut msg = format!("{plugin}: YES, version bump required{note}");
                if let Some(next) = assessment.as_ref().and_then(|a| a.suggested_version.as_deref()) {
                    msg.push_str(&format!(" (suggested: {next})"));
                }
                self.error(&msg);
                if self.mode == OutputMode::Human {
                    for line in assessment.iter().flat_map(|a| &a.functional_changes) {
                        eprintln!("    {}", line.dimmed());
                    }
                }
            }
            PluginOutcome::Failed { kind, message } => {
                self.error(&format!("{plugin}: could not verify ({kind}): {message}"));
            }
        }
    }

    pub fn finish(&self) {
        if self.mode == OutputMode::Json {
            let output = JsonOutput {
                results: self.json_results.clone(),
                report: self.json_report.clone(),
            };
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                println!("{json}");
            }
        }
    }
}

fn no_bump_note(assessment: &Assessment) -> String {
    if let Some(change) = &assessment.version_change {
        return format!(" ({} -> {}, {})", change.from, change.to, change.kind);
    }
    if assessment.functional_changes.is_empty() {
        " (no functional manifest changes)".into()
    } else {
        String::new()
    }
}

fn lifecycle_note(assessment: &Assessment) -> &'static str {
    match assessment.lifecycle {
        Some(ManifestLifecycle::Created) => " [new manifest]",
        Some(ManifestLifecycle::Deleted) => " [manifest removed]",
        None => "",
    }
}
