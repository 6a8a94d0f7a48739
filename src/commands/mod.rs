pub mod index;
pub mod reconcile;
pub mod run;
pub mod search;
pub mod status;

use serde::Serialize;

use crate::corpus::audit;
use crate::corpus::paths::CorpusPaths;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }

    pub fn merge(&mut self, mut other: CommandReport) {
        self.ok &= other.ok;
        self.details.append(&mut other.details);
        self.issues.append(&mut other.issues);
    }

    fn status_label(&self) -> &'static str {
        if self.ok { "ok" } else { "degraded" }
    }
}

/// Append the closing audit event of a command. Audit failures never change
/// the command outcome.
pub fn audit_outcome(paths: &CorpusPaths, report: &CommandReport, message: &str) {
    if let Err(err) = audit::append_event(paths, &report.command, report.status_label(), message) {
        tracing::warn!(error = %err, "failed to append audit event");
    }
}

pub fn audit_failure(paths: &CorpusPaths, phase: &str, err: &anyhow::Error) {
    if let Err(audit_err) = audit::append_event(paths, phase, "failed", &format!("{err:#}")) {
        tracing::warn!(error = %audit_err, "failed to append audit event");
    }
}
