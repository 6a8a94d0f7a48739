use anyhow::Result;

use crate::commands::{CommandReport, audit_failure, audit_outcome};
use crate::corpus::config::{CorpusConfig, load_config};
use crate::corpus::paths::{CorpusPaths, resolve_paths};
use crate::corpus::reconcile::{Reconciler, Reconciliation};
use crate::corpus::record::RecordSet;
use crate::corpus::report;
use crate::error::ThortErrorCode;

#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    pub dry_run: bool,
}

/// Run a reconciliation pass and describe it on `report`.
///
/// Degraded sources become report issues; an unreadable log is returned as
/// the error after it has been audited.
pub fn reconcile_into(
    paths: &CorpusPaths,
    cfg: &CorpusConfig,
    report: &mut CommandReport,
) -> Result<Reconciliation> {
    report.detail(format!("log_path={}", paths.log_path.display()));
    report.detail(format!("chats_dir={}", paths.chats_dir.display()));
    report.detail(format!("catalog_path={}", paths.catalog_path.display()));

    let outcome = match Reconciler::new(paths, cfg).and_then(|r| r.run()) {
        Ok(outcome) => outcome,
        Err(err) => {
            audit_failure(paths, &report.command, &err);
            return Err(err);
        }
    };

    report.detail(format!(
        "log_entries={} duplicate_stanza_ids={}",
        outcome.log_entries,
        outcome.duplicate_log_ids.len()
    ));
    report.detail(format!(
        "files_scanned={} attached={} replaced={} discarded={} orphans={}",
        outcome.files_scanned,
        outcome.merge.attached,
        outcome.merge.replaced,
        outcome.merge.discarded,
        outcome.merge.orphans
    ));
    report.detail(format!(
        "unmatched_names={} unreadable_files={}",
        outcome.skipped_names, outcome.unreadable_files
    ));
    match outcome.catalog_entries {
        Some(n) => report.detail(format!("catalog_entries={n}")),
        None => report.detail("catalog_entries=unavailable"),
    }
    report.detail(format!("records={}", outcome.records.len()));
    report.detail(format!(
        "anomalies missing_file={} missing_metadata={} orphan_file={} misclassified={}",
        outcome.counts.missing_file,
        outcome.counts.missing_metadata,
        outcome.counts.orphan_file,
        outcome.counts.misclassified
    ));
    for issue in &outcome.issues {
        report.issue(format!("{}: {}", issue.code.as_str(), issue.message));
    }

    Ok(outcome)
}

pub fn emit_artifacts(
    paths: &CorpusPaths,
    cfg: &CorpusConfig,
    records: &RecordSet,
    report: &mut CommandReport,
) {
    let outcome = report::emit_all(records, paths, &cfg.work_order);
    for written in &outcome.written {
        report.detail(format!(
            "{}={} entries={}",
            written.artifact.as_str(),
            written.path.display(),
            written.entries
        ));
    }
    for failure in &outcome.failures {
        report.issue(format!(
            "{}: {} at {}: {}",
            ThortErrorCode::E006WriteFailed.as_str(),
            failure.artifact.as_str(),
            failure.path.display(),
            failure.error
        ));
    }
}

pub fn run(options: ReconcileOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config(&paths.home)?;
    let mut report = CommandReport::new("reconcile");

    let outcome = reconcile_into(&paths, &cfg, &mut report)?;
    if options.dry_run {
        report.detail("dry_run=true artifacts=skipped");
    } else {
        emit_artifacts(&paths, &cfg, &outcome.records, &mut report);
    }

    audit_outcome(
        &paths,
        &report,
        &format!(
            "records={} issues={}",
            outcome.records.len(),
            report.issues.len()
        ),
    );
    Ok(report)
}
