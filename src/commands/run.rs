use anyhow::Result;

use crate::commands::index::index_documents;
use crate::commands::reconcile::{emit_artifacts, reconcile_into};
use crate::commands::{CommandReport, audit_outcome};
use crate::corpus::config::load_config;
use crate::corpus::index::documents_from_records;
use crate::corpus::paths::resolve_paths;

/// Reconcile, write the three artifacts, then index the matched files from
/// the same pass.
pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config(&paths.home)?;
    let mut report = CommandReport::new("run");

    let outcome = reconcile_into(&paths, &cfg, &mut report)?;
    emit_artifacts(&paths, &cfg, &outcome.records, &mut report);

    let documents = documents_from_records(&outcome.records, &paths.chats_dir);
    let mut indexing = CommandReport::new("index");
    index_documents(&paths, &cfg, &documents, &mut indexing)?;
    report.merge(indexing);

    audit_outcome(
        &paths,
        &report,
        &format!(
            "records={} documents={} issues={}",
            outcome.records.len(),
            documents.len(),
            report.issues.len()
        ),
    );
    Ok(report)
}
