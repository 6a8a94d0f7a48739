use anyhow::{Context, Result};

use crate::commands::reconcile::reconcile_into;
use crate::commands::{CommandReport, audit_failure, audit_outcome};
use crate::corpus::config::{CorpusConfig, load_config};
use crate::corpus::index::{
    IndexDocument, Tokenizer, build_index, documents_from_records, documents_from_report,
    write_index,
};
use crate::corpus::paths::{CorpusPaths, resolve_paths};
use crate::corpus::report::read_report;
use crate::error::ThortErrorCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum IndexSource {
    /// Reconcile the sources again and index the matched files.
    #[default]
    Reconcile,
    /// Index the files listed in the last written report.
    Report,
}

#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    pub source: IndexSource,
}

/// Build and write the search structures for `documents`.
///
/// Files that vanished since reconciliation and a failed index write are
/// reported as issues.
pub fn index_documents(
    paths: &CorpusPaths,
    cfg: &CorpusConfig,
    documents: &[IndexDocument],
    report: &mut CommandReport,
) -> Result<()> {
    let tokenizer = Tokenizer::new(&cfg.index).context("failed to compile index tokenizer")?;
    let index = build_index(documents, &tokenizer);

    report.detail(format!(
        "documents={} indexed={} tokens={}",
        documents.len(),
        index.database.len(),
        index.word_index.len()
    ));
    for path in &index.skipped {
        report.issue(format!(
            "{}: {} unavailable while indexing",
            ThortErrorCode::E008IndexSkipped.as_str(),
            path.display()
        ));
    }

    match write_index(&index, paths) {
        Ok(out) => {
            report.detail(format!("database={}", out.database_path.display()));
            report.detail(format!("word_index={}", out.word_index_path.display()));
            report.detail(format!("full_text_index={}", out.full_text_path.display()));
        }
        Err(err) => {
            tracing::error!(error = ?err, "index write failed");
            report.issue(format!(
                "{}: {err:#}",
                ThortErrorCode::E006WriteFailed.as_str()
            ));
        }
    }
    Ok(())
}

pub fn run(options: IndexOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config(&paths.home)?;
    let mut report = CommandReport::new("index");

    let documents = match options.source {
        IndexSource::Reconcile => {
            let outcome = reconcile_into(&paths, &cfg, &mut report)?;
            documents_from_records(&outcome.records, &paths.chats_dir)
        }
        IndexSource::Report => {
            report.detail(format!("report_path={}", paths.report_path.display()));
            let rows = match read_report(&paths.report_path) {
                Ok(rows) => rows,
                Err(err) => {
                    audit_failure(&paths, &report.command, &err);
                    return Err(err);
                }
            };
            report.detail(format!("report_rows={}", rows.len()));
            documents_from_report(&rows, &paths.chats_dir)
        }
    };

    index_documents(&paths, &cfg, &documents, &mut report)?;
    audit_outcome(
        &paths,
        &report,
        &format!(
            "documents={} issues={}",
            documents.len(),
            report.issues.len()
        ),
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn vanished_file_is_an_index_skip_issue() {
        let tmp = tempdir().expect("tempdir");
        let paths = CorpusPaths::under(tmp.path());
        let present = tmp.path().join("1_here.txt");
        fs::write(&present, "still here").expect("write");
        let documents = vec![
            IndexDocument {
                id: 1,
                title: "here".to_string(),
                message_count: 1,
                filesize: 10,
                path: present,
            },
            IndexDocument {
                id: 2,
                title: "gone".to_string(),
                message_count: 1,
                filesize: 10,
                path: tmp.path().join("2_gone.txt"),
            },
        ];

        let mut report = CommandReport::new("index");
        index_documents(&paths, &CorpusConfig::default(), &documents, &mut report)
            .expect("index");

        assert!(!report.ok);
        assert_eq!(report.issues.len(), 1);
        assert!(report.issues[0].starts_with("E008_INDEX_SKIPPED: "));
        assert!(report.issues[0].contains("2_gone.txt"));
        assert!(paths.word_index_path().exists());
    }
}
