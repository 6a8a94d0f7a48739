use crate::corpus::anomaly::{self, AnomalyCounts};
use crate::corpus::catalog::{self, Catalog};
use crate::corpus::config::CorpusConfig;
use crate::corpus::file_scanner::{self, MergeStats, ScanOutcome, ScannedFile};
use crate::corpus::log_parser::{self, AnalysisLogGrammar, LogGrammar};
use crate::corpus::paths::CorpusPaths;
use crate::corpus::record::{ChatId, LogEntry, Record, RecordSet};
use crate::error::{ThortError, ThortErrorCode};
use anyhow::{Context, Result};
use std::collections::BTreeMap;

/// A source that could not be used; the run continued without it.
#[derive(Debug, Clone)]
pub struct SourceIssue {
    pub code: ThortErrorCode,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub records: RecordSet,
    pub log_entries: usize,
    pub duplicate_log_ids: Vec<ChatId>,
    pub files_scanned: usize,
    pub skipped_names: usize,
    pub unreadable_files: usize,
    pub merge: MergeStats,
    pub catalog_entries: Option<usize>,
    pub counts: AnomalyCounts,
    pub issues: Vec<SourceIssue>,
}

/// Merge the three sources in their fixed order: log, then files, then
/// catalog, and classify only once everything is merged.
///
/// `catalog` is `None` when the catalog could not be loaded, in which case
/// titles are left to fall back and no record is flagged for missing metadata.
pub fn merge_sources(
    log_entries: BTreeMap<ChatId, LogEntry>,
    files: Vec<ScannedFile>,
    catalog: Option<&Catalog>,
) -> (RecordSet, MergeStats) {
    let mut records: RecordSet = log_entries
        .into_iter()
        .map(|(id, entry)| (id, Record::from_log(id, entry)))
        .collect();

    let merge = file_scanner::integrate_files(&mut records, files);
    if let Some(catalog) = catalog {
        let stats = catalog::enrich_from_catalog(&mut records, catalog);
        tracing::debug!(
            titled = stats.titled,
            missing_metadata = stats.missing_metadata,
            "catalog merged"
        );
    }
    anomaly::classify(&mut records);
    (records, merge)
}

fn source_issue(err: &anyhow::Error) -> SourceIssue {
    let code = err
        .downcast_ref::<ThortError>()
        .map(ThortError::code)
        .unwrap_or(ThortErrorCode::E007ScanFailed);
    SourceIssue {
        code,
        message: format!("{err:#}"),
    }
}

pub struct Reconciler<'a> {
    paths: &'a CorpusPaths,
    config: &'a CorpusConfig,
    grammar: Box<dyn LogGrammar>,
}

impl<'a> Reconciler<'a> {
    pub fn new(paths: &'a CorpusPaths, config: &'a CorpusConfig) -> Result<Self> {
        let grammar = AnalysisLogGrammar::new().context("failed to compile log grammar")?;
        Ok(Self::with_grammar(paths, config, Box::new(grammar)))
    }

    pub fn with_grammar(
        paths: &'a CorpusPaths,
        config: &'a CorpusConfig,
        grammar: Box<dyn LogGrammar>,
    ) -> Self {
        Self {
            paths,
            config,
            grammar,
        }
    }

    /// Run one full reconciliation pass.
    ///
    /// An unreadable log aborts the run. A missing scan root or an unusable
    /// catalog is recorded in [`Reconciliation::issues`] and the run goes on.
    pub fn run(&self) -> Result<Reconciliation> {
        let text = log_parser::read_log(&self.paths.log_path)?;
        let parsed = log_parser::parse_log(
            &text,
            self.grammar.as_ref(),
            self.config.log.duplicate_stanza_policy,
        );
        tracing::info!(
            entries = parsed.entries.len(),
            path = %self.paths.log_path.display(),
            "parsed processing log"
        );
        if !parsed.duplicate_ids.is_empty() {
            tracing::info!(
                ids = ?parsed.duplicate_ids,
                policy = self.config.log.duplicate_stanza_policy.as_str(),
                "log carries repeated stanzas"
            );
        }

        let mut issues = Vec::new();

        let scan = match file_scanner::scan_folders(&self.paths.chats_dir, &self.config.scan) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(error = ?err, "file scan skipped");
                issues.push(source_issue(&err));
                ScanOutcome::default()
            }
        };
        let skipped_names = scan.skipped_names.len();
        let unreadable_files = scan.unreadable.len();
        let files = scan.files;
        let files_scanned = files.len();

        let catalog = match catalog::load_catalog(&self.paths.catalog_path) {
            Ok(catalog) => Some(catalog),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "catalog unavailable; titles may be missing from report"
                );
                issues.push(SourceIssue {
                    code: err.code(),
                    message: err.to_string(),
                });
                None
            }
        };
        let catalog_entries = catalog.as_ref().map(Catalog::len);

        let log_entries = parsed.entries.len();
        let (records, merge) = merge_sources(parsed.entries, files, catalog.as_ref());
        let counts = AnomalyCounts::tally(&records);
        tracing::info!(
            records = records.len(),
            missing_file = counts.missing_file,
            missing_metadata = counts.missing_metadata,
            orphan_file = counts.orphan_file,
            misclassified = counts.misclassified,
            "reconciliation complete"
        );

        Ok(Reconciliation {
            records,
            log_entries,
            duplicate_log_ids: parsed.duplicate_ids,
            files_scanned,
            skipped_names,
            unreadable_files,
            merge,
            catalog_entries,
            counts,
            issues,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::record::{Anomaly, Classification};
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn write(path: &Path, body: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, body).expect("write");
    }

    fn stanza(id: &str, title: &str, class: &str, count: u32) -> String {
        format!(
            "--- Analyzing Chat #{id}: '{title}' ---\n[RESULT] {class} chat detected ({count} messages)\n"
        )
    }

    fn run(paths: &CorpusPaths) -> Reconciliation {
        let cfg = CorpusConfig::default();
        Reconciler::new(paths, &cfg)
            .expect("reconciler")
            .run()
            .expect("run")
    }

    #[test]
    fn misclassified_chat_gets_catalog_title_and_real_count() {
        let tmp = tempdir().expect("tempdir");
        let paths = CorpusPaths::under(tmp.path());
        write(&paths.log_path, &stanza("007", "Test", "LONG", 5));
        write(&paths.catalog_path, r#"[{"id": "007", "title": "Test Chat"}]"#);
        write(
            &paths.chats_dir.join("Short/007_test.txt"),
            "## PROMPT ##\na\n## RESPONSE ##\nb\n## PROMPT ##\nc\n## RESPONSE ##\nd\n",
        );

        let out = run(&paths);
        let record = &out.records[&7];
        assert_eq!(record.display_title(), Some("Test Chat"));
        assert_eq!(record.file.as_ref().and_then(|f| f.message_count), Some(4));
        assert_eq!(
            record.anomalies,
            vec![Anomaly::Misclassified {
                expected: Classification::Long,
                actual_folder: "Short".to_string(),
            }]
        );
        assert!(out.issues.is_empty());
    }

    #[test]
    fn orphan_file_falls_back_to_filename_title() {
        let tmp = tempdir().expect("tempdir");
        let paths = CorpusPaths::under(tmp.path());
        write(&paths.log_path, "");
        write(&paths.catalog_path, "[]");
        write(&paths.chats_dir.join("Long/042_x.txt"), "body");

        let out = run(&paths);
        let record = &out.records[&42];
        assert_eq!(record.anomalies, vec![Anomaly::OrphanFile]);
        assert_eq!(record.display_title(), Some("042_x.txt"));
        assert!(record.classification().is_none());
    }

    #[test]
    fn missing_log_is_fatal() {
        let tmp = tempdir().expect("tempdir");
        let paths = CorpusPaths::under(tmp.path());
        let cfg = CorpusConfig::default();
        let err = Reconciler::new(&paths, &cfg)
            .expect("reconciler")
            .run()
            .expect_err("fatal");
        assert!(matches!(
            err.downcast_ref::<ThortError>(),
            Some(ThortError::LogUnreadable { .. })
        ));
    }

    #[test]
    fn missing_scan_root_and_catalog_degrade_without_aborting() {
        let tmp = tempdir().expect("tempdir");
        let paths = CorpusPaths::under(tmp.path());
        write(&paths.log_path, &stanza("3", "Lost", "SHORT", 2));

        let out = run(&paths);
        let codes: Vec<&str> = out.issues.iter().map(|i| i.code.as_str()).collect();
        assert_eq!(codes, vec!["E002_SCAN_ROOT_MISSING", "E003_CATALOG_UNREADABLE"]);
        assert_eq!(out.records[&3].anomalies, vec![Anomaly::MissingFile]);
        assert_eq!(out.catalog_entries, None);
    }

    #[test]
    fn missing_file_and_file_facts_are_exclusive() {
        let tmp = tempdir().expect("tempdir");
        let paths = CorpusPaths::under(tmp.path());
        let log = [stanza("1", "a", "LONG", 2), stanza("2", "b", "SHORT", 2)].concat();
        write(&paths.log_path, &log);
        write(&paths.catalog_path, r#"[{"id": 1, "title": "A"}, {"id": 2, "title": "B"}]"#);
        write(&paths.chats_dir.join("Long/1_a.txt"), "x");

        let out = run(&paths);
        for record in out.records.values() {
            assert_ne!(record.is_missing_file(), record.file.is_some());
        }
    }

    #[test]
    fn acquiring_missing_files_clears_missing_file_on_rerun() {
        let tmp = tempdir().expect("tempdir");
        let paths = CorpusPaths::under(tmp.path());
        let log = [stanza("4", "d", "SHORT", 2), stanza("9", "i", "LONG", 8)].concat();
        write(&paths.log_path, &log);
        write(&paths.catalog_path, r#"[{"id": 4, "title": "D"}, {"id": 9, "title": "I"}]"#);
        fs::create_dir_all(&paths.chats_dir).expect("mkdir chats");

        let first = run(&paths);
        let missing: Vec<ChatId> = first
            .records
            .values()
            .filter(|r| r.is_missing_file())
            .map(|r| r.id)
            .collect();
        assert_eq!(missing, vec![4, 9]);

        for id in &missing {
            let class = first.records[id].classification().expect("logged");
            let folder = if class == Classification::Long { "Long" } else { "Short" };
            write(
                &paths.chats_dir.join(folder).join(format!("{id}_acquired.txt")),
                "## PROMPT ##\n## RESPONSE ##\n",
            );
        }

        let second = run(&paths);
        assert_eq!(second.counts.missing_file, 0);
        assert_eq!(second.counts.misclassified, 0);
    }
}
