use crate::corpus::config::WorkOrderConfig;
use crate::corpus::paths::CorpusPaths;
use crate::corpus::record::{Anomaly, NOT_AVAILABLE, Record, RecordSet};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const RELOCATION_PLAN_HEADER: &str = "--- Misplaced Files Report ---";
pub const RELOCATION_PLAN_EMPTY: &str = "No misclassified files were found.";

const REPORT_HEADER: [&str; 10] = [
    "Chat ID",
    "Title",
    "Logged Msg Count",
    "Actual Msg Count",
    "Filesize (bytes)",
    "Canvas Used",
    "Log Classification",
    "Actual Folder",
    "Matched Filename",
    "Anomalies",
];

/// One row of the tabular report. Every cell is already rendered, with
/// `N/A` standing in for unknown values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    #[serde(rename = "Chat ID")]
    pub chat_id: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Logged Msg Count")]
    pub logged_message_count: String,
    #[serde(rename = "Actual Msg Count")]
    pub actual_message_count: String,
    #[serde(rename = "Filesize (bytes)")]
    pub filesize: String,
    #[serde(rename = "Canvas Used")]
    pub canvas_used: String,
    #[serde(rename = "Log Classification")]
    pub log_classification: String,
    #[serde(rename = "Actual Folder")]
    pub actual_folder: String,
    #[serde(rename = "Matched Filename")]
    pub matched_filename: String,
    #[serde(rename = "Anomalies")]
    pub anomalies: String,
}

fn or_na<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| v.to_string())
}

impl ReportRow {
    pub fn from_record(record: &Record) -> Self {
        let log = record.log.as_ref();
        let file = record.file.as_ref();
        Self {
            chat_id: record.id.to_string(),
            title: or_na(record.display_title()),
            logged_message_count: or_na(log.map(|l| l.message_count)),
            actual_message_count: or_na(file.and_then(|f| f.message_count)),
            filesize: or_na(file.map(|f| f.filesize)),
            canvas_used: or_na(log.map(|l| if l.canvas_used { "True" } else { "False" })),
            log_classification: or_na(log.map(|l| l.classification)),
            actual_folder: or_na(file.map(|f| f.folder.as_str())),
            matched_filename: or_na(file.map(|f| f.filename.as_str())),
            anomalies: record.anomaly_summary(),
        }
    }
}

pub fn report_rows(records: &RecordSet) -> Vec<ReportRow> {
    records.values().map(ReportRow::from_record).collect()
}

/// Command for the acquisition collaborator: which chats still need fetching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub automation_mode: String,
    pub chat_ids_to_scrape: String,
    pub delay_seconds: u64,
}

impl WorkOrder {
    pub fn ids(&self) -> Vec<&str> {
        self.chat_ids_to_scrape
            .split(',')
            .filter(|s| !s.is_empty())
            .collect()
    }
}

pub fn work_order(records: &RecordSet, cfg: &WorkOrderConfig) -> WorkOrder {
    let ids = records
        .values()
        .filter(|r| r.is_missing_file())
        .map(|r| r.id.to_string())
        .collect::<Vec<_>>();
    WorkOrder {
        automation_mode: cfg.automation_mode.clone(),
        chat_ids_to_scrape: ids.join(","),
        delay_seconds: cfg.delay_seconds,
    }
}

/// Command for the relocation collaborator: move one misfiled chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocationMove {
    pub filename: String,
    pub from: String,
    pub to: String,
}

impl fmt::Display for RelocationMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Move '{}' from '{}' to '{}'.",
            self.filename, self.from, self.to
        )
    }
}

pub fn relocation_moves(records: &RecordSet) -> Vec<RelocationMove> {
    let mut out = Vec::new();
    for record in records.values() {
        let Some(file) = record.file.as_ref() else {
            continue;
        };
        for anomaly in &record.anomalies {
            if let Anomaly::Misclassified {
                expected,
                actual_folder,
            } = anomaly
            {
                out.push(RelocationMove {
                    filename: file.filename.clone(),
                    from: actual_folder.clone(),
                    to: expected.to_string(),
                });
            }
        }
    }
    out
}

pub fn render_relocation_plan(moves: &[RelocationMove]) -> String {
    let mut out = String::new();
    out.push_str(RELOCATION_PLAN_HEADER);
    out.push_str("\n\n");
    if moves.is_empty() {
        out.push_str(RELOCATION_PLAN_EMPTY);
        out.push('\n');
        return out;
    }
    for item in moves {
        out.push_str(&item.to_string());
        out.push('\n');
    }
    out
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(())
}

pub fn write_report(path: &Path, rows: &[ReportRow]) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    // serialize only emits the header alongside the first row
    if rows.is_empty() {
        writer
            .write_record(REPORT_HEADER)
            .with_context(|| format!("failed to write header to {}", path.display()))?;
    }
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("failed to write row to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(())
}

pub fn read_report(path: &Path) -> Result<Vec<ReportRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut out = Vec::new();
    for row in reader.deserialize() {
        let row: ReportRow =
            row.with_context(|| format!("failed to parse report row in {}", path.display()))?;
        out.push(row);
    }
    Ok(out)
}

pub fn write_work_order(path: &Path, order: &WorkOrder) -> Result<()> {
    ensure_parent(path)?;
    let data = serde_json::to_string_pretty(order)?;
    fs::write(path, format!("{data}\n"))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn write_relocation_plan(path: &Path, moves: &[RelocationMove]) -> Result<()> {
    ensure_parent(path)?;
    fs::write(path, render_relocation_plan(moves))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Report,
    WorkOrder,
    RelocationPlan,
}

impl Artifact {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Report => "report",
            Self::WorkOrder => "work_order",
            Self::RelocationPlan => "relocation_plan",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactWrite {
    pub artifact: Artifact,
    pub path: PathBuf,
    pub entries: usize,
}

#[derive(Debug, Clone)]
pub struct ArtifactFailure {
    pub artifact: Artifact,
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct EmitOutcome {
    pub written: Vec<ArtifactWrite>,
    pub failures: Vec<ArtifactFailure>,
}

impl EmitOutcome {
    fn record(&mut self, artifact: Artifact, path: &Path, entries: usize, result: Result<()>) {
        match result {
            Ok(()) => {
                tracing::info!(
                    artifact = artifact.as_str(),
                    path = %path.display(),
                    entries,
                    "artifact written"
                );
                self.written.push(ArtifactWrite {
                    artifact,
                    path: path.to_path_buf(),
                    entries,
                });
            }
            Err(err) => {
                tracing::error!(
                    artifact = artifact.as_str(),
                    error = ?err,
                    "artifact write failed"
                );
                self.failures.push(ArtifactFailure {
                    artifact,
                    path: path.to_path_buf(),
                    error: format!("{err:#}"),
                });
            }
        }
    }
}

/// Write all three artifacts. A failure on one never blocks the others.
pub fn emit_all(records: &RecordSet, paths: &CorpusPaths, cfg: &WorkOrderConfig) -> EmitOutcome {
    let mut out = EmitOutcome::default();

    let rows = report_rows(records);
    let result = write_report(&paths.report_path, &rows);
    out.record(Artifact::Report, &paths.report_path, rows.len(), result);

    let order = work_order(records, cfg);
    let result = write_work_order(&paths.work_order_path, &order);
    let entries = order.ids().len();
    out.record(Artifact::WorkOrder, &paths.work_order_path, entries, result);

    let moves = relocation_moves(records);
    let result = write_relocation_plan(&paths.relocation_plan_path, &moves);
    out.record(
        Artifact::RelocationPlan,
        &paths.relocation_plan_path,
        moves.len(),
        result,
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::record::{Classification, FileMatch, LogEntry};
    use tempfile::tempdir;

    fn sample_records() -> RecordSet {
        let mut misfiled = Record::from_log(
            7,
            LogEntry {
                title: "Test".to_string(),
                message_count: 5,
                classification: Classification::Long,
                canvas_used: true,
            },
        );
        misfiled.catalog_title = Some("Test Chat".to_string());
        misfiled.file = Some(FileMatch {
            filename: "007_test.txt".to_string(),
            folder: "Short".to_string(),
            filesize: 64,
            message_count: Some(4),
        });
        misfiled.note(Anomaly::Misclassified {
            expected: Classification::Long,
            actual_folder: "Short".to_string(),
        });

        let mut missing = Record::from_log(
            12,
            LogEntry {
                title: "Gone".to_string(),
                message_count: 3,
                classification: Classification::Short,
                canvas_used: false,
            },
        );
        missing.note(Anomaly::MissingMetadata { id: 12 });
        missing.note(Anomaly::MissingFile);

        let mut lost_early = Record::from_log(
            3,
            LogEntry {
                title: "Early".to_string(),
                message_count: 1,
                classification: Classification::Short,
                canvas_used: false,
            },
        );
        lost_early.note(Anomaly::MissingFile);

        RecordSet::from([(7, misfiled), (12, missing), (3, lost_early)])
    }

    #[test]
    fn rows_render_na_for_unknown_fields() {
        let rows = report_rows(&sample_records());
        let ids: Vec<&str> = rows.iter().map(|r| r.chat_id.as_str()).collect();
        assert_eq!(ids, vec!["3", "7", "12"]);

        let missing = &rows[2];
        assert_eq!(missing.title, "Gone");
        assert_eq!(missing.actual_message_count, "N/A");
        assert_eq!(missing.filesize, "N/A");
        assert_eq!(missing.matched_filename, "N/A");
        assert_eq!(
            missing.anomalies,
            "MISSING_METADATA: Chat ID 12 not in chats.json. | MISSING_FILE: Log entry exists but file not found."
        );

        let misfiled = &rows[1];
        assert_eq!(misfiled.title, "Test Chat");
        assert_eq!(misfiled.canvas_used, "True");
        assert_eq!(misfiled.log_classification, "LONG");
        assert_eq!(misfiled.actual_message_count, "4");
    }

    #[test]
    fn work_order_lists_missing_ids_ascending() {
        let order = work_order(&sample_records(), &WorkOrderConfig::default());
        assert_eq!(order.chat_ids_to_scrape, "3,12");
        assert_eq!(order.automation_mode, "hybrid");
        assert_eq!(order.delay_seconds, 3);
        assert_eq!(order.ids(), vec!["3", "12"]);
    }

    #[test]
    fn relocation_plan_lists_misclassified_moves() {
        let moves = relocation_moves(&sample_records());
        let plan = render_relocation_plan(&moves);
        assert_eq!(
            plan,
            "--- Misplaced Files Report ---\n\nMove '007_test.txt' from 'Short' to 'LONG'.\n"
        );
        assert_eq!(
            render_relocation_plan(&[]),
            "--- Misplaced Files Report ---\n\nNo misclassified files were found.\n"
        );
    }

    #[test]
    fn report_header_and_rows_survive_a_write_and_read() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("reports/report.csv");
        let rows = report_rows(&sample_records());
        write_report(&path, &rows).expect("write");

        let raw = fs::read_to_string(&path).expect("read");
        assert!(raw.starts_with(
            "Chat ID,Title,Logged Msg Count,Actual Msg Count,Filesize (bytes),Canvas Used,Log Classification,Actual Folder,Matched Filename,Anomalies\n"
        ));
        assert_eq!(read_report(&path).expect("parse"), rows);
    }

    #[test]
    fn empty_report_still_carries_header() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("report.csv");
        write_report(&path, &[]).expect("write");
        let raw = fs::read_to_string(&path).expect("read");
        assert_eq!(raw.lines().next(), Some(REPORT_HEADER.join(",").as_str()));
        assert!(read_report(&path).expect("read back").is_empty());
    }

    #[test]
    fn one_failed_artifact_does_not_block_the_others() {
        let tmp = tempdir().expect("tempdir");
        let mut paths = CorpusPaths::under(tmp.path());
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, "not a directory").expect("write blocker");
        paths.report_path = blocker.join("report.csv");

        let out = emit_all(&sample_records(), &paths, &WorkOrderConfig::default());
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].artifact, Artifact::Report);
        assert_eq!(out.written.len(), 2);
        assert!(paths.work_order_path.exists());
        assert!(paths.relocation_plan_path.exists());
    }
}
