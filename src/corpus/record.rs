use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub type ChatId = u64;

/// Every record known to a run, keyed and iterated in ascending id order.
pub type RecordSet = BTreeMap<ChatId, Record>;

pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    Long,
    Short,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Long => "LONG",
            Self::Short => "SHORT",
        }
    }

    /// Folder names are compared case-insensitively, so `Long` matches `LONG`.
    pub fn matches_folder(self, folder: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(folder)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Classification {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "LONG" => Ok(Self::Long),
            "SHORT" => Ok(Self::Short),
            other => Err(format!(
                "invalid classification '{other}', expected LONG or SHORT"
            )),
        }
    }
}

/// Facts the processing log asserted about one chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub title: String,
    pub message_count: u32,
    pub classification: Classification,
    pub canvas_used: bool,
}

/// The file on disk currently attached to a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMatch {
    pub filename: String,
    pub folder: String,
    pub filesize: u64,
    /// `None` when the file was matched but could not be read.
    pub message_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    OrphanFile,
    MissingMetadata { id: ChatId },
    MissingFile,
    Misclassified {
        expected: Classification,
        actual_folder: String,
    },
}

impl Anomaly {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::OrphanFile => "ORPHAN_FILE",
            Self::MissingMetadata { .. } => "MISSING_METADATA",
            Self::MissingFile => "MISSING_FILE",
            Self::Misclassified { .. } => "MISCLASSIFIED",
        }
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OrphanFile => write!(
                f,
                "ORPHAN_FILE: File found on disk but not in analysis log."
            ),
            Self::MissingMetadata { id } => {
                write!(f, "MISSING_METADATA: Chat ID {id} not in chats.json.")
            }
            Self::MissingFile => write!(f, "MISSING_FILE: Log entry exists but file not found."),
            Self::Misclassified {
                expected,
                actual_folder,
            } => write!(
                f,
                "MISCLASSIFIED: Log says '{expected}' but file is in '{actual_folder}' folder."
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: ChatId,
    /// `None` when the log never mentioned this id.
    pub log: Option<LogEntry>,
    /// `None` until a file on disk is matched.
    pub file: Option<FileMatch>,
    pub catalog_title: Option<String>,
    pub anomalies: Vec<Anomaly>,
}

impl Record {
    pub fn new(id: ChatId) -> Self {
        Self {
            id,
            log: None,
            file: None,
            catalog_title: None,
            anomalies: Vec::new(),
        }
    }

    pub fn from_log(id: ChatId, entry: LogEntry) -> Self {
        Self {
            log: Some(entry),
            ..Self::new(id)
        }
    }

    pub fn note(&mut self, anomaly: Anomaly) {
        tracing::debug!(id = self.id, anomaly = anomaly.tag(), "anomaly noted");
        self.anomalies.push(anomaly);
    }

    pub fn is_orphan(&self) -> bool {
        self.anomalies.contains(&Anomaly::OrphanFile)
    }

    pub fn is_missing_file(&self) -> bool {
        self.anomalies.contains(&Anomaly::MissingFile)
    }

    pub fn classification(&self) -> Option<Classification> {
        self.log.as_ref().map(|entry| entry.classification)
    }

    /// Display title: catalog, then log, then filename.
    pub fn display_title(&self) -> Option<&str> {
        self.catalog_title
            .as_deref()
            .or_else(|| self.log.as_ref().map(|entry| entry.title.as_str()))
            .or_else(|| self.file.as_ref().map(|file| file.filename.as_str()))
    }

    pub fn anomaly_summary(&self) -> String {
        self.anomalies
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> LogEntry {
        LogEntry {
            title: "Log Title".to_string(),
            message_count: 5,
            classification: Classification::Long,
            canvas_used: false,
        }
    }

    #[test]
    fn display_title_prefers_catalog_then_log_then_filename() {
        let mut record = Record::from_log(7, sample_entry());
        record.file = Some(FileMatch {
            filename: "007_test.txt".to_string(),
            folder: "Long".to_string(),
            filesize: 10,
            message_count: Some(2),
        });
        assert_eq!(record.display_title(), Some("Log Title"));

        record.catalog_title = Some("Catalog Title".to_string());
        assert_eq!(record.display_title(), Some("Catalog Title"));

        record.catalog_title = None;
        record.log = None;
        assert_eq!(record.display_title(), Some("007_test.txt"));

        record.file = None;
        assert_eq!(record.display_title(), None);
    }

    #[test]
    fn anomaly_rendering_is_stable() {
        let misclassified = Anomaly::Misclassified {
            expected: Classification::Long,
            actual_folder: "Short".to_string(),
        };
        assert_eq!(
            misclassified.to_string(),
            "MISCLASSIFIED: Log says 'LONG' but file is in 'Short' folder."
        );
        assert_eq!(
            Anomaly::MissingMetadata { id: 42 }.to_string(),
            "MISSING_METADATA: Chat ID 42 not in chats.json."
        );
    }

    #[test]
    fn anomaly_summary_joins_in_insertion_order() {
        let mut record = Record::new(3);
        record.note(Anomaly::MissingMetadata { id: 3 });
        record.note(Anomaly::MissingFile);
        assert_eq!(
            record.anomaly_summary(),
            "MISSING_METADATA: Chat ID 3 not in chats.json. | MISSING_FILE: Log entry exists but file not found."
        );
        assert!(record.is_missing_file());
        assert!(!record.is_orphan());
    }

    #[test]
    fn classification_matches_folder_case_insensitively() {
        assert!(Classification::Long.matches_folder("Long"));
        assert!(Classification::Short.matches_folder("short"));
        assert!(!Classification::Long.matches_folder("Short"));
        assert_eq!("SHORT".parse::<Classification>(), Ok(Classification::Short));
        assert!("long".parse::<Classification>().is_err());
    }
}
