use crate::corpus::config::IndexConfig;
use crate::corpus::paths::CorpusPaths;
use crate::corpus::record::{ChatId, NOT_AVAILABLE, RecordSet};
use crate::corpus::report::ReportRow;
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// A reconciled chat whose file can be read into the search structures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDocument {
    pub id: ChatId,
    pub title: String,
    pub message_count: u32,
    pub filesize: u64,
    pub path: PathBuf,
}

pub fn documents_from_records(records: &RecordSet, chats_dir: &Path) -> Vec<IndexDocument> {
    let mut out = Vec::new();
    for record in records.values() {
        let Some(file) = record.file.as_ref() else {
            continue;
        };
        let Some(message_count) = file.message_count else {
            continue;
        };
        out.push(IndexDocument {
            id: record.id,
            title: record.display_title().unwrap_or(NOT_AVAILABLE).to_string(),
            message_count,
            filesize: file.filesize,
            path: chats_dir.join(&file.folder).join(&file.filename),
        });
    }
    out
}

fn resolved(cell: &str) -> Option<&str> {
    let trimmed = cell.trim();
    if trimmed.is_empty() || trimmed == NOT_AVAILABLE {
        None
    } else {
        Some(trimmed)
    }
}

/// Rebuild index inputs from a previously written tabular report.
///
/// Rows without an actual message count, filename or folder have no readable
/// file and are left out.
pub fn documents_from_report(rows: &[ReportRow], chats_dir: &Path) -> Vec<IndexDocument> {
    let mut out = Vec::new();
    for row in rows {
        let (Some(id), Some(count), Some(filename), Some(folder)) = (
            resolved(&row.chat_id).and_then(|v| v.parse::<ChatId>().ok()),
            resolved(&row.actual_message_count).and_then(|v| v.parse::<u32>().ok()),
            resolved(&row.matched_filename),
            resolved(&row.actual_folder),
        ) else {
            continue;
        };
        out.push(IndexDocument {
            id,
            title: row.title.clone(),
            message_count: count,
            filesize: resolved(&row.filesize)
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            path: chats_dir.join(folder).join(filename),
        });
    }
    out.sort_by_key(|doc| doc.id);
    out
}

pub struct Tokenizer {
    pattern: Regex,
    stop_words: BTreeSet<String>,
}

impl Tokenizer {
    pub fn new(cfg: &IndexConfig) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(r"\b\w{{{},}}\b", cfg.min_token_chars))?;
        let stop_words = cfg.stop_words.iter().map(|w| w.to_lowercase()).collect();
        Ok(Self {
            pattern,
            stop_words,
        })
    }

    /// Distinct index tokens of already-lowercased text, stop words removed.
    pub fn tokens(&self, lowered: &str) -> BTreeSet<String> {
        self.pattern
            .find_iter(lowered)
            .map(|m| m.as_str())
            .filter(|token| !self.stop_words.contains(*token))
            .map(ToOwned::to_owned)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseEntry {
    pub id: ChatId,
    pub title: String,
    pub msg_count: u32,
    pub filesize: u64,
    pub content: String,
    pub content_sha256: String,
}

#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    pub database: BTreeMap<ChatId, DatabaseEntry>,
    pub word_index: BTreeMap<String, Vec<ChatId>>,
    pub full_text: BTreeMap<ChatId, String>,
    pub skipped: Vec<PathBuf>,
}

fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Read every document and build the database, word index and full-text map.
///
/// A document whose file can no longer be read is skipped and listed in
/// [`SearchIndex::skipped`].
pub fn build_index(documents: &[IndexDocument], tokenizer: &Tokenizer) -> SearchIndex {
    let mut out = SearchIndex::default();
    for doc in documents {
        let bytes = match fs::read(&doc.path) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(
                    id = doc.id,
                    path = %doc.path.display(),
                    error = %err,
                    "file unavailable while indexing; skipping"
                );
                out.skipped.push(doc.path.clone());
                continue;
            }
        };
        let content = String::from_utf8_lossy(&bytes).into_owned();
        let lowered = content.to_lowercase();

        for token in tokenizer.tokens(&lowered) {
            let ids = out.word_index.entry(token).or_default();
            if ids.last() != Some(&doc.id) {
                ids.push(doc.id);
            }
        }
        out.full_text.insert(doc.id, lowered);
        out.database.insert(
            doc.id,
            DatabaseEntry {
                id: doc.id,
                title: doc.title.clone(),
                msg_count: doc.message_count,
                filesize: doc.filesize,
                content,
                content_sha256: content_hash(&bytes),
            },
        );
    }
    out
}

#[derive(Debug, Clone)]
pub struct IndexWriteOutcome {
    pub database_path: PathBuf,
    pub word_index_path: PathBuf,
    pub full_text_path: PathBuf,
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let data = serde_json::to_string(value)
        .with_context(|| format!("failed to serialize {}", path.display()))?;
    fs::write(path, data).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn write_index(index: &SearchIndex, paths: &CorpusPaths) -> Result<IndexWriteOutcome> {
    fs::create_dir_all(&paths.site_dir)
        .with_context(|| format!("failed to create {}", paths.site_dir.display()))?;

    let out = IndexWriteOutcome {
        database_path: paths.database_path(),
        word_index_path: paths.word_index_path(),
        full_text_path: paths.full_text_index_path(),
    };
    write_json(&out.database_path, &index.database)?;
    write_json(&out.word_index_path, &index.word_index)?;
    write_json(&out.full_text_path, &index.full_text)?;
    Ok(out)
}
