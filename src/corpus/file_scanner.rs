use crate::corpus::config::ScanConfig;
use crate::corpus::record::{Anomaly, ChatId, FileMatch, Record, RecordSet};
use crate::error::ThortError;
use anyhow::{Context, Result};
use std::collections::btree_map::Entry;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub id: ChatId,
    pub path: PathBuf,
    pub file: FileMatch,
}

#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub files: Vec<ScannedFile>,
    pub skipped_names: Vec<String>,
    pub unreadable: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub attached: usize,
    pub replaced: usize,
    pub discarded: usize,
    pub orphans: usize,
}

/// Parse the `<digits>_` prefix of a chat filename.
pub fn chat_id_from_filename(name: &str) -> Option<ChatId> {
    let (digits, _) = name.split_once('_')?;
    if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Count speaker turns: every prompt marker plus every response marker.
pub fn count_messages(path: &Path, cfg: &ScanConfig) -> Result<u32> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let content = String::from_utf8_lossy(&bytes);
    let prompts = content.matches(cfg.prompt_marker.as_str()).count();
    let responses = content.matches(cfg.response_marker.as_str()).count();
    let turns = prompts + responses;
    Ok(u32::try_from(turns).unwrap_or(u32::MAX))
}

struct FolderEntry {
    name: String,
    path: PathBuf,
}

/// Regular files of `dir` sorted by display name. The real path is kept
/// alongside, since a lossy name may not round-trip to the file on disk.
fn sorted_entries(dir: &Path, unreadable: &mut Vec<PathBuf>) -> Result<Vec<FolderEntry>> {
    let read_dir =
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    let mut out = Vec::new();
    for entry in read_dir {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(folder = %dir.display(), error = %err, "skipping unreadable entry");
                unreadable.push(dir.to_path_buf());
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        out.push(FolderEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            path,
        });
    }
    out.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));
    Ok(out)
}

/// Visit every configured subfolder of `root` in order.
///
/// Subfolders that do not exist are skipped; a missing `root` is reported as
/// [`ThortError::ScanRootMissing`] so the caller can continue without files.
/// A subfolder or file that cannot be read is logged, listed in
/// [`ScanOutcome::unreadable`] and skipped.
pub fn scan_folders(root: &Path, cfg: &ScanConfig) -> Result<ScanOutcome> {
    if !root.is_dir() {
        return Err(ThortError::ScanRootMissing(root.to_path_buf()).into());
    }

    let mut out = ScanOutcome::default();
    for folder in &cfg.folders {
        let folder_path = root.join(folder);
        if !folder_path.is_dir() {
            tracing::debug!(folder = %folder_path.display(), "scan folder absent");
            continue;
        }

        let entries = match sorted_entries(&folder_path, &mut out.unreadable) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(error = ?err, "skipping unreadable scan folder");
                out.unreadable.push(folder_path);
                continue;
            }
        };

        for FolderEntry { name, path } in entries {
            let Some(id) = chat_id_from_filename(&name) else {
                tracing::warn!(
                    folder = %folder,
                    file = %name,
                    "skipping file without numeric id prefix"
                );
                out.skipped_names.push(name);
                continue;
            };

            let filesize = match fs::metadata(&path) {
                Ok(meta) => meta.len(),
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "skipping file that cannot be stat'ed"
                    );
                    out.unreadable.push(path);
                    continue;
                }
            };
            let message_count = match count_messages(&path, cfg) {
                Ok(count) => Some(count),
                Err(err) => {
                    tracing::error!(
                        path = %path.display(),
                        error = ?err,
                        "could not count messages"
                    );
                    out.unreadable.push(path.clone());
                    None
                }
            };

            out.files.push(ScannedFile {
                id,
                path,
                file: FileMatch {
                    filename: name,
                    folder: folder.clone(),
                    filesize,
                    message_count,
                },
            });
        }
    }
    Ok(out)
}

/// Fold scanned files into the record set in scan order.
///
/// A file for an unknown id creates an orphan record. When several files carry
/// the same id, only a strictly larger file replaces the one already attached.
pub fn integrate_files(records: &mut RecordSet, files: Vec<ScannedFile>) -> MergeStats {
    let mut stats = MergeStats::default();
    for scanned in files {
        let record = match records.entry(scanned.id) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => {
                tracing::debug!(
                    id = scanned.id,
                    path = %scanned.path.display(),
                    "file has no log entry"
                );
                let mut orphan = Record::new(scanned.id);
                orphan.file = Some(scanned.file);
                orphan.note(Anomaly::OrphanFile);
                slot.insert(orphan);
                stats.orphans += 1;
                continue;
            }
        };

        let Some(current) = record.file.as_ref() else {
            record.file = Some(scanned.file);
            stats.attached += 1;
            continue;
        };

        if scanned.file.filesize > current.filesize {
            tracing::debug!(
                id = scanned.id,
                kept = %scanned.file.filename,
                dropped = %current.filename,
                "larger duplicate replaces attached file"
            );
            record.file = Some(scanned.file);
            stats.replaced += 1;
        } else {
            tracing::debug!(
                id = scanned.id,
                kept = %current.filename,
                dropped = %scanned.file.filename,
                "smaller or equal duplicate discarded"
            );
            stats.discarded += 1;
        }
    }
    stats
}
