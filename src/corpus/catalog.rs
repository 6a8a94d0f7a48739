use crate::corpus::record::{Anomaly, ChatId, RecordSet};
use crate::error::ThortError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub type Catalog = BTreeMap<ChatId, String>;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogId {
    Number(u64),
    Text(String),
}

impl CatalogId {
    fn coerce(&self) -> Option<ChatId> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(raw) => raw.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    id: CatalogId,
    title: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichStats {
    pub titled: usize,
    pub missing_metadata: usize,
}

pub fn parse_catalog(raw: &str, path: &Path) -> Result<Catalog, ThortError> {
    let malformed = |reason: String| ThortError::CatalogMalformed {
        path: path.to_path_buf(),
        reason,
    };

    let entries: Vec<CatalogEntry> =
        serde_json::from_str(raw).map_err(|err| malformed(err.to_string()))?;

    let mut out = Catalog::new();
    for (position, entry) in entries.into_iter().enumerate() {
        let id = entry
            .id
            .coerce()
            .ok_or_else(|| malformed(format!("entry {position} has a non-numeric id")))?;
        if out.insert(id, entry.title).is_some() {
            tracing::warn!(id, path = %path.display(), "duplicate catalog id; keeping last entry");
        }
    }
    Ok(out)
}

pub fn load_catalog(path: &Path) -> Result<Catalog, ThortError> {
    let raw = fs::read_to_string(path).map_err(|source| ThortError::CatalogUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    parse_catalog(&raw, path)
}

/// Attach catalog titles to existing records.
///
/// The catalog never creates records. A non-orphan record absent from the
/// catalog is noted as missing metadata.
pub fn enrich_from_catalog(records: &mut RecordSet, catalog: &Catalog) -> EnrichStats {
    let mut stats = EnrichStats::default();
    for (id, record) in records.iter_mut() {
        if let Some(title) = catalog.get(id) {
            record.catalog_title = Some(title.clone());
            stats.titled += 1;
        } else if !record.is_orphan() {
            record.note(Anomaly::MissingMetadata { id: *id });
            stats.missing_metadata += 1;
        }
    }
    stats
}
