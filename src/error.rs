use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThortError {
    #[error("processing log unreadable at {path}: {source}")]
    LogUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("scan root not found: {0}")]
    ScanRootMissing(PathBuf),
    #[error("catalog unreadable at {path}: {source}")]
    CatalogUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("catalog malformed at {path}: {reason}")]
    CatalogMalformed { path: PathBuf, reason: String },
    #[error("config invalid or unreadable: {0}")]
    InvalidConfig(String),
}

impl ThortError {
    pub fn code(&self) -> ThortErrorCode {
        match self {
            Self::LogUnreadable { .. } => ThortErrorCode::E001LogUnreadable,
            Self::ScanRootMissing(_) => ThortErrorCode::E002ScanRootMissing,
            Self::CatalogUnreadable { .. } => ThortErrorCode::E003CatalogUnreadable,
            Self::CatalogMalformed { .. } => ThortErrorCode::E004CatalogMalformed,
            Self::InvalidConfig(_) => ThortErrorCode::E005ConfigInvalid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThortErrorCode {
    E001LogUnreadable,
    E002ScanRootMissing,
    E003CatalogUnreadable,
    E004CatalogMalformed,
    E005ConfigInvalid,
    E006WriteFailed,
    E007ScanFailed,
    E008IndexSkipped,
}

impl ThortErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::E001LogUnreadable => "E001_LOG_UNREADABLE",
            Self::E002ScanRootMissing => "E002_SCAN_ROOT_MISSING",
            Self::E003CatalogUnreadable => "E003_CATALOG_UNREADABLE",
            Self::E004CatalogMalformed => "E004_CATALOG_MALFORMED",
            Self::E005ConfigInvalid => "E005_CONFIG_INVALID",
            Self::E006WriteFailed => "E006_WRITE_FAILED",
            Self::E007ScanFailed => "E007_SCAN_FAILED",
            Self::E008IndexSkipped => "E008_INDEX_SKIPPED",
        }
    }
}
