use crate::corpus::log_parser::DuplicateStanzaPolicy;
use crate::error::ThortError;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it",
    "its", "of", "on", "that", "the", "to", "was", "were", "will", "with",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub folders: Vec<String>,
    pub prompt_marker: String,
    pub response_marker: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            folders: ["consolidated", "Long", "Short", "rescraped"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            prompt_marker: "## PROMPT ##".to_string(),
            response_marker: "## RESPONSE ##".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LogConfig {
    #[serde(default)]
    pub duplicate_stanza_policy: DuplicateStanzaPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkOrderConfig {
    pub automation_mode: String,
    pub delay_seconds: u64,
}

impl Default for WorkOrderConfig {
    fn default() -> Self {
        Self {
            automation_mode: "hybrid".to_string(),
            delay_seconds: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_min_token_chars")]
    pub min_token_chars: usize,
    #[serde(default = "default_stop_words")]
    pub stop_words: Vec<String>,
}

fn default_min_token_chars() -> usize {
    2
}

fn default_stop_words() -> Vec<String> {
    DEFAULT_STOP_WORDS.iter().map(|s| s.to_string()).collect()
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            min_token_chars: default_min_token_chars(),
            stop_words: default_stop_words(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CorpusConfig {
    pub scan: ScanConfig,
    pub log: LogConfig,
    pub work_order: WorkOrderConfig,
    pub index: IndexConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialCorpusConfig {
    scan: Option<ScanConfig>,
    log: Option<LogConfig>,
    work_order: Option<WorkOrderConfig>,
    index: Option<IndexConfig>,
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_usize(var: &str, fallback: usize) -> usize {
    match env::var(var) {
        Ok(v) => v.trim().parse::<usize>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn env_or_csv(var: &str, fallback: &[String]) -> Vec<String> {
    match env::var(var) {
        Ok(v) => {
            let out = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect::<Vec<_>>();
            if out.is_empty() {
                fallback.to_vec()
            } else {
                out
            }
        }
        Err(_) => fallback.to_vec(),
    }
}

fn env_or_policy(var: &str, fallback: DuplicateStanzaPolicy) -> DuplicateStanzaPolicy {
    match env::var(var) {
        Ok(v) => v.trim().parse().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

pub fn validate(cfg: &CorpusConfig) -> Result<()> {
    let invalid = |msg: &str| anyhow!(ThortError::InvalidConfig(msg.to_string()));

    if cfg.scan.folders.is_empty() {
        return Err(invalid("scan folders cannot be empty"));
    }
    for folder in &cfg.scan.folders {
        if folder.trim().is_empty() || folder.contains('/') || folder.contains('\\') {
            return Err(invalid(&format!(
                "invalid scan folder `{folder}`: use a plain subdirectory name"
            )));
        }
    }
    if cfg.scan.prompt_marker.is_empty() || cfg.scan.response_marker.is_empty() {
        return Err(invalid("message markers cannot be empty"));
    }
    if cfg.work_order.automation_mode.trim().is_empty() {
        return Err(invalid("work order automation mode cannot be empty"));
    }
    if cfg.index.min_token_chars == 0 {
        return Err(invalid("index min token chars must be >= 1"));
    }
    Ok(())
}

pub fn resolve_config_path(home: &Path) -> PathBuf {
    if let Ok(custom) = env::var("THORT_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    home.join("thortstream.toml")
}

fn merge_file_config(base: &mut CorpusConfig, path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let parsed: PartialCorpusConfig = toml::from_str(&raw).map_err(|err| {
        anyhow!(ThortError::InvalidConfig(format!(
            "failed to parse {}: {err}",
            path.display()
        )))
    })?;
    if let Some(scan) = parsed.scan {
        base.scan = scan;
    }
    if let Some(log) = parsed.log {
        base.log = log;
    }
    if let Some(work_order) = parsed.work_order {
        base.work_order = work_order;
    }
    if let Some(index) = parsed.index {
        base.index = index;
    }
    Ok(())
}

fn apply_env_overrides(cfg: &mut CorpusConfig) {
    cfg.scan.folders = env_or_csv("THORT_SCAN_FOLDERS", &cfg.scan.folders);
    cfg.scan.prompt_marker = env_or_string("THORT_PROMPT_MARKER", &cfg.scan.prompt_marker);
    cfg.scan.response_marker = env_or_string("THORT_RESPONSE_MARKER", &cfg.scan.response_marker);
    cfg.log.duplicate_stanza_policy = env_or_policy(
        "THORT_DUPLICATE_STANZA_POLICY",
        cfg.log.duplicate_stanza_policy,
    );
    cfg.work_order.automation_mode =
        env_or_string("THORT_AUTOMATION_MODE", &cfg.work_order.automation_mode);
    cfg.work_order.delay_seconds =
        env_or_u64("THORT_DELAY_SECONDS", cfg.work_order.delay_seconds);
    cfg.index.min_token_chars = env_or_usize("THORT_MIN_TOKEN_CHARS", cfg.index.min_token_chars);
    cfg.index.stop_words = env_or_csv("THORT_STOP_WORDS", &cfg.index.stop_words);
}

pub fn load_config(home: &Path) -> Result<CorpusConfig> {
    let mut cfg = CorpusConfig::default();
    merge_file_config(&mut cfg, &resolve_config_path(home))?;
    apply_env_overrides(&mut cfg);
    validate(&cfg)?;
    Ok(cfg)
}
