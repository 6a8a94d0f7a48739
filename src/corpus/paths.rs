use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct CorpusPaths {
    pub home: PathBuf,
    pub catalog_path: PathBuf,
    pub log_path: PathBuf,
    pub chats_dir: PathBuf,
    pub report_path: PathBuf,
    pub work_order_path: PathBuf,
    pub relocation_plan_path: PathBuf,
    pub site_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl CorpusPaths {
    /// Lay out every input and output under `home` using the default project
    /// structure.
    pub fn under(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            catalog_path: home.join("data/metadata/chats.json"),
            log_path: home.join("output/logs/chatAnalysis.txt"),
            chats_dir: home.join("data/allchats"),
            report_path: home.join("output/reports/chat_analysis_report.csv"),
            work_order_path: home.join("output/configs/rescraping_config.json"),
            relocation_plan_path: home.join("output/reports/misplaced_files_report.txt"),
            site_dir: home.join("public"),
            logs_dir: home.join("output/logs"),
            home,
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.site_dir.join("database.json")
    }

    pub fn word_index_path(&self) -> PathBuf {
        self.site_dir.join("search_index_word.json")
    }

    pub fn full_text_index_path(&self) -> PathBuf {
        self.site_dir.join("search_index_full_text.json")
    }
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_home() -> Result<PathBuf> {
    let cwd = env::current_dir().context("current directory could not be resolved")?;
    Ok(env_or_default_path("THORT_HOME", cwd))
}

pub fn resolve_paths() -> Result<CorpusPaths> {
    let defaults = CorpusPaths::under(resolve_home()?);

    Ok(CorpusPaths {
        catalog_path: env_or_default_path("THORT_CATALOG_PATH", defaults.catalog_path),
        log_path: env_or_default_path("THORT_LOG_PATH", defaults.log_path),
        chats_dir: env_or_default_path("THORT_CHATS_DIR", defaults.chats_dir),
        report_path: env_or_default_path("THORT_REPORT_PATH", defaults.report_path),
        work_order_path: env_or_default_path("THORT_WORK_ORDER_PATH", defaults.work_order_path),
        relocation_plan_path: env_or_default_path(
            "THORT_RELOCATION_PLAN_PATH",
            defaults.relocation_plan_path,
        ),
        site_dir: env_or_default_path("THORT_SITE_DIR", defaults.site_dir),
        logs_dir: env_or_default_path("THORT_LOGS_DIR", defaults.logs_dir),
        home: defaults.home,
    })
}
