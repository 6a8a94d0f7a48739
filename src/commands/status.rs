use anyhow::Result;
use std::env;
use std::path::Path;

use crate::commands::CommandReport;
use crate::corpus::config::{load_config, resolve_config_path};
use crate::corpus::paths::resolve_paths;
use crate::error::ThortErrorCode;

include!(concat!(env!("OUT_DIR"), "/thort_env_allowlist.rs"));

const ENV_PREFIX: &str = "THORT_";

/// `THORT_*` names that no part of the binary reads, sorted.
fn unknown_env_keys(keys: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = keys
        .into_iter()
        .filter(|key| key.starts_with(ENV_PREFIX))
        .filter(|key| !GENERATED_THORT_ENV_ALLOWLIST.contains(&key.as_str()))
        .collect();
    out.sort();
    out
}

fn describe_path(report: &mut CommandReport, label: &str, path: &Path) {
    report.detail(format!(
        "{label}={} exists={}",
        path.display(),
        path.exists()
    ));
}

pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("status");

    report.detail(format!("build_uuid={}", env!("BUILD_UUID")));
    report.detail(format!("home={}", paths.home.display()));

    describe_path(&mut report, "log_path", &paths.log_path);
    describe_path(&mut report, "chats_dir", &paths.chats_dir);
    describe_path(&mut report, "catalog_path", &paths.catalog_path);
    describe_path(&mut report, "report_path", &paths.report_path);
    describe_path(&mut report, "work_order_path", &paths.work_order_path);
    describe_path(&mut report, "relocation_plan_path", &paths.relocation_plan_path);
    describe_path(&mut report, "site_dir", &paths.site_dir);
    describe_path(&mut report, "logs_dir", &paths.logs_dir);

    if !paths.log_path.is_file() {
        report.issue(format!(
            "{}: missing processing log ({}); reconcile will abort",
            ThortErrorCode::E001LogUnreadable.as_str(),
            paths.log_path.display()
        ));
    }
    if !paths.chats_dir.is_dir() {
        report.issue(format!(
            "{}: missing scan root ({})",
            ThortErrorCode::E002ScanRootMissing.as_str(),
            paths.chats_dir.display()
        ));
    }
    if !paths.catalog_path.is_file() {
        report.issue(format!(
            "{}: missing catalog ({})",
            ThortErrorCode::E003CatalogUnreadable.as_str(),
            paths.catalog_path.display()
        ));
    }

    describe_path(&mut report, "config_path", &resolve_config_path(&paths.home));
    match load_config(&paths.home) {
        Ok(cfg) => {
            report.detail(format!("scan.folders={}", cfg.scan.folders.join(",")));
            report.detail(format!(
                "log.duplicate_stanza_policy={}",
                cfg.log.duplicate_stanza_policy.as_str()
            ));
            report.detail(format!(
                "work_order.automation_mode={} work_order.delay_seconds={}",
                cfg.work_order.automation_mode, cfg.work_order.delay_seconds
            ));
            report.detail(format!(
                "index.min_token_chars={} index.stop_words={}",
                cfg.index.min_token_chars,
                cfg.index.stop_words.len()
            ));
        }
        Err(err) => report.issue(format!(
            "{}: {err:#}",
            ThortErrorCode::E005ConfigInvalid.as_str()
        )),
    }

    let set_keys = env::vars_os().filter_map(|(key, _)| key.into_string().ok());
    for key in unknown_env_keys(set_keys) {
        report.issue(format!("unknown env var {key}; thortstream never reads it"));
    }

    Ok(report)
}
