use anyhow::{Context, Result};

use crate::commands::CommandReport;
use crate::corpus::config::load_config;
use crate::corpus::index::Tokenizer;
use crate::corpus::paths::resolve_paths;
use crate::corpus::record::NOT_AVAILABLE;
use crate::corpus::search::{QueryMode, search};

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub query: String,
    pub phrase: bool,
}

pub fn run(options: SearchOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config(&paths.home)?;
    let tokenizer = Tokenizer::new(&cfg.index).context("failed to compile index tokenizer")?;
    let mode = if options.phrase {
        QueryMode::Phrase
    } else {
        QueryMode::Tokens
    };

    let result = search(&paths, &tokenizer, &options.query, mode)?;
    let mut report = CommandReport::new("search");
    report.detail(format!("query={}", result.query));
    report.detail(format!("mode={}", result.mode.as_str()));
    report.detail(format!("hits={}", result.hits.len()));
    for hit in &result.hits {
        let count = hit
            .msg_count
            .map(|c| c.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        report.detail(format!(
            "hit id={} msgs={count} title={}",
            hit.id, hit.title
        ));
    }
    Ok(report)
}
