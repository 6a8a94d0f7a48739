use crate::corpus::index::{DatabaseEntry, Tokenizer};
use crate::corpus::paths::CorpusPaths;
use crate::corpus::record::ChatId;
use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    Tokens,
    Phrase,
}

impl QueryMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tokens => "tokens",
            Self::Phrase => "phrase",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: ChatId,
    pub title: String,
    pub msg_count: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub query: String,
    pub mode: QueryMode,
    pub hits: Vec<SearchHit>,
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| {
        format!(
            "failed to read {}; run `thortstream index` first",
            path.display()
        )
    })?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

/// Ids whose content holds every index token of `query`, ascending.
///
/// A query made only of stop words or short fragments matches nothing.
pub fn match_tokens(
    word_index: &BTreeMap<String, Vec<ChatId>>,
    tokenizer: &Tokenizer,
    query: &str,
) -> Vec<ChatId> {
    let tokens = tokenizer.tokens(&query.to_lowercase());
    let mut acc: Option<BTreeSet<ChatId>> = None;
    for token in &tokens {
        let ids: BTreeSet<ChatId> = word_index
            .get(token)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();
        acc = Some(match acc {
            None => ids,
            Some(prev) => prev.intersection(&ids).copied().collect(),
        });
    }
    acc.map(|ids| ids.into_iter().collect()).unwrap_or_default()
}

/// Ids whose lowercased content contains `phrase` verbatim, ascending.
pub fn match_phrase(full_text: &BTreeMap<ChatId, String>, phrase: &str) -> Vec<ChatId> {
    let needle = phrase.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    full_text
        .iter()
        .filter(|(_, text)| text.contains(&needle))
        .map(|(id, _)| *id)
        .collect()
}

pub fn search(
    paths: &CorpusPaths,
    tokenizer: &Tokenizer,
    query: &str,
    mode: QueryMode,
) -> Result<SearchResult> {
    let ids = match mode {
        QueryMode::Tokens => {
            let word_index: BTreeMap<String, Vec<ChatId>> = load_json(&paths.word_index_path())?;
            match_tokens(&word_index, tokenizer, query)
        }
        QueryMode::Phrase => {
            let full_text: BTreeMap<ChatId, String> = load_json(&paths.full_text_index_path())?;
            match_phrase(&full_text, query)
        }
    };

    let database: BTreeMap<ChatId, DatabaseEntry> = if paths.database_path().exists() {
        load_json(&paths.database_path())?
    } else {
        BTreeMap::new()
    };

    let hits = ids
        .into_iter()
        .map(|id| match database.get(&id) {
            Some(entry) => SearchHit {
                id,
                title: entry.title.clone(),
                msg_count: Some(entry.msg_count),
            },
            None => SearchHit {
                id,
                title: String::new(),
                msg_count: None,
            },
        })
        .collect();

    Ok(SearchResult {
        query: query.to_string(),
        mode,
        hits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::config::IndexConfig;
    use crate::corpus::index::{IndexDocument, build_index, write_index};
    use tempfile::tempdir;

    fn tokenizer() -> Tokenizer {
        Tokenizer::new(&IndexConfig::default()).expect("tokenizer")
    }

    fn index_of(pairs: &[(ChatId, &str)]) -> BTreeMap<String, Vec<ChatId>> {
        let mut out: BTreeMap<String, Vec<ChatId>> = BTreeMap::new();
        for (id, tokens) in pairs {
            for token in tokens.split_whitespace() {
                out.entry(token.to_string()).or_default().push(*id);
            }
        }
        out
    }

    #[test]
    fn every_query_token_must_match() {
        let index = index_of(&[(1, "rust borrow"), (2, "rust"), (3, "borrow")]);
        assert_eq!(match_tokens(&index, &tokenizer(), "Rust borrow"), vec![1]);
        assert_eq!(match_tokens(&index, &tokenizer(), "rust"), vec![1, 2]);
        assert!(match_tokens(&index, &tokenizer(), "rust python").is_empty());
    }

    #[test]
    fn stop_word_only_query_matches_nothing() {
        let index = index_of(&[(1, "rust")]);
        assert!(match_tokens(&index, &tokenizer(), "the of a").is_empty());
    }

    #[test]
    fn phrase_matches_case_insensitively() {
        let full_text = BTreeMap::from([
            (1, "the borrow checker said no".to_string()),
            (2, "borrow the checker".to_string()),
        ]);
        assert_eq!(match_phrase(&full_text, "Borrow Checker"), vec![1]);
        assert!(match_phrase(&full_text, "  ").is_empty());
    }

    #[test]
    fn search_reads_written_index_and_attaches_titles() {
        let tmp = tempdir().expect("tempdir");
        let paths = CorpusPaths::under(tmp.path());
        let path = tmp.path().join("1_a.txt");
        fs::write(&path, "Lifetimes and borrowing").expect("write");
        let docs = vec![IndexDocument {
            id: 1,
            title: "Lifetimes".to_string(),
            message_count: 2,
            filesize: 23,
            path,
        }];
        write_index(&build_index(&docs, &tokenizer()), &paths).expect("write index");

        let out = search(&paths, &tokenizer(), "borrowing", QueryMode::Tokens).expect("search");
        assert_eq!(out.hits.len(), 1);
        assert_eq!(out.hits[0].title, "Lifetimes");
        assert_eq!(out.hits[0].msg_count, Some(2));
    }

    #[test]
    fn search_without_index_explains_what_to_run() {
        let tmp = tempdir().expect("tempdir");
        let paths = CorpusPaths::under(tmp.path());
        let err = search(&paths, &tokenizer(), "x", QueryMode::Tokens).expect_err("no index");
        assert!(format!("{err:#}").contains("thortstream index"));
    }
}
