use crate::corpus::record::{ChatId, Classification, LogEntry};
use crate::error::ThortError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub const CANVAS_MARKER: &str = "[DEBUG] Canvas closed.";

const HEADER_START: &str = "--- Analyzing Chat #";

/// Split `text` at every stanza header so a header whose result line is
/// missing cannot borrow the result of the stanza after it.
fn header_segments(text: &str) -> Vec<&str> {
    let starts: Vec<usize> = text.match_indices(HEADER_START).map(|(at, _)| at).collect();
    starts
        .iter()
        .enumerate()
        .map(|(n, &start)| {
            let end = starts.get(n + 1).copied().unwrap_or(text.len());
            &text[start..end]
        })
        .collect()
}

/// What to do when the log carries more than one stanza for the same id.
///
/// No anomaly is raised either way; shadowed ids are only reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateStanzaPolicy {
    #[default]
    LastOccurrenceWins,
    FirstOccurrenceWins,
}

impl DuplicateStanzaPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LastOccurrenceWins => "last-occurrence-wins",
            Self::FirstOccurrenceWins => "first-occurrence-wins",
        }
    }
}

impl FromStr for DuplicateStanzaPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "last-occurrence-wins" | "last" => Ok(Self::LastOccurrenceWins),
            "first-occurrence-wins" | "first" => Ok(Self::FirstOccurrenceWins),
            other => Err(format!(
                "invalid duplicate stanza policy '{other}', expected last-occurrence-wins or first-occurrence-wins"
            )),
        }
    }
}

/// One header/result stanza lifted out of the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogStanza {
    pub id: ChatId,
    pub entry: LogEntry,
}

/// A grammar that recognizes stanzas in raw log text, in log order.
pub trait LogGrammar {
    fn stanzas(&self, text: &str) -> Vec<LogStanza>;
}

/// The analysis log grammar:
///
/// ```text
/// --- Analyzing Chat #12: 'Some title' ---
/// [DEBUG] Canvas closed.
/// [RESULT] LONG chat detected (14 messages)
/// ```
///
/// The debug line is optional. The result line must follow the header, or
/// the debug line, directly.
pub struct AnalysisLogGrammar {
    pattern: Regex,
}

impl AnalysisLogGrammar {
    pub fn new() -> Result<Self, regex::Error> {
        let pattern = Regex::new(concat!(
            r"(?s)--- Analyzing Chat #(\d+).*?'(.*?)'.*?---\s*\n",
            r"(?:\[DEBUG\] Canvas closed\.\s*\n)?",
            r"\[RESULT\] (LONG|SHORT) chat detected \((\d+) messages\)",
        ))?;
        Ok(Self { pattern })
    }
}

impl LogGrammar for AnalysisLogGrammar {
    fn stanzas(&self, text: &str) -> Vec<LogStanza> {
        let mut out = Vec::new();
        for segment in header_segments(text) {
            let Some(caps) = self.pattern.captures(segment) else {
                tracing::debug!(
                    header = segment.lines().next().unwrap_or_default(),
                    "header without a result line"
                );
                continue;
            };
            let (Ok(id), Ok(message_count), Ok(classification)) = (
                caps[1].parse::<ChatId>(),
                caps[4].parse::<u32>(),
                caps[3].parse::<Classification>(),
            ) else {
                tracing::warn!(stanza = &caps[0], "skipping log stanza with unparseable numbers");
                continue;
            };
            out.push(LogStanza {
                id,
                entry: LogEntry {
                    title: caps[2].to_string(),
                    message_count,
                    classification,
                    canvas_used: caps[0].contains(CANVAS_MARKER),
                },
            });
        }
        out
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogParseOutcome {
    pub entries: BTreeMap<ChatId, LogEntry>,
    /// Ids that appeared in more than one stanza.
    pub duplicate_ids: Vec<ChatId>,
}

pub fn parse_log(
    text: &str,
    grammar: &dyn LogGrammar,
    policy: DuplicateStanzaPolicy,
) -> LogParseOutcome {
    let mut out = LogParseOutcome::default();
    for stanza in grammar.stanzas(text) {
        if out.entries.contains_key(&stanza.id) {
            out.duplicate_ids.push(stanza.id);
            if policy == DuplicateStanzaPolicy::FirstOccurrenceWins {
                continue;
            }
        }
        out.entries.insert(stanza.id, stanza.entry);
    }
    out.duplicate_ids.sort_unstable();
    out.duplicate_ids.dedup();
    out
}

pub fn read_log(path: &Path) -> Result<String, ThortError> {
    let bytes = fs::read(path).map_err(|source| ThortError::LogUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = "\
--- Analyzing Chat #12: 'Rust lifetimes' ---
[DEBUG] Canvas closed.
[RESULT] LONG chat detected (14 messages)
noise between stanzas
--- Analyzing Chat #3: 'Quick question' ---
[RESULT] SHORT chat detected (2 messages)
";

    fn parse(text: &str, policy: DuplicateStanzaPolicy) -> LogParseOutcome {
        let grammar = AnalysisLogGrammar::new().expect("grammar");
        parse_log(text, &grammar, policy)
    }

    #[test]
    fn extracts_every_stanza() {
        let out = parse(SAMPLE, DuplicateStanzaPolicy::default());
        assert_eq!(out.entries.len(), 2);

        let long = &out.entries[&12];
        assert_eq!(long.title, "Rust lifetimes");
        assert_eq!(long.message_count, 14);
        assert_eq!(long.classification, Classification::Long);
        assert!(long.canvas_used);

        let short = &out.entries[&3];
        assert_eq!(short.classification, Classification::Short);
        assert!(!short.canvas_used);
        assert!(out.duplicate_ids.is_empty());
    }

    #[test]
    fn leading_zeros_collapse_to_numeric_id() {
        let text = "--- Analyzing Chat #007: 'Test' ---\n[RESULT] LONG chat detected (5 messages)\n";
        let out = parse(text, DuplicateStanzaPolicy::default());
        assert_eq!(out.entries[&7].title, "Test");
        assert_eq!(out.entries[&7].message_count, 5);
    }

    #[test]
    fn header_tolerates_text_between_number_and_title() {
        let text = "--- Analyzing Chat #9 (retry 2) titled 'Odd one' now ---\n[RESULT] SHORT chat detected (1 messages)";
        let out = parse(text, DuplicateStanzaPolicy::default());
        assert_eq!(out.entries[&9].title, "Odd one");
    }

    #[test]
    fn duplicate_stanzas_follow_policy() {
        let text = "\
--- Analyzing Chat #5: 'First' ---
[RESULT] SHORT chat detected (2 messages)
--- Analyzing Chat #5: 'Second' ---
[RESULT] LONG chat detected (40 messages)
";
        let last = parse(text, DuplicateStanzaPolicy::LastOccurrenceWins);
        assert_eq!(last.entries[&5].title, "Second");
        assert_eq!(last.duplicate_ids, vec![5]);

        let first = parse(text, DuplicateStanzaPolicy::FirstOccurrenceWins);
        assert_eq!(first.entries[&5].title, "First");
    }

    #[test]
    fn result_separated_from_header_is_not_attributed() {
        let text = "\
--- Analyzing Chat #4: 'Interrupted' ---
[ERROR] page failed to load
[RESULT] LONG chat detected (30 messages)
--- Analyzing Chat #5: 'Fine' ---
[RESULT] SHORT chat detected (2 messages)
";
        let out = parse(text, DuplicateStanzaPolicy::default());
        assert!(!out.entries.contains_key(&4));
        assert_eq!(out.entries[&5].title, "Fine");
        assert_eq!(out.entries[&5].classification, Classification::Short);
    }

    #[test]
    fn header_without_result_does_not_take_the_next_result() {
        let text = "\
--- Analyzing Chat #6: 'Stalled' ---
--- Analyzing Chat #7: 'Done' ---
[RESULT] LONG chat detected (12 messages)
";
        let out = parse(text, DuplicateStanzaPolicy::default());
        assert_eq!(out.entries.keys().copied().collect::<Vec<_>>(), vec![7]);
        assert_eq!(out.entries[&7].title, "Done");
    }

    #[test]
    fn text_without_stanzas_yields_nothing() {
        let out = parse("[INFO] nothing to see\n", DuplicateStanzaPolicy::default());
        assert!(out.entries.is_empty());
    }

    #[test]
    fn unreadable_log_is_reported() {
        let tmp = tempdir().expect("tempdir");
        let err = read_log(&tmp.path().join("absent.txt")).expect_err("missing log");
        assert!(matches!(err, ThortError::LogUnreadable { .. }));
    }

    #[test]
    fn policy_parses_short_and_long_forms() {
        assert_eq!(
            "first".parse::<DuplicateStanzaPolicy>(),
            Ok(DuplicateStanzaPolicy::FirstOccurrenceWins)
        );
        assert_eq!(
            "last-occurrence-wins".parse::<DuplicateStanzaPolicy>(),
            Ok(DuplicateStanzaPolicy::LastOccurrenceWins)
        );
        assert!("newest".parse::<DuplicateStanzaPolicy>().is_err());
    }
}
