//! Pure free-text content filter.
//!
//! `classify` normalizes input (lowercasing, punctuation stripping,
//! leetspeak collapsing) and matches it against a configured blocklist.
//! It is deterministic and side-effect-free so the same check can run on
//! the submitting client and again over imported data.

use serde::{Deserialize, Serialize};

/// How a blocklist term is matched against normalized input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Match whole normalized words only. Avoids false positives on
    /// innocuous substrings ("hello" does not match "hell").
    #[default]
    WholeWord,
    /// Match anywhere in the text with whitespace removed. Catches
    /// obfuscations like "d a r n".
    Substring,
}

/// One blocklist entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEntry {
    /// The term, stored in normalized form.
    pub term: String,
    #[serde(default)]
    pub mode: MatchMode,
}

impl BlockEntry {
    pub fn new(term: impl Into<String>, mode: MatchMode) -> Self {
        Self {
            term: normalize(&term.into()).replace(' ', ""),
            mode,
        }
    }
}

/// Classification verdict for a piece of free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Accepted,
    Rejected { reason: String },
}

impl Classification {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Classification::Accepted)
    }
}

/// A configured blocklist filter.
#[derive(Debug, Clone)]
pub struct ProfanityFilter {
    entries: Vec<BlockEntry>,
}

impl ProfanityFilter {
    /// Build a filter from explicit entries.
    pub fn new(entries: Vec<BlockEntry>) -> Self {
        Self { entries }
    }

    /// Build a filter where every term uses the same match mode.
    pub fn with_terms(terms: &[&str], mode: MatchMode) -> Self {
        Self {
            entries: terms.iter().map(|t| BlockEntry::new(*t, mode)).collect(),
        }
    }

    /// An empty filter that accepts everything.
    pub fn permissive() -> Self {
        Self { entries: vec![] }
    }

    /// Add entries on top of the existing list.
    pub fn extend(&mut self, entries: impl IntoIterator<Item = BlockEntry>) {
        self.entries.extend(entries);
    }

    /// Classify a piece of free text.
    pub fn classify(&self, text: &str) -> Classification {
        let normalized = normalize(text);
        let collapsed: String = normalized.chars().filter(|c| *c != ' ').collect();

        for entry in &self.entries {
            let hit = match entry.mode {
                MatchMode::WholeWord => normalized
                    .split(' ')
                    .any(|word| word == entry.term),
                MatchMode::Substring => collapsed.contains(entry.term.as_str()),
            };
            if hit {
                return Classification::Rejected {
                    reason: format!("matched blocked term '{}'", entry.term),
                };
            }
        }

        Classification::Accepted
    }
}

impl Default for ProfanityFilter {
    /// A small builtin blocklist of mild terms, suitable for an
    /// educational game. Deployments extend it via configuration.
    fn default() -> Self {
        Self::new(vec![
            BlockEntry::new("damn", MatchMode::Substring),
            BlockEntry::new("hell", MatchMode::WholeWord),
            BlockEntry::new("crap", MatchMode::WholeWord),
            BlockEntry::new("stupid", MatchMode::WholeWord),
            BlockEntry::new("idiot", MatchMode::Substring),
        ])
    }
}

/// Lowercase, collapse leetspeak digits/symbols to letters, strip
/// punctuation, and collapse whitespace runs to single spaces.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = true;

    for c in text.chars() {
        let mapped = match c {
            '0' => Some('o'),
            '1' | '!' | '|' => Some('i'),
            '3' => Some('e'),
            '4' | '@' => Some('a'),
            '5' | '$' => Some('s'),
            '7' => Some('t'),
            _ if c.is_alphanumeric() => Some(c.to_ascii_lowercase()),
            _ => None,
        };

        match mapped {
            Some(c) => {
                out.push(c);
                last_was_space = false;
            }
            None => {
                // Punctuation and whitespace both act as word breaks.
                if !last_was_space {
                    out.push(' ');
                    last_was_space = true;
                }
            }
        }
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_clean_text() {
        let filter = ProfanityFilter::default();
        assert!(filter.classify("the quick brown fox").is_accepted());
    }

    #[test]
    fn rejects_blocked_word() {
        let filter = ProfanityFilter::default();
        assert!(!filter.classify("what the hell").is_accepted());
    }

    #[test]
    fn whole_word_mode_avoids_false_positives() {
        let filter = ProfanityFilter::default();
        // "hell" is blocked whole-word; "hello" must pass.
        assert!(filter.classify("hello there").is_accepted());
    }

    #[test]
    fn leetspeak_is_collapsed() {
        let filter = ProfanityFilter::default();
        assert!(!filter.classify("d4mn").is_accepted());
        assert!(!filter.classify("D@MN").is_accepted());
    }

    #[test]
    fn punctuation_does_not_hide_terms() {
        let filter = ProfanityFilter::default();
        assert!(!filter.classify("d.a.m.n").is_accepted());
    }

    #[test]
    fn substring_mode_catches_embedded_terms() {
        let filter = ProfanityFilter::default();
        // "idiot" is a substring entry.
        assert!(!filter.classify("you idiotic goose").is_accepted());
        assert!(!filter.classify("i d i o t").is_accepted());
    }

    #[test]
    fn rejection_carries_reason() {
        let filter = ProfanityFilter::with_terms(&["darn"], MatchMode::WholeWord);
        match filter.classify("darn it") {
            Classification::Rejected { reason } => assert!(reason.contains("darn")),
            Classification::Accepted => panic!("expected rejection"),
        }
    }

    #[test]
    fn classification_is_deterministic() {
        let filter = ProfanityFilter::default();
        assert_eq!(filter.classify("h3ll no"), filter.classify("h3ll no"));
    }

    #[test]
    fn permissive_filter_accepts_everything() {
        let filter = ProfanityFilter::permissive();
        assert!(filter.classify("damn hell crap").is_accepted());
    }

    #[test]
    fn normalize_examples() {
        assert_eq!(normalize("He11o,   World?"), "heiio world");
        assert_eq!(normalize("  CAT  "), "cat");
    }
}
