//! Keyword Extractor: frequency-ranked unigrams and bigrams from a job description.
//!
//! Inflections of one term are counted together (`api`, `APIs`) and reported
//! under the first spelling seen. Terms keep the order of their first
//! occurrence so results are reproducible.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::lexicon::{Stopwords, Vocabulary};
use crate::analysis::normalizer::{phrase_key, NormalizedText};

/// Bigrams need at least this many occurrences unless the vocabulary names them.
const MIN_BIGRAM_FREQUENCY: u32 = 2;

/// A normalized keyword and its importance weight (frequency in the job description).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    term: String,
    weight: u32,
}

impl Keyword {
    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }
}

/// Unique, non-empty, normalized keywords in first-occurrence order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordSet {
    keywords: Vec<Keyword>,
}

impl KeywordSet {
    /// Builds a set from caller-supplied terms with weight 1.
    ///
    /// Terms are lowercased, trimmed and whitespace-collapsed; blanks and
    /// duplicates are dropped.
    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for term in terms {
            let normalized = normalize_term(term.as_ref());
            if !normalized.is_empty() && !set.contains(&normalized) {
                set.keywords.push(Keyword {
                    term: normalized,
                    weight: 1,
                });
            }
        }
        set
    }

    pub fn iter(&self) -> impl Iterator<Item = &Keyword> {
        self.keywords.iter()
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(|k| k.term.as_str())
    }

    pub fn contains(&self, term: &str) -> bool {
        self.keywords.iter().any(|k| k.term == term)
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

fn normalize_term(term: &str) -> String {
    term.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_numeric(token: &str) -> bool {
    token
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '#'))
}

struct Tally {
    surface: String,
    words: usize,
    frequency: u32,
    first_seen: usize,
}

/// Extraction settings borrowed from the analyzer.
#[derive(Debug, Clone, Copy)]
pub struct KeywordExtractor<'a> {
    stopwords: &'a Stopwords,
    frequency_threshold: u32,
}

impl<'a> KeywordExtractor<'a> {
    pub fn new(stopwords: &'a Stopwords, frequency_threshold: u32) -> Self {
        Self {
            stopwords,
            frequency_threshold,
        }
    }

    /// Keeps unigrams seen at least `frequency_threshold` times, bigrams seen at
    /// least `max(frequency_threshold, 2)` times, and any vocabulary term that
    /// occurs at all.
    pub fn extract(&self, text: &NormalizedText, vocabulary: Option<&Vocabulary>) -> KeywordSet {
        let skip = |token: &str| {
            if self.stopwords.contains(token) || is_numeric(token) {
                return true;
            }
            // Single letters are noise unless the vocabulary names them ("r", "c").
            token.chars().count() < 2 && !vocabulary.is_some_and(|v| v.contains_key(token))
        };
        let longest = vocabulary.map_or(0, Vocabulary::longest_phrase).max(2);
        let windows = text.windows(longest, skip);
        let mut tallies: HashMap<String, Tally> = HashMap::new();
        let mut seen = 0usize;

        for window in &windows {
            let key = phrase_key(window.tokens);
            // Only vocabulary terms may carry a stopword ("ruby on rails").
            if window.bridged && !vocabulary.is_some_and(|v| v.contains_key(&key)) {
                continue;
            }
            let tally = tallies.entry(key).or_insert_with(|| {
                seen += 1;
                Tally {
                    surface: window.tokens.join(" "),
                    words: window.tokens.len(),
                    frequency: 0,
                    first_seen: seen,
                }
            });
            tally.frequency += 1;
        }

        let unigram_min = self.frequency_threshold;
        let bigram_min = self.frequency_threshold.max(MIN_BIGRAM_FREQUENCY);
        let mut kept: Vec<(String, Tally)> = tallies
            .into_iter()
            .filter(|(key, tally)| {
                let in_vocabulary = vocabulary.is_some_and(|v| v.contains_key(key));
                in_vocabulary
                    || match tally.words {
                        1 => tally.frequency >= unigram_min,
                        2 => tally.frequency >= bigram_min,
                        _ => false,
                    }
            })
            .collect();
        kept.sort_by_key(|(_, tally)| tally.first_seen);

        let mut set = KeywordSet::default();
        for (_, tally) in kept {
            // Two stems can share a surface spelling; the first one wins.
            if !set.contains(&tally.surface) {
                set.keywords.push(Keyword {
                    term: tally.surface,
                    weight: tally.frequency,
                });
            }
        }

        debug!(
            windows = windows.len(),
            keywords = set.len(),
            "Keywords extracted"
        );
        set
    }
}
