//! Matcher/Scorer: which job-description keywords the resume covers.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::keywords::KeywordSet;
use crate::analysis::lexicon::{Stopwords, SynonymClasses};
use crate::analysis::normalizer::{normalize_text, phrase_key, NormalizedText};

/// Keyword coverage of one resume.
///
/// `matched` and `missing` partition the keyword set and keep its order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub score: f64,
    pub matched: Vec<String>,
    pub missing: Vec<String>,
}

impl MatchResult {
    pub fn total(&self) -> usize {
        self.matched.len() + self.missing.len()
    }
}

/// `matched / total`, or 1.0 when there is nothing to match.
pub fn coverage(matched: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        matched as f64 / total as f64
    }
}

/// Human-readable band for a coverage score in `[0, 1]`.
pub fn score_label(score: f64) -> &'static str {
    if score >= 0.8 {
        "Excellent Match"
    } else if score >= 0.6 {
        "Good Match"
    } else if score >= 0.4 {
        "Fair Match"
    } else if score >= 0.2 {
        "Needs Improvement"
    } else {
        "Poor Match"
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Matcher<'a> {
    stopwords: &'a Stopwords,
    synonyms: &'a SynonymClasses,
}

impl<'a> Matcher<'a> {
    pub fn new(stopwords: &'a Stopwords, synonyms: &'a SynonymClasses) -> Self {
        Self {
            stopwords,
            synonyms,
        }
    }

    pub fn match_keywords(&self, resume: &NormalizedText, keywords: &KeywordSet) -> MatchResult {
        let keyword_keys: Vec<(&str, String, usize)> = keywords
            .terms()
            .map(|term| {
                let tokens = normalize_text(term);
                let key = self.synonyms.canonical(&phrase_key(tokens.tokens())).to_string();
                (term, key, tokens.len())
            })
            .collect();

        let longest = keyword_keys
            .iter()
            .map(|(_, _, words)| *words)
            .chain([self.synonyms.longest_phrase(), 2])
            .max()
            .unwrap_or(2);

        let resume_keys = self.ngram_keys(resume, longest);

        let mut matched = Vec::new();
        let mut missing = Vec::new();
        for (term, key, _) in keyword_keys {
            if resume_keys.contains(&key) {
                matched.push(term.to_string());
            } else {
                missing.push(term.to_string());
            }
        }

        let score = coverage(matched.len(), matched.len() + missing.len());
        debug!(
            matched = matched.len(),
            missing = missing.len(),
            "Keywords matched"
        );
        MatchResult {
            score,
            matched,
            missing,
        }
    }

    /// Canonical keys of every in-phrase n-gram of the resume up to `longest`
    /// words. N-grams never start or end on a stopword but may contain one.
    fn ngram_keys(&self, resume: &NormalizedText, longest: usize) -> HashSet<String> {
        resume
            .windows(longest, |token| self.stopwords.contains(token))
            .into_iter()
            .map(|window| {
                let key = phrase_key(window.tokens);
                self.synonyms.canonical(&key).to_string()
            })
            .collect()
    }
}
