//! Report Builder: the only value that leaves the pipeline.

use serde::{Deserialize, Serialize};

use crate::analysis::error::AnalysisError;
use crate::analysis::matcher::{coverage, MatchResult};
use crate::analysis::redactor::{RedactionEntry, RedactionManifest};

const SCORE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    score: f64,
    matched_keywords: Vec<String>,
    missing_keywords: Vec<String>,
    redacted_resume_text: String,
    redactions: Vec<RedactionEntry>,
}

impl Report {
    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn matched_keywords(&self) -> &[String] {
        &self.matched_keywords
    }

    pub fn missing_keywords(&self) -> &[String] {
        &self.missing_keywords
    }

    pub fn redacted_resume_text(&self) -> &str {
        &self.redacted_resume_text
    }

    pub fn redactions(&self) -> &[RedactionEntry] {
        &self.redactions
    }
}

fn violation(message: impl Into<String>) -> AnalysisError {
    AnalysisError::InternalConsistency(message.into())
}

/// Checks that entries are sorted, disjoint and inside `original_len` characters.
pub fn check_manifest(manifest: &RedactionManifest, original_len: usize) -> Result<(), AnalysisError> {
    let mut previous_end = 0;
    for entry in manifest.entries() {
        if entry.start >= entry.end {
            return Err(violation(format!(
                "redaction {}..{} is empty or reversed",
                entry.start, entry.end
            )));
        }
        if entry.start < previous_end {
            return Err(violation(format!(
                "redaction at {} overlaps or precedes the previous entry",
                entry.start
            )));
        }
        if entry.end > original_len {
            return Err(violation(format!(
                "redaction end {} exceeds text length {original_len}",
                entry.end
            )));
        }
        previous_end = entry.end;
    }
    Ok(())
}

fn check_match(result: &MatchResult) -> Result<(), AnalysisError> {
    if let Some(both) = result.matched.iter().find(|k| result.missing.contains(k)) {
        return Err(violation(format!(
            "keyword '{both}' is both matched and missing"
        )));
    }
    if !(0.0..=1.0).contains(&result.score) {
        return Err(violation(format!("score {} is outside [0, 1]", result.score)));
    }
    let expected = coverage(result.matched.len(), result.total());
    if (result.score - expected).abs() > SCORE_TOLERANCE {
        return Err(violation(format!(
            "score {} does not equal {}/{}",
            result.score,
            result.matched.len(),
            result.total()
        )));
    }
    Ok(())
}

/// Assembles a [`Report`] after validating both inputs.
pub fn build(
    manifest: RedactionManifest,
    result: MatchResult,
    redacted_text: String,
    original_len: usize,
) -> Result<Report, AnalysisError> {
    check_manifest(&manifest, original_len)?;
    check_match(&result)?;

    Ok(Report {
        score: result.score,
        matched_keywords: result.matched,
        missing_keywords: result.missing,
        redacted_resume_text: redacted_text,
        redactions: manifest.into_entries(),
    })
}
