//! PII Redactor: ordered, pattern-based detectors over the original-case text.
//!
//! Every detector reports candidate byte spans. Overlaps are resolved
//! globally: the longer span wins, equal lengths go to the detector declared
//! first. Text left between accepted spans is scanned again until no detector
//! fires, so a losing candidate cannot hide PII next to the winner. Accepted
//! spans are replaced by the detector's placeholder and reported in the
//! manifest as character offsets into the original text.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::error::AnalysisError;

const EMAIL_PATTERN: &str =
    r"(?i)\b[a-z0-9._%+-]+@[a-z0-9-]+(?:\.[a-z0-9-]+)*\.[a-z]{2,}\b";

const PHONE_PATTERN: &str =
    r"(?:\+\d{1,3}[\s.-]?)?(?:\(\d{3}\)[\s.-]?|\b\d{3}[\s.-]?)\d{3}[\s.-]?\d{4}\b";

/// Street lines never wrap; only the city line may follow a comma and a newline.
const STREET_ADDRESS_PATTERN: &str = concat!(
    r"\b\d{1,6}[ \t]+(?:[A-Z][A-Za-z0-9.'-]*[ \t]+){1,4}",
    r"(?i:street|st|avenue|ave|road|rd|boulevard|blvd|lane|ln|drive|dr|court|ct|way",
    r"|place|pl|terrace|parkway|pkwy|circle|cir|highway|hwy)\b\.?",
    r"(?:,?[ \t]+(?i:apt|apartment|suite|ste|unit)\.?[ \t]*#?[ \t]*[A-Za-z0-9-]+)?",
    r"(?:,\s*[A-Z][A-Za-z.'-]*(?:[ \t]+[A-Z][A-Za-z.'-]*)*,[ \t]*[A-Z]{2}[ \t]+\d{5}(?:-\d{4})?)?",
);

/// US SSN layout (with dashes or spaces) and bare nine-digit runs.
const NATIONAL_ID_PATTERN: &str = r"\b\d{3}[- ]\d{2}[- ]\d{4}\b|\b\d{9}\b";

const PROFILE_URL_PATTERN: &str = concat!(
    r"(?i)(?:\b(?:https?://|www\.)|\b(?:linkedin|github|gitlab)\.com/)",
    r#"[^\s<>()\[\]]*[^\s<>()\[\].,;:!?'"]"#,
);

/// Built-in detector categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiCategory {
    Email,
    Phone,
    StreetAddress,
    NationalId,
    ProfileUrl,
}

impl PiiCategory {
    /// Categories applied when the configuration does not name any.
    pub const DEFAULTS: [PiiCategory; 4] = [
        PiiCategory::Email,
        PiiCategory::Phone,
        PiiCategory::StreetAddress,
        PiiCategory::NationalId,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PiiCategory::Email => "email",
            PiiCategory::Phone => "phone",
            PiiCategory::StreetAddress => "street_address",
            PiiCategory::NationalId => "national_id",
            PiiCategory::ProfileUrl => "profile_url",
        }
    }

    pub fn placeholder(&self) -> &'static str {
        match self {
            PiiCategory::Email => "[REDACTED_EMAIL]",
            PiiCategory::Phone => "[REDACTED_PHONE]",
            PiiCategory::StreetAddress => "[REDACTED_ADDRESS]",
            PiiCategory::NationalId => "[REDACTED_ID]",
            PiiCategory::ProfileUrl => "[REDACTED_URL]",
        }
    }

    fn pattern(&self) -> &'static str {
        match self {
            PiiCategory::Email => EMAIL_PATTERN,
            PiiCategory::Phone => PHONE_PATTERN,
            PiiCategory::StreetAddress => STREET_ADDRESS_PATTERN,
            PiiCategory::NationalId => NATIONAL_ID_PATTERN,
            PiiCategory::ProfileUrl => PROFILE_URL_PATTERN,
        }
    }
}

impl fmt::Display for PiiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PiiCategory {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(PiiCategory::Email),
            "phone" => Ok(PiiCategory::Phone),
            "street_address" | "address" => Ok(PiiCategory::StreetAddress),
            "national_id" | "id_number" => Ok(PiiCategory::NationalId),
            "profile_url" | "url" => Ok(PiiCategory::ProfileUrl),
            other => Err(AnalysisError::Configuration(format!(
                "unknown PII category '{other}'"
            ))),
        }
    }
}

/// A caller-supplied detector category compiled from a regular expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomPattern {
    pub name: String,
    pub pattern: String,
}

/// One detection capability. Implementations must be deterministic.
pub trait PiiDetector: Send + Sync {
    /// Category name reported in the manifest.
    fn category(&self) -> &str;

    /// Text substituted for every span this detector claims.
    fn placeholder(&self) -> &str;

    /// Candidate byte ranges in `text`. May overlap other detectors' spans.
    fn find_spans(&self, text: &str) -> Vec<Range<usize>>;
}

/// Detector backed by a compiled [`Regex`].
#[derive(Debug, Clone)]
pub struct RegexDetector {
    category: String,
    placeholder: String,
    pattern: Regex,
}

impl RegexDetector {
    pub fn new(category: &str, placeholder: &str, pattern: &str) -> Result<Self, AnalysisError> {
        let pattern = Regex::new(pattern).map_err(|e| {
            AnalysisError::Configuration(format!("pattern for '{category}' does not compile: {e}"))
        })?;
        Ok(Self {
            category: category.to_string(),
            placeholder: placeholder.to_string(),
            pattern,
        })
    }

    pub fn builtin(category: PiiCategory) -> Result<Self, AnalysisError> {
        Self::new(category.as_str(), category.placeholder(), category.pattern())
    }

    pub fn custom(custom: &CustomPattern) -> Result<Self, AnalysisError> {
        let name = custom.name.trim().to_ascii_lowercase();
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(AnalysisError::Configuration(format!(
                "custom PII category name '{}' must be non-empty ASCII letters, digits or '_'",
                custom.name
            )));
        }
        let placeholder = format!("[REDACTED_{}]", name.to_ascii_uppercase());
        Self::new(&name, &placeholder, &custom.pattern)
    }
}

impl PiiDetector for RegexDetector {
    fn category(&self) -> &str {
        &self.category
    }

    fn placeholder(&self) -> &str {
        &self.placeholder
    }

    fn find_spans(&self, text: &str) -> Vec<Range<usize>> {
        self.pattern
            .find_iter(text)
            .filter(|m| !m.is_empty())
            .map(|m| m.range())
            .collect()
    }
}

/// One redacted span, in character offsets of the original text (end exclusive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionEntry {
    pub category: String,
    pub start: usize,
    pub end: usize,
}

/// Redaction entries sorted by `start`, never overlapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RedactionManifest(Vec<RedactionEntry>);

impl RedactionManifest {
    pub fn entries(&self) -> &[RedactionEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_entries(self) -> Vec<RedactionEntry> {
        self.0
    }
}

impl From<Vec<RedactionEntry>> for RedactionManifest {
    fn from(entries: Vec<RedactionEntry>) -> Self {
        Self(entries)
    }
}

/// Output of [`Redactor::redact`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redaction {
    pub text: String,
    pub manifest: RedactionManifest,
}

struct Candidate {
    span: Range<usize>,
    detector: usize,
}

/// Ordered detector list.
pub struct Redactor {
    detectors: Vec<Box<dyn PiiDetector>>,
}

impl fmt::Debug for Redactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.detectors.iter().map(|d| d.category()))
            .finish()
    }
}

impl Redactor {
    /// Builds a redactor from arbitrary detectors, applied in the given order.
    pub fn new(detectors: Vec<Box<dyn PiiDetector>>) -> Self {
        Self { detectors }
    }

    /// Builds the built-in categories named in `categories` (in that order)
    /// followed by `custom` patterns.
    ///
    /// Fails on unknown or repeated categories, patterns that do not compile,
    /// and patterns that match a placeholder (which would break idempotence).
    pub fn from_config(
        categories: &[String],
        custom: &[CustomPattern],
    ) -> Result<Self, AnalysisError> {
        let mut detectors: Vec<Box<dyn PiiDetector>> = Vec::new();
        for name in categories {
            let category: PiiCategory = name.parse()?;
            detectors.push(Box::new(RegexDetector::builtin(category)?));
        }
        for pattern in custom {
            detectors.push(Box::new(RegexDetector::custom(pattern)?));
        }

        for (i, detector) in detectors.iter().enumerate() {
            if detectors[..i]
                .iter()
                .any(|d| d.category() == detector.category())
            {
                return Err(AnalysisError::Configuration(format!(
                    "PII category '{}' is listed more than once",
                    detector.category()
                )));
            }
        }
        for detector in &detectors {
            for other in &detectors {
                if !detector.find_spans(other.placeholder()).is_empty() {
                    return Err(AnalysisError::Configuration(format!(
                        "pattern for '{}' matches the placeholder {}",
                        detector.category(),
                        other.placeholder()
                    )));
                }
            }
        }

        Ok(Self::new(detectors))
    }

    /// The built-in [`PiiCategory::DEFAULTS`], in that order.
    pub fn with_defaults() -> Result<Self, AnalysisError> {
        let names: Vec<String> = PiiCategory::DEFAULTS
            .iter()
            .map(|c| c.as_str().to_string())
            .collect();
        Self::from_config(&names, &[])
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.detectors.iter().map(|d| d.category())
    }

    /// Replaces every accepted PII span in `text`. Never fails.
    pub fn redact(&self, text: &str) -> Redaction {
        let mut accepted: Vec<Candidate> = Vec::new();
        let mut passes = 0;
        loop {
            passes += 1;
            let fresh = Self::resolve(self.candidates(text, &accepted));
            if fresh.is_empty() {
                break;
            }
            accepted.extend(fresh);
            accepted.sort_by_key(|c| c.span.start);
        }

        let mut redacted = String::with_capacity(text.len());
        let mut entries = Vec::with_capacity(accepted.len());
        let mut cursor = 0;
        let mut chars_before_cursor = 0;
        for Candidate { span, detector } in &accepted {
            let detector = &self.detectors[*detector];
            let start = chars_before_cursor + text[cursor..span.start].chars().count();
            let end = start + text[span.clone()].chars().count();

            redacted.push_str(&text[cursor..span.start]);
            redacted.push_str(detector.placeholder());
            entries.push(RedactionEntry {
                category: detector.category().to_string(),
                start,
                end,
            });

            cursor = span.end;
            chars_before_cursor = end;
        }
        redacted.push_str(&text[cursor..]);

        debug!(redactions = entries.len(), passes, "PII redaction complete");
        Redaction {
            text: redacted,
            manifest: RedactionManifest(entries),
        }
    }

    /// Detector hits inside the gaps between `accepted` spans (sorted by start),
    /// as byte spans of the whole text.
    fn candidates(&self, text: &str, accepted: &[Candidate]) -> Vec<Candidate> {
        let mut gaps = Vec::with_capacity(accepted.len() + 1);
        let mut cursor = 0;
        for kept in accepted {
            if cursor < kept.span.start {
                gaps.push(cursor..kept.span.start);
            }
            cursor = kept.span.end;
        }
        if cursor < text.len() {
            gaps.push(cursor..text.len());
        }

        let mut candidates = Vec::new();
        for gap in gaps {
            let slice = &text[gap.clone()];
            for (detector, d) in self.detectors.iter().enumerate() {
                // Empty or misaligned spans from external detectors are ignored.
                let spans = d.find_spans(slice).into_iter().filter(|span| {
                    span.start < span.end
                        && slice.is_char_boundary(span.start)
                        && slice.is_char_boundary(span.end)
                });
                candidates.extend(spans.map(|span| Candidate {
                    span: gap.start + span.start..gap.start + span.end,
                    detector,
                }));
            }
        }
        candidates
    }

    /// Greedily keeps non-overlapping candidates: longest first, then the
    /// detector declared first, then the earliest start.
    fn resolve(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        candidates.sort_by(|a, b| {
            b.span
                .len()
                .cmp(&a.span.len())
                .then(a.detector.cmp(&b.detector))
                .then(a.span.start.cmp(&b.span.start))
        });

        let mut accepted: Vec<Candidate> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let overlaps = accepted.iter().any(|kept| {
                candidate.span.start < kept.span.end && kept.span.start < candidate.span.end
            });
            if !overlaps {
                accepted.push(candidate);
            }
        }
        accepted
    }
}
