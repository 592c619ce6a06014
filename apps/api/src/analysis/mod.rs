//! Resume analysis pipeline.
//!
//! `bytes + job description -> Loader -> Normalizer -> {Redactor, Extractor + Matcher} -> Report`
//!
//! An [`Analyzer`] is compiled once from an [`AnalysisConfig`] and is immutable
//! afterwards, so one instance can serve concurrent requests behind an `Arc`.

pub mod error;
pub mod hidden_text;
pub mod keywords;
pub mod lexicon;
pub mod loader;
pub mod matcher;
pub mod normalizer;
pub mod options;
pub mod redactor;
pub mod report;

use tracing::debug;

pub use error::{AnalysisError, ExtractionFailure};
pub use hidden_text::{scan_hidden_text, HiddenTextFlag};
pub use keywords::{Keyword, KeywordExtractor, KeywordSet};
pub use loader::{Document, DocumentFormat, Loader};
pub use matcher::{score_label, MatchResult, Matcher};
pub use options::AnalysisConfig;
pub use redactor::{
    CustomPattern, PiiCategory, PiiDetector, Redaction, RedactionEntry, RedactionManifest,
    Redactor,
};
pub use report::Report;

use lexicon::{Stopwords, SynonymClasses, Vocabulary};
use normalizer::{normalize, normalize_text};

/// Compiled, immutable form of an [`AnalysisConfig`].
#[derive(Debug)]
pub struct Analyzer {
    stopwords: Stopwords,
    synonyms: SynonymClasses,
    vocabulary: Vocabulary,
    frequency_threshold: u32,
    redactor: Redactor,
}

impl Analyzer {
    /// Compiles `config`. All configuration errors surface here, before any
    /// document is read.
    pub fn new(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        let redactor = Redactor::from_config(&config.pii_categories, &config.custom_patterns)?;

        Ok(Self {
            stopwords: Stopwords::new(&config.stopwords),
            synonyms: SynonymClasses::new(&config.synonym_table),
            vocabulary: Vocabulary::new(&config.vocabulary),
            frequency_threshold: config.keyword_frequency_threshold,
            redactor,
        })
    }

    pub fn redactor(&self) -> &Redactor {
        &self.redactor
    }

    /// Loads `bytes` as `format` and analyzes it against `job_description`.
    pub fn analyze(
        &self,
        bytes: &[u8],
        format: DocumentFormat,
        job_description: &str,
    ) -> Result<Report, AnalysisError> {
        let document = Loader::new(format).load(bytes)?;
        self.analyze_document(&document, job_description)
    }

    /// Analyzes resume text that has already been extracted.
    pub fn analyze_text(&self, resume_text: &str, job_description: &str) -> Result<Report, AnalysisError> {
        let document = loader::from_text(resume_text)?;
        self.analyze_document(&document, job_description)
    }

    pub fn analyze_document(
        &self,
        document: &Document,
        job_description: &str,
    ) -> Result<Report, AnalysisError> {
        let resume = normalize(document);
        let redaction = self.redactor.redact(document.text());

        let job = normalize_text(job_description);
        let vocabulary = (!self.vocabulary.is_empty()).then_some(&self.vocabulary);
        let keywords = self.extract_keywords(&job, vocabulary);
        let result = Matcher::new(&self.stopwords, &self.synonyms).match_keywords(&resume, &keywords);

        debug!(
            format = %document.format(),
            resume_tokens = resume.len(),
            job_tokens = job.len(),
            redactions = redaction.manifest.len(),
            keywords = keywords.len(),
            "Analysis stages complete"
        );

        report::build(
            redaction.manifest,
            result,
            redaction.text,
            document.text().chars().count(),
        )
    }

    /// Keyword set of a job description under this analyzer's settings.
    pub fn keywords(&self, job_description: &str) -> KeywordSet {
        let vocabulary = (!self.vocabulary.is_empty()).then_some(&self.vocabulary);
        self.extract_keywords(&normalize_text(job_description), vocabulary)
    }

    fn extract_keywords(
        &self,
        job: &normalizer::NormalizedText,
        vocabulary: Option<&Vocabulary>,
    ) -> KeywordSet {
        KeywordExtractor::new(&self.stopwords, self.frequency_threshold).extract(job, vocabulary)
    }
}

/// One-shot entry point: compiles `config` and runs the whole pipeline.
pub fn analyze(
    bytes: &[u8],
    format: DocumentFormat,
    job_description: &str,
    config: &AnalysisConfig,
) -> Result<Report, AnalysisError> {
    Analyzer::new(config)?.analyze(bytes, format, job_description)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::loader::fixtures::{docx_with_paragraphs, pdf_with_lines};

    fn analyzer() -> Analyzer {
        Analyzer::new(&AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn test_skill_overlap_scenario() {
        let report = analyze(
            b"5 years Python and Docker experience",
            DocumentFormat::Text,
            "Python, Docker, Kubernetes",
            &AnalysisConfig::default(),
        )
        .unwrap();
        assert_eq!(report.matched_keywords(), ["python", "docker"]);
        assert_eq!(report.missing_keywords(), ["kubernetes"]);
        assert!((report.score() - 0.667).abs() < 0.001);
    }

    #[test]
    fn test_contact_details_are_redacted() {
        let report = analyzer()
            .analyze_text("Contact: jane@example.com, 555-123-4567", "Rust")
            .unwrap();
        let text = report.redacted_resume_text();
        assert!(!text.contains("jane@example.com"));
        assert!(!text.contains("555-123-4567"));
        let categories: Vec<&str> = report
            .redactions()
            .iter()
            .map(|e| e.category.as_str())
            .collect();
        assert_eq!(categories, vec!["email", "phone"]);
    }

    #[test]
    fn test_empty_upload_produces_no_report() {
        let err = analyzer()
            .analyze(b"", DocumentFormat::Pdf, "Rust")
            .unwrap_err();
        assert_eq!(err, AnalysisError::EmptyDocument);
    }

    #[test]
    fn test_empty_job_description_scores_one() {
        let report = analyzer().analyze_text("Rust developer", "").unwrap();
        assert_eq!(report.score(), 1.0);
        assert!(report.matched_keywords().is_empty());
        assert!(report.missing_keywords().is_empty());
    }

    #[test]
    fn test_pdf_and_docx_resumes() {
        let analyzer = analyzer();
        let jd = "Rust, Kubernetes";

        let pdf = pdf_with_lines(&[("Rust engineer running k8s clusters", false)]);
        let report = analyzer.analyze(&pdf, DocumentFormat::Pdf, jd).unwrap();
        assert_eq!(report.score(), 1.0);

        let docx = docx_with_paragraphs(&["Rust engineer", "Contact: jane@example.com"]);
        let report = analyzer.analyze(&docx, DocumentFormat::Docx, jd).unwrap();
        assert_eq!(report.matched_keywords(), ["rust"]);
        assert_eq!(report.redactions().len(), 1);
    }

    #[test]
    fn test_configuration_errors_surface_before_loading() {
        let config = AnalysisConfig {
            pii_categories: vec!["fingerprint".to_string()],
            ..AnalysisConfig::default()
        };
        let err = analyze(b"", DocumentFormat::Text, "", &config).unwrap_err();
        assert_eq!(err.code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_custom_synonyms_and_vocabulary() {
        let config = AnalysisConfig::from_json(
            r#"{"synonym_table": {"site reliability engineering": ["sre"]},
                "vocabulary": ["site reliability engineering"]}"#,
        )
        .unwrap();
        let analyzer = Analyzer::new(&config).unwrap();
        let keywords = analyzer.keywords("Site reliability engineering is core to this job.");
        assert!(keywords.contains("site reliability engineering"));

        let report = analyzer
            .analyze_text("Five years as an SRE", "Site reliability engineering")
            .unwrap();
        assert_eq!(report.matched_keywords(), ["site reliability engineering"]);
    }

    #[test]
    fn test_default_vocabulary_phrases_with_stopwords() {
        let keywords = analyzer().keywords("Ruby on Rails, infrastructure as code");
        assert!(keywords.contains("ruby on rails"));
        assert!(keywords.contains("infrastructure as code"));

        let report = analyzer()
            .analyze_text("Maintained Ruby on Rails monoliths", "Ruby on Rails")
            .unwrap();
        assert!(report.matched_keywords().iter().any(|k| k == "ruby on rails"));
        assert!(report.missing_keywords().is_empty());
    }

    #[test]
    fn test_phrase_wrapped_by_extraction_still_matches() {
        let report = analyzer()
            .analyze_text(
                "Data scientist at Acme, applying machine\nlearning to fraud",
                "Machine learning",
            )
            .unwrap();
        assert!(report.matched_keywords().iter().any(|k| k == "machine learning"));
        assert!(report.missing_keywords().is_empty());
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let analyzer = analyzer();
        let resume = "Jane Doe, 12 Main Street. Python, SQL, distributed systems.";
        let jd = "Python and SQL. Distributed systems, distributed systems!";
        let first = analyzer.analyze_text(resume, jd).unwrap();
        let second = analyzer.analyze_text(resume, jd).unwrap();
        assert_eq!(first, second);
    }
}
