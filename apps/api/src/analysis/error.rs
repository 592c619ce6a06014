use thiserror::Error;

/// Why a binary document could not be turned into text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionFailure {
    #[error("document is corrupt: {0}")]
    Corrupt(String),

    #[error("document is encrypted")]
    Encrypted,

    #[error("parser aborted while reading the document")]
    Panicked,
}

/// Typed failure of the analysis pipeline.
///
/// Loader and extraction errors are terminal for a request; nothing here is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("document is empty")]
    EmptyDocument,

    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("could not extract text: {0}")]
    Extraction(#[from] ExtractionFailure),

    #[error("invalid analysis configuration: {0}")]
    Configuration(String),

    #[error("internal consistency violation: {0}")]
    InternalConsistency(String),
}

impl AnalysisError {
    /// Stable, machine-readable category for callers that render errors.
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::EmptyDocument => "EMPTY_DOCUMENT",
            AnalysisError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            AnalysisError::Extraction(_) => "EXTRACTION_ERROR",
            AnalysisError::Configuration(_) => "CONFIGURATION_ERROR",
            AnalysisError::InternalConsistency(_) => "INTERNAL_CONSISTENCY_ERROR",
        }
    }
}
