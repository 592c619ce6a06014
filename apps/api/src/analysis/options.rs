use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::analysis::error::AnalysisError;
use crate::analysis::lexicon::{default_stopwords, default_synonyms, default_vocabulary};
use crate::analysis::redactor::{CustomPattern, PiiCategory};

/// Caller-tunable analysis settings. Every field is optional in JSON; missing
/// fields take the built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub stopwords: BTreeSet<String>,
    /// Built-in PII categories, applied in this order.
    pub pii_categories: Vec<String>,
    /// Extra regex categories, applied after the built-in ones.
    pub custom_patterns: Vec<CustomPattern>,
    /// `canonical -> aliases`.
    pub synonym_table: BTreeMap<String, BTreeSet<String>>,
    pub keyword_frequency_threshold: u32,
    pub vocabulary: BTreeSet<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            stopwords: default_stopwords(),
            pii_categories: PiiCategory::DEFAULTS
                .iter()
                .map(|c| c.as_str().to_string())
                .collect(),
            custom_patterns: Vec::new(),
            synonym_table: default_synonyms(),
            keyword_frequency_threshold: 1,
            vocabulary: default_vocabulary(),
        }
    }
}

impl AnalysisConfig {
    /// Parses a JSON document, reporting malformed input as a configuration error.
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        serde_json::from_str(json)
            .map_err(|e| AnalysisError::Configuration(format!("malformed analysis config: {e}")))
    }

    /// Checks the fields that are not validated by compiling them.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.keyword_frequency_threshold == 0 {
            return Err(AnalysisError::Configuration(
                "keyword_frequency_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
