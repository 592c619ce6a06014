//! Word lists used by extraction and matching: stopwords, synonym classes and
//! the curated skill vocabulary. Defaults live here; callers override them
//! through `AnalysisConfig`.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::analysis::normalizer::{normalize_text, phrase_key};

/// Common English function words plus job-posting boilerplate that would
/// otherwise dominate every keyword set.
pub const DEFAULT_STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "all", "also", "am", "an", "and", "any", "are", "as", "at",
    "be", "been", "being", "both", "but", "by", "can", "could", "did", "do", "does", "each",
    "etc", "every", "for", "from", "had", "has", "have", "he", "her", "his", "how", "i", "if",
    "in", "into", "is", "it", "its", "just", "may", "me", "more", "most", "must", "my", "no",
    "not", "of", "on", "or", "other", "our", "ours", "out", "over", "own", "per", "same", "she",
    "should", "so", "some", "such", "than", "that", "the", "their", "them", "then", "there",
    "these", "they", "this", "those", "through", "to", "too", "under", "up", "us", "very",
    "was", "we", "well", "were", "what", "when", "where", "which", "while", "who", "whom",
    "why", "will", "with", "within", "would", "you", "your", "yours",
    // job-posting boilerplate
    "ability", "able", "candidate", "candidates", "company", "excellent", "experience",
    "experienced", "familiarity", "good", "great", "ideal", "including", "join", "knowledge",
    "looking", "new", "nice", "plus", "preferred", "proficiency", "proficient", "required",
    "requirement", "requirements", "responsibilities", "role", "skills", "strong", "team",
    "understanding", "using", "work", "working", "year", "years",
];

/// Alias groups as `canonical -> aliases`.
pub const DEFAULT_SYNONYMS: &[(&str, &[&str])] = &[
    ("javascript", &["js", "ecmascript"]),
    ("typescript", &["ts"]),
    ("kubernetes", &["k8s"]),
    ("postgresql", &["postgres", "psql"]),
    ("golang", &["go"]),
    ("python", &["py", "python3"]),
    ("node.js", &["node", "nodejs"]),
    ("react", &["react.js", "reactjs"]),
    ("machine learning", &["ml"]),
    ("artificial intelligence", &["ai"]),
    ("natural language processing", &["nlp"]),
    ("amazon web services", &["aws"]),
    ("google cloud platform", &["gcp", "google cloud"]),
    ("microsoft azure", &["azure"]),
    ("continuous integration", &["ci"]),
    ("continuous delivery", &["cd", "continuous deployment"]),
    ("user experience", &["ux"]),
    ("user interface", &["ui"]),
    ("c#", &["csharp", "c sharp"]),
    ("c++", &["cpp"]),
];

/// Skills kept from a job description even when they occur only once.
pub const DEFAULT_VOCABULARY: &[&str] = &[
    "machine learning", "deep learning", "data science", "data engineering",
    "distributed systems", "system design", "computer vision", "natural language processing",
    "amazon web services", "google cloud platform", "microsoft azure", "spring boot",
    "ruby on rails", "react native", "unit testing", "integration testing", "test automation",
    "continuous integration", "continuous delivery", "infrastructure as code",
    "project management", "product management", "agile", "scrum", "rest api", "graphql",
    "microservices", "event driven", "message queues", "data modeling", "data pipelines",
    "etl", "sql", "nosql", "rust", "python", "java", "kotlin", "swift", "go", "golang",
    "javascript", "typescript", "c++", "c#", "scala", "terraform", "ansible", "docker",
    "kubernetes", "kafka", "spark", "hadoop", "airflow", "pytorch", "tensorflow",
    "postgresql", "mysql", "mongodb", "redis", "elasticsearch", "linux", "git",
];

pub fn default_stopwords() -> BTreeSet<String> {
    DEFAULT_STOPWORDS.iter().map(|w| w.to_string()).collect()
}

pub fn default_synonyms() -> BTreeMap<String, BTreeSet<String>> {
    DEFAULT_SYNONYMS
        .iter()
        .map(|(canonical, aliases)| {
            (
                canonical.to_string(),
                aliases.iter().map(|a| a.to_string()).collect(),
            )
        })
        .collect()
}

pub fn default_vocabulary() -> BTreeSet<String> {
    DEFAULT_VOCABULARY.iter().map(|w| w.to_string()).collect()
}

/// Tokenizes a configured phrase and returns its comparison key and word count.
fn configured_key(phrase: &str) -> Option<(String, usize)> {
    let normalized = normalize_text(phrase);
    if normalized.is_empty() {
        return None;
    }
    Some((phrase_key(normalized.tokens()), normalized.len()))
}

/// Lowercased stopword set.
#[derive(Debug, Clone, Default)]
pub struct Stopwords(HashSet<String>);

impl Stopwords {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        )
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }
}

/// Equivalence classes built from a synonym table, keyed by stemmed phrase.
///
/// When an alias is listed under two canonical terms, the first group in
/// canonical (sorted) order claims it.
#[derive(Debug, Clone, Default)]
pub struct SynonymClasses {
    classes: HashMap<String, String>,
    longest_phrase: usize,
}

impl SynonymClasses {
    pub fn new(table: &BTreeMap<String, BTreeSet<String>>) -> Self {
        let mut classes = HashMap::new();
        let mut longest_phrase = 0;

        for (canonical, aliases) in table {
            let Some((class, words)) = configured_key(canonical) else {
                continue;
            };
            longest_phrase = longest_phrase.max(words);
            classes.entry(class.clone()).or_insert_with(|| class.clone());

            for alias in aliases {
                if let Some((key, words)) = configured_key(alias) {
                    longest_phrase = longest_phrase.max(words);
                    classes.entry(key).or_insert_with(|| class.clone());
                }
            }
        }

        Self {
            classes,
            longest_phrase,
        }
    }

    /// Maps a stemmed phrase key to its class representative.
    pub fn canonical<'a>(&'a self, key: &'a str) -> &'a str {
        self.classes.get(key).map(String::as_str).unwrap_or(key)
    }

    /// Word count of the longest phrase in any class.
    pub fn longest_phrase(&self) -> usize {
        self.longest_phrase
    }
}

/// Curated skill terms, keyed by stemmed phrase.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    keys: HashSet<String>,
    longest_phrase: usize,
}

impl Vocabulary {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut keys = HashSet::new();
        let mut longest_phrase = 0;
        for term in terms {
            if let Some((key, words)) = configured_key(term.as_ref()) {
                longest_phrase = longest_phrase.max(words);
                keys.insert(key);
            }
        }
        Self {
            keys,
            longest_phrase,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn longest_phrase(&self) -> usize {
        self.longest_phrase
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
