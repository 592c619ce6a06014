use std::time::Duration;

use anyhow::{Context, Result};

use crate::analysis::AnalysisConfig;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_ANALYSIS_TIMEOUT_SECS: u64 = 30;

/// Application configuration loaded from environment variables.
/// Every variable is optional; invalid values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub max_upload_bytes: usize,
    pub analysis_timeout: Duration,
    /// Server-wide default, overridable per request.
    pub analysis: AnalysisConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            rust_log: "info".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            analysis_timeout: Duration::from_secs(DEFAULT_ANALYSIS_TIMEOUT_SECS),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let analysis = match std::env::var("ATS_ANALYSIS_CONFIG") {
            Ok(path) => load_analysis_config(&path)?,
            Err(_) => AnalysisConfig::default(),
        };

        Ok(Config {
            port: parse_env("PORT", 8080).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            max_upload_bytes: parse_env("ATS_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)
                .context("ATS_MAX_UPLOAD_BYTES must be a byte count")?,
            analysis_timeout: Duration::from_secs(
                parse_env("ATS_ANALYSIS_TIMEOUT_SECS", DEFAULT_ANALYSIS_TIMEOUT_SECS)
                    .context("ATS_ANALYSIS_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            analysis,
        })
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Invalid value '{raw}' for '{key}'")),
        Err(_) => Ok(default),
    }
}

fn load_analysis_config(path: &str) -> Result<AnalysisConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read analysis config '{path}'"))?;
    let config = AnalysisConfig::from_json(&raw)
        .with_context(|| format!("Failed to parse analysis config '{path}'"))?;
    config
        .validate()
        .with_context(|| format!("Invalid analysis config '{path}'"))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_parse_env_falls_back_to_default() {
        let value: u64 = parse_env("ATS_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_missing_analysis_config_file_fails() {
        let err = load_analysis_config("/nonexistent/ats-config.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/ats-config.json"));
    }

    #[test]
    fn test_analysis_config_file_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"keyword_frequency_threshold": 2}}"#).unwrap();
        let config = load_analysis_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.keyword_frequency_threshold, 2);
    }

    #[test]
    fn test_invalid_analysis_config_file_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"keyword_frequency_threshold": 0}}"#).unwrap();
        assert!(load_analysis_config(file.path().to_str().unwrap()).is_err());
    }
}
