use std::sync::Arc;

use anyhow::Context;

use crate::analysis::Analyzer;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Compiled from `config.analysis`; used unless a request carries its own config.
    pub analyzer: Arc<Analyzer>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let analyzer =
            Analyzer::new(&config.analysis).context("Default analysis config rejected")?;
        Ok(Self {
            config,
            analyzer: Arc::new(analyzer),
        })
    }
}
