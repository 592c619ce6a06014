pub mod analyze;
pub mod health;
pub mod sanitize;
pub mod scan;
pub mod upload;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::analysis::{AnalysisConfig, AnalysisError, Analyzer};
use crate::errors::AppError;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/analyze", post(analyze::handle_analyze_upload))
        .route("/api/v1/analyze/text", post(analyze::handle_analyze_text))
        .route("/api/v1/sanitize", post(sanitize::handle_sanitize))
        .route("/api/v1/scan/hidden-text", post(scan::handle_scan_hidden_text))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// The server's analyzer, or one compiled from a per-request override.
pub(crate) fn select_analyzer(
    state: &AppState,
    config: Option<&AnalysisConfig>,
) -> Result<Arc<Analyzer>, AppError> {
    match config {
        Some(config) => Ok(Arc::new(Analyzer::new(config)?)),
        None => Ok(Arc::clone(&state.analyzer)),
    }
}

/// Runs CPU-bound pipeline work on the blocking pool under a wall-clock limit.
///
/// On timeout the blocking task is detached; its result is dropped when it finishes.
pub(crate) async fn run_blocking<T, F>(limit: Duration, job: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AnalysisError> + Send + 'static,
    T: Send + 'static,
{
    let task = tokio::task::spawn_blocking(job);
    match tokio::time::timeout(limit, task).await {
        Ok(Ok(result)) => Ok(result?),
        Ok(Err(join_error)) => Err(AppError::Internal(
            anyhow::Error::new(join_error).context("Analysis task aborted"),
        )),
        Err(_) => Err(AppError::Timeout(limit.as_secs())),
    }
}
