use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::analysis::RedactionEntry;
use crate::errors::AppError;
use crate::routes::run_blocking;
use crate::state::AppState;

const MIN_RESUME_CHARS: usize = 10;
const STATUS_MASKED: &str = "PII_MASKED_SUCCESSFULLY";

#[derive(Debug, Deserialize)]
pub struct SanitizeRequest {
    pub resume_text: String,
}

#[derive(Debug, Serialize)]
pub struct SanitizeResponse {
    /// SHA-256 of the submitted text; identifies the submission without storing it.
    pub session_id: String,
    pub sanitized_content: String,
    pub redactions: Vec<RedactionEntry>,
    pub status: &'static str,
}

pub fn session_id(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

/// POST /api/v1/sanitize
/// Redacts PII with the server's default detectors; no keyword analysis.
pub async fn handle_sanitize(
    State(state): State<AppState>,
    Json(req): Json<SanitizeRequest>,
) -> Result<Json<SanitizeResponse>, AppError> {
    if req.resume_text.trim().chars().count() < MIN_RESUME_CHARS {
        return Err(AppError::Validation(format!(
            "resume_text must contain at least {MIN_RESUME_CHARS} characters"
        )));
    }

    let session_id = session_id(&req.resume_text);
    let analyzer = state.analyzer.clone();
    let redaction = run_blocking(state.config.analysis_timeout, move || {
        Ok(analyzer.redactor().redact(&req.resume_text))
    })
    .await?;

    info!(redactions = redaction.manifest.len(), "Resume sanitized");
    Ok(Json(SanitizeResponse {
        session_id,
        sanitized_content: redaction.text,
        redactions: redaction.manifest.into_entries(),
        status: STATUS_MASKED,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_is_sha256_hex() {
        assert_eq!(
            session_id("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
