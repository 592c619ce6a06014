use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::analysis::{scan_hidden_text, AnalysisError, DocumentFormat, HiddenTextFlag};
use crate::errors::AppError;
use crate::routes::run_blocking;
use crate::routes::upload::{resolve_format, UploadForm};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HiddenTextResponse {
    pub hidden_text_detected: bool,
    pub flags: Vec<HiddenTextFlag>,
}

/// POST /api/v1/scan/hidden-text
/// Multipart field `file` (PDF). Uploads without a recognizable type are tried as PDF.
pub async fn handle_scan_hidden_text(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<HiddenTextResponse>, AppError> {
    let mut form = UploadForm::read(multipart).await?;
    let file = form.take_file()?;

    if let Ok(format) = resolve_format(None, &file) {
        if format != DocumentFormat::Pdf {
            return Err(AnalysisError::UnsupportedFormat(format!(
                "hidden text scanning needs a PDF, got {format}"
            ))
            .into());
        }
    }

    let flags = run_blocking(state.config.analysis_timeout, move || {
        scan_hidden_text(&file.bytes)
    })
    .await?;

    info!(flags = flags.len(), "Hidden text scan complete");
    Ok(Json(HiddenTextResponse {
        hidden_text_detected: !flags.is_empty(),
        flags,
    }))
}
