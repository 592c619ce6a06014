use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::{score_label, AnalysisConfig, Report};
use crate::errors::AppError;
use crate::routes::upload::{resolve_format, UploadForm};
use crate::routes::{run_blocking, select_analyzer};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeTextRequest {
    pub resume_text: String,
    pub job_description: String,
    #[serde(default)]
    pub config: Option<AnalysisConfig>,
}

/// A report plus the label for its score band.
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    #[serde(flatten)]
    pub report: Report,
    pub score_label: &'static str,
}

impl From<Report> for AnalyzeResponse {
    fn from(report: Report) -> Self {
        let score_label = score_label(report.score());
        Self {
            report,
            score_label,
        }
    }
}

fn log_report(report: &Report) {
    info!(
        score = report.score(),
        label = score_label(report.score()),
        matched = report.matched_keywords().len(),
        missing = report.missing_keywords().len(),
        redactions = report.redactions().len(),
        "Analysis complete"
    );
}

/// POST /api/v1/analyze
/// Multipart fields: `file`, `job_description`, optional `format` and `config` (JSON).
pub async fn handle_analyze_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let mut form = UploadForm::read(multipart).await?;
    let file = form.take_file()?;
    let job_description = form
        .field("job_description")
        .ok_or_else(|| AppError::Validation("Missing multipart field 'job_description'".into()))?
        .to_string();
    let config = form
        .field("config")
        .filter(|raw| !raw.trim().is_empty())
        .map(AnalysisConfig::from_json)
        .transpose()?;

    let format = resolve_format(form.field("format"), &file)?;
    let analyzer = select_analyzer(&state, config.as_ref())?;

    let report = run_blocking(state.config.analysis_timeout, move || {
        analyzer.analyze(&file.bytes, format, &job_description)
    })
    .await?;

    log_report(&report);
    Ok(Json(report.into()))
}

/// POST /api/v1/analyze/text
pub async fn handle_analyze_text(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeTextRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let analyzer = select_analyzer(&state, req.config.as_ref())?;

    let report = run_blocking(state.config.analysis_timeout, move || {
        analyzer.analyze_text(&req.resume_text, &req.job_description)
    })
    .await?;

    log_report(&report);
    Ok(Json(report.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Analyzer;

    #[test]
    fn test_response_adds_score_label_to_report_fields() {
        let analyzer = Analyzer::new(&AnalysisConfig::default()).unwrap();
        let report = analyzer
            .analyze_text("Python and Docker", "Python, Docker, Kubernetes")
            .unwrap();

        let value = serde_json::to_value(AnalyzeResponse::from(report)).unwrap();
        assert_eq!(value["score_label"], "Good Match");
        assert_eq!(value["matched_keywords"], serde_json::json!(["python", "docker"]));
        assert!(value.get("redacted_resume_text").is_some());
        assert!(value.get("report").is_none());
    }
}
