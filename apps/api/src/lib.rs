//! ATS Shield: resume screening against a job description with PII redaction.
//!
//! The [`analysis`] module is the synchronous, deterministic core. The
//! remaining modules wrap it in an Axum HTTP service.

pub mod analysis;
pub mod config;
pub mod errors;
pub mod routes;
pub mod state;

pub use analysis::{analyze, AnalysisConfig, AnalysisError, Analyzer, DocumentFormat, Report};
