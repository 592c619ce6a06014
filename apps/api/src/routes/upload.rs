use std::collections::HashMap;

use axum::extract::Multipart;
use bytes::Bytes;

use crate::analysis::{AnalysisError, DocumentFormat};
use crate::errors::AppError;

/// Content type browsers send when they do not know better.
const GENERIC_CONTENT_TYPE: &str = "application/octet-stream";

/// The `file` part of a multipart upload.
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// A multipart form: the `file` part plus every other text field by name.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if name == "file" {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                form.file = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes,
                });
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    pub fn take_file(&mut self) -> Result<UploadedFile, AppError> {
        self.file
            .take()
            .ok_or_else(|| AppError::Validation("Missing multipart field 'file'".to_string()))
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Picks the document format: an explicit declaration wins, then the part's
/// content type, then the file name's extension.
pub fn resolve_format(
    declared: Option<&str>,
    file: &UploadedFile,
) -> Result<DocumentFormat, AnalysisError> {
    if let Some(declared) = declared {
        return declared.parse();
    }

    let content_type = file
        .content_type
        .as_deref()
        .filter(|ct| !ct.trim().eq_ignore_ascii_case(GENERIC_CONTENT_TYPE));
    if let Some(format) = content_type.and_then(|ct| ct.parse().ok()) {
        return Ok(format);
    }
    if let Some(format) = file.file_name.as_deref().and_then(DocumentFormat::from_filename) {
        return Ok(format);
    }

    let hint = content_type
        .or(file.file_name.as_deref())
        .unwrap_or("unknown");
    Err(AnalysisError::UnsupportedFormat(hint.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(file_name: Option<&str>, content_type: Option<&str>) -> UploadedFile {
        UploadedFile {
            file_name: file_name.map(str::to_string),
            content_type: content_type.map(str::to_string),
            bytes: Bytes::new(),
        }
    }

    #[test]
    fn test_declared_format_wins() {
        let upload = file(Some("resume.pdf"), Some("application/pdf"));
        assert_eq!(
            resolve_format(Some("docx"), &upload).unwrap(),
            DocumentFormat::Docx
        );
    }

    #[test]
    fn test_content_type_then_extension() {
        let upload = file(Some("resume.docx"), Some("application/pdf"));
        assert_eq!(resolve_format(None, &upload).unwrap(), DocumentFormat::Pdf);

        let upload = file(Some("resume.docx"), Some("application/octet-stream"));
        assert_eq!(resolve_format(None, &upload).unwrap(), DocumentFormat::Docx);

        let upload = file(Some("resume.txt"), None);
        assert_eq!(resolve_format(None, &upload).unwrap(), DocumentFormat::Text);
    }

    #[test]
    fn test_unknown_format_is_unsupported() {
        let upload = file(Some("resume.rtf"), Some("application/rtf"));
        assert_eq!(
            resolve_format(None, &upload).unwrap_err(),
            AnalysisError::UnsupportedFormat("application/rtf".to_string())
        );
        assert!(resolve_format(Some("odt"), &file(None, None)).is_err());
    }
}
