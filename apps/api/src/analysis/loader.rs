//! Document Loader: turns an uploaded byte buffer into plain text.
//!
//! Format dispatch is resolved once, when a [`Loader`] is built for a declared
//! [`DocumentFormat`]. Each format variant carries its own [`ExtractText`]
//! implementation; third-party parser panics are contained and reported as
//! [`ExtractionFailure::Panicked`].

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;

use docx_rs::{
    DocumentChild, Paragraph, ParagraphChild, RunChild, TableCellContent, TableChild,
    TableRowChild,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::analysis::error::{AnalysisError, ExtractionFailure};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
/// Compound File Binary header. Password-protected OOXML documents are wrapped in one.
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const ZIP_MAGIC: &[u8] = b"PK";

/// The formats the loader can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Text,
    Pdf,
    Docx,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Text => "text",
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
        }
    }

    /// Resolves a format from a file name's extension (`resume.pdf` -> `Pdf`).
    pub fn from_filename(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        ext.parse().ok()
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentFormat {
    type Err = AnalysisError;

    /// Accepts short names, extensions (with or without the dot) and MIME types.
    fn from_str(declared: &str) -> Result<Self, Self::Err> {
        let normalized = declared.trim().trim_start_matches('.').to_ascii_lowercase();
        // MIME parameters such as "; charset=utf-8" do not change the format.
        let essence = normalized.split(';').next().unwrap_or_default().trim();

        match essence {
            "text" | "txt" | "plain" | "text/plain" | "md" | "text/markdown" => {
                Ok(DocumentFormat::Text)
            }
            "pdf" | "application/pdf" => Ok(DocumentFormat::Pdf),
            "docx"
            | "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Ok(DocumentFormat::Docx)
            }
            _ => Err(AnalysisError::UnsupportedFormat(declared.trim().to_string())),
        }
    }
}

/// A loaded document: its declared format and the text extracted from it.
///
/// The source bytes are consumed during loading and not kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    format: DocumentFormat,
    text: String,
}

impl Document {
    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Capability implemented by every supported format.
pub trait ExtractText {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, AnalysisError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

#[derive(Debug, Clone, Copy, Default)]
pub struct DocxExtractor;

impl ExtractText for PlainTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, AnalysisError> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        match std::str::from_utf8(bytes) {
            Ok(text) => Ok(text.to_string()),
            Err(e) => {
                warn!(
                    valid_up_to = e.valid_up_to(),
                    "Text upload is not valid UTF-8; decoding lossily"
                );
                Ok(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }
}

impl ExtractText for PdfExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, AnalysisError> {
        // Reject encrypted and unparseable files before the text extractor sees them.
        open_pdf(bytes)?;

        let extracted = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(bytes)
        }))
        .map_err(|_| {
            warn!("PDF text extractor panicked");
            ExtractionFailure::Panicked
        })?;

        extracted.map_err(|e| ExtractionFailure::Corrupt(e.to_string()).into())
    }
}

impl ExtractText for DocxExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, AnalysisError> {
        if bytes.starts_with(OLE_MAGIC) {
            return Err(ExtractionFailure::Encrypted.into());
        }
        if !bytes.starts_with(ZIP_MAGIC) {
            return Err(ExtractionFailure::Corrupt("not an OOXML package".to_string()).into());
        }

        let docx = panic::catch_unwind(AssertUnwindSafe(|| docx_rs::read_docx(bytes)))
            .map_err(|_| {
                warn!("DOCX reader panicked");
                ExtractionFailure::Panicked
            })?
            .map_err(|e| ExtractionFailure::Corrupt(e.to_string()))?;

        let mut lines = Vec::new();
        for child in &docx.document.children {
            match child {
                DocumentChild::Paragraph(paragraph) => lines.push(paragraph_text(paragraph)),
                DocumentChild::Table(table) => {
                    for row in &table.rows {
                        let TableChild::TableRow(row) = row else { continue };
                        let mut cells = Vec::new();
                        for cell in &row.cells {
                            let TableRowChild::TableCell(cell) = cell else { continue };
                            for content in &cell.children {
                                if let TableCellContent::Paragraph(paragraph) = content {
                                    cells.push(paragraph_text(paragraph));
                                }
                            }
                        }
                        lines.push(cells.join("\t"));
                    }
                }
                _ => {}
            }
        }
        Ok(lines.join("\n"))
    }
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut out = String::new();
    push_paragraph_children(&paragraph.children, &mut out);
    out
}

fn push_paragraph_children(children: &[ParagraphChild], out: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => {
                for run_child in &run.children {
                    match run_child {
                        RunChild::Text(text) => out.push_str(&text.text),
                        RunChild::Tab(_) => out.push('\t'),
                        RunChild::Break(_) => out.push('\n'),
                        _ => {}
                    }
                }
            }
            ParagraphChild::Hyperlink(link) => push_paragraph_children(&link.children, out),
            _ => {}
        }
    }
}

/// Parses a PDF, rejecting encrypted and malformed files.
///
/// Encryption is read from the parsed trailer; body text that happens to
/// contain `/Encrypt` does not count.
pub(crate) fn open_pdf(bytes: &[u8]) -> Result<lopdf::Document, AnalysisError> {
    let loaded = panic::catch_unwind(AssertUnwindSafe(|| lopdf::Document::load_mem(bytes)))
        .map_err(|_| ExtractionFailure::Panicked)?;

    let doc = match loaded {
        Ok(doc) => doc,
        // Parsers that try to decrypt on load fail before the trailer can be inspected.
        Err(e) if e.to_string().to_ascii_lowercase().contains("crypt") => {
            return Err(ExtractionFailure::Encrypted.into());
        }
        Err(e) => return Err(ExtractionFailure::Corrupt(e.to_string()).into()),
    };

    if doc.is_encrypted() || doc.trailer.get(b"Encrypt").is_ok() {
        return Err(ExtractionFailure::Encrypted.into());
    }
    Ok(doc)
}

enum Extractor {
    Text(PlainTextExtractor),
    Pdf(PdfExtractor),
    Docx(DocxExtractor),
}

impl ExtractText for Extractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, AnalysisError> {
        match self {
            Extractor::Text(e) => e.extract_text(bytes),
            Extractor::Pdf(e) => e.extract_text(bytes),
            Extractor::Docx(e) => e.extract_text(bytes),
        }
    }
}

/// Loader bound to one declared format.
pub struct Loader {
    format: DocumentFormat,
    extractor: Extractor,
}

impl Loader {
    pub fn new(format: DocumentFormat) -> Self {
        let extractor = match format {
            DocumentFormat::Text => Extractor::Text(PlainTextExtractor),
            DocumentFormat::Pdf => Extractor::Pdf(PdfExtractor),
            DocumentFormat::Docx => Extractor::Docx(DocxExtractor),
        };
        Self { format, extractor }
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    /// Extracts the text of `bytes`.
    ///
    /// Empty input, and documents whose text is only whitespace (for example a
    /// scanned PDF without a text layer), fail with [`AnalysisError::EmptyDocument`].
    pub fn load(&self, bytes: &[u8]) -> Result<Document, AnalysisError> {
        if bytes.is_empty() {
            return Err(AnalysisError::EmptyDocument);
        }

        let text = self.extractor.extract_text(bytes)?;
        if text.trim().is_empty() {
            warn!(format = %self.format, "Document contains no extractable text");
            return Err(AnalysisError::EmptyDocument);
        }

        debug!(
            format = %self.format,
            bytes = bytes.len(),
            chars = text.chars().count(),
            "Document loaded"
        );
        Ok(Document {
            format: self.format,
            text,
        })
    }
}

/// Loads `bytes` as `format`.
pub fn load(bytes: &[u8], format: DocumentFormat) -> Result<Document, AnalysisError> {
    Loader::new(format).load(bytes)
}

/// Wraps already-extracted text, applying the same emptiness rule as [`load`].
pub fn from_text(text: &str) -> Result<Document, AnalysisError> {
    load(text.as_bytes(), DocumentFormat::Text)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::Cursor;

    use docx_rs::{Docx, Paragraph, Run};
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    /// Builds a one-page PDF. Each line is `(text, white)`; white lines are drawn
    /// with a white fill color.
    pub fn pdf_with_lines(lines: &[(&str, bool)]) -> Vec<u8> {
        save(pdf_document(lines))
    }

    /// A PDF whose trailer declares standard-handler encryption.
    pub fn encrypted_pdf(lines: &[(&str, bool)]) -> Vec<u8> {
        let mut doc = pdf_document(lines);
        doc.trailer.set(
            "Encrypt",
            dictionary! {
                "Filter" => "Standard",
                "V" => 1,
                "R" => 2,
                "P" => -4,
                "O" => Object::string_literal(vec![0u8; 32]),
                "U" => Object::string_literal(vec![0u8; 32]),
            },
        );
        save(doc)
    }

    fn save(mut doc: Document) -> Vec<u8> {
        let mut out = Vec::new();
        doc.save_to(&mut out).expect("save pdf");
        out
    }

    fn pdf_document(lines: &[(&str, bool)]) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
        ];
        for (text, white) in lines {
            let gray: Object = if *white { 1.into() } else { 0.into() };
            operations.push(Operation::new("g", vec![gray]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
            operations.push(Operation::new("Td", vec![0.into(), (-14).into()]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    pub fn docx_with_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
        let mut docx = Docx::new();
        for text in paragraphs {
            docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*text)));
        }
        let mut cursor = Cursor::new(Vec::new());
        docx.build().pack(&mut cursor).expect("pack docx");
        cursor.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parses_names_mime_types_and_extensions() {
        assert_eq!("txt".parse::<DocumentFormat>().unwrap(), DocumentFormat::Text);
        assert_eq!(
            "text/plain; charset=utf-8".parse::<DocumentFormat>().unwrap(),
            DocumentFormat::Text
        );
        assert_eq!("PDF".parse::<DocumentFormat>().unwrap(), DocumentFormat::Pdf);
        assert_eq!(".docx".parse::<DocumentFormat>().unwrap(), DocumentFormat::Docx);
        assert_eq!(
            DocumentFormat::from_filename("Jane_Resume.v2.pdf"),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(DocumentFormat::from_filename("resume"), None);
    }

    #[test]
    fn test_unknown_format_is_unsupported() {
        let err = "rtf".parse::<DocumentFormat>().unwrap_err();
        assert_eq!(err, AnalysisError::UnsupportedFormat("rtf".to_string()));
    }

    #[test]
    fn test_empty_upload_is_rejected() {
        for format in [DocumentFormat::Text, DocumentFormat::Pdf, DocumentFormat::Docx] {
            assert_eq!(load(b"", format).unwrap_err(), AnalysisError::EmptyDocument);
        }
    }

    #[test]
    fn test_whitespace_only_text_is_empty() {
        assert_eq!(
            load(b"  \n\t ", DocumentFormat::Text).unwrap_err(),
            AnalysisError::EmptyDocument
        );
    }

    #[test]
    fn test_plain_text_strips_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice("Résumé".as_bytes());
        let doc = load(&bytes, DocumentFormat::Text).unwrap();
        assert_eq!(doc.text(), "Résumé");
        assert_eq!(doc.format(), DocumentFormat::Text);
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let doc = load(b"Rust \xFF engineer", DocumentFormat::Text).unwrap();
        assert!(doc.text().starts_with("Rust "));
        assert!(doc.text().ends_with(" engineer"));
    }

    #[test]
    fn test_corrupt_pdf_is_extraction_error() {
        let err = load(b"%PDF-1.4 this is not really a pdf", DocumentFormat::Pdf).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Extraction(ExtractionFailure::Corrupt(_))
                | AnalysisError::Extraction(ExtractionFailure::Panicked)
        ));
    }

    #[test]
    fn test_encrypted_pdf_is_rejected() {
        let bytes = fixtures::encrypted_pdf(&[("Senior Python Engineer", false)]);
        assert_eq!(
            load(&bytes, DocumentFormat::Pdf).unwrap_err(),
            AnalysisError::Extraction(ExtractionFailure::Encrypted)
        );
    }

    #[test]
    fn test_encrypt_in_body_text_is_not_encryption() {
        let bytes = fixtures::pdf_with_lines(&[("Rust engineer, TLS/Encryption and PKI", false)]);
        let doc = load(&bytes, DocumentFormat::Pdf).unwrap();
        assert!(doc.text().contains("Encryption"), "got {:?}", doc.text());
    }

    #[test]
    fn test_pdf_text_is_extracted() {
        let bytes = fixtures::pdf_with_lines(&[("Senior Python Engineer", false)]);
        let doc = load(&bytes, DocumentFormat::Pdf).unwrap();
        assert!(doc.text().contains("Python"), "got {:?}", doc.text());
    }

    #[test]
    fn test_docx_paragraphs_are_extracted() {
        let bytes = fixtures::docx_with_paragraphs(&["Jane Doe", "Rust and Kubernetes"]);
        let doc = load(&bytes, DocumentFormat::Docx).unwrap();
        let lines: Vec<&str> = doc.text().lines().filter(|l| !l.is_empty()).collect();
        assert_eq!(lines, vec!["Jane Doe", "Rust and Kubernetes"]);
    }

    #[test]
    fn test_ole_wrapped_docx_is_encrypted() {
        let mut bytes = OLE_MAGIC.to_vec();
        bytes.extend_from_slice(&[0u8; 64]);
        assert_eq!(
            load(&bytes, DocumentFormat::Docx).unwrap_err(),
            AnalysisError::Extraction(ExtractionFailure::Encrypted)
        );
    }

    #[test]
    fn test_non_zip_docx_is_corrupt() {
        let err = load(b"plain text pretending", DocumentFormat::Docx).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Extraction(ExtractionFailure::Corrupt(_))
        ));
    }
}
