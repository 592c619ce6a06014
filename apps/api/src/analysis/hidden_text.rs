//! Hidden text scanner: finds text painted white on the page, a common way to
//! stuff keywords into a resume without a human reader noticing.

use std::panic::{self, AssertUnwindSafe};

use lopdf::content::{Content, Operation};
use lopdf::Object;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::error::{AnalysisError, ExtractionFailure};
use crate::analysis::loader::open_pdf;

const SNIPPET_CHARS: usize = 100;
const WHITE: u32 = 0xFF_FF_FF;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiddenTextFlag {
    /// 1-based.
    pub page_number: u32,
    pub text_snippet: String,
    /// Packed `0xRRGGBB` fill color.
    pub color: u32,
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn channel(value: f32) -> u32 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u32
}

fn pack(r: f32, g: f32, b: f32) -> u32 {
    (channel(r) << 16) | (channel(g) << 8) | channel(b)
}

/// Converts fill-color operands to packed RGB by component count.
fn fill_color(operands: &[Object]) -> Option<u32> {
    let values: Vec<f32> = operands.iter().map(number).collect::<Option<_>>()?;
    match values.as_slice() {
        [gray] => Some(pack(*gray, *gray, *gray)),
        [r, g, b] => Some(pack(*r, *g, *b)),
        [c, m, y, k] => Some(pack(
            (1.0 - c) * (1.0 - k),
            (1.0 - m) * (1.0 - k),
            (1.0 - y) * (1.0 - k),
        )),
        _ => None,
    }
}

fn decode_string(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        // Simple fonts use single-byte encodings; Latin-1 is close enough for a snippet.
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn shown_text(operation: &Operation) -> Option<String> {
    let mut text = String::new();
    match operation.operator.as_str() {
        "Tj" | "'" | "\"" => {
            for operand in &operation.operands {
                if let Object::String(bytes, _) = operand {
                    text.push_str(&decode_string(bytes));
                }
            }
        }
        "TJ" => {
            for operand in &operation.operands {
                let Object::Array(items) = operand else {
                    continue;
                };
                for item in items {
                    if let Object::String(bytes, _) = item {
                        text.push_str(&decode_string(bytes));
                    }
                }
            }
        }
        _ => return None,
    }
    Some(text)
}

fn snippet(text: &str) -> String {
    text.trim().chars().take(SNIPPET_CHARS).collect()
}

/// Flags every text-showing operation drawn with a white fill.
fn scan_page(page_number: u32, content: &Content) -> Vec<HiddenTextFlag> {
    let mut flags = Vec::new();
    let mut fill = 0u32;
    let mut saved = Vec::new();

    for operation in &content.operations {
        match operation.operator.as_str() {
            "q" => saved.push(fill),
            "Q" => fill = saved.pop().unwrap_or(0),
            "g" | "rg" | "k" | "sc" | "scn" => {
                if let Some(color) = fill_color(&operation.operands) {
                    fill = color;
                }
            }
            _ => {
                if fill != WHITE {
                    continue;
                }
                if let Some(text) = shown_text(operation) {
                    let text_snippet = snippet(&text);
                    if !text_snippet.is_empty() {
                        flags.push(HiddenTextFlag {
                            page_number,
                            text_snippet,
                            color: fill,
                        });
                    }
                }
            }
        }
    }
    flags
}

/// Scans every page of a PDF for white-filled text.
///
/// Encrypted and unreadable files fail with [`AnalysisError::Extraction`].
pub fn scan_hidden_text(bytes: &[u8]) -> Result<Vec<HiddenTextFlag>, AnalysisError> {
    if bytes.is_empty() {
        return Err(AnalysisError::EmptyDocument);
    }
    let doc = open_pdf(bytes)?;

    let mut flags = Vec::new();
    for (page_number, page_id) in doc.get_pages() {
        let content = panic::catch_unwind(AssertUnwindSafe(|| {
            doc.get_page_content(page_id)
                .and_then(|raw| Content::decode(&raw))
        }))
        .map_err(|_| ExtractionFailure::Panicked)?
        .map_err(|e| ExtractionFailure::Corrupt(e.to_string()))?;

        flags.extend(scan_page(page_number, &content));
    }

    debug!(flags = flags.len(), "Hidden text scan finished");
    Ok(flags)
}
