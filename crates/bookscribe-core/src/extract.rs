//! Embedded text extraction
//!
//! Pulls the text-showing operands out of each page's content stream and
//! formats them as `Page <n>:` blocks. Large documents are capped.

use crate::error::{Error, Result};
use lopdf::{content::Content, Document, Object, ObjectId};
use serde::Serialize;
use tracing::{debug, info, instrument};

/// Pages processed before the output is truncated
pub const DEFAULT_PAGE_CAP: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionOptions {
    pub page_cap: u32,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            page_cap: DEFAULT_PAGE_CAP,
        }
    }
}

/// Text tokens of a single page, in content-stream order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageText {
    pub page_number: u32,
    pub tokens: Vec<String>,
}

impl PageText {
    pub fn text(&self) -> String {
        self.tokens.join(" ")
    }
}

/// Result of an extraction pass: the processed pages and the real total
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedPages {
    pub pages: Vec<PageText>,
    pub total_pages: u32,
}

impl ExtractedPages {
    pub fn is_truncated(&self) -> bool {
        (self.pages.len() as u32) < self.total_pages
    }

    /// Render as repeated `Page <n>:\n<text>\n\n` blocks plus the truncation
    /// notice when the cap was hit.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for page in &self.pages {
            out.push_str(&format!("Page {}:\n{}\n\n", page.page_number, page.text()));
        }
        if self.is_truncated() {
            out.push_str(&format!(
                "\n... Showing first {} pages only. The PDF has {} pages in total.\n",
                self.pages.len(),
                self.total_pages
            ));
        }
        out
    }
}

/// Extract embedded text from PDF bytes, formatted for display/export.
pub fn extract_text(bytes: &[u8], options: &ExtractionOptions) -> Result<String> {
    Ok(extract_pages(bytes, options)?.to_text())
}

/// Extract the embedded text tokens of the first `page_cap` pages.
#[instrument(skip(bytes), fields(size = bytes.len()))]
pub fn extract_pages(bytes: &[u8], options: &ExtractionOptions) -> Result<ExtractedPages> {
    let doc = Document::load_mem(bytes).map_err(|e| Error::ExtractionFailed(e.to_string()))?;

    let page_ids = doc.get_pages();
    let total_pages = page_ids.len() as u32;
    info!(total_pages, cap = options.page_cap, "PDF document loaded");

    let pages = page_ids
        .iter()
        .take(options.page_cap as usize)
        .map(|(&page_number, &page_id)| {
            debug!(page_number, "Processing page");
            PageText {
                page_number,
                tokens: page_tokens(&doc, page_id),
            }
        })
        .collect();

    Ok(ExtractedPages { pages, total_pages })
}

/// One token per text-showing operator (`Tj`, `TJ`, `'`, `"`)
fn page_tokens(doc: &Document, page_id: ObjectId) -> Vec<String> {
    let content = match doc.get_page_content(page_id) {
        Ok(content) => content,
        Err(e) => {
            debug!(?page_id, error = %e, "Page has no readable content stream");
            return Vec::new();
        }
    };

    let operations = match Content::decode(&content) {
        Ok(decoded) => decoded.operations,
        Err(e) => {
            debug!(?page_id, error = %e, "Failed to decode content stream");
            return Vec::new();
        }
    };

    operations
        .iter()
        .filter_map(|op| match op.operator.as_str() {
            // Tj and ' take the string last; " takes (aw ac string)
            "Tj" | "'" | "\"" => op.operands.last().and_then(operand_text),
            "TJ" => op.operands.first().and_then(operand_text),
            _ => None,
        })
        .filter(|token| !token.is_empty())
        .collect()
}

fn operand_text(operand: &Object) -> Option<String> {
    match operand {
        Object::String(bytes, _) => Some(decode_string(bytes)),
        Object::Array(items) => {
            let mut text = String::new();
            for item in items {
                match item {
                    Object::String(bytes, _) => text.push_str(&decode_string(bytes)),
                    // Large negative kerning is a word gap
                    Object::Integer(n) if *n < -100 => text.push(' '),
                    Object::Real(n) if *n < -100.0 => text.push(' '),
                    _ => {}
                }
            }
            Some(text)
        }
        _ => None,
    }
}

/// UTF-16BE with BOM, then UTF-8, then Latin-1
fn decode_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect();
        if let Ok(s) = String::from_utf16(&units) {
            return s;
        }
    }
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }
    bytes.iter().map(|&b| b as char).collect()
}
