//! Upload validation and PDF info extraction
//!
//! Checks the declared content type and parses the document once to learn
//! its page count and metadata.

use crate::error::{Error, Result};
use lopdf::Document;
use serde::Serialize;
use std::path::Path;

/// The only content type accepted for uploads
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// PDF file information extracted during validation
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct PdfInfo {
    /// Number of pages in the document
    pub page_count: u32,
    /// PDF version string (e.g., "1.7")
    pub version: String,
    /// Whether the document is encrypted
    pub encrypted: bool,
    /// File size in bytes
    pub size_bytes: usize,
    /// Document title from metadata (if available)
    pub title: Option<String>,
    /// Document author from metadata (if available)
    pub author: Option<String>,
}

/// Reject anything whose declared content type is not PDF.
pub fn check_content_type(content_type: Option<&str>) -> Result<()> {
    match content_type {
        Some(ct) if ct.trim().eq_ignore_ascii_case(PDF_CONTENT_TYPE) => Ok(()),
        Some(ct) => Err(Error::UploadRejected(format!(
            "Please upload a PDF file (got {})",
            ct
        ))),
        None => Err(Error::UploadRejected(
            "Please upload a PDF file (unknown content type)".to_string(),
        )),
    }
}

/// Declared content type for a file on disk, judged by its extension the way
/// a file picker does.
pub fn content_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some(PDF_CONTENT_TYPE),
        "txt" => Some("text/plain"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        _ => Some("application/octet-stream"),
    }
}

/// Validate a PDF file and extract basic info
pub fn validate_pdf(bytes: &[u8]) -> Result<PdfInfo> {
    quick_validate(bytes)?;

    let version = extract_version(bytes);

    let document = Document::load_mem(bytes)
        .map_err(|e| Error::UploadRejected(format!("Failed to parse PDF: {}", e)))?;

    let page_count = document.get_pages().len() as u32;
    if page_count == 0 {
        return Err(Error::UploadRejected("PDF has no pages".to_string()));
    }

    let (title, author) = extract_metadata(&document);

    Ok(PdfInfo {
        page_count,
        version,
        encrypted: document.is_encrypted(),
        size_bytes: bytes.len(),
        title,
        author,
    })
}

/// Header checks that run before the full parse
pub fn quick_validate(bytes: &[u8]) -> Result<()> {
    if bytes.len() < 8 {
        return Err(Error::UploadRejected(
            "File too small to be a valid PDF".to_string(),
        ));
    }

    if !bytes.starts_with(b"%PDF-") {
        return Err(Error::UploadRejected(
            "Not a valid PDF file (missing %PDF- header)".to_string(),
        ));
    }

    Ok(())
}

/// Extract PDF version from header
fn extract_version(bytes: &[u8]) -> String {
    // Header format: %PDF-1.7
    if bytes.len() >= 8 && bytes.starts_with(b"%PDF-") {
        if let Ok(version) = std::str::from_utf8(&bytes[5..8]) {
            return version.trim().to_string();
        }
    }
    "1.4".to_string()
}

/// Extract title and author from the Info dictionary
fn extract_metadata(document: &Document) -> (Option<String>, Option<String>) {
    let info_dict = document
        .trailer
        .get(b"Info")
        .and_then(|obj| obj.as_reference())
        .and_then(|id| document.get_dictionary(id));

    let Ok(info_dict) = info_dict else {
        return (None, None);
    };

    let read = |key: &[u8]| {
        info_dict
            .get(key)
            .and_then(|obj| obj.as_str())
            .ok()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .filter(|s| !s.is_empty())
    };

    (read(b"Title"), read(b"Author"))
}
