//! The uploaded source PDF

use crate::error::Result;
use crate::validation::{check_content_type, validate_pdf, PdfInfo};
use std::sync::Arc;

/// An uploaded PDF: raw bytes plus what validation learned about them.
///
/// Cloning is cheap; the bytes are shared so long-running stages can hold a
/// handle without keeping the session locked.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    name: String,
    bytes: Arc<[u8]>,
    info: PdfInfo,
}

impl SourceDocument {
    /// Accept an upload. The declared content type must be PDF and the bytes
    /// must parse to a document with at least one page.
    pub fn from_upload(name: &str, content_type: Option<&str>, bytes: Vec<u8>) -> Result<Self> {
        check_content_type(content_type)?;
        Self::from_bytes(name, bytes)
    }

    /// Build from bytes already known to be a PDF (skips the content type check)
    pub fn from_bytes(name: &str, bytes: Vec<u8>) -> Result<Self> {
        let info = validate_pdf(&bytes)?;
        Ok(Self {
            name: name.to_string(),
            bytes: Arc::from(bytes),
            info,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn info(&self) -> &PdfInfo {
        &self.info
    }

    pub fn page_count(&self) -> u32 {
        self.info.page_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::fixtures::create_test_pdf;

    #[test]
    fn test_from_upload_accepts_pdf() {
        let doc = SourceDocument::from_upload("book.pdf", Some("application/pdf"), create_test_pdf(3))
            .unwrap();
        assert_eq!(doc.name(), "book.pdf");
        assert_eq!(doc.page_count(), 3);
        assert!(doc.bytes().starts_with(b"%PDF-"));
    }

    #[test]
    fn test_from_upload_rejects_wrong_content_type() {
        let result = SourceDocument::from_upload("photo.png", Some("image/png"), create_test_pdf(1));
        assert!(matches!(result, Err(Error::UploadRejected(_))));
    }

    #[test]
    fn test_from_upload_rejects_unparseable_bytes() {
        let result =
            SourceDocument::from_upload("fake.pdf", Some("application/pdf"), b"hello".to_vec());
        assert!(matches!(result, Err(Error::UploadRejected(_))));
    }
}
