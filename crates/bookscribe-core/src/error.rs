use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Upload rejected: {0}")]
    UploadRejected(String),

    #[error("Failed to extract text: {0}")]
    ExtractionFailed(String),

    #[error("Invalid page selection: {0}")]
    SelectionInvalid(String),

    #[error("Chapter not found: {0}")]
    ChapterNotFound(String),

    #[error("Failed to create PDF: {0}")]
    AssemblyFailed(String),

    #[error("No PDF document loaded")]
    NoDocument,

    #[error("Please extract text first")]
    NoExtractedText,

    #[error("No text to save")]
    NothingToExport,

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Another operation is in progress: {0}")]
    OperationInProgress(&'static str),

    #[error("Export failed: {0}")]
    Export(#[from] std::io::Error),
}

/// Failure of a single page inside an OCR batch. Never aborts the batch.
#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Page {page} does not exist (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: u32 },

    #[error("{tool} failed: {message}")]
    ToolFailed { tool: &'static str, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
