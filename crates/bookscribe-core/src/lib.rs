//! Page selection, text extraction and assembly for PDF documents
//!
//! This crate turns an uploaded PDF into either plain text or a smaller PDF:
//! - `extract`: embedded text, page by page, capped at 50 pages
//! - `ocr`: render + recognize fallback for image-only pages
//! - `selection` / `chapters`: which pages the user cares about
//! - `assemble`: a new PDF from the selected pages, in order
//! - `export`: named files handed to a sink
//!
//! [`session::Session`] ties the stages together behind one stateful API.

pub mod assemble;
pub mod chapters;
pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod extract;
pub mod ocr;
pub mod selection;
pub mod session;
pub mod summary;
pub mod validation;

#[cfg(test)]
mod fixtures;

pub use assemble::{assemble_pages, AssembledDocument};
pub use chapters::{locate_chapter, ChapterQuery};
pub use config::BookscribeConfig;
pub use document::SourceDocument;
pub use error::{Error, OcrError, Result};
pub use export::{DirectorySink, ExportFile, ExportFormat, ExportSink, MemorySink};
pub use extract::{extract_pages, extract_text, ExtractedPages, ExtractionOptions};
pub use ocr::{OcrEngine, OcrFallback, OcrOptions, PageRasterizer};
pub use selection::{parse_ranges, PageSelection};
pub use session::{LocalSession, Notice, NoticeLevel, Session, SessionSettings, SessionState};
pub use validation::PdfInfo;
