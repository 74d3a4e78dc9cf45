//! OCR fallback for pages without usable embedded text
//!
//! Each requested page is rendered to a PNG and handed to an OCR engine,
//! one page at a time. A page that fails contributes a placeholder and the
//! batch moves on.
//!
//! The shipped backends drive external tools:
//! - `pdftoppm` (poppler-utils) renders a single page
//! - `tesseract` recognizes the rendered image

use crate::document::SourceDocument;
use crate::error::OcrError;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Render scale relative to 72 DPI; larger renders recognize better
pub const DEFAULT_RENDER_SCALE: f32 = 1.5;

/// Tesseract language code
pub const DEFAULT_LANGUAGE: &str = "eng";

/// Renders one PDF page to a raster image
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    /// Render 1-based `page` of `pdf` at `scale` and return PNG bytes
    async fn render(&self, pdf: &[u8], page: u32, scale: f32) -> Result<Vec<u8>, OcrError>;
}

/// Turns a raster image into text
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, png: &[u8], language: &str) -> Result<String, OcrError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct OcrOptions {
    pub render_scale: f32,
    pub language: String,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            render_scale: DEFAULT_RENDER_SCALE,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

/// Outcome for one page of a batch
#[derive(Debug)]
pub struct PageOcr {
    pub page_number: u32,
    pub outcome: Result<String, OcrError>,
}

/// Ordered per-page results of an OCR batch
#[derive(Debug, Default)]
pub struct OcrBatch {
    pub pages: Vec<PageOcr>,
}

impl OcrBatch {
    /// Render as `Page <n>:\n<text>\n\n` blocks; failed pages become
    /// `Page <n>: Error extracting text\n\n`.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for page in &self.pages {
            match &page.outcome {
                Ok(text) => out.push_str(&format!("Page {}:\n{}\n\n", page.page_number, text)),
                Err(_) => out.push_str(&format!(
                    "Page {}: Error extracting text\n\n",
                    page.page_number
                )),
            }
        }
        out
    }

    pub fn failed_pages(&self) -> Vec<u32> {
        self.pages
            .iter()
            .filter(|p| p.outcome.is_err())
            .map(|p| p.page_number)
            .collect()
    }

    pub fn summary(&self) -> OcrSummary {
        let failed = self.failed_pages();
        OcrSummary {
            processed: self.pages.len(),
            succeeded: self.pages.len() - failed.len(),
            failed_pages: failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OcrSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub failed_pages: Vec<u32>,
}

/// Render + recognize pipeline over an explicit page list
pub struct OcrFallback<R, E> {
    rasterizer: R,
    engine: E,
    options: OcrOptions,
}

impl<R: PageRasterizer, E: OcrEngine> OcrFallback<R, E> {
    pub fn new(rasterizer: R, engine: E, options: OcrOptions) -> Self {
        Self {
            rasterizer,
            engine,
            options,
        }
    }

    pub fn options(&self) -> &OcrOptions {
        &self.options
    }

    /// OCR `pages` of `doc` strictly in order, one page at a time.
    #[instrument(skip(self, doc), fields(document = doc.name()))]
    pub async fn run(&self, doc: &SourceDocument, pages: &[u32]) -> OcrBatch {
        info!(count = pages.len(), "Starting OCR");
        let mut batch = OcrBatch::default();

        for &page_number in pages {
            let outcome = self.process_page(doc, page_number).await;
            match &outcome {
                Ok(text) => debug!(page_number, chars = text.len(), "OCR completed for page"),
                Err(e) => warn!(page_number, error = %e, "Error processing page"),
            }
            batch.pages.push(PageOcr {
                page_number,
                outcome,
            });
        }

        let summary = batch.summary();
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed_pages.len(),
            "OCR finished"
        );
        batch
    }

    async fn process_page(&self, doc: &SourceDocument, page: u32) -> Result<String, OcrError> {
        if page == 0 || page > doc.page_count() {
            return Err(OcrError::PageOutOfRange {
                page,
                page_count: doc.page_count(),
            });
        }

        let png = self
            .rasterizer
            .render(doc.bytes(), page, self.options.render_scale)
            .await?;
        debug!(page, bytes = png.len(), "Rendered page, starting OCR");

        self.engine.recognize(&png, &self.options.language).await
    }
}

/// Renders pages with poppler's `pdftoppm`
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    binary: PathBuf,
}

impl PdftoppmRasterizer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub async fn is_available(&self) -> bool {
        probe(&self.binary, "-v").await
    }
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self::new("pdftoppm")
    }
}

/// pdftoppm resolution for a render scale (PDF user space is 72 DPI)
pub fn scale_to_dpi(scale: f32) -> u32 {
    (72.0 * scale).round().max(1.0) as u32
}

#[async_trait]
impl PageRasterizer for PdftoppmRasterizer {
    async fn render(&self, pdf: &[u8], page: u32, scale: f32) -> Result<Vec<u8>, OcrError> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("source.pdf");
        let prefix = dir.path().join("page");
        tokio::fs::write(&input, pdf).await?;

        let page_arg = page.to_string();
        let output = Command::new(&self.binary)
            .arg("-png")
            .arg("-r")
            .arg(scale_to_dpi(scale).to_string())
            .arg("-f")
            .arg(&page_arg)
            .arg("-l")
            .arg(&page_arg)
            .arg("-singlefile")
            .arg(&input)
            .arg(&prefix)
            .output()
            .await?;

        if !output.status.success() {
            return Err(OcrError::ToolFailed {
                tool: "pdftoppm",
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // -singlefile writes exactly <prefix>.png
        Ok(tokio::fs::read(prefix.with_extension("png")).await?)
    }
}

/// Recognizes text with the `tesseract` CLI
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    binary: PathBuf,
}

impl TesseractEngine {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub async fn is_available(&self) -> bool {
        probe(&self.binary, "--version").await
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn recognize(&self, png: &[u8], language: &str) -> Result<String, OcrError> {
        let dir = tempfile::tempdir()?;
        let image = dir.path().join("page.png");
        tokio::fs::write(&image, png).await?;

        let output = Command::new(&self.binary)
            .arg(&image)
            .arg("stdout")
            .arg("-l")
            .arg(language)
            .output()
            .await?;

        if !output.status.success() {
            return Err(OcrError::ToolFailed {
                tool: "tesseract",
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

async fn probe(binary: &Path, flag: &str) -> bool {
    let found = Command::new(binary).arg(flag).output().await.is_ok();
    if !found {
        debug!(binary = %binary.display(), "OCR tool not found");
    }
    found
}
