//! Stateful document session
//!
//! Holds the loaded document, the page selection and any extracted text, and
//! drives the pipeline stages over them. Methods take `&self`: state sits
//! behind a mutex that is never held across an `.await`, and a busy flag
//! rejects overlapping long-running operations.

use crate::assemble::assemble_pages;
use crate::chapters::{locate_chapter, ChapterQuery};
use crate::config::{BookscribeConfig, DEFAULT_OCR_FALLBACK_THRESHOLD};
use crate::document::SourceDocument;
use crate::error::{Error, Result};
use crate::export::{validate_stem, DirectorySink, ExportFile, ExportSink};
use crate::extract::{self, ExtractionOptions};
use crate::ocr::{
    OcrEngine, OcrFallback, OcrSummary, PageRasterizer, PdftoppmRasterizer, TesseractEngine,
};
use crate::selection::PageSelection;
use crate::summary::mock_summary;
use crate::validation::PdfInfo;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::{error, info, instrument, warn};

/// Where the session is in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    DocumentLoaded,
    TextExtracted,
    DocumentAssembled,
}

/// How the current text was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TextMethod {
    Embedded,
    Ocr,
}

/// Text produced by the last successful extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedText {
    pub text: String,
    pub method: TextMethod,
    /// Present when OCR produced the text
    pub ocr: Option<OcrSummary>,
    #[serde(skip)]
    document_generation: u64,
    #[serde(skip)]
    selection_revision: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Transient user-facing notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Result of a successful `create_pdf`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub file_name: String,
    pub pages: Vec<u32>,
    pub skipped: Vec<u32>,
    pub size_bytes: usize,
}

/// Knobs the session needs from the configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub extraction: ExtractionOptions,
    pub ocr_enabled: bool,
    /// Trimmed character count below which OCR replaces embedded text
    pub ocr_fallback_threshold: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            extraction: ExtractionOptions::default(),
            ocr_enabled: true,
            ocr_fallback_threshold: DEFAULT_OCR_FALLBACK_THRESHOLD,
        }
    }
}

impl From<&BookscribeConfig> for SessionSettings {
    fn from(config: &BookscribeConfig) -> Self {
        Self {
            extraction: config.extraction.options(),
            ocr_enabled: config.ocr.enabled,
            ocr_fallback_threshold: config.extraction.ocr_fallback_threshold,
        }
    }
}

#[derive(Debug)]
struct SessionInner {
    document: Option<SourceDocument>,
    /// Bumped on every successful upload
    generation: u64,
    selection: PageSelection,
    extracted: Option<ExtractedText>,
    summary: Option<String>,
    state: SessionState,
    notices: Vec<Notice>,
}

impl SessionInner {
    fn new() -> Self {
        Self {
            document: None,
            generation: 0,
            selection: PageSelection::default(),
            extracted: None,
            summary: None,
            state: SessionState::Idle,
            notices: Vec::new(),
        }
    }

    fn document(&self) -> Result<&SourceDocument> {
        self.document.as_ref().ok_or(Error::NoDocument)
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice {
            level,
            message: message.into(),
        });
    }

    fn is_stale(&self, text: &ExtractedText) -> bool {
        text.document_generation != self.generation
            || text.selection_revision != self.selection.revision()
    }
}

/// Clears the busy flag when dropped
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool, operation: &'static str) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::OperationInProgress(operation))?;
        Ok(Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Session wired to the local `pdftoppm`/`tesseract` tools and a directory
pub type LocalSession = Session<PdftoppmRasterizer, TesseractEngine, DirectorySink>;

/// One document, one selection, one pipeline
pub struct Session<R, E, S> {
    inner: Mutex<SessionInner>,
    busy: AtomicBool,
    ocr: OcrFallback<R, E>,
    sink: S,
    settings: SessionSettings,
}

impl LocalSession {
    /// Build a session from configuration using the external OCR tools and
    /// the configured output directory.
    pub fn from_config(config: &BookscribeConfig) -> Self {
        let ocr = OcrFallback::new(
            PdftoppmRasterizer::new(&config.ocr.pdftoppm_path),
            TesseractEngine::new(&config.ocr.tesseract_path),
            config.ocr.options(),
        );
        Session::new(
            ocr,
            DirectorySink::new(&config.export.output_dir),
            SessionSettings::from(config),
        )
    }
}

impl<R: PageRasterizer, E: OcrEngine, S: ExportSink> Session<R, E, S> {
    pub fn new(ocr: OcrFallback<R, E>, sink: S, settings: SessionSettings) -> Self {
        Self {
            inner: Mutex::new(SessionInner::new()),
            busy: AtomicBool::new(false),
            ocr,
            sink,
            settings,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue an error notice for a failed operation and pass the result on
    fn report<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            error!(error = %e, "Operation failed");
            self.lock().notify(NoticeLevel::Error, e.to_string());
        }
        result
    }

    // ============ Document ============

    /// Accept an uploaded PDF. Replaces any previous document and resets the
    /// selection, extracted text and summary.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub fn load_document(
        &self,
        name: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<PdfInfo> {
        let result = self.load_document_inner(name, content_type, bytes);
        self.report(result)
    }

    fn load_document_inner(
        &self,
        name: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<PdfInfo> {
        let _guard = BusyGuard::acquire(&self.busy, "document upload")?;
        let document = SourceDocument::from_upload(name, content_type, bytes)?;
        let info = document.info().clone();

        let mut inner = self.lock();
        inner.generation += 1;
        inner.selection = PageSelection::new(info.page_count);
        inner.extracted = None;
        inner.summary = None;
        inner.document = Some(document);
        inner.state = SessionState::DocumentLoaded;
        inner.notify(
            NoticeLevel::Success,
            format!("PDF loaded successfully ({} pages)", info.page_count),
        );
        info!(name, page_count = info.page_count, "Document loaded");

        Ok(info)
    }

    // ============ Selection ============

    /// Toggle one page; returns whether it is now selected.
    pub fn toggle_page(&self, page: u32) -> Result<bool> {
        let result = self.with_selection(|inner| inner.selection.toggle(page));
        self.report(result)
    }

    /// Replace the selection with `start..=end`.
    pub fn select_range(&self, start: u32, end: u32) -> Result<()> {
        let result = self.with_selection(|inner| {
            inner.selection.set_range(start, end)?;
            inner.notify(
                NoticeLevel::Success,
                format!("Selected pages {} to {}", start, end),
            );
            Ok(())
        });
        self.report(result)
    }

    /// Replace the selection with an explicit list. Pages that do not exist
    /// are dropped and returned.
    pub fn select_pages(&self, pages: &[u32]) -> Result<Vec<u32>> {
        let result = self.with_selection(|inner| {
            let dropped = inner.selection.set_explicit(pages)?;
            warn_dropped(inner, &dropped);
            Ok(dropped)
        });
        self.report(result)
    }

    /// Replace the selection from a range string such as `"1-3, 5"`.
    pub fn select_ranges(&self, input: &str) -> Result<()> {
        let result = self.with_selection(|inner| inner.selection.set_from_ranges(input));
        self.report(result)
    }

    /// Replace the selection with the pages of a chapter.
    pub fn select_chapter(&self, query: &ChapterQuery) -> Result<Vec<u32>> {
        let result = self.with_selection(|inner| {
            let page_count = inner.selection.page_count();
            let pages = locate_chapter(query, Some(page_count))?;
            let dropped = inner.selection.set_explicit(&pages)?;
            warn_dropped(inner, &dropped);
            let selected = inner.selection.pages().to_vec();
            inner.notify(
                NoticeLevel::Success,
                format!("Chapter found: {} pages selected", selected.len()),
            );
            Ok(selected)
        });
        self.report(result)
    }

    fn with_selection<T>(&self, f: impl FnOnce(&mut SessionInner) -> Result<T>) -> Result<T> {
        let mut inner = self.lock();
        inner.document()?;
        f(&mut inner)
    }

    // ============ Pipeline ============

    /// Extract text from the document, falling back to OCR over the current
    /// selection when the embedded text is too short to be useful.
    #[instrument(skip(self))]
    pub async fn extract_text(&self) -> Result<String> {
        let result = self.extract_text_inner().await;
        self.report(result)
    }

    async fn extract_text_inner(&self) -> Result<String> {
        let _guard = BusyGuard::acquire(&self.busy, "text extraction")?;

        let (document, generation, pages, revision) = {
            let inner = self.lock();
            let document = inner.document()?.clone();
            if inner.selection.is_empty() {
                return Err(Error::SelectionInvalid(
                    "Please select at least one page".to_string(),
                ));
            }
            (
                document,
                inner.generation,
                inner.selection.pages().to_vec(),
                inner.selection.revision(),
            )
        };

        let options = self.settings.extraction;
        let source = document.clone();
        let embedded = run_blocking(
            move || extract::extract_text(source.bytes(), &options),
            Error::ExtractionFailed,
        )
        .await?;
        let usable = embedded.trim().chars().count();

        let extracted = if self.settings.ocr_enabled && usable < self.settings.ocr_fallback_threshold
        {
            info!(usable, pages = pages.len(), "Embedded text too short, using OCR");
            self.lock().notify(
                NoticeLevel::Info,
                "Using OCR to extract text from image-based PDF. This may take a moment...",
            );

            let batch = self.ocr.run(&document, &pages).await;
            let summary = batch.summary();
            if !summary.failed_pages.is_empty() {
                warn!(failed = ?summary.failed_pages, "OCR failed for some pages");
            }
            ExtractedText {
                text: batch.to_text(),
                method: TextMethod::Ocr,
                ocr: Some(summary),
                document_generation: generation,
                selection_revision: revision,
            }
        } else {
            ExtractedText {
                text: embedded,
                method: TextMethod::Embedded,
                ocr: None,
                document_generation: generation,
                selection_revision: revision,
            }
        };

        let mut inner = self.lock();
        if let Some(ocr) = &extracted.ocr {
            if !ocr.failed_pages.is_empty() {
                inner.notify(
                    NoticeLevel::Warning,
                    format!("OCR failed for pages {}", join_pages(&ocr.failed_pages)),
                );
            }
        }
        let text = extracted.text.clone();
        inner.extracted = Some(extracted);
        inner.summary = None;
        inner.state = SessionState::TextExtracted;
        inner.notify(NoticeLevel::Success, "Text extracted successfully");
        info!(chars = text.len(), "Text extracted");

        Ok(text)
    }

    /// Assemble the selected pages into `<stem>.pdf` and hand it to the sink.
    #[instrument(skip(self))]
    pub async fn create_pdf(&self, stem: &str) -> Result<ExportReport> {
        let result = self.create_pdf_inner(stem).await;
        self.report(result)
    }

    async fn create_pdf_inner(&self, stem: &str) -> Result<ExportReport> {
        let _guard = BusyGuard::acquire(&self.busy, "PDF creation")?;
        let stem = validate_stem(stem)?;

        let (document, pages) = {
            let inner = self.lock();
            let document = inner.document()?.clone();
            if inner.selection.is_empty() {
                return Err(Error::SelectionInvalid(
                    "Please select at least one page".to_string(),
                ));
            }
            (document, inner.selection.pages().to_vec())
        };

        let assembled = run_blocking(
            move || assemble_pages(document.bytes(), &pages),
            Error::AssemblyFailed,
        )
        .await?;
        let file = ExportFile::pdf(stem, assembled.bytes);
        let report = ExportReport {
            file_name: file.file_name.clone(),
            pages: assembled.pages,
            skipped: assembled.skipped,
            size_bytes: file.contents.len(),
        };
        self.sink.save(file)?;

        let mut inner = self.lock();
        warn_dropped(&mut inner, &report.skipped);
        inner.state = SessionState::DocumentAssembled;
        inner.notify(
            NoticeLevel::Success,
            format!("PDF created successfully: {}", report.file_name),
        );

        Ok(report)
    }

    /// Produce a summary of the extracted text.
    ///
    /// PLACEHOLDER: see [`mock_summary`].
    pub fn summarize(&self) -> Result<String> {
        let result = self.summarize_inner();
        self.report(result)
    }

    fn summarize_inner(&self) -> Result<String> {
        let mut inner = self.lock();
        let summary = match &inner.extracted {
            Some(extracted) => mock_summary(&extracted.text),
            None => return Err(Error::NoExtractedText),
        };
        inner.summary = Some(summary.clone());
        inner.notify(NoticeLevel::Success, "Summary generated successfully");
        Ok(summary)
    }

    /// Save the summary if there is one, otherwise the extracted text, as
    /// `<stem>.txt`.
    #[instrument(skip(self))]
    pub fn save_text(&self, stem: &str) -> Result<String> {
        let result = self.save_text_inner(stem);
        self.report(result)
    }

    fn save_text_inner(&self, stem: &str) -> Result<String> {
        let stem = validate_stem(stem)?;
        let (text, stale) = {
            let inner = self.lock();
            let stale = inner
                .extracted
                .as_ref()
                .is_some_and(|extracted| inner.is_stale(extracted));
            let text = inner
                .summary
                .clone()
                .or_else(|| inner.extracted.as_ref().map(|e| e.text.clone()))
                .filter(|text| !text.is_empty())
                .ok_or(Error::NothingToExport)?;
            (text, stale)
        };

        let file = ExportFile::text(stem, &text);
        let file_name = file.file_name.clone();
        self.sink.save(file)?;

        let mut inner = self.lock();
        if stale {
            inner.notify(
                NoticeLevel::Warning,
                "Saved text was extracted before the page selection changed",
            );
        }
        inner.notify(
            NoticeLevel::Success,
            format!("Text saved successfully: {}", file_name),
        );

        Ok(file_name)
    }

    // ============ Queries ============

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn document_info(&self) -> Option<PdfInfo> {
        self.lock().document.as_ref().map(|d| d.info().clone())
    }

    pub fn document_name(&self) -> Option<String> {
        self.lock().document.as_ref().map(|d| d.name().to_string())
    }

    /// Selected pages in selection order
    pub fn selected_pages(&self) -> Vec<u32> {
        self.lock().selection.pages().to_vec()
    }

    pub fn extracted_text(&self) -> Option<ExtractedText> {
        self.lock().extracted.clone()
    }

    pub fn summary(&self) -> Option<String> {
        self.lock().summary.clone()
    }

    /// True when the extracted text predates the current document or
    /// selection.
    pub fn is_text_stale(&self) -> bool {
        let inner = self.lock();
        inner
            .extracted
            .as_ref()
            .is_some_and(|extracted| inner.is_stale(extracted))
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Drain queued notices, oldest first
    pub fn take_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut self.lock().notices)
    }
}

/// Run CPU-bound PDF work on the blocking pool
async fn run_blocking<T, F>(task: F, on_panic: fn(String) -> Error) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| on_panic(format!("worker task failed: {}", e)))?
}

fn warn_dropped(inner: &mut SessionInner, pages: &[u32]) {
    if pages.is_empty() {
        return;
    }
    warn!(pages = ?pages, "Skipping pages that do not exist");
    inner.notify(
        NoticeLevel::Warning,
        format!("Skipped pages that do not exist: {}", join_pages(pages)),
    );
}

fn join_pages(pages: &[u32]) -> String {
    pages
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
