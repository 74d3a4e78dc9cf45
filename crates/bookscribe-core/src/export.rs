//! Export sinks
//!
//! Packages assembled PDFs and extracted text as named files with the right
//! MIME type and hands them to a sink that saves them.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

/// Longest stem kept after sanitizing (leaves room for the extension)
const MAX_STEM_CHARS: usize = 200;

/// Stem used when sanitizing leaves nothing
const DEFAULT_STEM: &str = "document";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Text,
}

impl ExportFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Text => "text/plain",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Text => "txt",
        }
    }
}

/// A file ready to be saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub format: ExportFormat,
    pub contents: Vec<u8>,
}

impl ExportFile {
    /// `<stem>.pdf`, `application/pdf`
    pub fn pdf(stem: &str, bytes: Vec<u8>) -> Self {
        Self::new(stem, ExportFormat::Pdf, bytes)
    }

    /// `<stem>.txt`, `text/plain`
    pub fn text(stem: &str, text: &str) -> Self {
        Self::new(stem, ExportFormat::Text, text.as_bytes().to_vec())
    }

    fn new(stem: &str, format: ExportFormat, contents: Vec<u8>) -> Self {
        Self {
            file_name: sanitize_filename(&format!("{}.{}", stem, format.extension())),
            format,
            contents,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// Somewhere exported files go. Saving is a side effect only.
pub trait ExportSink: Send + Sync {
    fn save(&self, file: ExportFile) -> Result<()>;
}

/// Writes exports into a directory on the local filesystem
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where a file with this name would be written
    pub fn target_path(&self, file_name: &str) -> PathBuf {
        self.dir.join(sanitize_filename(file_name))
    }
}

impl ExportSink for DirectorySink {
    fn save(&self, file: ExportFile) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.target_path(&file.file_name);
        std::fs::write(&path, &file.contents)?;
        info!(
            path = %path.display(),
            mime = file.mime_type(),
            bytes = file.contents.len(),
            "Saved export"
        );
        Ok(())
    }
}

/// Keeps exports in memory; useful for embedding and tests
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<Vec<ExportFile>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> Vec<ExportFile> {
        self.files
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ExportSink for MemorySink {
    fn save(&self, file: ExportFile) -> Result<()> {
        self.files
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(file);
        Ok(())
    }
}

/// Check a user-supplied filename stem before anything is built with it.
pub fn validate_stem(stem: &str) -> Result<&str> {
    let stem = stem.trim();
    if stem.is_empty() {
        return Err(Error::InvalidFilename(
            "Please enter a filename".to_string(),
        ));
    }
    Ok(stem)
}

/// Sanitizes a filename for saving.
///
/// - Replaces path separators and reserved characters with `_`
/// - Removes control characters
/// - Trims whitespace and dots from both ends
/// - Limits the stem length, respecting UTF-8 boundaries
pub fn sanitize_filename(name: &str) -> String {
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            (stem, Some(ext))
        }
        _ => (name, None),
    };

    let sanitized: String = stem
        .chars()
        .filter_map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => Some('_'),
            '\0'..='\x1f' | '\x7f' => None,
            c => Some(c),
        })
        .collect();

    let trimmed = sanitized.trim().trim_matches('.');
    let limited: String = trimmed.chars().take(MAX_STEM_CHARS).collect();
    let stem = if limited.is_empty() {
        DEFAULT_STEM.to_string()
    } else {
        limited
    };

    match ext {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_export_named_and_typed() {
        let file = ExportFile::pdf("report", b"%PDF-1.7".to_vec());
        assert_eq!(file.file_name, "report.pdf");
        assert_eq!(file.mime_type(), "application/pdf");
    }

    #[test]
    fn test_text_export_named_and_typed() {
        let file = ExportFile::text("report", "hello");
        assert_eq!(file.file_name, "report.txt");
        assert_eq!(file.mime_type(), "text/plain");
        assert_eq!(file.contents, b"hello");
    }

    #[test]
    fn test_export_name_is_sanitized_up_front() {
        let file = ExportFile::pdf("a/b", vec![1]);
        assert_eq!(file.file_name, "a_b.pdf");

        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());
        let expected = sink.target_path(&file.file_name);
        sink.save(file).unwrap();
        assert_eq!(expected, dir.path().join("a_b.pdf"));
        assert!(expected.exists());
    }

    #[test]
    fn test_memory_sink_collects_files() {
        let sink = MemorySink::new();
        sink.save(ExportFile::text("a", "1")).unwrap();
        sink.save(ExportFile::pdf("b", vec![1, 2])).unwrap();
        let names: Vec<String> = sink.files().into_iter().map(|f| f.file_name).collect();
        assert_eq!(names, vec!["a.txt", "b.pdf"]);
    }

    #[test]
    fn test_directory_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("out"));
        sink.save(ExportFile::text("chapter one", "text body")).unwrap();

        let written = std::fs::read_to_string(dir.path().join("out/chapter one.txt")).unwrap();
        assert_eq!(written, "text body");
    }

    #[test]
    fn test_directory_sink_cannot_escape_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());
        sink.save(ExportFile::pdf("../../etc/passwd", vec![1])).unwrap();
        assert!(dir.path().join("_.._etc_passwd.pdf").exists());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("report.pdf"), "report.pdf");
        assert_eq!(sanitize_filename("a/b\\c:d.txt"), "a_b_c_d.txt");
        assert_eq!(sanitize_filename("bad\u{7}name.pdf"), "badname.pdf");
        assert_eq!(sanitize_filename("  .pdf"), "document.pdf");
        assert_eq!(sanitize_filename("..."), "document");
        let long = "x".repeat(300);
        assert_eq!(sanitize_filename(&format!("{}.pdf", long)).len(), 204);
    }

    #[test]
    fn test_validate_stem() {
        assert_eq!(validate_stem("  notes ").unwrap(), "notes");
        assert!(matches!(validate_stem("   "), Err(Error::InvalidFilename(_))));
    }
}
