//! Configuration parsing
//!
//! TOML configuration for the extraction pipeline. Every field has a default,
//! so an empty file (or no file at all) is a valid configuration.

use crate::extract::{ExtractionOptions, DEFAULT_PAGE_CAP};
use crate::ocr::{OcrOptions, DEFAULT_LANGUAGE, DEFAULT_RENDER_SCALE};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Trimmed length below which embedded text is considered missing
pub const DEFAULT_OCR_FALLBACK_THRESHOLD: usize = 100;

/// Main configuration structure loaded from TOML files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookscribeConfig {
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl BookscribeConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML is malformed
    /// - A value fails validation
    ///
    /// # Example
    ///
    /// ```no_run
    /// use bookscribe_core::config::BookscribeConfig;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = BookscribeConfig::from_file("bookscribe.toml")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    ///
    /// # Example
    ///
    /// ```
    /// use bookscribe_core::config::BookscribeConfig;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let toml = r#"
    ///     [extraction]
    ///     page_cap = 20
    ///
    ///     [ocr]
    ///     language = "deu"
    /// "#;
    /// let config = BookscribeConfig::from_str(toml)?;
    /// assert_eq!(config.extraction.page_cap, 20);
    /// # Ok(())
    /// # }
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(s).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.extraction.page_cap >= 1,
            "extraction.page_cap must be at least 1"
        );
        anyhow::ensure!(
            self.ocr.render_scale > 0.0 && self.ocr.render_scale.is_finite(),
            "ocr.render_scale must be a positive number, got {}",
            self.ocr.render_scale
        );
        anyhow::ensure!(
            !self.ocr.language.trim().is_empty(),
            "ocr.language must not be empty"
        );
        Ok(())
    }
}

/// Embedded text extraction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Pages processed before output is truncated (default: 50)
    #[serde(default = "default_page_cap")]
    pub page_cap: u32,
    /// Trimmed character count below which OCR takes over (default: 100)
    #[serde(default = "default_ocr_fallback_threshold")]
    pub ocr_fallback_threshold: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            page_cap: default_page_cap(),
            ocr_fallback_threshold: default_ocr_fallback_threshold(),
        }
    }
}

impl ExtractionConfig {
    pub fn options(&self) -> ExtractionOptions {
        ExtractionOptions {
            page_cap: self.page_cap,
        }
    }
}

/// OCR fallback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Whether short embedded text triggers OCR at all (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Render scale relative to 72 DPI (default: 1.5)
    #[serde(default = "default_render_scale")]
    pub render_scale: f32,
    /// Tesseract language code (default: "eng")
    #[serde(default = "default_language")]
    pub language: String,
    /// pdftoppm binary (default: looked up on PATH)
    #[serde(default = "default_pdftoppm")]
    pub pdftoppm_path: PathBuf,
    /// tesseract binary (default: looked up on PATH)
    #[serde(default = "default_tesseract")]
    pub tesseract_path: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            render_scale: default_render_scale(),
            language: default_language(),
            pdftoppm_path: default_pdftoppm(),
            tesseract_path: default_tesseract(),
        }
    }
}

impl OcrConfig {
    pub fn options(&self) -> OcrOptions {
        OcrOptions {
            render_scale: self.render_scale,
            language: self.language.clone(),
        }
    }
}

/// Export settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory exports are written to (default: ".")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

fn default_page_cap() -> u32 {
    DEFAULT_PAGE_CAP
}

fn default_ocr_fallback_threshold() -> usize {
    DEFAULT_OCR_FALLBACK_THRESHOLD
}

fn default_true() -> bool {
    true
}

fn default_render_scale() -> f32 {
    DEFAULT_RENDER_SCALE
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_pdftoppm() -> PathBuf {
    PathBuf::from("pdftoppm")
}

fn default_tesseract() -> PathBuf {
    PathBuf::from("tesseract")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
