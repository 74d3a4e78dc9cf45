//! bookscribe command line
//!
//! Loads one PDF, applies a page selection and either extracts its text or
//! writes the selected pages to a new PDF.

use std::path::{Path, PathBuf};

use anyhow::Context;
use bookscribe_core::chapters::ChapterQuery;
use bookscribe_core::ocr::{PdftoppmRasterizer, TesseractEngine};
use bookscribe_core::session::NoticeLevel;
use bookscribe_core::validation::content_type_for_path;
use bookscribe_core::{BookscribeConfig, LocalSession};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Extract text from PDF pages or build a PDF out of a page selection
#[derive(Parser, Debug)]
#[command(name = "bookscribe", version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show page count and metadata of a PDF
    Info {
        /// Path to the PDF
        file_path: PathBuf,
    },

    /// Extract text, falling back to OCR for image-only documents
    Extract {
        /// Path to the PDF
        file_path: PathBuf,

        #[command(flatten)]
        selection: SelectionArgs,

        /// Produce a summary of the extracted text
        #[arg(long)]
        summary: bool,

        /// Save as <STEM>.txt instead of printing to stdout
        #[arg(long)]
        stem: Option<String>,

        /// Output directory (overrides export.output_dir)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Never run OCR
        #[arg(long)]
        no_ocr: bool,
    },

    /// Write the selected pages to <STEM>.pdf
    Create {
        /// Path to the PDF
        file_path: PathBuf,

        #[command(flatten)]
        selection: SelectionArgs,

        /// Output file name without extension
        #[arg(long)]
        stem: String,

        /// Output directory (overrides export.output_dir)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

/// Page selection; every page is selected when none of these is given
#[derive(Args, Debug, Default)]
#[group(multiple = false)]
struct SelectionArgs {
    /// Page ranges, e.g. "1-3, 5, 8-10"
    #[arg(long)]
    pages: Option<String>,

    /// Inclusive page range
    #[arg(long, num_args = 2, value_names = ["START", "END"])]
    range: Option<Vec<u32>>,

    /// Chapter number
    #[arg(long)]
    chapter: Option<u32>,

    /// Chapter title
    #[arg(long)]
    chapter_title: Option<String>,

    /// Pages toggled one by one, in order
    #[arg(long, num_args = 1..)]
    toggle: Vec<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries results, so logs go to stderr
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &cli.config {
        Some(path) => BookscribeConfig::from_file(path)?,
        None => BookscribeConfig::default(),
    };

    match cli.command {
        Command::Info { file_path } => info(config, &file_path).await,
        Command::Extract {
            file_path,
            selection,
            summary,
            stem,
            out,
            no_ocr,
        } => extract(config, &file_path, &selection, summary, stem, out, no_ocr).await,
        Command::Create {
            file_path,
            selection,
            stem,
            out,
        } => create(config, &file_path, &selection, &stem, out).await,
    }
}

async fn info(config: BookscribeConfig, file_path: &Path) -> anyhow::Result<()> {
    let session = LocalSession::from_config(&config);
    let info = load(&session, file_path).await?;
    flush_notices(&session);
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

async fn extract(
    mut config: BookscribeConfig,
    file_path: &Path,
    selection: &SelectionArgs,
    summary: bool,
    stem: Option<String>,
    out: Option<PathBuf>,
    no_ocr: bool,
) -> anyhow::Result<()> {
    if no_ocr {
        config.ocr.enabled = false;
    }
    if let Some(out) = out {
        config.export.output_dir = out;
    }
    if config.ocr.enabled {
        warn_missing_tools(&config).await;
    }

    let session = LocalSession::from_config(&config);
    let result = async {
        load(&session, file_path).await?;
        apply_selection(&session, selection)?;
        let text = session.extract_text().await?;
        let text = if summary { session.summarize()? } else { text };
        if let Some(stem) = &stem {
            session.save_text(stem)?;
        } else {
            print!("{}", text);
        }
        anyhow::Ok(())
    }
    .await;
    flush_notices(&session);
    result
}

async fn create(
    mut config: BookscribeConfig,
    file_path: &Path,
    selection: &SelectionArgs,
    stem: &str,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    if let Some(out) = out {
        config.export.output_dir = out;
    }

    let session = LocalSession::from_config(&config);
    let result = async {
        load(&session, file_path).await?;
        apply_selection(&session, selection)?;
        let report = session.create_pdf(stem).await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        anyhow::Ok(())
    }
    .await;
    flush_notices(&session);
    result
}

async fn load(
    session: &LocalSession,
    file_path: &Path,
) -> anyhow::Result<bookscribe_core::PdfInfo> {
    let bytes = tokio::fs::read(file_path)
        .await
        .with_context(|| format!("Failed to read {}", file_path.display()))?;
    let name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_path.display().to_string());

    Ok(session.load_document(&name, content_type_for_path(file_path), bytes)?)
}

fn apply_selection(session: &LocalSession, args: &SelectionArgs) -> anyhow::Result<()> {
    if let Some(pages) = &args.pages {
        session.select_ranges(pages)?;
    } else if let Some(range) = &args.range {
        let (start, end) = match range.as_slice() {
            [start, end] => (*start, *end),
            _ => anyhow::bail!("--range takes exactly two page numbers"),
        };
        session.select_range(start, end)?;
    } else if args.chapter.is_some() || args.chapter_title.is_some() {
        let query = ChapterQuery::from_inputs(args.chapter, args.chapter_title.as_deref())?;
        session.select_chapter(&query)?;
    } else if !args.toggle.is_empty() {
        for &page in &args.toggle {
            session.toggle_page(page)?;
        }
    } else {
        let page_count = session
            .document_info()
            .map(|info| info.page_count)
            .context("No document loaded")?;
        session.select_range(1, page_count)?;
    }

    tracing::debug!(pages = ?session.selected_pages(), "Selection applied");
    Ok(())
}

async fn warn_missing_tools(config: &BookscribeConfig) {
    if !PdftoppmRasterizer::new(&config.ocr.pdftoppm_path)
        .is_available()
        .await
    {
        tracing::warn!(
            path = %config.ocr.pdftoppm_path.display(),
            "pdftoppm not found; OCR fallback will fail"
        );
    }
    if !TesseractEngine::new(&config.ocr.tesseract_path)
        .is_available()
        .await
    {
        tracing::warn!(
            path = %config.ocr.tesseract_path.display(),
            "tesseract not found; OCR fallback will fail"
        );
    }
}

/// Print queued notices to stderr. Errors are left to the returned error.
fn flush_notices(session: &LocalSession) {
    for notice in session.take_notices() {
        let label = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "ok",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => continue,
        };
        eprintln!("[{}] {}", label, notice.message);
    }
}
