//! End-to-end runs of the session against lopdf-built documents, with a
//! scripted OCR backend and a real output directory.

use async_trait::async_trait;
use bookscribe_core::chapters::ChapterQuery;
use bookscribe_core::ocr::{OcrEngine, OcrFallback, OcrOptions, PageRasterizer};
use bookscribe_core::session::{SessionState, TextMethod};
use bookscribe_core::{DirectorySink, Error, OcrError, Session, SessionSettings};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};
use pretty_assertions::assert_eq;
use std::sync::Mutex;

fn build_pdf(texts: &[String]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();

    for text in texts {
        let mut operations = vec![Operation::new("BT", vec![])];
        if !text.is_empty() {
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(text.as_str())],
            ));
        }
        operations.push(Operation::new("ET", vec![]));
        let content = Content { operations }.encode().unwrap();
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(595),
                    Object::Integer(842),
                ]),
            ),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(count)),
        ])),
    );
    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn book(pages: u32) -> Vec<u8> {
    let texts: Vec<String> = (1..=pages)
        .map(|n| format!("Page {} of the sample book, long enough to skip OCR.", n))
        .collect();
    build_pdf(&texts)
}

fn scan(pages: u32) -> Vec<u8> {
    build_pdf(&vec![String::new(); pages as usize])
}

/// Records which pages were rendered
#[derive(Default)]
struct RecordingRasterizer {
    rendered: Mutex<Vec<u32>>,
}

#[async_trait]
impl PageRasterizer for RecordingRasterizer {
    async fn render(&self, _pdf: &[u8], page: u32, _scale: f32) -> Result<Vec<u8>, OcrError> {
        self.rendered.lock().unwrap().push(page);
        Ok(vec![page as u8])
    }
}

struct ScriptedEngine;

#[async_trait]
impl OcrEngine for ScriptedEngine {
    async fn recognize(&self, png: &[u8], language: &str) -> Result<String, OcrError> {
        Ok(format!("[{}] recognized page {}", language, png[0]))
    }
}

type TestSession = Session<RecordingRasterizer, ScriptedEngine, DirectorySink>;

fn session(dir: &std::path::Path) -> TestSession {
    Session::new(
        OcrFallback::new(
            RecordingRasterizer::default(),
            ScriptedEngine,
            OcrOptions::default(),
        ),
        DirectorySink::new(dir),
        SessionSettings::default(),
    )
}

#[tokio::test]
async fn test_extract_then_save_text() {
    let dir = tempfile::tempdir().unwrap();
    let session = session(dir.path());

    session
        .load_document("book.pdf", Some("application/pdf"), book(12))
        .unwrap();
    session.select_range(3, 5).unwrap();

    let text = session.extract_text().await.unwrap();
    for n in 1..=12 {
        assert!(text.contains(&format!("Page {}:\n", n)));
    }
    assert!(!text.contains("Showing first"));
    assert_eq!(session.extracted_text().unwrap().method, TextMethod::Embedded);

    session.save_text("book-text").unwrap();
    let saved = std::fs::read_to_string(dir.path().join("book-text.txt")).unwrap();
    assert_eq!(saved, text);
}

#[tokio::test]
async fn test_long_document_is_capped() {
    let dir = tempfile::tempdir().unwrap();
    let session = session(dir.path());

    session
        .load_document("long.pdf", Some("application/pdf"), book(53))
        .unwrap();
    session.select_range(1, 1).unwrap();

    let text = session.extract_text().await.unwrap();
    assert!(text.contains("Page 50:\n"));
    assert!(!text.contains("Page 51:\n"));
    assert!(text.ends_with(
        "\n... Showing first 50 pages only. The PDF has 53 pages in total.\n"
    ));
}

#[tokio::test]
async fn test_scanned_document_uses_ocr_for_selected_pages() {
    let dir = tempfile::tempdir().unwrap();
    let session = session(dir.path());

    session
        .load_document("scan.pdf", Some("application/pdf"), scan(8))
        .unwrap();
    session.select_pages(&[7, 3]).unwrap();

    let text = session.extract_text().await.unwrap();
    assert_eq!(
        text,
        "Page 7:\n[eng] recognized page 7\n\nPage 3:\n[eng] recognized page 3\n\n"
    );
    assert_eq!(session.extracted_text().unwrap().method, TextMethod::Ocr);
}

#[tokio::test]
async fn test_create_pdf_writes_selected_pages() {
    let dir = tempfile::tempdir().unwrap();
    let session = session(dir.path());

    session
        .load_document("book.pdf", Some("application/pdf"), book(20))
        .unwrap();
    session.select_chapter(&ChapterQuery::Number(2)).unwrap();

    let report = session.create_pdf("chapter-2").await.unwrap();
    assert_eq!(report.pages, vec![6, 7, 8, 9, 10]);
    assert!(report.skipped.is_empty());
    assert_eq!(session.state(), SessionState::DocumentAssembled);

    let written = std::fs::read(dir.path().join("chapter-2.pdf")).unwrap();
    let doc = Document::load_mem(&written).unwrap();
    assert_eq!(doc.get_pages().len(), 5);
}

#[tokio::test]
async fn test_new_upload_resets_everything() {
    let dir = tempfile::tempdir().unwrap();
    let session = session(dir.path());

    session
        .load_document("first.pdf", Some("application/pdf"), book(4))
        .unwrap();
    session.select_range(1, 4).unwrap();
    session.extract_text().await.unwrap();
    session.summarize().unwrap();

    session
        .load_document("second.pdf", Some("application/pdf"), book(2))
        .unwrap();
    assert_eq!(session.state(), SessionState::DocumentLoaded);
    assert!(session.selected_pages().is_empty());
    assert!(session.extracted_text().is_none());
    assert!(session.summary().is_none());
    assert!(matches!(
        session.save_text("anything"),
        Err(Error::NothingToExport)
    ));
}

#[tokio::test]
async fn test_rejected_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let session = session(dir.path());

    assert!(matches!(
        session.load_document("book.pdf", Some("image/png"), book(2)),
        Err(Error::UploadRejected(_))
    ));
    assert!(matches!(
        session.load_document("broken.pdf", Some("application/pdf"), b"%PDF-1.4 junk".to_vec()),
        Err(Error::UploadRejected(_))
    ));
    assert_eq!(session.state(), SessionState::Idle);

    session
        .load_document("book.pdf", Some("application/pdf"), book(5))
        .unwrap();
    assert!(matches!(
        session.select_range(4, 2),
        Err(Error::SelectionInvalid(_))
    ));
    assert!(matches!(
        session.select_range(0, 2),
        Err(Error::SelectionInvalid(_))
    ));
    assert!(session.selected_pages().is_empty());
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn test_returned_names_exist_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let session = session(dir.path());

    session
        .load_document("book.pdf", Some("application/pdf"), book(3))
        .unwrap();
    session.select_ranges("1, 3").unwrap();

    let report = session.create_pdf("drafts/part one").await.unwrap();
    assert_eq!(report.file_name, "drafts_part one.pdf");
    assert!(dir.path().join(&report.file_name).exists());

    session.extract_text().await.unwrap();
    let saved = session.save_text("notes\\ch1").unwrap();
    assert_eq!(saved, "notes_ch1.txt");
    assert!(dir.path().join(&saved).exists());
}
