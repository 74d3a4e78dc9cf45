//! lopdf-built PDFs shared by the unit tests

use lopdf::{content::Content, content::Operation, Dictionary, Document, Object, Stream};

/// Create a valid test PDF whose page N shows the text "Page N"
pub fn create_test_pdf(num_pages: u32) -> Vec<u8> {
    let texts: Vec<String> = (1..=num_pages).map(|i| format!("Page {}", i)).collect();
    create_pdf_with_texts(&texts)
}

/// Create a PDF with one page per entry; each entry is drawn as one `Tj`
/// per whitespace-free run so the tokens can be checked individually.
pub fn create_pdf_with_texts<S: AsRef<str>>(texts: &[S]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut page_ids = Vec::new();

    for text in texts {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(b"F1".to_vec()), Object::Integer(12)],
            ),
            Operation::new("Td", vec![Object::Integer(100), Object::Integer(700)]),
        ];
        for word in text.as_ref().split_whitespace() {
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(
                    word.as_bytes().to_vec(),
                    lopdf::StringFormat::Literal,
                )],
            ));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("MediaBox", letter_media_box()),
            ("Contents", Object::Reference(content_id)),
        ]);
        page_ids.push(doc.add_object(page));
    }

    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(page_ids.len() as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    finish(doc, pages_id)
}

/// Image-only stand-in: pages with no text-showing operators at all
pub fn create_blank_pdf(num_pages: u32) -> Vec<u8> {
    let empty: Vec<&str> = (0..num_pages).map(|_| "").collect();
    create_pdf_with_texts(&empty)
}

/// Two-level page tree where MediaBox and Resources are only set on the
/// intermediate Pages nodes, so copied pages must inherit them.
pub fn create_nested_pdf(pages_per_branch: u32) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let root_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));

    let mut branch_ids = Vec::new();
    let mut page_number = 0;
    for _ in 0..2 {
        let branch_id = doc.new_object_id();
        let mut kids = Vec::new();
        for _ in 0..pages_per_branch {
            page_number += 1;
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new(
                        "Tj",
                        vec![Object::String(
                            format!("Nested{}", page_number).into_bytes(),
                            lopdf::StringFormat::Literal,
                        )],
                    ),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
            let page_id = doc.add_object(Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(branch_id)),
                ("Contents", Object::Reference(content_id)),
            ]));
            kids.push(Object::Reference(page_id));
        }

        let resources = Dictionary::from_iter(vec![(
            "Font",
            Object::Dictionary(Dictionary::from_iter(vec![(
                "F1",
                Object::Reference(font_id),
            )])),
        )]);
        let branch = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Parent", Object::Reference(root_id)),
            ("Count", Object::Integer(pages_per_branch as i64)),
            ("Kids", Object::Array(kids)),
            ("MediaBox", letter_media_box()),
            ("Resources", Object::Dictionary(resources)),
        ]);
        doc.objects.insert(branch_id, Object::Dictionary(branch));
        branch_ids.push(Object::Reference(branch_id));
    }

    let root = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer((pages_per_branch * 2) as i64)),
        ("Kids", Object::Array(branch_ids)),
    ]);
    doc.objects.insert(root_id, Object::Dictionary(root));

    finish(doc, root_id)
}

fn letter_media_box() -> Object {
    Object::Array(vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Integer(612),
        Object::Integer(792),
    ])
}

fn finish(mut doc: Document, pages_id: lopdf::ObjectId) -> Vec<u8> {
    let catalog = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]);
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}
