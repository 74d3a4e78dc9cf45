//! Document assembly
//!
//! Builds a new PDF out of selected pages of a source document, in the order
//! given. The source is loaded once, the chosen page objects are re-parented
//! under a fresh page tree and catalog, and everything no longer reachable is
//! pruned before serialization.

use crate::error::{Error, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, instrument, warn};

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic Parent chains in malformed files
const MAX_TREE_DEPTH: usize = 64;

/// A freshly serialized document and what went into it
#[derive(Debug, Clone, Serialize)]
pub struct AssembledDocument {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// Source page numbers that were copied, in output order
    pub pages: Vec<u32>,
    /// Requested page numbers that do not exist in the source
    pub skipped: Vec<u32>,
}

impl AssembledDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Copy `pages` (1-indexed, in order) of the PDF in `bytes` into a new
/// document.
///
/// Page numbers beyond the source are skipped with a warning instead of
/// failing the whole operation. Repeated page numbers produce independent
/// copies.
#[instrument(skip(bytes), fields(size = bytes.len()))]
pub fn assemble_pages(bytes: &[u8], pages: &[u32]) -> Result<AssembledDocument> {
    let mut doc = Document::load_mem(bytes)
        .map_err(|e| Error::AssemblyFailed(format!("Failed to load source PDF: {}", e)))?;

    let source_pages = doc.get_pages();
    let page_count = source_pages.len() as u32;
    info!(page_count, requested = pages.len(), "Original PDF loaded");

    let tree_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(pages.len());
    let mut copied = Vec::with_capacity(pages.len());
    let mut skipped = Vec::new();
    let mut used: HashSet<ObjectId> = HashSet::new();

    for &page in pages {
        let Some(&page_id) = source_pages.get(&page) else {
            warn!(page, page_count, "Page is out of range and will be skipped");
            skipped.push(page);
            continue;
        };

        let mut dict = flattened_page(&doc, page_id)?;
        dict.set("Parent", Object::Reference(tree_id));

        // First use keeps the original object; repeats get their own copy
        let target_id = if used.insert(page_id) {
            doc.objects.insert(page_id, Object::Dictionary(dict));
            page_id
        } else {
            doc.add_object(dict)
        };

        kids.push(Object::Reference(target_id));
        copied.push(page);
    }

    if kids.is_empty() {
        return Err(Error::AssemblyFailed(format!(
            "None of the requested pages exist (document has {} pages)",
            page_count
        )));
    }

    let tree = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(kids.len() as i64)),
        ("Kids", Object::Array(kids)),
    ]);
    doc.objects.insert(tree_id, Object::Dictionary(tree));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(tree_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc.trailer.remove(b"Info");

    // Drop the old tree, unselected pages and their resources
    doc.prune_objects();
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| Error::AssemblyFailed(format!("Save failed: {}", e)))?;

    info!(
        pages = copied.len(),
        skipped = skipped.len(),
        size = buffer.len(),
        "New PDF created"
    );

    Ok(AssembledDocument {
        bytes: buffer,
        pages: copied,
        skipped,
    })
}

/// Clone a page dictionary with inherited attributes pushed down onto it, so
/// it stays complete once detached from its original ancestors.
fn flattened_page(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut page = doc
        .get_dictionary(page_id)
        .map_err(|e| Error::AssemblyFailed(format!("Invalid page object {:?}: {}", page_id, e)))?
        .clone();

    for key in INHERITABLE {
        if page.has(key) {
            continue;
        }
        if let Some(value) = inherited_value(doc, &page, key) {
            page.set(key, value);
        }
    }

    Ok(page)
}

fn inherited_value(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();

    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_dictionary(parent?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    None
}
