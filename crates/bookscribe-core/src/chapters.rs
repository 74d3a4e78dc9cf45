//! Simulated chapter lookup
//!
//! PLACEHOLDER: this does not analyse the document. Chapter numbers come
//! from a fixed table and titles are matched with naive heuristics (or a
//! random three-page window). It exists so the "select by chapter" flow can
//! be exercised until real chapter detection is built.

use crate::error::{Error, Result};
use rand::Rng;

/// Fixed chapter table: chapter number -> pages
const SIMULATED_CHAPTERS: [(u32, [u32; 5]); 4] = [
    (1, [1, 2, 3, 4, 5]),
    (2, [6, 7, 8, 9, 10]),
    (3, [11, 12, 13, 14, 15]),
    (4, [16, 17, 18, 19, 20]),
];

/// Pages assumed when the page count is not known yet
const FALLBACK_PAGE_COUNT: u32 = 20;
const FALLBACK_RANDOM_SPAN: u32 = 15;

/// Length of the window returned for unrecognised titles
const WINDOW: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChapterQuery {
    Number(u32),
    Title(String),
}

impl ChapterQuery {
    /// Build a query from the two optional inputs; the number wins when both
    /// are given.
    pub fn from_inputs(number: Option<u32>, title: Option<&str>) -> Result<Self> {
        match (number, title.map(str::trim)) {
            (Some(n), _) => Ok(Self::Number(n)),
            (None, Some(t)) if !t.is_empty() => Ok(Self::Title(t.to_string())),
            _ => Err(Error::SelectionInvalid(
                "Please enter either chapter title or number".to_string(),
            )),
        }
    }
}

/// Simulated lookup using the thread-local RNG for unknown titles.
pub fn locate_chapter(query: &ChapterQuery, page_count: Option<u32>) -> Result<Vec<u32>> {
    locate_chapter_with_rng(query, page_count, &mut rand::thread_rng())
}

/// Simulated lookup with an injectable random source.
pub fn locate_chapter_with_rng<R: Rng>(
    query: &ChapterQuery,
    page_count: Option<u32>,
    rng: &mut R,
) -> Result<Vec<u32>> {
    let pages = match query {
        ChapterQuery::Number(number) => SIMULATED_CHAPTERS
            .iter()
            .find(|(n, _)| n == number)
            .map(|(_, pages)| pages.to_vec())
            .ok_or_else(|| {
                Error::ChapterNotFound(format!("Chapter {} not found in the document", number))
            })?,
        ChapterQuery::Title(title) => pages_for_title(title, page_count, rng),
    };

    if pages.is_empty() {
        return Err(Error::ChapterNotFound(
            "Could not detect chapter pages".to_string(),
        ));
    }
    Ok(pages)
}

fn pages_for_title<R: Rng>(title: &str, page_count: Option<u32>, rng: &mut R) -> Vec<u32> {
    let title = title.to_lowercase();

    if title.contains("introduction") {
        return vec![1, 2, 3];
    }

    if title.contains("conclusion") {
        let last = page_count.unwrap_or(FALLBACK_PAGE_COUNT);
        return (last.saturating_sub(2)..=last).filter(|&p| p >= 1).collect();
    }

    let span = page_count.unwrap_or(FALLBACK_RANDOM_SPAN).max(1);
    let start = rng.gen_range(1..=span);
    // Without a known page count nothing can be confirmed to exist
    let Some(count) = page_count else {
        return Vec::new();
    };
    (start..start + WINDOW).filter(|&p| p <= count).collect()
}
