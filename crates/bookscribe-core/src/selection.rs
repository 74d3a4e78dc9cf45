//! Page selection model
//!
//! An insertion-ordered set of 1-based page numbers bounded by the page count
//! of the loaded document. Every rejected mutation leaves the selection as it
//! was.

use crate::error::{Error, Result};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSelection {
    pages: Vec<u32>,
    page_count: u32,
    revision: u64,
}

impl PageSelection {
    /// Empty selection for a document with `page_count` pages
    pub fn new(page_count: u32) -> Self {
        Self {
            pages: Vec::new(),
            page_count,
            revision: 0,
        }
    }

    /// Selected pages in selection order
    pub fn pages(&self) -> &[u32] {
        &self.pages
    }

    /// Selected pages in ascending order
    pub fn sorted(&self) -> Vec<u32> {
        let mut pages = self.pages.clone();
        pages.sort_unstable();
        pages
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Bumped on every successful mutation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Remove `page` if selected, otherwise append it.
    /// Returns whether the page is selected afterwards.
    pub fn toggle(&mut self, page: u32) -> Result<bool> {
        self.check_page(page)?;

        let selected = if let Some(pos) = self.pages.iter().position(|&p| p == page) {
            self.pages.remove(pos);
            false
        } else {
            self.pages.push(page);
            true
        };
        self.revision += 1;
        Ok(selected)
    }

    /// Replace the selection with `start..=end`.
    pub fn set_range(&mut self, start: u32, end: u32) -> Result<()> {
        if start < 1 || end > self.page_count {
            return Err(Error::SelectionInvalid(format!(
                "Page range must be between 1 and {}",
                self.page_count
            )));
        }
        if start > end {
            return Err(Error::SelectionInvalid(
                "Start page must be less than or equal to end page".to_string(),
            ));
        }

        self.replace((start..=end).collect());
        Ok(())
    }

    /// Replace the selection with a caller-supplied list, keeping its order.
    ///
    /// Duplicates collapse to their first occurrence and pages outside the
    /// document are dropped; the dropped pages are returned. Fails without
    /// mutating if nothing valid remains.
    pub fn set_explicit(&mut self, pages: &[u32]) -> Result<Vec<u32>> {
        let mut kept = Vec::with_capacity(pages.len());
        let mut dropped = Vec::new();
        for &page in pages {
            if page == 0 || page > self.page_count {
                dropped.push(page);
            } else if !kept.contains(&page) {
                kept.push(page);
            }
        }

        if kept.is_empty() {
            return Err(Error::SelectionInvalid(format!(
                "None of the pages {:?} exist (document has {} pages)",
                pages, self.page_count
            )));
        }

        self.replace(kept);
        Ok(dropped)
    }

    /// Replace the selection from a range string such as `"1-3, 5, 8-10"`.
    /// Every page must exist.
    pub fn set_from_ranges(&mut self, input: &str) -> Result<()> {
        let pages = parse_ranges(input, self.page_count)?;
        if pages.is_empty() {
            return Err(Error::SelectionInvalid(
                "Page range cannot be empty".to_string(),
            ));
        }

        self.replace(pages);
        Ok(())
    }

    /// Adopt a new page count, dropping pages that no longer exist.
    /// Returns the dropped pages.
    pub fn revalidate(&mut self, page_count: u32) -> Vec<u32> {
        self.page_count = page_count;
        let (kept, dropped): (Vec<u32>, Vec<u32>) =
            self.pages.iter().partition(|&&p| p <= page_count);
        if !dropped.is_empty() {
            self.pages = kept;
            self.revision += 1;
        }
        dropped
    }

    fn replace(&mut self, pages: Vec<u32>) {
        self.pages = pages;
        self.revision += 1;
    }

    fn check_page(&self, page: u32) -> Result<()> {
        if page == 0 || page > self.page_count {
            return Err(Error::SelectionInvalid(format!(
                "Page {} is out of range (1-{})",
                page, self.page_count
            )));
        }
        Ok(())
    }
}

/// Parse page range string like "1-3, 5, 8-10" into sorted unique page numbers.
///
/// Every page must lie in `1..=max_page`; bounds are checked before a range
/// is expanded.
pub fn parse_ranges(input: &str, max_page: u32) -> Result<Vec<u32>> {
    let mut pages = BTreeSet::new();

    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some((start, end)) = part.split_once('-') {
            let start: u32 = start
                .trim()
                .parse()
                .map_err(|_| Error::SelectionInvalid(format!("Invalid start: {}", start)))?;
            let end: u32 = end
                .trim()
                .parse()
                .map_err(|_| Error::SelectionInvalid(format!("Invalid end: {}", end)))?;

            if start > end {
                return Err(Error::SelectionInvalid(format!(
                    "Start {} > end {}",
                    start, end
                )));
            }

            check_bounds(start, max_page)?;
            check_bounds(end, max_page)?;
            pages.extend(start..=end);
        } else {
            let page: u32 = part
                .parse()
                .map_err(|_| Error::SelectionInvalid(format!("Invalid page: {}", part)))?;
            check_bounds(page, max_page)?;
            pages.insert(page);
        }
    }

    Ok(pages.into_iter().collect())
}

fn check_bounds(page: u32, max_page: u32) -> Result<()> {
    if page == 0 || page > max_page {
        return Err(Error::SelectionInvalid(format!(
            "Page {} is out of range (1-{})",
            page, max_page
        )));
    }
    Ok(())
}
