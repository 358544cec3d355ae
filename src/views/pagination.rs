//! Pagination and sorting state of a listing screen

use crate::api::types::{Page, PageRequest, SortDir};

/// Page sizes offered by listing screens
pub const PAGE_SIZES: [u32; 4] = [5, 10, 20, 50];

/// Pages shown in full before the window collapses
const MAX_VISIBLE: u32 = 5;

/// Entry of the page-number bar (zero-based page index)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(u32),
    Ellipsis,
}

/// Page-number bar: every page when there are few, otherwise first and
/// last page around a window of the current one.
pub fn page_window(current: u32, total_pages: u32) -> Vec<PageItem> {
    use PageItem::{Ellipsis, Page};

    if total_pages <= MAX_VISIBLE {
        return (0..total_pages).map(Page).collect();
    }

    let last = total_pages - 1;
    if current < 3 {
        let mut items: Vec<PageItem> = (0..4).map(Page).collect();
        items.extend([Ellipsis, Page(last)]);
        items
    } else if current + 4 > total_pages {
        let mut items = vec![Page(0), Ellipsis];
        items.extend((total_pages - 4..total_pages).map(Page));
        items
    } else {
        vec![
            Page(0),
            Ellipsis,
            Page(current - 1),
            Page(current),
            Page(current + 1),
            Ellipsis,
            Page(last),
        ]
    }
}

/// One-based "showing X to Y of N" bounds; `None` for an empty listing
pub fn item_range(page: u32, size: u32, total_elements: u64) -> Option<(u64, u64)> {
    let start = u64::from(page) * u64::from(size) + 1;
    if total_elements == 0 || start > total_elements {
        return None;
    }
    let end = (u64::from(page) + 1) * u64::from(size);
    Some((start, end.min(total_elements)))
}

/// Page index, size, sort and last known totals of one listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListState {
    page: u32,
    size: u32,
    sort_by: String,
    sort_dir: SortDir,
    total_elements: u64,
    total_pages: u32,
}

impl Default for ListState {
    fn default() -> Self {
        Self::new(10)
    }
}

impl ListState {
    pub fn new(size: u32) -> Self {
        Self {
            page: 0,
            size: size.max(1),
            sort_by: "id".to_string(),
            sort_dir: SortDir::Asc,
            total_elements: 0,
            total_pages: 0,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn sort_by(&self) -> &str {
        &self.sort_by
    }

    pub fn sort_dir(&self) -> SortDir {
        self.sort_dir
    }

    pub fn total_elements(&self) -> u64 {
        self.total_elements
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Request for the current state
    pub fn request(&self) -> PageRequest {
        PageRequest {
            page: self.page,
            size: self.size,
            sort_by: self.sort_by.clone(),
            sort_dir: self.sort_dir,
        }
    }

    /// Jump to `page`, clamped to the known page count
    pub fn go_to(&mut self, page: u32) {
        self.page = match self.total_pages {
            0 => page,
            total => page.min(total - 1),
        };
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    pub fn next(&mut self) {
        if self.has_next() {
            self.page += 1;
        }
    }

    pub fn previous(&mut self) {
        self.page = self.page.saturating_sub(1);
    }

    /// New page size; back to the first page
    pub fn set_size(&mut self, size: u32) {
        self.size = size.max(1);
        self.page = 0;
    }

    /// Sort by `field`: same field toggles direction, a new one starts
    /// ascending. Back to the first page either way.
    pub fn sort(&mut self, field: &str) {
        if self.sort_by == field {
            self.sort_dir = self.sort_dir.toggled();
        } else {
            self.sort_by = field.to_string();
            self.sort_dir = SortDir::Asc;
        }
        self.page = 0;
    }

    pub fn reset(&mut self) {
        self.page = 0;
    }

    /// Record totals from a fetched page
    pub fn record<T>(&mut self, page: &Page<T>) {
        self.total_elements = page.total_elements;
        self.total_pages = page.total_pages;
    }

    pub fn window(&self) -> Vec<PageItem> {
        page_window(self.page, self.total_pages)
    }

    pub fn range(&self) -> Option<(u64, u64)> {
        item_range(self.page, self.size, self.total_elements)
    }

    /// Whether a page bar is worth showing
    pub fn is_paginated(&self) -> bool {
        self.total_pages > 1
    }
}
