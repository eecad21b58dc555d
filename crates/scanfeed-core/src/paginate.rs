//! Newest-first paging over an oldest-first log. Page 1 holds the most recent
//! `size` records; each page keeps chronological order internally.

use std::fmt;
use std::ops::Range;

pub const PAGE_SIZE_OPTIONS: [usize; 4] = [10, 20, 50, 100];
pub const DEFAULT_PAGE_SIZE: usize = 20;

pub fn total_pages(total: usize, size: usize) -> usize {
    if size == 0 {
        return 0;
    }
    total.div_ceil(size)
}

/// `[max(end - size, 0), end)` with `end = total - (page - 1) * size`.
pub fn page_bounds(total: usize, size: usize, page: usize) -> Range<usize> {
    let page = page.max(1);
    let skipped = (page - 1).saturating_mul(size);
    let end = total.saturating_sub(skipped);
    let start = end.saturating_sub(size);
    start..end
}

pub fn paginate<T>(items: &[T], size: usize, page: usize) -> &[T] {
    &items[page_bounds(items.len(), size, page)]
}

pub fn clamp_page(page: usize, total: usize, size: usize) -> usize {
    page.clamp(1, total_pages(total, size).max(1))
}

pub fn next_page_size(size: usize) -> usize {
    let index = PAGE_SIZE_OPTIONS
        .iter()
        .position(|option| *option == size)
        .map_or(0, |index| (index + 1) % PAGE_SIZE_OPTIONS.len());
    PAGE_SIZE_OPTIONS[index]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSummary {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
    /// 1-based position of the newest record on the page, counted from the
    /// newest record overall; 0 when there are no records.
    pub first_record: usize,
    pub last_record: usize,
}

impl PageSummary {
    pub fn new(total: usize, size: usize, page: usize) -> Self {
        let page = clamp_page(page, total, size);
        let (first_record, last_record) = if total == 0 || size == 0 {
            (0, 0)
        } else {
            let first = (page - 1) * size + 1;
            (first, (page * size).min(total))
        };
        Self {
            page,
            page_size: size,
            total,
            total_pages: total_pages(total, size),
            first_record,
            last_record,
        }
    }

    pub fn has_newer(&self) -> bool {
        self.page > 1
    }

    pub fn has_older(&self) -> bool {
        self.page < self.total_pages
    }
}

impl fmt::Display for PageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Showing {}-{} of {}",
            self.first_record, self.last_record, self.total
        )
    }
}
