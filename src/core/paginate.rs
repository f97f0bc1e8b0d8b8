//! Page arithmetic for list and report results

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 500;

/// Page metadata attached to paginated envelopes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub current_page: usize,
    pub page_size: usize,
    pub total_count: usize,
    pub total_pages: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page: Option<usize>,
    pub next_page: Option<usize>,
    /// 1-based index of the first row on this page (0 when empty)
    pub start_index: usize,
    /// 1-based index of the last row on this page
    pub end_index: usize,
}

/// A requested page, already clamped into range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page: usize,
    page_size: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Paginator {
    /// Clamp page to >= 1 and page size to 1..=MAX_PAGE_SIZE
    pub fn new(page: i64, page_size: i64) -> Self {
        Self::with_max(page, page_size, MAX_PAGE_SIZE)
    }

    /// Like [`Paginator::new`] with a lower configured ceiling
    pub fn with_max(page: i64, page_size: i64, max_page_size: usize) -> Self {
        let max = max_page_size.clamp(1, MAX_PAGE_SIZE) as i64;
        Self {
            page: page.max(1) as usize,
            page_size: page_size.clamp(1, max) as usize,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    fn total_pages(&self, total: usize) -> usize {
        if total == 0 {
            1
        } else {
            total.div_ceil(self.page_size)
        }
    }

    /// Page actually served: requests past the end land on the last page
    fn effective_page(&self, total: usize) -> usize {
        self.page.min(self.total_pages(total))
    }

    pub fn offset(&self, total: usize) -> usize {
        (self.effective_page(total) - 1) * self.page_size
    }

    pub fn page_info(&self, total: usize) -> PageInfo {
        let total_pages = self.total_pages(total);
        let page = self.effective_page(total);
        let start = self.offset(total);
        let end = (start + self.page_size).min(total);
        PageInfo {
            current_page: page,
            page_size: self.page_size,
            total_count: total,
            total_pages,
            has_previous: page > 1,
            has_next: page < total_pages,
            previous_page: (page > 1).then(|| page - 1),
            next_page: (page < total_pages).then(|| page + 1),
            start_index: if total == 0 { 0 } else { start + 1 },
            end_index: end,
        }
    }

    /// Cut one page out of a full result set
    pub fn paginate<T>(&self, items: Vec<T>) -> (Vec<T>, PageInfo) {
        let info = self.page_info(items.len());
        let page = items
            .into_iter()
            .skip(self.offset(info.total_count))
            .take(self.page_size)
            .collect();
        (page, info)
    }
}
