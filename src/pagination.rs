//! Page-number pagination shared by the report and audit list endpoints.

use crate::config::PaginationConfig;
use serde::{Deserialize, Serialize};

/// A normalized page request: `page >= 1`, `1 <= limit <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    /// Normalize raw query values against the configured bounds.
    ///
    /// A missing page becomes 1 and pages below 1 are raised to 1. A missing
    /// limit takes the configured default; any limit is clamped into
    /// `1..=max_limit`.
    pub fn new(page: Option<u32>, limit: Option<u32>, bounds: PaginationConfig) -> Self {
        let max = bounds.max_limit.max(1);
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(bounds.default_limit).clamp(1, max),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Rows to skip for this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

/// Pagination metadata returned next to every list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    pub fn new(request: PageRequest, total: u64) -> Self {
        Self {
            page: request.page,
            limit: request.limit,
            total,
            pages: total.div_ceil(u64::from(request.limit)),
        }
    }
}

/// One page of items plus its metadata.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            pagination: Pagination::new(request, total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> PaginationConfig {
        PaginationConfig {
            default_limit: 20,
            max_limit: 100,
        }
    }

    #[test]
    fn defaults_apply_when_absent() {
        let request = PageRequest::new(None, None, bounds());
        assert_eq!(request.page(), 1);
        assert_eq!(request.limit(), 20);
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn page_and_limit_are_clamped() {
        let request = PageRequest::new(Some(0), Some(10_000), bounds());
        assert_eq!(request.page(), 1);
        assert_eq!(request.limit(), 100);

        let request = PageRequest::new(Some(3), Some(0), bounds());
        assert_eq!(request.limit(), 1);
        assert_eq!(request.offset(), 2);
    }

    #[test]
    fn pages_is_ceiling_of_total_over_limit() {
        for (total, limit, expected) in [(0, 20, 0), (1, 20, 1), (20, 20, 1), (21, 20, 2), (3, 1, 3)] {
            let request = PageRequest::new(Some(1), Some(limit), bounds());
            assert_eq!(Pagination::new(request, total).pages, expected, "total={total} limit={limit}");
        }
    }

    #[test]
    fn page_past_the_end_keeps_metadata() {
        let request = PageRequest::new(Some(5), Some(20), bounds());
        let page: Page<u8> = Page::new(Vec::new(), request, 3);
        assert!(page.items.is_empty());
        assert_eq!(
            page.pagination,
            Pagination {
                page: 5,
                limit: 20,
                total: 3,
                pages: 1
            }
        );
        assert_eq!(request.offset(), 80);
    }
}
