//! Pagination envelope shared by all list endpoints.
//!
//! Responses use the shape `{ data: [...], meta: { current_page, last_page,
//! per_page, total } }`.

use serde::{Deserialize, Serialize};

/// Hard ceiling on page size, regardless of what the client asks for.
pub const MAX_PER_PAGE: u32 = 100;

/// Query-string pagination parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageParams {
    /// Build from already-extracted query fields.
    #[must_use]
    pub const fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self { page, per_page }
    }

    /// Resolve to a concrete (page, `per_page`) pair, clamping `per_page`
    /// to [1, [`MAX_PER_PAGE`]] and page to at least 1.
    #[must_use]
    pub fn resolve(self, default_per_page: u32) -> (u32, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self
            .per_page
            .unwrap_or(default_per_page)
            .clamp(1, MAX_PER_PAGE);
        (page, per_page)
    }

    /// SQL LIMIT/OFFSET for the resolved page.
    #[must_use]
    pub fn limit_offset(self, default_per_page: u32) -> (i64, i64) {
        let (page, per_page) = self.resolve(default_per_page);
        (
            i64::from(per_page),
            i64::from(per_page) * (i64::from(page) - 1),
        )
    }
}

/// Pagination metadata.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub last_page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// A page of results.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    /// Assemble a page from query results and a total row count.
    #[must_use]
    pub fn new(data: Vec<T>, total: i64, params: PageParams, default_per_page: u32) -> Self {
        let (current_page, per_page) = params.resolve(default_per_page);
        let total_nonneg = u64::try_from(total.max(0)).unwrap_or(0);
        let last_page = u32::try_from(total_nonneg.div_ceil(u64::from(per_page)))
            .unwrap_or(u32::MAX)
            .max(1);
        Self {
            data,
            meta: PageMeta {
                current_page,
                last_page,
                per_page,
                total,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = PageParams::default();
        assert_eq!(params.resolve(12), (1, 12));
        assert_eq!(params.limit_offset(12), (12, 0));
    }

    #[test]
    fn test_per_page_is_clamped() {
        let params = PageParams {
            page: Some(2),
            per_page: Some(10_000),
        };
        assert_eq!(params.resolve(12), (2, MAX_PER_PAGE));
        assert_eq!(
            params.limit_offset(12),
            (i64::from(MAX_PER_PAGE), i64::from(MAX_PER_PAGE))
        );
    }

    #[test]
    fn test_zero_values_are_normalized() {
        let params = PageParams {
            page: Some(0),
            per_page: Some(0),
        };
        assert_eq!(params.resolve(12), (1, 1));
    }

    #[test]
    fn test_last_page_computation() {
        let page = Page::new(vec![1, 2, 3], 31, PageParams::default(), 15);
        assert_eq!(page.meta.last_page, 3);

        let empty: Page<i32> = Page::new(vec![], 0, PageParams::default(), 15);
        assert_eq!(empty.meta.last_page, 1);
    }
}
