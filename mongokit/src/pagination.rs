//! Page-number pagination for find queries.

use mongodb::options::FindOptions;
use serde::{Deserialize, Serialize};

/// Page size used when a request asks for size 0.
pub const DEFAULT_PAGE_SIZE: u64 = 5;

/// Largest page size handed to the server.
pub const MAX_PAGE_SIZE: u64 = 100;

/// A requested page.
///
/// Pages are 1-based. Page 0 means "no paging": the query returns every match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Paging {
    /// 1-based page number.
    #[serde(default)]
    pub page: u64,
    /// Documents per page.
    #[serde(default)]
    pub size: u64,
}

/// The limit and skip for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Documents to return.
    pub limit: u64,
    /// Documents to skip.
    pub skip: u64,
}

impl Paging {
    /// Create a page request.
    pub fn new(page: u64, size: u64) -> Self {
        Self { page, size }
    }

    /// Whether the request selects a page at all.
    pub fn is_paged(&self) -> bool {
        self.page > 0
    }

    /// Page size after defaulting and clamping to `max_size`.
    pub fn effective_size(&self, max_size: u64) -> u64 {
        let size = if self.size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.size
        };
        size.min(max_size.max(1))
    }

    /// Limit and skip for this page, or `None` when unpaged.
    pub fn window(&self, max_size: u64) -> Option<PageWindow> {
        if !self.is_paged() {
            return None;
        }
        let limit = self.effective_size(max_size);
        Some(PageWindow {
            limit,
            skip: (self.page - 1).saturating_mul(limit),
        })
    }

    /// Set limit and skip on `options`, capping the size at [`MAX_PAGE_SIZE`].
    pub fn apply(&self, options: &mut FindOptions) {
        self.apply_with_cap(options, MAX_PAGE_SIZE);
    }

    /// Set limit and skip on `options` with a custom size cap.
    ///
    /// Unpaged requests leave `options` untouched.
    pub fn apply_with_cap(&self, options: &mut FindOptions, max_size: u64) {
        if let Some(window) = self.window(max_size) {
            options.limit = Some(i64::try_from(window.limit).unwrap_or(i64::MAX));
            options.skip = Some(window.skip);
        }
    }

    /// Build fresh find options for this page.
    pub fn find_options(&self) -> FindOptions {
        let mut options = FindOptions::default();
        self.apply(&mut options);
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_zero_is_unpaged() {
        let mut options = FindOptions::default();
        Paging::new(0, 50).apply(&mut options);

        assert_eq!(options.limit, None);
        assert_eq!(options.skip, None);
    }

    #[test]
    fn test_size_clamped_to_cap() {
        let mut options = FindOptions::default();
        Paging::new(3, 200).apply(&mut options);

        assert_eq!(options.limit, Some(100));
        assert_eq!(options.skip, Some(200));
    }

    #[test]
    fn test_zero_size_uses_default() {
        let window = Paging::new(2, 0).window(MAX_PAGE_SIZE).unwrap();
        assert_eq!(window, PageWindow { limit: 5, skip: 5 });
    }

    #[test]
    fn test_first_page_skips_nothing() {
        let options = Paging::new(1, 20).find_options();
        assert_eq!(options.limit, Some(20));
        assert_eq!(options.skip, Some(0));
    }

    #[test]
    fn test_custom_cap() {
        let window = Paging::new(4, 30).window(10).unwrap();
        assert_eq!(window, PageWindow { limit: 10, skip: 30 });
    }

    #[test]
    fn test_huge_page_does_not_overflow() {
        let window = Paging::new(u64::MAX, 100).window(MAX_PAGE_SIZE).unwrap();
        assert_eq!(window.skip, u64::MAX);
    }
}
