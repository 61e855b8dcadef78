//! Page arithmetic for paginated listings.

/// Maximum number of page links shown at once.
const WINDOW: u32 = 5;

/// A resolved page of a listing.
///
/// Out-of-range page requests resolve to the first page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page, 1-based.
    pub page: u32,
    /// Total number of pages (at least 1).
    pub num_pages: u32,
    /// Items per page.
    pub per_page: u32,
}

impl Pagination {
    /// Resolve a requested page against a total item count.
    #[must_use]
    pub fn new(requested: Option<u32>, total_items: u64, per_page: u32) -> Self {
        let per_page = per_page.max(1);
        let num_pages = u32::try_from(total_items.div_ceil(u64::from(per_page)))
            .unwrap_or(u32::MAX)
            .max(1);
        let page = match requested {
            Some(p) if (1..=num_pages).contains(&p) => p,
            _ => 1,
        };
        Self {
            page,
            num_pages,
            per_page,
        }
    }

    /// Row offset of the current page.
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }

    /// Row limit of the current page.
    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    /// Whether a previous page exists.
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// Whether a next page exists.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.num_pages
    }

    /// Page numbers to link to: at most five, centred on the current page
    /// where possible.
    #[must_use]
    pub fn window(&self) -> Vec<u32> {
        if self.num_pages <= WINDOW {
            return (1..=self.num_pages).collect();
        }
        let start = if self.page <= 3 {
            1
        } else if self.num_pages - self.page <= 2 {
            self.num_pages - WINDOW + 1
        } else {
            self.page - 2
        };
        (start..start + WINDOW).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_listing_has_one_page() {
        let p = Pagination::new(None, 0, 2);
        assert_eq!(p.page, 1);
        assert_eq!(p.num_pages, 1);
        assert_eq!(p.window(), vec![1]);
        assert!(!p.has_previous());
        assert!(!p.has_next());
    }

    #[test]
    fn test_out_of_range_falls_back_to_first_page() {
        assert_eq!(Pagination::new(Some(9), 5, 2).page, 1);
        assert_eq!(Pagination::new(Some(0), 5, 2).page, 1);
        assert_eq!(Pagination::new(Some(3), 5, 2).page, 3);
    }

    #[test]
    fn test_offset_and_limit() {
        let p = Pagination::new(Some(3), 10, 2);
        assert_eq!(p.offset(), 4);
        assert_eq!(p.limit(), 2);
    }

    #[test]
    fn test_window_positions() {
        // 10 pages of 1 item each
        let at = |page| Pagination::new(Some(page), 10, 1).window();
        assert_eq!(at(1), vec![1, 2, 3, 4, 5]);
        assert_eq!(at(3), vec![1, 2, 3, 4, 5]);
        assert_eq!(at(6), vec![4, 5, 6, 7, 8]);
        assert_eq!(at(8), vec![6, 7, 8, 9, 10]);
        assert_eq!(at(10), vec![6, 7, 8, 9, 10]);
        assert_eq!(Pagination::new(Some(2), 3, 1).window(), vec![1, 2, 3]);
    }
}
