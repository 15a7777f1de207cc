//! Pagination engine.
//!
//! Converts a page/limit request into a row-window descriptor and computes
//! response metadata from a row count. The window is derived once per request
//! and reused for both the row fetch and the metadata, so the two can never
//! disagree about which page was served.

use serde::Serialize;

/// Smallest accepted page size.
pub const MIN_LIMIT: i64 = 5;
/// Largest accepted page size.
pub const MAX_LIMIT: i64 = 50;
/// Page size used when the request does not specify one.
pub const DEFAULT_LIMIT: i64 = 25;
/// First page number; pages are 1-based.
pub const FIRST_PAGE: i64 = 1;

/// A validated page/limit pair.
///
/// The constructor clamps so that `page >= 1` and `limit` lies in
/// [`MIN_LIMIT`]..=[`MAX_LIMIT`] always hold. HTTP-facing DTOs reject
/// out-of-range input with a validation error before constructing one of
/// these; programmatic callers get clamping instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    page: i64,
    limit: i64,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: FIRST_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageParams {
    /// Build params, clamping into the valid range.
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.max(FIRST_PAGE),
            limit: limit.clamp(MIN_LIMIT, MAX_LIMIT),
        }
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// Rows to skip before the requested page starts.
    ///
    /// Saturates at `i64::MAX`: an absurdly large page is still a valid page,
    /// and pages past the end serve empty items rather than failing.
    pub fn offset(&self) -> i64 {
        (self.page - FIRST_PAGE).saturating_mul(self.limit)
    }

    /// The offset/limit window handed to the storage layer.
    pub fn window(&self) -> PageWindow {
        PageWindow {
            offset: self.offset(),
            limit: self.limit,
        }
    }

    /// Compute response metadata for a total row count.
    ///
    /// A `page` beyond the last page is accepted as-is: the caller gets empty
    /// items and metadata computed from the requested page, never a clamped
    /// one.
    pub fn meta(&self, total_items: i64) -> PageMeta {
        let total_items = total_items.max(0);
        let total_pages = if total_items == 0 {
            0
        } else {
            (total_items + self.limit - 1) / self.limit
        };
        let has_next_page = self.page < total_pages;
        let has_previous_page = self.page > FIRST_PAGE;

        PageMeta {
            page: self.page,
            limit: self.limit,
            total_items,
            total_pages,
            has_next_page,
            has_previous_page,
            next_page: has_next_page.then(|| self.page + 1),
            previous_page: has_previous_page.then(|| self.page - 1),
            first_page: FIRST_PAGE,
            last_page: total_pages,
        }
    }

    /// Wrap a fetched window of rows with its metadata.
    pub fn paginate<T>(&self, items: Vec<T>, total_items: i64) -> Page<T> {
        Page {
            meta: self.meta(total_items),
            items,
        }
    }
}

/// Offset/limit pair consumed by the storage layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: i64,
    pub limit: i64,
}

/// Metadata accompanying every paginated response. Never persisted; computed
/// fresh from `(page, limit, total_items)` on each query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: i64,
    pub limit: i64,
    pub total_items: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub next_page: Option<i64>,
    pub previous_page: Option<i64>,
    pub first_page: i64,
    pub last_page: i64,
}

/// One page of results plus its metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_derived_from_page_and_limit() {
        let params = PageParams::new(3, 10);
        assert_eq!(params.offset(), 20);
        assert_eq!(
            params.window(),
            PageWindow {
                offset: 20,
                limit: 10
            }
        );
    }

    #[test]
    fn defaults_are_page_one_limit_twenty_five() {
        let params = PageParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 25);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn constructor_clamps_out_of_range_values() {
        let params = PageParams::new(0, 1000);
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), MAX_LIMIT);

        let params = PageParams::new(-7, 1);
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), MIN_LIMIT);
    }

    #[test]
    fn meta_counts_pages_with_ceiling_division() {
        let params = PageParams::new(1, 10);
        assert_eq!(params.meta(100).total_pages, 10);
        assert_eq!(params.meta(101).total_pages, 11);
        assert_eq!(params.meta(9).total_pages, 1);
        assert_eq!(params.meta(10).total_pages, 1);
    }

    #[test]
    fn meta_for_empty_result_set() {
        let params = PageParams::new(1, 25);
        let meta = params.meta(0);
        assert_eq!(meta.total_items, 0);
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.has_next_page);
        assert!(!meta.has_previous_page);
        assert_eq!(meta.next_page, None);
        assert_eq!(meta.previous_page, None);
        assert_eq!(meta.first_page, 1);
        assert_eq!(meta.last_page, 0);
    }

    #[test]
    fn empty_result_set_on_a_later_page_still_reports_previous() {
        let meta = PageParams::new(4, 25).meta(0);
        assert!(!meta.has_next_page);
        assert!(meta.has_previous_page);
        assert_eq!(meta.previous_page, Some(3));
    }

    #[test]
    fn offset_saturates_instead_of_overflowing() {
        let params = PageParams::new(i64::MAX, 50);
        assert_eq!(params.offset(), i64::MAX);
        assert_eq!(params.window().offset, i64::MAX);

        let meta = params.meta(30);
        assert_eq!(meta.page, i64::MAX);
        assert!(!meta.has_next_page);
        assert!(meta.has_previous_page);
    }

    #[test]
    fn page_beyond_last_is_not_clamped() {
        let params = PageParams::new(9, 10);
        let page = params.paginate(Vec::<i32>::new(), 30);
        assert!(page.items.is_empty());
        assert_eq!(page.meta.page, 9);
        assert_eq!(page.meta.total_pages, 3);
        assert!(!page.meta.has_next_page);
        assert!(page.meta.has_previous_page);
    }

    #[test]
    fn middle_page_links_both_ways() {
        let meta = PageParams::new(2, 10).meta(35);
        assert_eq!(meta.total_pages, 4);
        assert!(meta.has_next_page);
        assert!(meta.has_previous_page);
        assert_eq!(meta.next_page, Some(3));
        assert_eq!(meta.previous_page, Some(1));
        assert_eq!(meta.last_page, 4);
    }

    #[test]
    fn meta_serializes_camel_case_with_null_links() {
        let value = serde_json::to_value(PageParams::new(1, 25).meta(0)).unwrap();
        assert_eq!(value["totalItems"], 0);
        assert_eq!(value["hasNextPage"], false);
        assert!(value["nextPage"].is_null());
        assert_eq!(value["firstPage"], 1);
    }
}
