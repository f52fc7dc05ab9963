//! Pagination and sorting shared by every list query

use serde::{Deserialize, Serialize};

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl ListParams {
    /// Largest page size a caller may request
    pub const MAX_PER_PAGE: u32 = 100;

    /// Create new pagination parameters, clamping out-of-range values
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, Self::MAX_PER_PAGE),
        }
    }

    /// Offset for database queries
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }

    /// Limit for database queries
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of matching items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Total number of pages (0 when there are no items)
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 || self.total <= 0 {
            return 0;
        }
        let per_page = i64::from(self.per_page);
        ((self.total + per_page - 1) / per_page) as u32
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Transform the items while keeping the pagination metadata
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

impl<T> Default for PagedResult<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            per_page: 10,
        }
    }
}

/// Ordering for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    Title,
    /// Most viewed first. Only documents track views; other entities fall back to newest.
    Popular,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Newest => "newest",
            SortOrder::Oldest => "oldest",
            SortOrder::Title => "title",
            SortOrder::Popular => "popular",
        }
    }

    /// Parse a query-string value; unknown values yield `None`
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "newest" | "latest" => Some(SortOrder::Newest),
            "oldest" => Some(SortOrder::Oldest),
            "title" => Some(SortOrder::Title),
            "popular" => Some(SortOrder::Popular),
            _ => None,
        }
    }

    /// `ORDER BY` clause for tables with `created_at` and `title` columns.
    ///
    /// `id` breaks ties so that pages never overlap.
    pub fn order_by(&self, has_view_count: bool) -> &'static str {
        match self {
            SortOrder::Oldest => "ORDER BY created_at ASC, id ASC",
            SortOrder::Title => "ORDER BY title ASC, id ASC",
            SortOrder::Popular if has_view_count => "ORDER BY view_count DESC, id DESC",
            SortOrder::Newest | SortOrder::Popular => "ORDER BY created_at DESC, id DESC",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_list_params_clamp() {
        let params = ListParams::new(0, 0);
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 1);

        let params = ListParams::new(3, 500);
        assert_eq!(params.per_page, 100);
        assert_eq!(params.offset(), 200);
        assert_eq!(params.limit(), 100);
    }

    #[test]
    fn test_paged_result_navigation() {
        let params = ListParams::new(2, 10);
        let result = PagedResult::new(vec![1; 10], 25, &params);
        assert_eq!(result.total_pages(), 3);
        assert!(result.has_next());
        assert!(result.has_prev());

        let empty: PagedResult<i32> = PagedResult::new(vec![], 0, &ListParams::default());
        assert_eq!(empty.total_pages(), 0);
        assert!(!empty.has_next());
        assert!(!empty.has_prev());
    }

    #[test]
    fn test_map_keeps_metadata() {
        let result = PagedResult::new(vec![1, 2], 12, &ListParams::new(1, 2));
        let mapped = result.map(|n| n.to_string());
        assert_eq!(mapped.items, vec!["1".to_string(), "2".to_string()]);
        assert_eq!(mapped.total, 12);
        assert_eq!(mapped.total_pages(), 6);
    }

    #[test]
    fn test_sort_order_parse() {
        assert_eq!(SortOrder::parse("Popular"), Some(SortOrder::Popular));
        assert_eq!(SortOrder::parse("latest"), Some(SortOrder::Newest));
        assert_eq!(SortOrder::parse("random"), None);
        assert_eq!(SortOrder::Popular.order_by(false), SortOrder::Newest.order_by(false));
    }

    proptest! {
        #[test]
        fn pages_cover_total(total in 0i64..10_000, per_page in 1u32..=100) {
            let params = ListParams::new(1, per_page);
            let result: PagedResult<()> = PagedResult::new(vec![], total, &params);
            let pages = i64::from(result.total_pages());

            // Every item fits and no page is entirely empty
            prop_assert!(pages * i64::from(per_page) >= total);
            prop_assert!(pages == 0 || (pages - 1) * i64::from(per_page) < total);
        }

        #[test]
        fn offset_matches_page(page in 1u32..10_000, per_page in 1u32..=100) {
            let params = ListParams::new(page, per_page);
            prop_assert_eq!(params.offset(), i64::from(page - 1) * i64::from(per_page));
        }
    }
}
