use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// `?page=&limit=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    /// 1-based page, never below 1
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Saturates instead of overflowing on absurd page numbers
    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    pub fn describe(&self, total: i64) -> Pagination {
        let limit = self.limit();
        Pagination {
            total,
            total_pages: total.saturating_add(limit - 1) / limit,
            current_page: self.page(),
            limit,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub limit: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = PageParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let params = PageParams {
            page: Some(-3),
            limit: Some(10_000),
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), MAX_PAGE_SIZE);

        let params = PageParams {
            page: Some(3),
            limit: Some(0),
        };
        assert_eq!(params.limit(), 1);
        assert_eq!(params.offset(), 2);
    }

    #[test]
    fn test_huge_page_does_not_overflow() {
        let params = PageParams {
            page: Some(i64::MAX),
            limit: Some(10),
        };
        assert_eq!(params.offset(), i64::MAX);
        assert_eq!(params.describe(5).current_page, i64::MAX);

        let params = PageParams {
            page: Some(i64::MAX),
            limit: Some(MAX_PAGE_SIZE),
        };
        assert!(params.offset() >= 0);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let params = PageParams {
            page: Some(2),
            limit: Some(10),
        };
        assert_eq!(params.offset(), 10);

        let pagination = params.describe(21);
        assert_eq!(pagination.total_pages, 3);
        assert_eq!(pagination.current_page, 2);

        assert_eq!(params.describe(0).total_pages, 0);
    }
}
