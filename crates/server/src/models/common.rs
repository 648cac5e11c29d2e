use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, AppResult};

/// Default page size
pub const PAGINATION_NUMBER: i64 = 15;
/// Largest page size a client may request
pub const MAX_PAGINATION_NUMBER: i64 = 100;
/// Largest page number a client may request
pub const MAX_PAGE: i64 = 1_000_000;

/// Dates rendered for humans (lending history)
pub const DEFAULT_DATE_FORMAT: &str = "%d/%m/%Y";

fn default_page() -> i64 {
    1
}

fn default_size() -> i64 {
    PAGINATION_NUMBER
}

/// Page selection query parameters
#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
pub struct PageParams {
    /// Page number, starting at 1
    #[serde(default = "default_page")]
    pub page: i64,
    /// Page size (1-100, default 15)
    #[serde(default = "default_size")]
    pub size: i64,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            size: default_size(),
        }
    }
}

impl PageParams {
    pub fn new(page: i64, size: i64) -> Self {
        Self { page, size }
    }

    pub fn validate(&self) -> AppResult<()> {
        let mut errors = Vec::new();
        if self.page < 1 {
            errors.push(crate::error::FieldError::new(
                "page",
                "Deve ser maior ou igual a 1",
            ));
        } else if self.page > MAX_PAGE {
            errors.push(crate::error::FieldError::new(
                "page",
                format!("Deve ser menor ou igual a {}", MAX_PAGE),
            ));
        }
        if !(1..=MAX_PAGINATION_NUMBER).contains(&self.size) {
            errors.push(crate::error::FieldError::new(
                "size",
                format!("Deve estar entre 1 e {}", MAX_PAGINATION_NUMBER),
            ));
        }
        AppError::check(errors)
    }

    pub fn limit(&self) -> i64 {
        self.size
    }

    pub fn offset(&self) -> i64 {
        self.page
            .saturating_sub(1)
            .max(0)
            .saturating_mul(self.size.max(0))
    }
}

/// A page of results
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
    pub pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, params: PageParams) -> Self {
        let pages = if total == 0 {
            0
        } else {
            (total + params.size - 1) / params.size
        };

        Self {
            items,
            total,
            page: params.page,
            size: params.size,
            pages,
        }
    }
}

/// Fixed catalogue entry (statuses, workloads, actions)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct CatalogItem {
    pub id: i64,
    pub name: String,
}

/// Case-insensitive `search` filter for small lists
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SearchParams {
    pub search: Option<String>,
}

/// Plain message response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Calendar date right now in `timezone`.
pub fn today(timezone: Tz) -> NaiveDate {
    Utc::now().with_timezone(&timezone).date_naive()
}

/// `%term%` for LIKE comparisons, or None for blank input.
pub fn like_pattern(term: Option<&str>) -> Option<String> {
    term.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| format!("%{}%", t))
}

/// Zero-padded sequence number used for generated registrations and
/// register numbers. The width shrinks as the number grows.
pub fn padded_sequence(n: i64) -> String {
    let digits = n.to_string();
    let width = 16usize.saturating_sub(digits.len());
    format!("{:0>width$}", digits, width = width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_sequence() {
        assert_eq!(padded_sequence(7), "000000000000007");
        assert_eq!(padded_sequence(1234), "000000001234");
    }

    #[test]
    fn test_page_math() {
        let params = PageParams::new(2, 15);
        assert_eq!(params.offset(), 15);

        let page: Page<i32> = Page::new(vec![], 31, params);
        assert_eq!(page.pages, 3);

        let empty: Page<i32> = Page::new(vec![], 0, PageParams::default());
        assert_eq!(empty.pages, 0);
    }

    #[test]
    fn test_page_validation() {
        assert!(PageParams::new(1, 100).validate().is_ok());
        assert!(PageParams::new(0, 15).validate().is_err());
        assert!(PageParams::new(1, 101).validate().is_err());
        assert!(PageParams::new(1, 0).validate().is_err());
        assert!(PageParams::new(MAX_PAGE, 100).validate().is_ok());
        assert!(PageParams::new(MAX_PAGE + 1, 15).validate().is_err());
    }

    #[test]
    fn test_offset_does_not_overflow() {
        let params = PageParams::new(i64::MAX, 15);
        assert_eq!(params.offset(), i64::MAX);
        assert_eq!(PageParams::new(i64::MIN, 15).offset(), 0);
    }

    #[test]
    fn test_like_pattern() {
        assert_eq!(like_pattern(Some(" note ")), Some("%note%".to_string()));
        assert_eq!(like_pattern(Some("  ")), None);
        assert_eq!(like_pattern(None), None);
    }
}
