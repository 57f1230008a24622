//! Common API utilities and shared types

use serde::{Deserialize, Serialize};

use crate::api::middleware::ApiError;
use crate::models::PagedResult;

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

/// Query parameters of the article index
#[derive(Debug, Deserialize)]
pub struct ArticleListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    /// `Title`, `Author` or `DateCreation`; anything else sorts by date
    #[serde(default)]
    pub sort: Option<String>,
}

/// Paged response body
#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> From<PagedResult<T>> for PageResponse<T> {
    fn from(result: PagedResult<T>) -> Self {
        let total_pages = result.total_pages();
        let has_next = result.has_next();
        let has_prev = result.has_prev();
        Self {
            items: result.items,
            total: result.total,
            page: result.page,
            per_page: result.per_page,
            total_pages,
            has_next,
            has_prev,
        }
    }
}

/// Reject update bodies addressed to a different resource than the URL
pub fn ensure_same_id(path_id: i64, body_id: i64) -> Result<(), ApiError> {
    if path_id != body_id {
        return Err(ApiError::with_details(
            "VALIDATION_ERROR",
            "Path id does not match body id",
            serde_json::json!({ "path_id": path_id, "body_id": body_id }),
        ));
    }
    Ok(())
}
