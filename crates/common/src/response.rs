//! API response envelope
//!
//! Every endpoint answers with the same shape:
//! `{ success, count?, pagination?, data?, message?, errors? }`.
//! Record payloads expose the storage identifier as a public `id` string and
//! never carry internal version metadata.

use serde::Serialize;

/// Success envelope wrapping a payload
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageMeta>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Envelope carrying a data payload
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            count: None,
            pagination: None,
            data: Some(data),
            message: None,
        }
    }

    /// Envelope carrying only a message
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            count: None,
            pagination: None,
            data: None,
            message: Some(message.into()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_pagination(mut self, pagination: PageMeta) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

/// Pagination metadata for list responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    /// Current page (1-based)
    pub current: u64,

    /// Total number of pages
    pub total: u64,

    /// Page size used for the query
    pub limit: u64,

    /// Total matching items across all pages
    pub total_items: u64,

    pub has_next: bool,
    pub has_prev: bool,
}

impl PageMeta {
    /// Build metadata from the current page, page size, and total item count
    pub fn new(current: u64, limit: u64, total_items: u64) -> Self {
        let total = total_items.div_ceil(limit.max(1));
        Self {
            current,
            total,
            limit,
            total_items,
            has_next: current < total,
            has_prev: current > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_meta_ceil() {
        let meta = PageMeta::new(1, 10, 25);
        assert_eq!(meta.total, 3);
        assert_eq!(meta.total_items, 25);
        assert!(meta.has_next);
        assert!(!meta.has_prev);
    }

    #[test]
    fn test_page_meta_last_page() {
        let meta = PageMeta::new(3, 10, 25);
        assert!(!meta.has_next);
        assert!(meta.has_prev);
    }

    #[test]
    fn test_page_meta_empty() {
        let meta = PageMeta::new(1, 20, 0);
        assert_eq!(meta.total, 0);
        assert!(!meta.has_next);
        assert!(!meta.has_prev);
    }

    #[test]
    fn test_envelope_shape() {
        let body = ApiResponse::data(vec![1, 2, 3])
            .with_count(3)
            .with_pagination(PageMeta::new(1, 10, 3));
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["count"], 3);
        assert_eq!(json["pagination"]["totalItems"], 3);
        assert_eq!(json["pagination"]["hasNext"], false);
        assert!(json.get("message").is_none());
    }

    #[test]
    fn test_message_only_envelope() {
        let body: ApiResponse<()> = ApiResponse::message("Article and citations deleted");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Article and citations deleted");
        assert!(json.get("data").is_none());
    }
}
