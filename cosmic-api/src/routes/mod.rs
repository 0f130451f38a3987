/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, token refresh, own profile
/// - `portfolio`: Project gallery CRUD, likes, comments
/// - `guestbook`: Public guestbook with moderation
/// - `contact`: Contact form intake and admin review
/// - `users`: Public profiles, leaderboard, admin user management
/// - `analytics`: Event ingest and the admin dashboard
/// - `live`: SSE live event feed
///
/// Shared plumbing lives here: the `{success, message, data}` response
/// envelope, pagination math, request validation mapping, and client
/// address extraction.

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{ApiError, ValidationErrorDetail};

pub mod analytics;
pub mod auth;
pub mod contact;
pub mod guestbook;
pub mod health;
pub mod live;
pub mod portfolio;
pub mod users;

/// Success response envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Wraps data in a success envelope
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

/// Common pagination query parameters
///
/// List queries declare `page`/`limit` inline and build this struct in the
/// handler; `serde_urlencoded` cannot deserialize numeric fields through
/// `#[serde(flatten)]`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    /// Current page, clamped to at least 1
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size, clamped to `[1, max]`
    pub fn limit(&self, default: i64, max: i64) -> i64 {
        self.limit.unwrap_or(default).clamp(1, max)
    }

    /// Row offset for the current page
    pub fn offset(&self, default: i64, max: i64) -> i64 {
        (self.page() - 1) * self.limit(default, max)
    }
}

/// Pagination metadata returned alongside list data
#[derive(Debug, Clone, Serialize)]
pub struct PageInfo {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PageInfo {
    /// Computes page metadata from a total row count
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + limit - 1) / limit
        };

        Self {
            current_page: page,
            total_pages,
            total_items: total,
            has_next: page < total_pages,
            has_prev: page > 1 && total_pages > 0,
        }
    }
}

/// A page of items plus its metadata
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: PageInfo,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: i64, limit: i64, total: i64) -> Self {
        Self {
            items,
            pagination: PageInfo::new(page, limit, total),
        }
    }
}

/// Runs `validator` checks and maps failures to a 422 with field details
pub fn check_request<T: Validate>(req: &T) -> Result<(), ApiError> {
    req.validate().map_err(|e| {
        let errors: Vec<ValidationErrorDetail> = e
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        ApiError::ValidationError(errors)
    })
}

/// Client IP from proxy headers
///
/// The server always sits behind a reverse proxy, so the peer address is the
/// proxy. Takes the first `X-Forwarded-For` hop, then `X-Real-IP`.
pub fn client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let trimmed = first.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let trimmed = real_ip.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    "unknown".to_string()
}

/// Client User-Agent, truncated to fit the column
pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|ua| ua.chars().take(512).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_pagination_defaults() {
        let p = Pagination::default();
        assert_eq!(p.page(), 1);
        assert_eq!(p.limit(20, 100), 20);
        assert_eq!(p.offset(20, 100), 0);
    }

    #[test]
    fn test_pagination_clamping() {
        let p = Pagination {
            page: Some(0),
            limit: Some(500),
        };
        assert_eq!(p.page(), 1);
        assert_eq!(p.limit(20, 100), 100);

        let p = Pagination {
            page: Some(3),
            limit: Some(10),
        };
        assert_eq!(p.offset(20, 100), 20);
    }

    #[test]
    fn test_page_info_math() {
        let info = PageInfo::new(1, 10, 35);
        assert_eq!(info.total_pages, 4);
        assert!(info.has_next);
        assert!(!info.has_prev);

        let info = PageInfo::new(4, 10, 35);
        assert!(!info.has_next);
        assert!(info.has_prev);

        let info = PageInfo::new(2, 10, 20);
        assert_eq!(info.total_pages, 2);
        assert!(!info.has_next);
        assert!(info.has_prev);
    }

    #[test]
    fn test_page_info_empty() {
        let info = PageInfo::new(1, 10, 0);
        assert_eq!(info.total_pages, 0);
        assert!(!info.has_next);
        assert!(!info.has_prev);
    }

    #[test]
    fn test_list_queries_parse_numeric_pagination() {
        use axum::extract::Query;
        use axum::http::Uri;

        let uri = Uri::from_static("/api/portfolio?page=2&limit=5&featured=true");
        let Query(q) = Query::<portfolio::ListQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(q.page, Some(2));
        assert_eq!(q.limit, Some(5));
        assert_eq!(q.featured, Some(true));

        let uri = Uri::from_static("/api/guestbook?page=3&limit=10&category=general");
        let Query(q) = Query::<guestbook::ListQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(q.page, Some(3));
        assert_eq!(q.limit, Some(10));
        assert_eq!(q.category.as_deref(), Some("general"));

        let uri = Uri::from_static("/api/contact?page=1&limit=50&status=new");
        let Query(q) = Query::<contact::ListQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(q.limit, Some(50));
        assert_eq!(q.status.as_deref(), Some("new"));

        let uri = Uri::from_static("/api/users?page=4&limit=25&search=ada");
        let Query(q) = Query::<users::ListQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(q.page, Some(4));
        assert_eq!(q.search.as_deref(), Some("ada"));
    }

    #[test]
    fn test_client_ip_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers), "203.0.113.9");
    }

    #[test]
    fn test_client_ip_real_ip_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(client_ip(&headers), "198.51.100.2");
    }

    #[test]
    fn test_client_ip_unknown() {
        assert_eq!(client_ip(&HeaderMap::new()), "unknown");
    }
}
