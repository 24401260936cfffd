/// API route handlers, one module per resource
///
/// - `health`: liveness and dependency status
/// - `comments`: threaded comments and moderation
/// - `likes`: per-device likes
/// - `activity`: anonymous interaction log
/// - `posts`: blog posts
/// - `categories`: post categories
/// - `site_content`: CMS page blocks
/// - `newsletter`: newsletter subscriptions
/// - `users`: dashboard accounts

use axum::http::{header, HeaderMap};
use inkwell_shared::models::Page;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};

pub mod activity;
pub mod categories;
pub mod comments;
pub mod health;
pub mod likes;
pub mod newsletter;
pub mod posts;
pub mod site_content;
pub mod users;

/// `?limit=&offset=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageQuery {
    pub fn page(&self) -> Page {
        Page::new(self.limit, self.offset)
    }
}

/// `User-Agent` of the request, used as activity device info
pub(crate) fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Trims an optional text field, mapping blank values to `None`
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trims a required text field, rejecting values that are blank once trimmed
pub(crate) fn required_text(field: &str, value: &str, message: &str) -> ApiResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::invalid_field(field, message));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_page_query_clamps() {
        let query = PageQuery {
            limit: Some(500),
            offset: Some(-1),
        };
        assert_eq!(query.page(), Page { limit: 100, offset: 0 });
    }

    #[test]
    fn test_user_agent() {
        let mut headers = HeaderMap::new();
        assert_eq!(user_agent(&headers), None);

        headers.insert(header::USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
        assert_eq!(user_agent(&headers).as_deref(), Some("Mozilla/5.0"));
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  ".to_string())), None);
        assert_eq!(non_blank(Some(" Ada ".to_string())).as_deref(), Some("Ada"));
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn test_required_text_rejects_whitespace() {
        assert_eq!(
            required_text("title", "  Hello  ", "Title must not be blank").unwrap(),
            "Hello"
        );

        match required_text("title", " \t\n ", "Title must not be blank") {
            Err(ApiError::ValidationError(details)) => {
                assert_eq!(details.len(), 1);
                assert_eq!(details[0].field, "title");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
