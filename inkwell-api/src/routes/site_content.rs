/// CMS page blocks
///
/// # Endpoints
///
/// - `GET /api/site-content/:page_key` - All blocks of a page as a map (public, cached)
/// - `GET /api/site-content/:page_key/:section_key` - One block (public)
/// - `GET /api/site-content` - Every block (editor)
/// - `PUT /api/site-content/:page_key/:section_key` - Create or replace (editor)
/// - `DELETE /api/site-content/:page_key/:section_key` - Delete (editor)
///
/// The public site renders its default copy for any section missing here.

use std::collections::BTreeMap;

use axum::{extract::State, http::StatusCode, Json};
use inkwell_shared::{
    auth::authorization::require_editor,
    cache::keys,
    models::site_content::{page_map, SiteContent, UpsertSiteContent},
    slug::{is_valid_content_key, MAX_CONTENT_KEY_LEN},
};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use validator::Validate;

use super::non_blank;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::{
        auth::Authenticated,
        extract::{ApiPath, ValidatedJson},
    },
};

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertSectionRequest {
    /// Any JSON value; the site decides its shape per section
    pub content: JsonValue,

    #[validate(length(max = 1024, message = "Image URL is too long"))]
    pub image_url: Option<String>,
}

pub async fn list_all_content(
    State(state): State<AppState>,
    Authenticated(auth): Authenticated,
) -> ApiResult<Json<Vec<SiteContent>>> {
    require_editor(&auth)?;

    let blocks = SiteContent::list_all(&state.db).await?;
    Ok(Json(blocks))
}

/// Blocks of one page keyed by section
///
/// ```text
/// GET /api/site-content/home
/// ```
///
/// ```json
/// {
///   "hero": {"page_key": "home", "section_key": "hero", "content": {"title": "Welcome"}, ...}
/// }
/// ```
///
/// An unknown page is an empty map, not a 404.
pub async fn get_page_content(
    State(state): State<AppState>,
    ApiPath(page_key): ApiPath<String>,
) -> ApiResult<Json<BTreeMap<String, SiteContent>>> {
    check_key("page_key", &page_key)?;

    let blocks = state
        .cache
        .get_or_load(&keys::site_content_page(&page_key), || async {
            SiteContent::list_for_page(&state.db, &page_key)
                .await
                .map(page_map)
        })
        .await?;

    Ok(Json(blocks))
}

pub async fn get_section(
    State(state): State<AppState>,
    ApiPath((page_key, section_key)): ApiPath<(String, String)>,
) -> ApiResult<Json<SiteContent>> {
    check_key("page_key", &page_key)?;
    check_key("section_key", &section_key)?;

    let block = SiteContent::find(&state.db, &page_key, &section_key)
        .await?
        .ok_or_else(|| ApiError::NotFound("Content section not found".to_string()))?;

    Ok(Json(block))
}

/// Create or replace a block
///
/// ```text
/// PUT /api/site-content/home/hero
/// Authorization: Bearer <jwt_token>
/// Content-Type: application/json
///
/// {"content": {"title": "Welcome"}, "image_url": "https://cdn.example.com/hero.jpg"}
/// ```
pub async fn upsert_section(
    State(state): State<AppState>,
    Authenticated(auth): Authenticated,
    ApiPath((page_key, section_key)): ApiPath<(String, String)>,
    ValidatedJson(req): ValidatedJson<UpsertSectionRequest>,
) -> ApiResult<Json<SiteContent>> {
    require_editor(&auth)?;
    check_key("page_key", &page_key)?;
    check_key("section_key", &section_key)?;

    let block = SiteContent::upsert(
        &state.db,
        UpsertSiteContent {
            page_key: page_key.clone(),
            section_key,
            content: req.content,
            image_url: non_blank(req.image_url),
        },
    )
    .await?;

    state
        .cache
        .invalidate_prefix(&keys::site_content_page(&page_key))
        .await;

    tracing::info!(
        page_key = %block.page_key,
        section_key = %block.section_key,
        editor_id = %auth.user_id,
        "Site content saved"
    );

    Ok(Json(block))
}

pub async fn delete_section(
    State(state): State<AppState>,
    Authenticated(auth): Authenticated,
    ApiPath((page_key, section_key)): ApiPath<(String, String)>,
) -> ApiResult<StatusCode> {
    require_editor(&auth)?;
    check_key("page_key", &page_key)?;
    check_key("section_key", &section_key)?;

    if !SiteContent::delete(&state.db, &page_key, &section_key).await? {
        return Err(ApiError::NotFound("Content section not found".to_string()));
    }

    state
        .cache
        .invalidate_prefix(&keys::site_content_page(&page_key))
        .await;

    tracing::info!(%page_key, %section_key, "Site content deleted");

    Ok(StatusCode::NO_CONTENT)
}

fn check_key(field: &str, key: &str) -> ApiResult<()> {
    if is_valid_content_key(key) {
        Ok(())
    } else {
        Err(ApiError::invalid_field(
            field,
            format!(
                "Must be 1-{} characters of lowercase letters, digits, '-' or '_'",
                MAX_CONTENT_KEY_LEN
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_key() {
        assert!(check_key("page_key", "home").is_ok());
        assert!(check_key("section_key", "hero_banner-2").is_ok());
        assert!(check_key("page_key", "Home").is_err());
        assert!(check_key("page_key", "").is_err());
    }

    #[test]
    fn test_upsert_requires_content() {
        assert!(serde_json::from_str::<UpsertSectionRequest>(r#"{"image_url":null}"#).is_err());

        let req: UpsertSectionRequest =
            serde_json::from_str(r#"{"content":{"title":"Welcome"}}"#).unwrap();
        assert_eq!(req.content["title"], "Welcome");
        assert_eq!(req.image_url, None);
    }
}
