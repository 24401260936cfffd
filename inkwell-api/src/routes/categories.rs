/// Category endpoints
///
/// # Endpoints
///
/// - `GET /api/category` - Active categories (public, cached)
/// - `GET /api/category/slug/:slug` - One active category (public)
/// - `GET /api/category/all` - All categories (editor)
/// - `POST /api/category` - Create (editor)
/// - `PUT /api/category/:id` - Partial update (editor)
/// - `DELETE /api/category/:id` - Delete; posts keep existing uncategorized (editor)
///
/// Posts embed their category's name and slug, so category writes drop the
/// cached post pages too.

use axum::{extract::State, http::StatusCode, Json};
use inkwell_shared::{
    auth::authorization::require_editor,
    cache::keys,
    models::{
        category::{Category, CreateCategory, UpdateCategory},
        double_option,
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{
    non_blank,
    posts::{resolve_slug, validate_slug},
    required_text,
};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::{
        auth::Authenticated,
        extract::{ApiPath, ValidatedJson},
    },
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    /// Derived from the name when omitted
    pub slug: Option<String>,

    pub description: Option<String>,

    #[serde(default = "default_active")]
    pub is_active: bool,
}

const NAME_BLANK: &str = "Name must not be blank";

fn default_active() -> bool {
    true
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    pub slug: Option<String>,

    /// `null` clears the description
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    pub is_active: Option<bool>,
}

pub async fn list_active_categories(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Category>>> {
    let categories = state
        .cache
        .get_or_load(&keys::active_categories(), || Category::list(&state.db, true))
        .await?;

    Ok(Json(categories))
}

pub async fn get_category_by_slug(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> ApiResult<Json<Category>> {
    let category = Category::find_active_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))?;

    Ok(Json(category))
}

/// All categories, inactive ones included
pub async fn list_all_categories(
    State(state): State<AppState>,
    Authenticated(auth): Authenticated,
) -> ApiResult<Json<Vec<Category>>> {
    require_editor(&auth)?;

    let categories = Category::list(&state.db, false).await?;
    Ok(Json(categories))
}

/// Create a category
///
/// ```text
/// POST /api/category
/// Authorization: Bearer <jwt_token>
/// Content-Type: application/json
///
/// {"name": "Rust Tips", "description": "Short practical notes"}
/// ```
///
/// Returns 201 with the category (slug `rust-tips`), 409 if the slug is taken.
pub async fn create_category(
    State(state): State<AppState>,
    Authenticated(auth): Authenticated,
    ValidatedJson(req): ValidatedJson<CreateCategoryRequest>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    require_editor(&auth)?;

    let name = required_text("name", &req.name, NAME_BLANK)?;
    let slug = resolve_slug(req.slug.as_deref(), &name)?;

    let category = Category::create(
        &state.db,
        CreateCategory {
            name,
            slug,
            description: non_blank(req.description),
            is_active: req.is_active,
        },
    )
    .await?;

    invalidate(&state).await;

    tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    Authenticated(auth): Authenticated,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateCategoryRequest>,
) -> ApiResult<Json<Category>> {
    require_editor(&auth)?;

    let name = req
        .name
        .as_deref()
        .map(|n| required_text("name", n, NAME_BLANK))
        .transpose()?;
    let slug = req.slug.as_deref().map(validate_slug).transpose()?;

    let category = Category::update(
        &state.db,
        id,
        UpdateCategory {
            name,
            slug,
            description: req.description.map(non_blank),
            is_active: req.is_active,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))?;

    invalidate(&state).await;

    tracing::info!(category_id = %id, "Category updated");

    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Authenticated(auth): Authenticated,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    require_editor(&auth)?;

    if !Category::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Category not found".to_string()));
    }

    invalidate(&state).await;

    tracing::info!(category_id = %id, "Category deleted");

    Ok(StatusCode::NO_CONTENT)
}

async fn invalidate(state: &AppState) {
    state.cache.invalidate_prefix(keys::CATEGORIES_PREFIX).await;
    state.cache.invalidate_prefix(keys::POSTS_PREFIX).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_defaults_active() {
        let req: CreateCategoryRequest = serde_json::from_str(r#"{"name":"News"}"#).unwrap();
        assert!(req.is_active);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_create_request_rejects_empty_name() {
        let req: CreateCategoryRequest = serde_json::from_str(r#"{"name":""}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_update_request_clears_description() {
        let req: UpdateCategoryRequest =
            serde_json::from_str(r#"{"description":null}"#).unwrap();
        assert_eq!(req.description, Some(None));
        assert_eq!(req.name, None);
    }
}
