/// Blog post endpoints
///
/// # Endpoints
///
/// - `GET /api/post` - Published posts (public, cached)
/// - `GET /api/post/slug/:slug` - One published post (public, cached)
/// - `GET /api/post/all` - Every post, drafts included (editor)
/// - `GET /api/post/:id` - Any post by id (editor)
/// - `POST /api/post` - Create (editor)
/// - `PUT /api/post/:id` - Partial update (editor)
/// - `DELETE /api/post/:id` - Delete with comments, likes and activity (editor)
///
/// Every write drops the cached post pages.

use axum::{extract::State, http::StatusCode, Json};
use inkwell_shared::{
    auth::authorization::require_editor,
    cache::keys,
    models::{
        double_option,
        post::{CreatePost, Post, PostFilter, UpdatePost},
        Page, Paginated,
    },
    slug::{is_valid_slug, slugify, MAX_SLUG_LEN},
};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;
use validator::Validate;

use super::{non_blank, required_text};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::{
        auth::Authenticated,
        extract::{ApiPath, ApiQuery, ValidatedJson},
    },
};

/// Longest accepted image URL
const MAX_URL_LEN: usize = 1024;

const TITLE_BLANK: &str = "Title must not be blank";

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 300, message = "Title must be 1-300 characters"))]
    pub title: String,

    /// Derived from the title when omitted
    pub slug: Option<String>,

    pub excerpt: Option<String>,

    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,

    /// JSON object; defaults to `{}`
    pub metadata: Option<JsonValue>,

    #[validate(length(max = 1024, message = "Cover image URL is too long"))]
    pub cover_image_url: Option<String>,

    pub category_id: Option<Uuid>,

    #[serde(default)]
    pub is_published: bool,

    #[serde(default)]
    pub is_featured: bool,
}

/// Partial update
///
/// Absent fields are left alone. `excerpt`, `cover_image_url` and
/// `category_id` may be set to `null` to clear them.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 300, message = "Title must be 1-300 characters"))]
    pub title: Option<String>,

    pub slug: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub excerpt: Option<Option<String>>,

    #[validate(length(min = 1, message = "Content must not be empty"))]
    pub content: Option<String>,

    pub metadata: Option<JsonValue>,

    #[serde(default, deserialize_with = "double_option")]
    pub cover_image_url: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<Uuid>>,

    pub is_published: Option<bool>,

    pub is_featured: Option<bool>,
}

/// Query string of `GET /api/post`
#[derive(Debug, Default, Deserialize)]
pub struct PublicPostQuery {
    /// Category slug
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PublicPostQuery {
    fn into_parts(self) -> (PostFilter, Page) {
        let filter = PostFilter {
            featured: self.featured,
            category_slug: non_blank(self.category),
            search: non_blank(self.search),
            ..PostFilter::public()
        };
        (filter, Page::new(self.limit, self.offset))
    }
}

/// Query string of `GET /api/post/all`
#[derive(Debug, Default, Deserialize)]
pub struct AdminPostQuery {
    pub published: Option<bool>,
    pub featured: Option<bool>,
    pub category_id: Option<Uuid>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl AdminPostQuery {
    fn into_parts(self) -> (PostFilter, Page) {
        let filter = PostFilter {
            published: self.published,
            featured: self.featured,
            category_id: self.category_id,
            category_slug: non_blank(self.category),
            search: non_blank(self.search),
        };
        (filter, Page::new(self.limit, self.offset))
    }
}

/// Published posts, newest first
///
/// ```text
/// GET /api/post?category=rust&featured=true&limit=10&offset=0
/// ```
///
/// ```json
/// {"items": [...], "total": 42, "limit": 10, "offset": 0}
/// ```
pub async fn list_published_posts(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PublicPostQuery>,
) -> ApiResult<Json<Paginated<Post>>> {
    let (filter, page) = query.into_parts();
    let key = keys::post_list(&format!("{:?}|{}|{}", filter, page.limit, page.offset));

    let posts = state
        .cache
        .get_or_load(&key, || async {
            let items = Post::list(&state.db, &filter, page).await?;
            let total = Post::count(&state.db, &filter).await?;
            Ok::<_, sqlx::Error>(Paginated::new(items, total, page))
        })
        .await?;

    Ok(Json(posts))
}

/// One published post by slug
///
/// Misses are not cached, so unknown slugs cannot fill the cache.
pub async fn get_post_by_slug(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> ApiResult<Json<Post>> {
    let key = keys::post_by_slug(&slug);

    if let Some(post) = state.cache.get_json::<Post>(&key).await {
        return Ok(Json(post));
    }

    let post = Post::find_published_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    state.cache.set_json(&key, &post).await;

    Ok(Json(post))
}

/// All posts, drafts included
pub async fn list_all_posts(
    State(state): State<AppState>,
    Authenticated(auth): Authenticated,
    ApiQuery(query): ApiQuery<AdminPostQuery>,
) -> ApiResult<Json<Paginated<Post>>> {
    require_editor(&auth)?;

    let (filter, page) = query.into_parts();
    let items = Post::list(&state.db, &filter, page).await?;
    let total = Post::count(&state.db, &filter).await?;

    Ok(Json(Paginated::new(items, total, page)))
}

pub async fn get_post(
    State(state): State<AppState>,
    Authenticated(auth): Authenticated,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Post>> {
    require_editor(&auth)?;

    let post = Post::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    Ok(Json(post))
}

/// Create a post
///
/// ```text
/// POST /api/post
/// Authorization: Bearer <jwt_token>
/// Content-Type: application/json
///
/// {
///   "title": "Hello, Inkwell",
///   "content": "First post.",
///   "category_id": "550e8400-e29b-41d4-a716-446655440000",
///   "is_published": true
/// }
/// ```
///
/// The caller becomes the author. A taken slug returns 409, an unknown
/// category 400.
pub async fn create_post(
    State(state): State<AppState>,
    Authenticated(auth): Authenticated,
    ValidatedJson(req): ValidatedJson<CreatePostRequest>,
) -> ApiResult<(StatusCode, Json<Post>)> {
    require_editor(&auth)?;

    let title = required_text("title", &req.title, TITLE_BLANK)?;
    let slug = resolve_slug(req.slug.as_deref(), &title)?;
    let metadata = match req.metadata {
        Some(metadata) => require_object(metadata)?,
        None => JsonValue::Object(Default::default()),
    };

    let post = Post::create(
        &state.db,
        CreatePost {
            title,
            slug,
            excerpt: non_blank(req.excerpt),
            content: req.content,
            metadata,
            cover_image_url: non_blank(req.cover_image_url),
            category_id: req.category_id,
            author_id: Some(auth.user_id),
            is_published: req.is_published,
            is_featured: req.is_featured,
        },
    )
    .await?;

    state.cache.invalidate_prefix(keys::POSTS_PREFIX).await;

    tracing::info!(
        post_id = %post.id,
        slug = %post.slug,
        published = post.is_published,
        author_id = %auth.user_id,
        "Post created"
    );

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update_post(
    State(state): State<AppState>,
    Authenticated(auth): Authenticated,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdatePostRequest>,
) -> ApiResult<Json<Post>> {
    require_editor(&auth)?;

    let title = req
        .title
        .as_deref()
        .map(|t| required_text("title", t, TITLE_BLANK))
        .transpose()?;

    let slug = match req.slug.as_deref() {
        Some(slug) => Some(validate_slug(slug)?),
        None => None,
    };

    if let Some(Some(url)) = &req.cover_image_url {
        if url.len() > MAX_URL_LEN {
            return Err(ApiError::invalid_field("cover_image_url", "Cover image URL is too long"));
        }
    }

    let metadata = req.metadata.map(require_object).transpose()?;

    let update = UpdatePost {
        title,
        slug,
        excerpt: req.excerpt.map(non_blank),
        content: req.content,
        metadata,
        cover_image_url: req.cover_image_url.map(non_blank),
        category_id: req.category_id,
        is_published: req.is_published,
        is_featured: req.is_featured,
    };

    let post = Post::update(&state.db, id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    state.cache.invalidate_prefix(keys::POSTS_PREFIX).await;

    tracing::info!(post_id = %id, editor_id = %auth.user_id, "Post updated");

    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Authenticated(auth): Authenticated,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    require_editor(&auth)?;

    if !Post::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Post not found".to_string()));
    }

    state.cache.invalidate_prefix(keys::POSTS_PREFIX).await;

    tracing::info!(post_id = %id, editor_id = %auth.user_id, "Post deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Uses the provided slug if valid, else derives one from `title`
pub(crate) fn resolve_slug(provided: Option<&str>, title: &str) -> ApiResult<String> {
    match provided.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => validate_slug(slug),
        None => {
            let slug = slugify(title);
            if slug.is_empty() {
                return Err(ApiError::invalid_field(
                    "slug",
                    "A slug is required when the title has no letters or digits",
                ));
            }
            Ok(slug)
        }
    }
}

pub(crate) fn validate_slug(slug: &str) -> ApiResult<String> {
    let slug = slug.trim();
    if is_valid_slug(slug) {
        Ok(slug.to_string())
    } else {
        Err(ApiError::invalid_field(
            "slug",
            format!(
                "Slug must be lowercase letters, digits and single hyphens (max {} characters)",
                MAX_SLUG_LEN
            ),
        ))
    }
}

fn require_object(metadata: JsonValue) -> ApiResult<JsonValue> {
    if metadata.is_object() {
        Ok(metadata)
    } else {
        Err(ApiError::invalid_field("metadata", "Metadata must be a JSON object"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_slug_from_title() {
        assert_eq!(resolve_slug(None, "Hello, World!").unwrap(), "hello-world");
        assert_eq!(resolve_slug(Some("  "), "Rust Tips").unwrap(), "rust-tips");
    }

    #[test]
    fn test_resolve_slug_rejects_bad_input() {
        assert!(matches!(
            resolve_slug(Some("Not A Slug"), "Title"),
            Err(ApiError::ValidationError(_))
        ));
        assert!(matches!(resolve_slug(None, "!!!"), Err(ApiError::ValidationError(_))));
    }

    #[test]
    fn test_provided_slug_is_kept() {
        assert_eq!(resolve_slug(Some("custom-slug"), "Other").unwrap(), "custom-slug");
    }

    #[test]
    fn test_metadata_must_be_object() {
        assert!(require_object(serde_json::json!({"reading_time": 4})).is_ok());
        assert!(require_object(serde_json::json!([1, 2])).is_err());
    }

    #[test]
    fn test_update_request_distinguishes_null() {
        let req: UpdatePostRequest =
            serde_json::from_str(r#"{"excerpt": null, "title": "New"}"#).unwrap();
        assert_eq!(req.excerpt, Some(None));
        assert_eq!(req.cover_image_url, None);
        assert_eq!(req.title.as_deref(), Some("New"));
    }

    #[test]
    fn test_public_query_forces_published() {
        let query = PublicPostQuery {
            category: Some("rust".to_string()),
            search: Some("   ".to_string()),
            ..Default::default()
        };
        let (filter, page) = query.into_parts();
        assert_eq!(filter.published, Some(true));
        assert_eq!(filter.category_slug.as_deref(), Some("rust"));
        assert_eq!(filter.search, None);
        assert_eq!(page, Page::new(None, None));
    }
}
