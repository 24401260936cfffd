/// Database models for Inkwell
///
/// Each model owns its SQL: rows are plain structs deriving `sqlx::FromRow`,
/// and CRUD lives in associated functions taking `&PgPool`.
///
/// # Models
///
/// - `user`: editorial/moderation accounts
/// - `category`: post categories
/// - `post`: blog articles
/// - `comment`: threaded, moderated comments
/// - `post_like`: per-device likes
/// - `user_activity`: append-only interaction log
/// - `site_content`: CMS page blocks
/// - `newsletter`: newsletter subscribers
///
/// # Example
///
/// ```no_run
/// use inkwell_shared::models::post::Post;
/// use inkwell_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// if let Some(post) = Post::find_published_by_slug(&pool, "hello-world").await? {
///     println!("{}", post.title);
/// }
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Deserializer, Serialize};

pub mod category;
pub mod comment;
pub mod newsletter;
pub mod post;
pub mod post_like;
pub mod site_content;
pub mod user;
pub mod user_activity;

/// Largest page a list endpoint will return
pub const MAX_PAGE_SIZE: i64 = 100;

/// Page size used when the client does not ask for one
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Limit/offset pagination shared by list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// Clamps client-supplied values into a valid page
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// A page of rows plus the total number of matching rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, page: Page) -> Self {
        Self {
            items,
            total,
            limit: page.limit,
            offset: page.offset,
        }
    }
}

/// Distinguishes an absent field from an explicit `null`
///
/// Use with `#[serde(default, deserialize_with = "double_option")]` on an
/// `Option<Option<T>>`: missing → `None`, `null` → `Some(None)`,
/// value → `Some(Some(v))`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
